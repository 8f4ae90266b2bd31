//! Payments received from students.
//!
//! A payment is immutable once recorded. It only leaves the ledger together
//! with its receipt.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine,
    util::{ensure_amount, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: MoneyCents,
    pub method: String,
    pub description: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
}

impl Payment {
    pub fn new(
        student_id: Uuid,
        amount: MoneyCents,
        method: String,
        description: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        ensure_amount(amount, "payment amount")?;
        Ok(Self {
            id: Uuid::new_v4(),
            student_id,
            amount,
            method,
            description,
            paid_at,
            idempotency_key: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub student_id: String,
    pub amount_minor: i64,
    pub method: String,
    pub description: Option<String>,
    pub paid_at: DateTimeUtc,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::receipts::Entity")]
    Receipts,
}

impl Related<super::receipts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(value: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            student_id: ActiveValue::Set(value.student_id.to_string()),
            amount_minor: ActiveValue::Set(value.amount.cents()),
            method: ActiveValue::Set(value.method.clone()),
            description: ActiveValue::Set(value.description.clone()),
            paid_at: ActiveValue::Set(value.paid_at),
            idempotency_key: ActiveValue::Set(value.idempotency_key.clone()),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "payment")?,
            student_id: parse_uuid(&model.student_id, "student")?,
            amount: MoneyCents::new(model.amount_minor),
            method: model.method,
            description: model.description,
            paid_at: model.paid_at,
            idempotency_key: model.idempotency_key,
        })
    }
}
