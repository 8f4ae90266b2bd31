//! Receipts: the proof of payment issued together with every payment.
//!
//! Receipt numbers carry a human-readable prefix and a zero-padded value of
//! the `receipt` sequence, which is incremented inside the transaction that
//! records the payment.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, Payment, util::parse_uuid};

pub(crate) const RECEIPT_PREFIX: &str = "REC-";
pub(crate) const RECEIPT_SEQUENCE: &str = "receipt";

/// Formats the receipt number for a sequence value.
pub(crate) fn receipt_number(sequence: i64) -> String {
    format!("{RECEIPT_PREFIX}{sequence:06}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub receipt_number: String,
    pub sequence: i64,
    pub issued_at: DateTime<Utc>,
}

impl Receipt {
    pub fn new(payment_id: Uuid, sequence: i64, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id,
            receipt_number: receipt_number(sequence),
            sequence,
            issued_at,
        }
    }
}

/// A receipt with the payment it proves, enough to reprint it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptDetail {
    pub receipt: Receipt,
    pub payment: Payment,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub payment_id: String,
    pub receipt_number: String,
    pub sequence: i64,
    pub issued_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payments::Entity",
        from = "Column::PaymentId",
        to = "super::payments::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Payments,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Receipt> for ActiveModel {
    fn from(value: &Receipt) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            payment_id: ActiveValue::Set(value.payment_id.to_string()),
            receipt_number: ActiveValue::Set(value.receipt_number.clone()),
            sequence: ActiveValue::Set(value.sequence),
            issued_at: ActiveValue::Set(value.issued_at),
        }
    }
}

impl TryFrom<Model> for Receipt {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "receipt")?,
            payment_id: parse_uuid(&model.payment_id, "payment")?,
            receipt_number: model.receipt_number,
            sequence: model.sequence,
            issued_at: model.issued_at,
        })
    }
}
