//! Fee assignments: one row per (student, fee item) pair the student owes.
//!
//! The pair is unique in storage (`uidx-fee_assignments-student_id-fee_item_id`)
//! and every write goes through an insert-or-ignore, so repeated or
//! concurrent assignment converges to a single row per pair.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, MoneyCents, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeeAssignment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub fee_item_id: Uuid,
}

impl FeeAssignment {
    pub fn new(student_id: Uuid, fee_item_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            fee_item_id,
        }
    }
}

/// An assignment line resolved against its item and structure, as shown on
/// a student statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssignedFee {
    pub assignment_id: Uuid,
    pub fee_item_id: Uuid,
    pub fee_item_name: String,
    pub fee_structure_id: Uuid,
    pub fee_structure_name: String,
    pub academic_year_id: Uuid,
    pub amount: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fee_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub student_id: String,
    pub fee_item_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fee_items::Entity",
        from = "Column::FeeItemId",
        to = "super::fee_items::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    FeeItems,
}

impl Related<super::fee_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FeeAssignment> for ActiveModel {
    fn from(value: &FeeAssignment) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            student_id: ActiveValue::Set(value.student_id.to_string()),
            fee_item_id: ActiveValue::Set(value.fee_item_id.to_string()),
        }
    }
}

impl TryFrom<Model> for FeeAssignment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "fee assignment")?,
            student_id: parse_uuid(&model.student_id, "student")?,
            fee_item_id: parse_uuid(&model.fee_item_id, "fee item")?,
        })
    }
}
