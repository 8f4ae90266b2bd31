//! Fee items: the billable lines of a fee structure.
//!
//! Amounts are not versioned. Updating an item's amount changes the billed
//! total of every student already assigned to it.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine,
    util::{ensure_amount, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeeItem {
    pub id: Uuid,
    pub fee_structure_id: Uuid,
    pub name: String,
    pub amount: MoneyCents,
    pub is_compulsory: bool,
}

impl FeeItem {
    pub fn new(
        fee_structure_id: Uuid,
        name: String,
        amount: MoneyCents,
        is_compulsory: bool,
    ) -> ResultEngine<Self> {
        ensure_amount(amount, "fee amount")?;
        Ok(Self {
            id: Uuid::new_v4(),
            fee_structure_id,
            name,
            amount,
            is_compulsory,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fee_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub fee_structure_id: String,
    pub name: String,
    pub amount_minor: i64,
    pub is_compulsory: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fee_structures::Entity",
        from = "Column::FeeStructureId",
        to = "super::fee_structures::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    FeeStructures,
    #[sea_orm(has_many = "super::fee_assignments::Entity")]
    FeeAssignments,
}

impl Related<super::fee_structures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeStructures.def()
    }
}

impl Related<super::fee_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FeeItem> for ActiveModel {
    fn from(value: &FeeItem) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            fee_structure_id: ActiveValue::Set(value.fee_structure_id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            amount_minor: ActiveValue::Set(value.amount.cents()),
            is_compulsory: ActiveValue::Set(value.is_compulsory),
        }
    }
}

impl TryFrom<Model> for FeeItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "fee item")?,
            fee_structure_id: parse_uuid(&model.fee_structure_id, "fee structure")?,
            name: model.name,
            amount: MoneyCents::new(model.amount_minor),
            is_compulsory: model.is_compulsory,
        })
    }
}
