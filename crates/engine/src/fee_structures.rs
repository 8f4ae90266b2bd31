//! Fee structures: a named bundle of billable items, bound to an academic
//! year and optionally to a class.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, FeeItem,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeeStructure {
    pub id: Uuid,
    pub name: String,
    pub academic_year_id: Uuid,
    /// When set, students of this class are billed automatically: at
    /// creation of the structure and when a new student joins the class.
    pub class_id: Option<Uuid>,
    pub items: Vec<FeeItem>,
}

impl FeeStructure {
    pub fn new(name: String, academic_year_id: Uuid, class_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            academic_year_id,
            class_id,
            items: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fee_structures")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub academic_year_id: String,
    pub class_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::fee_items::Entity")]
    FeeItems,
}

impl Related<super::fee_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FeeStructure> for ActiveModel {
    fn from(value: &FeeStructure) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            academic_year_id: ActiveValue::Set(value.academic_year_id.to_string()),
            class_id: ActiveValue::Set(value.class_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<(Model, Vec<super::fee_items::Model>)> for FeeStructure {
    type Error = EngineError;

    fn try_from(
        (model, items): (Model, Vec<super::fee_items::Model>),
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "fee structure")?,
            name: model.name,
            academic_year_id: parse_uuid(&model.academic_year_id, "academic year")?,
            class_id: parse_optional_uuid(model.class_id.as_deref(), "class")?,
            items: items
                .into_iter()
                .map(FeeItem::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}
