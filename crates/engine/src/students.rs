//! Students as seen by billing: a name and the class they currently sit in.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    /// Current class. Class-wide fee assignment targets this column.
    pub class_id: Option<Uuid>,
}

impl Student {
    pub fn new(name: String, class_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            class_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub class_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Student> for ActiveModel {
    fn from(value: &Student) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            class_id: ActiveValue::Set(value.class_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Student {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "student")?,
            name: model.name,
            class_id: parse_optional_uuid(model.class_id.as_deref(), "class")?,
        })
    }
}
