//! Terms split an academic year into billing windows.
//!
//! A term filters payments by their date: a payment belongs to a term when it
//! was received on a day between `starts_on` and `ends_on`, both inclusive.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Term {
    pub id: Uuid,
    pub academic_year_id: Uuid,
    pub name: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

impl Term {
    pub fn new(
        academic_year_id: Uuid,
        name: String,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> ResultEngine<Self> {
        if ends_on < starts_on {
            return Err(EngineError::Validation(format!(
                "term '{name}' ends on {ends_on}, before it starts on {starts_on}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            academic_year_id,
            name,
            starts_on,
            ends_on,
        })
    }

    /// Returns `true` if `at` falls on a day inside the term.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.starts_on <= day && day <= self.ends_on
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "terms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub academic_year_id: String,
    pub name: String,
    pub starts_on: Date,
    pub ends_on: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Term> for ActiveModel {
    fn from(value: &Term) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            academic_year_id: ActiveValue::Set(value.academic_year_id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            starts_on: ActiveValue::Set(value.starts_on),
            ends_on: ActiveValue::Set(value.ends_on),
        }
    }
}

impl TryFrom<Model> for Term {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "term")?,
            academic_year_id: parse_uuid(&model.academic_year_id, "academic year")?,
            name: model.name,
            starts_on: model.starts_on,
            ends_on: model.ends_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let term = Term::new(Uuid::new_v4(), "First".to_string(), date(2025, 9, 1), date(2025, 12, 19))
            .unwrap();

        assert!(term.contains(Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap()));
        assert!(term.contains(Utc.with_ymd_and_hms(2025, 12, 19, 23, 59, 59).unwrap()));
        assert!(!term.contains(Utc.with_ymd_and_hms(2025, 8, 31, 23, 59, 59).unwrap()));
        assert!(!term.contains(Utc.with_ymd_and_hms(2025, 12, 20, 0, 0, 0).unwrap()));
    }

    #[test]
    fn rejects_inverted_window() {
        let err = Term::new(Uuid::new_v4(), "Bad".to_string(), date(2025, 12, 1), date(2025, 9, 1))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
