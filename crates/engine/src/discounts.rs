//! Discounts and the arithmetic that turns them into a reduction.
//!
//! A discount is scoped to a student, to a fee structure, or to both. It
//! matches a `(student, fee structure)` lookup when **either** scope matches.
//!
//! Totals are additive: each discount is evaluated against the original
//! billed amount, never against what previous discounts left over, and the
//! sum is not clamped. Clamping happens only when the outstanding balance is
//! computed.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine,
    util::{parse_optional_uuid, parse_uuid},
};

/// One hundred percent, in basis points.
const FULL_PERCENT_BP: i64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is in basis points: 1000 = 10%.
    Percentage,
    /// `value` is in minor units.
    Fixed,
}

impl DiscountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl TryFrom<&str> for DiscountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(EngineError::Validation(format!(
                "invalid discount type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Discount {
    pub id: Uuid,
    pub name: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub student_id: Option<Uuid>,
    pub fee_structure_id: Option<Uuid>,
}

impl Discount {
    pub fn new(
        name: String,
        kind: DiscountKind,
        value: i64,
        student_id: Option<Uuid>,
        fee_structure_id: Option<Uuid>,
    ) -> ResultEngine<Self> {
        validate_discount(kind, value, student_id, fee_structure_id)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            kind,
            value,
            student_id,
            fee_structure_id,
        })
    }

    /// Broad match: the student scope or the structure scope is enough.
    pub fn applies_to(&self, student_id: Uuid, fee_structure_id: Uuid) -> bool {
        self.student_id == Some(student_id) || self.fee_structure_id == Some(fee_structure_id)
    }

    /// Reduction this discount grants on `total_billed`.
    ///
    /// Percentages round half away from zero to the minor unit.
    pub fn reduction(&self, total_billed: MoneyCents) -> MoneyCents {
        match self.kind {
            DiscountKind::Fixed => MoneyCents::new(self.value),
            DiscountKind::Percentage => {
                let product = i128::from(total_billed.cents()) * i128::from(self.value);
                let full = i128::from(FULL_PERCENT_BP);
                let quotient = product / full;
                let remainder = product % full;
                let rounded = if remainder.abs() * 2 >= full {
                    quotient + product.signum()
                } else {
                    quotient
                };
                let saturated = i64::try_from(rounded).unwrap_or(if rounded < 0 {
                    i64::MIN
                } else {
                    i64::MAX
                });
                MoneyCents::new(saturated)
            }
        }
    }
}

pub(crate) fn validate_discount(
    kind: DiscountKind,
    value: i64,
    student_id: Option<Uuid>,
    fee_structure_id: Option<Uuid>,
) -> ResultEngine<()> {
    if value <= 0 {
        return Err(EngineError::Validation(format!(
            "{} discount value must be greater than zero",
            kind.as_str()
        )));
    }
    let ceiling = match kind {
        DiscountKind::Percentage => FULL_PERCENT_BP,
        DiscountKind::Fixed => MoneyCents::MAX_AMOUNT.cents(),
    };
    if value > ceiling {
        return Err(EngineError::Validation(format!(
            "{} discount value must not exceed {ceiling}, got {value}",
            kind.as_str()
        )));
    }
    if student_id.is_none() && fee_structure_id.is_none() {
        return Err(EngineError::Validation(
            "discount must be scoped to a student or a fee structure".to_string(),
        ));
    }
    Ok(())
}

/// Sum of every discount's reduction against the same `total_billed`.
/// Saturates rather than overflowing.
pub fn compute_discount_total(total_billed: MoneyCents, discounts: &[Discount]) -> MoneyCents {
    discounts
        .iter()
        .map(|discount| discount.reduction(total_billed))
        .sum()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub value: i64,
    pub student_id: Option<String>,
    pub fee_structure_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Discount> for ActiveModel {
    fn from(value: &Discount) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            value: ActiveValue::Set(value.value),
            student_id: ActiveValue::Set(value.student_id.map(|id| id.to_string())),
            fee_structure_id: ActiveValue::Set(value.fee_structure_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Discount {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "discount")?,
            name: model.name,
            kind: DiscountKind::try_from(model.kind.as_str())?,
            value: model.value,
            student_id: parse_optional_uuid(model.student_id.as_deref(), "student")?,
            fee_structure_id: parse_optional_uuid(
                model.fee_structure_id.as_deref(),
                "fee structure",
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percentage(bp: i64) -> Discount {
        Discount::new(
            "Sibling".to_string(),
            DiscountKind::Percentage,
            bp,
            Some(Uuid::new_v4()),
            None,
        )
        .unwrap()
    }

    fn fixed(cents: i64) -> Discount {
        Discount::new(
            "Bursary".to_string(),
            DiscountKind::Fixed,
            cents,
            None,
            Some(Uuid::new_v4()),
        )
        .unwrap()
    }

    #[test]
    fn percentage_discount_applies_to_billed_amount() {
        let total = compute_discount_total(MoneyCents::new(100_000), &[percentage(1_000)]);
        assert_eq!(total, MoneyCents::new(10_000));
    }

    #[test]
    fn discounts_are_additive_not_compounded() {
        let total = compute_discount_total(
            MoneyCents::new(100_000),
            &[percentage(1_000), fixed(20_000)],
        );
        // 10% of 1000.00 plus 200.00, both against the original amount.
        assert_eq!(total, MoneyCents::new(30_000));
    }

    #[test]
    fn total_is_not_clamped_to_billed() {
        let total = compute_discount_total(MoneyCents::new(10_000), &[fixed(15_000)]);
        assert_eq!(total, MoneyCents::new(15_000));
    }

    #[test]
    fn percentage_rounds_half_away_from_zero() {
        // 12.5% of 0.99 = 0.12375
        assert_eq!(percentage(1_250).reduction(MoneyCents::new(99)), MoneyCents::new(12));
        // 50% of 0.01 = 0.005
        assert_eq!(percentage(5_000).reduction(MoneyCents::new(1)), MoneyCents::new(1));
    }

    #[test]
    fn empty_discount_list_is_zero() {
        assert_eq!(compute_discount_total(MoneyCents::new(500), &[]), MoneyCents::ZERO);
    }

    #[test]
    fn unscoped_discount_is_rejected() {
        let err = Discount::new("Free".to_string(), DiscountKind::Fixed, 100, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn non_positive_value_is_rejected() {
        let student = Some(Uuid::new_v4());
        assert!(Discount::new("Zero".to_string(), DiscountKind::Fixed, 0, student, None).is_err());
        assert!(
            Discount::new("Neg".to_string(), DiscountKind::Percentage, -5, student, None).is_err()
        );
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let student = Some(Uuid::new_v4());
        let err = Discount::new("Huge".to_string(), DiscountKind::Fixed, i64::MAX, student, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(
            Discount::new("Over".to_string(), DiscountKind::Percentage, 10_001, student, None)
                .is_err()
        );
        assert!(
            Discount::new("Full".to_string(), DiscountKind::Percentage, 10_000, student, None)
                .is_ok()
        );
    }

    #[test]
    fn stored_oversized_discounts_saturate() {
        let huge = Discount {
            value: i64::MAX,
            ..fixed(1)
        };
        let total = compute_discount_total(MoneyCents::new(100), &[huge.clone(), huge]);
        assert_eq!(total, MoneyCents::new(i64::MAX));
    }

    #[test]
    fn matches_on_either_scope() {
        let student = Uuid::new_v4();
        let structure = Uuid::new_v4();
        let discount = Discount::new(
            "Staff child".to_string(),
            DiscountKind::Fixed,
            100,
            Some(student),
            Some(structure),
        )
        .unwrap();

        assert!(discount.applies_to(student, Uuid::new_v4()));
        assert!(discount.applies_to(Uuid::new_v4(), structure));
        assert!(!discount.applies_to(Uuid::new_v4(), Uuid::new_v4()));
    }
}
