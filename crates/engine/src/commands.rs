//! Command structs for engine write operations.
//!
//! These types group parameters for the writes that take more than a couple
//! of arguments, keeping call sites readable.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{DiscountKind, MoneyCents};

/// Create a fee structure with its single fee item.
#[derive(Clone, Debug)]
pub struct CreateFeeStructureCmd {
    pub name: String,
    pub amount: MoneyCents,
    pub academic_year_id: Uuid,
    pub class_id: Option<Uuid>,
}

impl CreateFeeStructureCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, amount: MoneyCents, academic_year_id: Uuid) -> Self {
        Self {
            name: name.into(),
            amount,
            academic_year_id,
            class_id: None,
        }
    }

    /// Bind the structure to a class; its current roster is billed at once.
    #[must_use]
    pub fn class_id(mut self, class_id: Uuid) -> Self {
        self.class_id = Some(class_id);
        self
    }
}

/// Create or replace a discount.
#[derive(Clone, Debug)]
pub struct DiscountCmd {
    pub name: String,
    pub kind: DiscountKind,
    /// Basis points for [`DiscountKind::Percentage`], minor units for
    /// [`DiscountKind::Fixed`].
    pub value: i64,
    pub student_id: Option<Uuid>,
    pub fee_structure_id: Option<Uuid>,
}

impl DiscountCmd {
    #[must_use]
    pub fn percentage(name: impl Into<String>, basis_points: i64) -> Self {
        Self {
            name: name.into(),
            kind: DiscountKind::Percentage,
            value: basis_points,
            student_id: None,
            fee_structure_id: None,
        }
    }

    #[must_use]
    pub fn fixed(name: impl Into<String>, amount: MoneyCents) -> Self {
        Self {
            name: name.into(),
            kind: DiscountKind::Fixed,
            value: amount.cents(),
            student_id: None,
            fee_structure_id: None,
        }
    }

    #[must_use]
    pub fn student_id(mut self, student_id: Uuid) -> Self {
        self.student_id = Some(student_id);
        self
    }

    #[must_use]
    pub fn fee_structure_id(mut self, fee_structure_id: Uuid) -> Self {
        self.fee_structure_id = Some(fee_structure_id);
        self
    }
}

/// Record a payment and issue its receipt.
#[derive(Clone, Debug)]
pub struct CreateReceiptCmd {
    pub student_id: Uuid,
    pub amount: MoneyCents,
    pub method: String,
    pub description: Option<String>,
    pub paid_at: DateTime<Utc>,
    /// Makes the call safe to retry: a second call with the same key returns
    /// the receipt issued by the first one.
    pub idempotency_key: Option<String>,
}

impl CreateReceiptCmd {
    #[must_use]
    pub fn new(student_id: Uuid, amount: MoneyCents, method: impl Into<String>) -> Self {
        Self {
            student_id,
            amount,
            method: method.into(),
            description: None,
            paid_at: Utc::now(),
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn paid_at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.paid_at = paid_at;
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}
