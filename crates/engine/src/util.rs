//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::Validation(format!("invalid {label} id")))
}

/// Parse an optional UUID column.
pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|raw| parse_uuid(raw, label)).transpose()
}

/// Reject zero, negative and out-of-range amounts.
pub(crate) fn ensure_amount(amount: MoneyCents, label: &str) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(format!(
            "{label} must be greater than zero, got {amount}"
        )));
    }
    if amount > MoneyCents::MAX_AMOUNT {
        return Err(EngineError::Validation(format!(
            "{label} must not exceed {}, got {amount}",
            MoneyCents::MAX_AMOUNT
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uuid_labels_errors() {
        assert_eq!(
            parse_uuid("nope", "student"),
            Err(EngineError::Validation("invalid student id".to_string()))
        );
    }

    #[test]
    fn ensure_amount_rejects_zero_and_oversized() {
        assert!(ensure_amount(MoneyCents::ZERO, "amount").is_err());
        assert!(ensure_amount(MoneyCents::new(-1), "amount").is_err());
        assert!(ensure_amount(MoneyCents::new(1), "amount").is_ok());
        assert!(ensure_amount(MoneyCents::MAX_AMOUNT, "amount").is_ok());
        assert!(ensure_amount(MoneyCents::new(i64::MAX), "amount").is_err());
    }
}
