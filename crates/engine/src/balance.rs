//! Balance arithmetic.
//!
//! [`Balance::compute`] is the only place where billed, discounted and paid
//! amounts are combined. It performs no I/O, so a receipt or report printed
//! twice from the same rows always shows the same figures.

use serde::Serialize;

use crate::{Discount, MoneyCents, compute_discount_total};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub total_billed: MoneyCents,
    pub total_discount: MoneyCents,
    /// Billed minus discount. Negative when discounts exceed the billed amount.
    pub gross_total: MoneyCents,
    pub total_paid: MoneyCents,
    /// Never negative: overpayment is absorbed, not carried as credit.
    pub outstanding: MoneyCents,
}

impl Balance {
    pub fn compute(
        total_billed: MoneyCents,
        discounts: &[Discount],
        total_paid: MoneyCents,
    ) -> Self {
        let total_discount = compute_discount_total(total_billed, discounts);
        let gross_total = total_billed - total_discount;
        let outstanding = (gross_total - total_paid).clamp_non_negative();
        Self {
            total_billed,
            total_discount,
            gross_total,
            total_paid,
            outstanding,
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::DiscountKind;

    fn discount(kind: DiscountKind, value: i64) -> Discount {
        Discount::new("d".to_string(), kind, value, Some(Uuid::new_v4()), None).unwrap()
    }

    #[test]
    fn partial_payments_leave_remainder_outstanding() {
        let balance = Balance::compute(MoneyCents::new(50_000), &[], MoneyCents::new(35_000));
        assert_eq!(balance.total_discount, MoneyCents::ZERO);
        assert_eq!(balance.gross_total, MoneyCents::new(50_000));
        assert_eq!(balance.outstanding, MoneyCents::new(15_000));
    }

    #[test]
    fn percentage_discount_reduces_gross_total() {
        let balance = Balance::compute(
            MoneyCents::new(100_000),
            &[discount(DiscountKind::Percentage, 1_000)],
            MoneyCents::ZERO,
        );
        assert_eq!(balance.total_discount, MoneyCents::new(10_000));
        assert_eq!(balance.gross_total, MoneyCents::new(90_000));
    }

    #[test]
    fn stacked_discounts_are_summed() {
        let balance = Balance::compute(
            MoneyCents::new(100_000),
            &[
                discount(DiscountKind::Percentage, 1_000),
                discount(DiscountKind::Fixed, 20_000),
            ],
            MoneyCents::ZERO,
        );
        assert_eq!(balance.total_discount, MoneyCents::new(30_000));
        assert_eq!(balance.gross_total, MoneyCents::new(70_000));
        assert_eq!(balance.outstanding, MoneyCents::new(70_000));
    }

    #[test]
    fn overpayment_floors_at_zero() {
        let balance = Balance::compute(MoneyCents::new(50_000), &[], MoneyCents::new(60_000));
        assert_eq!(balance.outstanding, MoneyCents::ZERO);
        assert_eq!(balance.total_paid, MoneyCents::new(60_000));
    }

    #[test]
    fn discounts_beyond_billed_leave_negative_gross() {
        let balance = Balance::compute(
            MoneyCents::new(10_000),
            &[discount(DiscountKind::Fixed, 25_000)],
            MoneyCents::ZERO,
        );
        assert_eq!(balance.gross_total, MoneyCents::new(-15_000));
        assert_eq!(balance.outstanding, MoneyCents::ZERO);
    }

    #[test]
    fn oversized_stored_discount_does_not_overflow() {
        let huge = Discount {
            value: i64::MAX,
            ..discount(DiscountKind::Fixed, 1)
        };
        let balance = Balance::compute(MoneyCents::new(50_000), &[huge], MoneyCents::new(100_000));
        assert_eq!(balance.total_discount, MoneyCents::new(i64::MAX));
        assert!(balance.gross_total.is_negative());
        assert_eq!(balance.outstanding, MoneyCents::ZERO);
    }

    #[test]
    fn outstanding_matches_formula_over_a_grid() {
        let billed_values = [0, 1, 999, 50_000, 100_000];
        let paid_values = [0, 1, 49_999, 50_000, 200_000];
        let discount_sets = [
            vec![],
            vec![discount(DiscountKind::Percentage, 2_500)],
            vec![
                discount(DiscountKind::Fixed, 5_000),
                discount(DiscountKind::Percentage, 333),
            ],
        ];

        for billed in billed_values {
            for paid in paid_values {
                for discounts in &discount_sets {
                    let billed = MoneyCents::new(billed);
                    let paid = MoneyCents::new(paid);
                    let balance = Balance::compute(billed, discounts, paid);
                    let expected = (billed - compute_discount_total(billed, discounts) - paid)
                        .clamp_non_negative();
                    assert_eq!(balance.outstanding, expected);
                    assert!(!balance.outstanding.is_negative());
                    assert_eq!(balance, Balance::compute(billed, discounts, paid));
                }
            }
        }
    }
}
