//! Report shapes returned by the reporting operations.

use serde::Serialize;
use uuid::Uuid;

use crate::{AssignedFee, Balance, Discount, MoneyCents, Payment, SchoolClass, Student, Term};

/// Sums of balances over a set of students.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub total_billed: MoneyCents,
    pub total_discount: MoneyCents,
    pub total_paid: MoneyCents,
    pub outstanding: MoneyCents,
}

impl ReportTotals {
    pub fn add_balance(&mut self, balance: &Balance) {
        self.total_billed += balance.total_billed;
        self.total_discount += balance.total_discount;
        self.total_paid += balance.total_paid;
        self.outstanding += balance.outstanding;
    }

    pub fn add_totals(&mut self, other: &ReportTotals) {
        self.total_billed += other.total_billed;
        self.total_discount += other.total_discount;
        self.total_paid += other.total_paid;
        self.outstanding += other.outstanding;
    }
}

/// Everything the statement of one student shows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentReport {
    pub student: Student,
    pub term: Option<Term>,
    pub fees: Vec<AssignedFee>,
    pub payments: Vec<Payment>,
    pub discounts: Vec<Discount>,
    pub balance: Balance,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StudentBalanceRow {
    pub student_id: Uuid,
    pub student_name: String,
    pub balance: Balance,
    /// The balance could not be computed; figures are zeroed.
    pub degraded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassReport {
    pub class: SchoolClass,
    pub term: Option<Term>,
    pub students: Vec<StudentBalanceRow>,
    pub totals: ReportTotals,
}

impl ClassReport {
    pub fn degraded_rows(&self) -> usize {
        self.students.iter().filter(|row| row.degraded).count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub class_id: Uuid,
    pub class_name: String,
    pub student_count: usize,
    pub totals: ReportTotals,
    /// The class report failed or some of its rows are zeroed.
    pub degraded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TermReport {
    pub term: Term,
    pub classes: Vec<ClassSummary>,
    pub totals: ReportTotals,
}
