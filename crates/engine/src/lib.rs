//! Billing and payment reconciliation engine for a school administration
//! console.
//!
//! The engine owns fee catalogs, the assignment of fee items to students,
//! discount resolution, payment recording with receipt issuance, and the
//! balance computation every report is built on. Persistence goes through
//! SeaORM; every multi-row write runs inside a single database transaction.

pub use academic_years::AcademicYear;
pub use balance::Balance;
pub use classes::SchoolClass;
pub use commands::{CreateFeeStructureCmd, CreateReceiptCmd, DiscountCmd};
pub use discounts::{Discount, DiscountKind, compute_discount_total};
pub use error::EngineError;
pub use events::{ChangeEvent, Operation, View};
pub use fee_assignments::{AssignedFee, FeeAssignment};
pub use fee_items::FeeItem;
pub use fee_structures::FeeStructure;
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder};
pub use payments::Payment;
pub use receipts::{Receipt, ReceiptDetail};
pub use reports::{
    ClassReport, ClassSummary, ReportTotals, StudentBalanceRow, StudentReport, TermReport,
};
pub use students::Student;
pub use terms::Term;

mod academic_years;
mod balance;
mod classes;
mod commands;
mod discounts;
mod error;
mod events;
mod fee_assignments;
mod fee_items;
mod fee_structures;
mod money;
mod ops;
mod payments;
mod receipts;
mod reports;
mod sequences;
mod students;
mod terms;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
