//! Change feed.
//!
//! Every committed write publishes a [`ChangeEvent`] naming the logical views
//! it made stale. The engine never refreshes anything itself; whoever renders
//! those views subscribes with [`Engine::subscribe`] and decides what to
//! reload.
//!
//! [`Engine::subscribe`]: crate::Engine::subscribe

use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    FeeCatalog,
    FeeAssignments,
    Discounts,
    Receipts,
    StudentBalances,
    ClassReports,
    TermReports,
    Roster,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AcademicYearCreated,
    TermCreated,
    ClassCreated,
    StudentCreated,
    FeeStructureCreated,
    FeeStructureUpdated,
    FeeStructureDeleted,
    FeeAssigned,
    DiscountCreated,
    DiscountUpdated,
    DiscountDeleted,
    ReceiptCreated,
    ReceiptDeleted,
}

impl Operation {
    /// Views made stale by this operation.
    pub fn invalidates(self) -> &'static [View] {
        use View::*;

        match self {
            Self::AcademicYearCreated | Self::TermCreated => &[FeeCatalog, TermReports],
            Self::ClassCreated => &[Roster, TermReports],
            Self::StudentCreated => &[
                Roster,
                FeeAssignments,
                StudentBalances,
                ClassReports,
                TermReports,
            ],
            Self::FeeStructureCreated | Self::FeeStructureUpdated | Self::FeeStructureDeleted => &[
                FeeCatalog,
                FeeAssignments,
                StudentBalances,
                ClassReports,
                TermReports,
            ],
            Self::FeeAssigned => &[FeeAssignments, StudentBalances, ClassReports, TermReports],
            Self::DiscountCreated | Self::DiscountUpdated | Self::DiscountDeleted => {
                &[Discounts, StudentBalances, ClassReports, TermReports]
            }
            Self::ReceiptCreated | Self::ReceiptDeleted => {
                &[Receipts, StudentBalances, ClassReports, TermReports]
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub operation: Operation,
    /// Id of the row the operation was about (structure, receipt, ...).
    pub subject_id: Uuid,
    pub views: Vec<View>,
}

impl ChangeEvent {
    pub fn new(operation: Operation, subject_id: Uuid) -> Self {
        Self {
            operation,
            subject_id,
            views: operation.invalidates().to_vec(),
        }
    }

    pub fn invalidates(&self, view: View) -> bool {
        self.views.contains(&view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipts_invalidate_balances_and_receipt_list() {
        let event = ChangeEvent::new(Operation::ReceiptCreated, Uuid::new_v4());
        assert!(event.invalidates(View::Receipts));
        assert!(event.invalidates(View::StudentBalances));
        assert!(!event.invalidates(View::FeeCatalog));
    }

    #[test]
    fn catalog_changes_invalidate_catalog_and_assignments() {
        let event = ChangeEvent::new(Operation::FeeStructureDeleted, Uuid::new_v4());
        assert!(event.invalidates(View::FeeCatalog));
        assert!(event.invalidates(View::FeeAssignments));
        assert!(!event.invalidates(View::Receipts));
    }
}
