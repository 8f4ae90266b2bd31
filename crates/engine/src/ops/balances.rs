use std::collections::BTreeSet;

use sea_orm::{JoinType, QueryFilter, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{
    AssignedFee, Balance, Discount, MoneyCents, Payment, ResultEngine, Term, fee_assignments,
    fee_items,
};

use super::{
    Engine, assignments::load_assigned_fees, discounts::resolve_discounts_in, load_term,
    payments::load_payments, require_fee_structure, require_student,
};

/// The inputs and result of a student-wide balance.
pub(super) struct Statement {
    pub fees: Vec<AssignedFee>,
    pub discounts: Vec<Discount>,
    pub payments: Vec<Payment>,
    pub balance: Balance,
}

/// Gathers everything a student owes and has paid, then computes the
/// balance across all billed structures.
///
/// With a term, fees are limited to the term's academic year and payments
/// to the term window. Discounts are the distinct set matching the student
/// or any billed structure, applied once to the whole billed amount.
pub(super) async fn statement<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
    term: Option<&Term>,
) -> ResultEngine<Statement> {
    let mut fees = load_assigned_fees(conn, student_id).await?;
    if let Some(term) = term {
        fees.retain(|fee| fee.academic_year_id == term.academic_year_id);
    }

    let structure_ids: Vec<Uuid> = fees
        .iter()
        .map(|fee| fee.fee_structure_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let discounts = resolve_discounts_in(conn, student_id, &structure_ids).await?;
    let payments = load_payments(conn, student_id, term).await?;

    let total_billed: MoneyCents = fees.iter().map(|fee| fee.amount).sum();
    let total_paid: MoneyCents = payments.iter().map(|payment| payment.amount).sum();
    let balance = Balance::compute(total_billed, &discounts, total_paid);

    Ok(Statement {
        fees,
        discounts,
        payments,
        balance,
    })
}

impl Engine {
    /// Balance of one student against one fee structure.
    ///
    /// Billed is what the student owes under the structure; discounts are
    /// those scoped to the student or the structure; paid is every payment
    /// of the student, within the term window when a term is given.
    pub async fn compute_balance(
        &self,
        student_id: Uuid,
        fee_structure_id: Uuid,
        term_id: Option<Uuid>,
    ) -> ResultEngine<Balance> {
        require_student(&self.database, student_id).await?;
        require_fee_structure(&self.database, fee_structure_id).await?;
        let term = load_term(&self.database, term_id).await?;

        let items = fee_items::Entity::find()
            .join(JoinType::InnerJoin, fee_items::Relation::FeeAssignments.def())
            .filter(fee_assignments::Column::StudentId.eq(student_id.to_string()))
            .filter(fee_items::Column::FeeStructureId.eq(fee_structure_id.to_string()))
            .all(&self.database)
            .await?;
        let total_billed: MoneyCents = items
            .iter()
            .map(|item| MoneyCents::new(item.amount_minor))
            .sum();

        let discounts = resolve_discounts_in(&self.database, student_id, &[fee_structure_id]).await?;
        let total_paid: MoneyCents = load_payments(&self.database, student_id, term.as_ref())
            .await?
            .iter()
            .map(|payment| payment.amount)
            .sum();

        let balance = Balance::compute(total_billed, &discounts, total_paid);
        tracing::debug!(%student_id, %fee_structure_id, outstanding = %balance.outstanding, "balance computed");
        Ok(balance)
    }

    /// Balance of a student across every structure they are billed for.
    pub async fn student_balance(
        &self,
        student_id: Uuid,
        term_id: Option<Uuid>,
    ) -> ResultEngine<Balance> {
        require_student(&self.database, student_id).await?;
        let term = load_term(&self.database, term_id).await?;
        let statement = statement(&self.database, student_id, term.as_ref()).await?;
        Ok(statement.balance)
    }
}
