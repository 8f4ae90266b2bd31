use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    CreateReceiptCmd, EngineError, Operation, Payment, Receipt, ReceiptDetail, ResultEngine, Term,
    payments, receipts,
    receipts::RECEIPT_SEQUENCE,
    sequences,
    util::parse_uuid,
};

use super::{
    Engine, load_term, normalize_optional_text, normalize_required, require_student, with_tx,
};

/// Issues the next value of a named sequence.
///
/// The increment is a single `UPDATE value = value + 1`, so the row is
/// locked by the writing transaction until it commits or rolls back.
async fn next_sequence_value<C: ConnectionTrait>(conn: &C, name: &str) -> ResultEngine<i64> {
    let updated = sequences::Entity::update_many()
        .col_expr(
            sequences::Column::Value,
            Expr::col(sequences::Column::Value).add(1),
        )
        .filter(sequences::Column::Name.eq(name))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        sequences::ActiveModel {
            name: ActiveValue::Set(name.to_string()),
            value: ActiveValue::Set(1),
        }
        .insert(conn)
        .await?;
        return Ok(1);
    }

    let row = sequences::Entity::find_by_id(name.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("sequence {name} not exists")))?;
    Ok(row.value)
}

/// Looks up a payment already recorded under `key`.
///
/// Returns its receipt id when it matches `payment`, and `ExistingKey` when
/// the key was used for another student or amount.
async fn find_replay<C: ConnectionTrait>(
    conn: &C,
    key: &str,
    payment: &Payment,
) -> ResultEngine<Option<Uuid>> {
    let Some((existing, receipt)) = payments::Entity::find()
        .filter(payments::Column::IdempotencyKey.eq(key))
        .find_also_related(receipts::Entity)
        .one(conn)
        .await?
    else {
        return Ok(None);
    };

    if existing.student_id != payment.student_id.to_string()
        || existing.amount_minor != payment.amount.cents()
    {
        return Err(EngineError::ExistingKey(format!("idempotency key {key}")));
    }
    let receipt =
        receipt.ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
    Ok(Some(parse_uuid(&receipt.id, "receipt")?))
}

/// Payments of a student, oldest first, limited to the term window when
/// one is given.
pub(super) async fn load_payments<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
    term: Option<&Term>,
) -> ResultEngine<Vec<Payment>> {
    let rows = payments::Entity::find()
        .filter(payments::Column::StudentId.eq(student_id.to_string()))
        .order_by_asc(payments::Column::PaidAt)
        .order_by_asc(payments::Column::Id)
        .all(conn)
        .await?;

    let mut payments = Vec::with_capacity(rows.len());
    for row in rows {
        let payment = Payment::try_from(row)?;
        if term.is_none_or(|term| term.contains(payment.paid_at)) {
            payments.push(payment);
        }
    }
    Ok(payments)
}

fn receipt_detail(row: (receipts::Model, Option<payments::Model>)) -> ResultEngine<ReceiptDetail> {
    let (receipt, payment) = row;
    let payment =
        payment.ok_or_else(|| EngineError::KeyNotFound("payment not exists".to_string()))?;
    Ok(ReceiptDetail {
        receipt: Receipt::try_from(receipt)?,
        payment: Payment::try_from(payment)?,
    })
}

impl Engine {
    /// Records a payment and issues its receipt in one transaction.
    ///
    /// The receipt number comes from the `receipt` sequence. If anything
    /// fails after the payment insert, the payment is rolled back with it.
    ///
    /// With an idempotency key, a repeated call returns the receipt issued
    /// by the first one and writes nothing. The key is looked up before the
    /// write; a concurrent call that commits the same key in between is
    /// caught by the unique index and replayed the same way.
    pub async fn create_receipt(&self, cmd: CreateReceiptCmd) -> ResultEngine<Uuid> {
        let method = normalize_required(&cmd.method, "payment method")?;
        let description = normalize_optional_text(cmd.description.as_deref());
        let key = normalize_optional_text(cmd.idempotency_key.as_deref());

        let mut payment = Payment::new(cmd.student_id, cmd.amount, method, description, cmd.paid_at)?;
        payment.idempotency_key = key.clone();

        if let Some(key) = key.as_deref()
            && let Some(receipt_id) = find_replay(&self.database, key, &payment).await?
        {
            tracing::info!(%receipt_id, "receipt replayed from idempotency key");
            return Ok(receipt_id);
        }

        let outcome = with_tx!(self, |db_tx| {
            require_student(&db_tx, payment.student_id).await?;
            payments::ActiveModel::from(&payment).insert(&db_tx).await?;
            let sequence = next_sequence_value(&db_tx, RECEIPT_SEQUENCE).await?;
            let receipt = Receipt::new(payment.id, sequence, Utc::now());
            receipts::ActiveModel::from(&receipt).insert(&db_tx).await?;
            Ok(receipt)
        });

        let receipt = match (outcome, key.as_deref()) {
            // Another call committed the same key after the lookup above.
            (Err(EngineError::ExistingKey(msg)), Some(key)) => {
                return match find_replay(&self.database, key, &payment).await? {
                    Some(receipt_id) => {
                        tracing::info!(%receipt_id, "receipt replayed after concurrent insert");
                        Ok(receipt_id)
                    }
                    None => Err(EngineError::ExistingKey(msg)),
                };
            }
            (outcome, _) => outcome?,
        };

        tracing::info!(
            receipt_id = %receipt.id,
            receipt_number = %receipt.receipt_number,
            student_id = %payment.student_id,
            amount = %payment.amount,
            "receipt issued"
        );
        self.publish(Operation::ReceiptCreated, receipt.id);
        Ok(receipt.id)
    }

    /// Deletes a receipt and the payment behind it.
    pub async fn delete_payment_and_receipt(&self, receipt_id: Uuid) -> ResultEngine<()> {
        let payment_id = with_tx!(self, |db_tx| {
            let receipt = receipts::Entity::find_by_id(receipt_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;

            receipts::Entity::delete_by_id(receipt.id.clone())
                .exec(&db_tx)
                .await?;
            let deleted = payments::Entity::delete_by_id(receipt.payment_id.clone())
                .exec(&db_tx)
                .await?;
            if deleted.rows_affected == 0 {
                return Err(EngineError::KeyNotFound("payment not exists".to_string()));
            }
            parse_uuid(&receipt.payment_id, "payment")
        })?;

        tracing::info!(%receipt_id, %payment_id, "receipt and payment deleted");
        self.publish(Operation::ReceiptDeleted, receipt_id);
        Ok(())
    }

    pub async fn receipt(&self, receipt_id: Uuid) -> ResultEngine<ReceiptDetail> {
        let row = receipts::Entity::find_by_id(receipt_id.to_string())
            .find_also_related(payments::Entity)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
        receipt_detail(row)
    }

    pub async fn receipt_by_number(&self, receipt_number: &str) -> ResultEngine<ReceiptDetail> {
        let row = receipts::Entity::find()
            .filter(receipts::Column::ReceiptNumber.eq(receipt_number.trim()))
            .find_also_related(payments::Entity)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
        receipt_detail(row)
    }

    /// Lists receipts newest first, optionally for one student.
    pub async fn list_receipts(&self, student_id: Option<Uuid>) -> ResultEngine<Vec<ReceiptDetail>> {
        let mut query = receipts::Entity::find().find_also_related(payments::Entity);
        if let Some(student_id) = student_id {
            query = query.filter(payments::Column::StudentId.eq(student_id.to_string()));
        }

        query
            .order_by_desc(receipts::Column::Sequence)
            .all(&self.database)
            .await?
            .into_iter()
            .map(receipt_detail)
            .collect()
    }

    /// Payments of a student, oldest first. With a term, only payments
    /// received inside the term window are returned.
    pub async fn payments_for_student(
        &self,
        student_id: Uuid,
        term_id: Option<Uuid>,
    ) -> ResultEngine<Vec<Payment>> {
        require_student(&self.database, student_id).await?;
        let term = load_term(&self.database, term_id).await?;
        load_payments(&self.database, student_id, term.as_ref()).await
    }
}
