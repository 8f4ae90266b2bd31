use sea_orm::{ActiveValue, Condition, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Discount, DiscountCmd, EngineError, Operation, ResultEngine, discounts,
    discounts::validate_discount,
};

use super::{
    Engine, normalize_required, require_fee_structure, require_student, with_tx,
};

/// Discounts matching the student **or** any of the given structures.
pub(super) async fn resolve_discounts_in<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
    fee_structure_ids: &[Uuid],
) -> ResultEngine<Vec<Discount>> {
    let mut condition =
        Condition::any().add(discounts::Column::StudentId.eq(student_id.to_string()));
    if !fee_structure_ids.is_empty() {
        condition = condition.add(
            discounts::Column::FeeStructureId
                .is_in(fee_structure_ids.iter().map(ToString::to_string)),
        );
    }

    discounts::Entity::find()
        .filter(condition)
        .order_by_asc(discounts::Column::Name)
        .order_by_asc(discounts::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(Discount::try_from)
        .collect()
}

impl Engine {
    async fn require_discount_scope<C: ConnectionTrait>(
        &self,
        conn: &C,
        cmd: &DiscountCmd,
    ) -> ResultEngine<()> {
        if let Some(student_id) = cmd.student_id {
            require_student(conn, student_id).await?;
        }
        if let Some(fee_structure_id) = cmd.fee_structure_id {
            require_fee_structure(conn, fee_structure_id).await?;
        }
        Ok(())
    }

    /// Creates a discount. It must be scoped to a student, a fee structure,
    /// or both; an unscoped discount is rejected.
    pub async fn create_discount(&self, cmd: DiscountCmd) -> ResultEngine<Uuid> {
        let name = normalize_required(&cmd.name, "discount name")?;
        let discount = Discount::new(
            name,
            cmd.kind,
            cmd.value,
            cmd.student_id,
            cmd.fee_structure_id,
        )?;

        with_tx!(self, |db_tx| {
            self.require_discount_scope(&db_tx, &cmd).await?;
            discounts::ActiveModel::from(&discount).insert(&db_tx).await?;
            Ok(())
        })?;

        tracing::info!(discount_id = %discount.id, kind = discount.kind.as_str(), value = discount.value, "discount created");
        self.publish(Operation::DiscountCreated, discount.id);
        Ok(discount.id)
    }

    /// Replaces every field of an existing discount.
    pub async fn update_discount(&self, discount_id: Uuid, cmd: DiscountCmd) -> ResultEngine<()> {
        let name = normalize_required(&cmd.name, "discount name")?;
        validate_discount(cmd.kind, cmd.value, cmd.student_id, cmd.fee_structure_id)?;

        with_tx!(self, |db_tx| {
            discounts::Entity::find_by_id(discount_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("discount not exists".to_string()))?;
            self.require_discount_scope(&db_tx, &cmd).await?;

            let active = discounts::ActiveModel {
                id: ActiveValue::Set(discount_id.to_string()),
                name: ActiveValue::Set(name.clone()),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                value: ActiveValue::Set(cmd.value),
                student_id: ActiveValue::Set(cmd.student_id.map(|id| id.to_string())),
                fee_structure_id: ActiveValue::Set(cmd.fee_structure_id.map(|id| id.to_string())),
            };
            active.update(&db_tx).await?;
            Ok(())
        })?;

        tracing::info!(%discount_id, "discount updated");
        self.publish(Operation::DiscountUpdated, discount_id);
        Ok(())
    }

    pub async fn delete_discount(&self, discount_id: Uuid) -> ResultEngine<()> {
        let result = discounts::Entity::delete_by_id(discount_id.to_string())
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("discount not exists".to_string()));
        }

        tracing::info!(%discount_id, "discount deleted");
        self.publish(Operation::DiscountDeleted, discount_id);
        Ok(())
    }

    pub async fn discount(&self, discount_id: Uuid) -> ResultEngine<Discount> {
        let model = discounts::Entity::find_by_id(discount_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("discount not exists".to_string()))?;
        Discount::try_from(model)
    }

    /// Discounts explicitly scoped to the student.
    pub async fn discounts_for_student(&self, student_id: Uuid) -> ResultEngine<Vec<Discount>> {
        discounts::Entity::find()
            .filter(discounts::Column::StudentId.eq(student_id.to_string()))
            .order_by_asc(discounts::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Discount::try_from)
            .collect()
    }

    /// Discounts applicable to a `(student, fee structure)` pair: those
    /// scoped to the student or to the structure.
    pub async fn resolve_discounts(
        &self,
        student_id: Uuid,
        fee_structure_id: Uuid,
    ) -> ResultEngine<Vec<Discount>> {
        resolve_discounts_in(&self.database, student_id, &[fee_structure_id]).await
    }
}
