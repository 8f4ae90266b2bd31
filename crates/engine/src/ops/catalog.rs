use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    CreateFeeStructureCmd, FeeItem, FeeStructure, MoneyCents, Operation, ResultEngine, discounts,
    fee_assignments, fee_items, fee_structures, util::ensure_amount,
};

use super::{
    Engine, assignments::assign_item_to_class, normalize_required, require_academic_year,
    require_class, require_fee_structure, with_tx,
};

impl Engine {
    /// Creates a fee structure together with its single, compulsory fee item.
    ///
    /// When the command names a class, every student currently in that class
    /// is billed for the new item in the same transaction. A failure at any
    /// step leaves neither the structure nor the item behind.
    pub async fn create_fee_structure(&self, cmd: CreateFeeStructureCmd) -> ResultEngine<Uuid> {
        let name = normalize_required(&cmd.name, "fee structure name")?;
        ensure_amount(cmd.amount, "fee amount")?;

        let (structure_id, assigned) = with_tx!(self, |db_tx| {
            require_academic_year(&db_tx, cmd.academic_year_id).await?;
            if let Some(class_id) = cmd.class_id {
                require_class(&db_tx, class_id).await?;
            }

            let structure = FeeStructure::new(name.clone(), cmd.academic_year_id, cmd.class_id);
            fee_structures::ActiveModel::from(&structure)
                .insert(&db_tx)
                .await?;

            let item = FeeItem::new(structure.id, name.clone(), cmd.amount, true)?;
            fee_items::ActiveModel::from(&item).insert(&db_tx).await?;

            let assigned = match cmd.class_id {
                Some(class_id) => assign_item_to_class(&db_tx, item.id, class_id).await?,
                None => 0,
            };
            Ok((structure.id, assigned))
        })?;

        tracing::info!(%structure_id, %name, amount = %cmd.amount, assigned, "fee structure created");
        self.publish(Operation::FeeStructureCreated, structure_id);
        Ok(structure_id)
    }

    /// Renames a fee structure and reprices its items.
    ///
    /// Items keep their ids, so existing assignments now bill the new amount.
    /// Receipts already issued are left untouched.
    pub async fn update_fee_structure(
        &self,
        fee_structure_id: Uuid,
        name: &str,
        amount: MoneyCents,
    ) -> ResultEngine<()> {
        let name = normalize_required(name, "fee structure name")?;
        ensure_amount(amount, "fee amount")?;

        with_tx!(self, |db_tx| {
            require_fee_structure(&db_tx, fee_structure_id).await?;

            let active = fee_structures::ActiveModel {
                id: ActiveValue::Set(fee_structure_id.to_string()),
                name: ActiveValue::Set(name.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            fee_items::Entity::update_many()
                .col_expr(fee_items::Column::Name, Expr::value(name.clone()))
                .col_expr(fee_items::Column::AmountMinor, Expr::value(amount.cents()))
                .filter(fee_items::Column::FeeStructureId.eq(fee_structure_id.to_string()))
                .exec(&db_tx)
                .await?;
            Ok(())
        })?;

        tracing::info!(%fee_structure_id, %name, %amount, "fee structure updated");
        self.publish(Operation::FeeStructureUpdated, fee_structure_id);
        Ok(())
    }

    /// Deletes a fee structure.
    ///
    /// Rows go in foreign-key order: assignments of the structure's items,
    /// discounts scoped to the structure, the items, then the structure
    /// itself. Everything happens in one transaction.
    ///
    /// A discount that also names a student is kept and loses only its
    /// structure scope.
    pub async fn delete_fee_structure(&self, fee_structure_id: Uuid) -> ResultEngine<()> {
        let removed_assignments = with_tx!(self, |db_tx| {
            require_fee_structure(&db_tx, fee_structure_id).await?;
            let structure_key = fee_structure_id.to_string();

            let item_ids: Vec<String> = fee_items::Entity::find()
                .filter(fee_items::Column::FeeStructureId.eq(structure_key.clone()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|item| item.id)
                .collect();

            let mut removed_assignments = 0;
            if !item_ids.is_empty() {
                removed_assignments = fee_assignments::Entity::delete_many()
                    .filter(fee_assignments::Column::FeeItemId.is_in(item_ids))
                    .exec(&db_tx)
                    .await?
                    .rows_affected;
            }

            discounts::Entity::delete_many()
                .filter(discounts::Column::FeeStructureId.eq(structure_key.clone()))
                .filter(discounts::Column::StudentId.is_null())
                .exec(&db_tx)
                .await?;
            // Still matches the student's other structures.
            discounts::Entity::update_many()
                .col_expr(
                    discounts::Column::FeeStructureId,
                    Expr::value(Option::<String>::None),
                )
                .filter(discounts::Column::FeeStructureId.eq(structure_key.clone()))
                .exec(&db_tx)
                .await?;

            fee_items::Entity::delete_many()
                .filter(fee_items::Column::FeeStructureId.eq(structure_key.clone()))
                .exec(&db_tx)
                .await?;

            fee_structures::Entity::delete_by_id(structure_key)
                .exec(&db_tx)
                .await?;
            Ok(removed_assignments)
        })?;

        tracing::info!(%fee_structure_id, removed_assignments, "fee structure deleted");
        self.publish(Operation::FeeStructureDeleted, fee_structure_id);
        Ok(())
    }

    /// Returns a fee structure with its items.
    pub async fn fee_structure(&self, fee_structure_id: Uuid) -> ResultEngine<FeeStructure> {
        let model = require_fee_structure(&self.database, fee_structure_id).await?;
        let items = model
            .find_related(fee_items::Entity)
            .order_by_asc(fee_items::Column::Name)
            .all(&self.database)
            .await?;
        FeeStructure::try_from((model, items))
    }

    /// Lists fee structures ordered by name, optionally for one academic year.
    pub async fn list_fee_structures(
        &self,
        academic_year_id: Option<Uuid>,
    ) -> ResultEngine<Vec<FeeStructure>> {
        let mut query = fee_structures::Entity::find();
        if let Some(year_id) = academic_year_id {
            query = query.filter(fee_structures::Column::AcademicYearId.eq(year_id.to_string()));
        }

        let rows = query
            .order_by_asc(fee_structures::Column::Name)
            .order_by_asc(fee_structures::Column::Id)
            .find_with_related(fee_items::Entity)
            .all(&self.database)
            .await?;

        rows.into_iter().map(FeeStructure::try_from).collect()
    }
}
