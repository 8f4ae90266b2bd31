use std::collections::HashMap;

use sea_orm::{JoinType, QueryFilter, QuerySelect, prelude::*, sea_query::OnConflict};
use uuid::Uuid;

use crate::{
    AssignedFee, EngineError, FeeAssignment, MoneyCents, Operation, ResultEngine,
    fee_assignments, fee_items, fee_structures, students,
    util::{parse_optional_uuid, parse_uuid},
};

use super::{Engine, require_class, require_fee_item, require_student, with_tx};

/// Rows per `INSERT`; keeps bound parameters well under SQLite's limit.
const INSERT_CHUNK: usize = 256;

/// Inserts `(student_id, fee_item_id)` pairs, skipping pairs that already
/// exist. Returns how many rows were actually written.
///
/// The skip is done by the store (`ON CONFLICT DO NOTHING` on the unique
/// pair index), never by a prior read, so concurrent callers cannot both
/// insert the same pair.
pub(super) async fn insert_assignments<C: ConnectionTrait>(
    conn: &C,
    pairs: &[(Uuid, Uuid)],
) -> ResultEngine<u64> {
    let mut inserted = 0;
    for chunk in pairs.chunks(INSERT_CHUNK) {
        let models = chunk.iter().map(|(student_id, fee_item_id)| {
            fee_assignments::ActiveModel::from(&FeeAssignment::new(*student_id, *fee_item_id))
        });
        inserted += fee_assignments::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    fee_assignments::Column::StudentId,
                    fee_assignments::Column::FeeItemId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }
    Ok(inserted)
}

/// Bills one fee item to every student currently in `class_id`.
pub(super) async fn assign_item_to_class<C: ConnectionTrait>(
    conn: &C,
    fee_item_id: Uuid,
    class_id: Uuid,
) -> ResultEngine<u64> {
    let roster = students::Entity::find()
        .filter(students::Column::ClassId.eq(class_id.to_string()))
        .all(conn)
        .await?;

    let pairs = roster
        .iter()
        .map(|student| Ok((parse_uuid(&student.id, "student")?, fee_item_id)))
        .collect::<ResultEngine<Vec<_>>>()?;
    insert_assignments(conn, &pairs).await
}

/// Bills one student for every fee item whose structure is bound to
/// `class_id`.
pub(super) async fn assign_class_fees<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
    class_id: Uuid,
) -> ResultEngine<u64> {
    let items = fee_items::Entity::find()
        .join(JoinType::InnerJoin, fee_items::Relation::FeeStructures.def())
        .filter(fee_structures::Column::ClassId.eq(class_id.to_string()))
        .all(conn)
        .await?;

    let pairs = items
        .iter()
        .map(|item| Ok((student_id, parse_uuid(&item.id, "fee item")?)))
        .collect::<ResultEngine<Vec<_>>>()?;
    insert_assignments(conn, &pairs).await
}

/// Loads a student's assignment lines with their item and structure.
pub(super) async fn load_assigned_fees<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
) -> ResultEngine<Vec<AssignedFee>> {
    let rows = fee_assignments::Entity::find()
        .filter(fee_assignments::Column::StudentId.eq(student_id.to_string()))
        .find_also_related(fee_items::Entity)
        .all(conn)
        .await?;

    let structure_ids: Vec<String> = rows
        .iter()
        .filter_map(|(_, item)| item.as_ref().map(|item| item.fee_structure_id.clone()))
        .collect();
    let structures: HashMap<String, fee_structures::Model> = if structure_ids.is_empty() {
        HashMap::new()
    } else {
        fee_structures::Entity::find()
            .filter(fee_structures::Column::Id.is_in(structure_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|structure| (structure.id.clone(), structure))
            .collect()
    };

    let mut fees = Vec::with_capacity(rows.len());
    for (assignment, item) in rows {
        let item = item
            .ok_or_else(|| EngineError::KeyNotFound("fee item not exists".to_string()))?;
        let structure = structures
            .get(&item.fee_structure_id)
            .ok_or_else(|| EngineError::KeyNotFound("fee structure not exists".to_string()))?;
        fees.push(AssignedFee {
            assignment_id: parse_uuid(&assignment.id, "fee assignment")?,
            fee_item_id: parse_uuid(&item.id, "fee item")?,
            fee_item_name: item.name,
            fee_structure_id: parse_uuid(&structure.id, "fee structure")?,
            fee_structure_name: structure.name.clone(),
            academic_year_id: parse_uuid(&structure.academic_year_id, "academic year")?,
            amount: MoneyCents::new(item.amount_minor),
        });
    }
    fees.sort_by(|a, b| {
        a.fee_structure_name
            .cmp(&b.fee_structure_name)
            .then_with(|| a.fee_item_name.cmp(&b.fee_item_name))
            .then_with(|| a.assignment_id.cmp(&b.assignment_id))
    });
    Ok(fees)
}

impl Engine {
    /// Bills `fee_item_id` to every student currently in `class_id`.
    ///
    /// Returns how many students were newly assigned. Students who already
    /// owe the item are skipped, so calling this again (or concurrently) is
    /// harmless and reports 0 once the class is fully billed.
    pub async fn assign_fee_to_class(&self, fee_item_id: Uuid, class_id: Uuid) -> ResultEngine<u64> {
        let assigned = with_tx!(self, |db_tx| {
            require_fee_item(&db_tx, fee_item_id).await?;
            require_class(&db_tx, class_id).await?;
            assign_item_to_class(&db_tx, fee_item_id, class_id).await
        })?;

        tracing::info!(%fee_item_id, %class_id, assigned, "fee assigned to class");
        if assigned > 0 {
            self.publish(Operation::FeeAssigned, fee_item_id);
        }
        Ok(assigned)
    }

    /// Bills a student for every fee bound to their current class.
    ///
    /// This is what runs automatically when a student is created with a
    /// class; returns 0 for a student without a class.
    pub async fn assign_class_fees_to_student(&self, student_id: Uuid) -> ResultEngine<u64> {
        let assigned = with_tx!(self, |db_tx| {
            let student = require_student(&db_tx, student_id).await?;
            match parse_optional_uuid(student.class_id.as_deref(), "class")? {
                Some(class_id) => assign_class_fees(&db_tx, student_id, class_id).await,
                None => Ok(0),
            }
        })?;

        tracing::info!(%student_id, assigned, "class fees assigned to student");
        if assigned > 0 {
            self.publish(Operation::FeeAssigned, student_id);
        }
        Ok(assigned)
    }

    /// Lists what a student has been billed for.
    pub async fn assignments_for_student(&self, student_id: Uuid) -> ResultEngine<Vec<AssignedFee>> {
        require_student(&self.database, student_id).await?;
        load_assigned_fees(&self.database, student_id).await
    }
}
