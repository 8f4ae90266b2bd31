mod common;

use engine::{CreateFeeStructureCmd, DiscountCmd, EngineError, MoneyCents};
use uuid::Uuid;

use common::{cents, count, engine_with_db, exec, fee, school, students};

#[tokio::test]
async fn fee_structure_bound_to_class_bills_current_roster() {
    let (engine, db) = engine_with_db().await;
    let school = school(&engine).await;
    let roster = students(&engine, Some(school.class), &["Ada", "Ben", "Cleo"]).await;

    let (structure_id, item_id) = fee(&engine, "Tuition", 50_000, school.year, Some(school.class)).await;

    let structure = engine.fee_structure(structure_id).await.unwrap();
    assert_eq!(structure.items.len(), 1);
    assert_eq!(structure.items[0].name, "Tuition");
    assert_eq!(structure.items[0].amount, cents(50_000));
    assert_eq!(count(&db, "fee_assignments").await, 3);

    for student in roster {
        let fees = engine.assignments_for_student(student).await.unwrap();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].fee_item_id, item_id);
        assert_eq!(fees[0].fee_structure_id, structure_id);
    }
}

#[tokio::test]
async fn assign_fee_to_class_only_counts_new_rows() {
    let (engine, db) = engine_with_db().await;
    let school = school(&engine).await;
    students(&engine, Some(school.class), &["Ada", "Ben"]).await;
    let (_, item_id) = fee(&engine, "Books", 12_000, school.year, None).await;

    assert_eq!(engine.assign_fee_to_class(item_id, school.class).await.unwrap(), 2);

    students(&engine, Some(school.class), &["Cleo", "Dan", "Eve"]).await;
    assert_eq!(engine.assign_fee_to_class(item_id, school.class).await.unwrap(), 3);
    assert_eq!(count(&db, "fee_assignments").await, 5);

    assert_eq!(engine.assign_fee_to_class(item_id, school.class).await.unwrap(), 0);
    assert_eq!(count(&db, "fee_assignments").await, 5);
}

#[tokio::test]
async fn assign_fee_to_empty_class_returns_zero() {
    let (engine, _db) = engine_with_db().await;
    let school = school(&engine).await;
    let (_, item_id) = fee(&engine, "Books", 12_000, school.year, None).await;

    assert_eq!(engine.assign_fee_to_class(item_id, school.class).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_assignment_converges() {
    let (engine, db) = engine_with_db().await;
    let school = school(&engine).await;
    students(&engine, Some(school.class), &["Ada", "Ben", "Cleo", "Dan"]).await;
    let (_, item_id) = fee(&engine, "Trip", 8_000, school.year, None).await;

    let (first, second) = tokio::join!(
        engine.assign_fee_to_class(item_id, school.class),
        engine.assign_fee_to_class(item_id, school.class),
    );

    assert_eq!(first.unwrap() + second.unwrap(), 4);
    assert_eq!(count(&db, "fee_assignments").await, 4);
}

#[tokio::test]
async fn assign_fee_rejects_unknown_item_or_class() {
    let (engine, _db) = engine_with_db().await;
    let school = school(&engine).await;
    let (_, item_id) = fee(&engine, "Books", 12_000, school.year, None).await;

    let err = engine
        .assign_fee_to_class(Uuid::new_v4(), school.class)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .assign_fee_to_class(item_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn new_student_is_enrolled_into_class_fees() {
    let (engine, _db) = engine_with_db().await;
    let school = school(&engine).await;
    let (_, tuition_item) = fee(&engine, "Tuition", 50_000, school.year, Some(school.class)).await;
    fee(&engine, "Unbound", 1_000, school.year, None).await;

    let student = engine.create_student("Ada", Some(school.class)).await.unwrap();
    let fees = engine.assignments_for_student(student).await.unwrap();
    assert_eq!(fees.len(), 1);
    assert_eq!(fees[0].fee_item_id, tuition_item);

    assert_eq!(engine.assign_class_fees_to_student(student).await.unwrap(), 0);

    let without_class = engine.create_student("Ben", None).await.unwrap();
    assert!(engine.assignments_for_student(without_class).await.unwrap().is_empty());
    assert_eq!(engine.assign_class_fees_to_student(without_class).await.unwrap(), 0);
}

#[tokio::test]
async fn create_fee_structure_validates_input() {
    let (engine, _db) = engine_with_db().await;
    let school = school(&engine).await;

    let err = engine
        .create_fee_structure(CreateFeeStructureCmd::new("Tuition", MoneyCents::ZERO, school.year))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_fee_structure(CreateFeeStructureCmd::new("  ", cents(100), school.year))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_fee_structure(CreateFeeStructureCmd::new("Tuition", cents(100), Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .create_fee_structure(
            CreateFeeStructureCmd::new("Tuition", cents(100), school.year).class_id(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    assert!(engine.list_fee_structures(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_fee_structure_rolls_back_when_item_insert_fails() {
    let (engine, db) = engine_with_db().await;
    let school = school(&engine).await;
    students(&engine, Some(school.class), &["Ada"]).await;
    exec(
        &db,
        "CREATE TRIGGER fail_fee_items BEFORE INSERT ON fee_items \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
    )
    .await;

    let err = engine
        .create_fee_structure(
            CreateFeeStructureCmd::new("Tuition", cents(50_000), school.year).class_id(school.class),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Database(_)));
    assert_eq!(count(&db, "fee_structures").await, 0);
    assert_eq!(count(&db, "fee_items").await, 0);
    assert_eq!(count(&db, "fee_assignments").await, 0);
}

#[tokio::test]
async fn update_fee_structure_reprices_existing_assignments() {
    let (engine, _db) = engine_with_db().await;
    let school = school(&engine).await;
    let student = engine.create_student("Ada", Some(school.class)).await.unwrap();
    let (structure_id, item_id) = fee(&engine, "Tuition", 50_000, school.year, Some(school.class)).await;

    engine
        .update_fee_structure(structure_id, "Tuition (revised)", cents(55_000))
        .await
        .unwrap();

    let structure = engine.fee_structure(structure_id).await.unwrap();
    assert_eq!(structure.name, "Tuition (revised)");
    assert_eq!(structure.items[0].id, item_id);
    assert_eq!(structure.items[0].name, "Tuition (revised)");
    assert_eq!(structure.items[0].amount, cents(55_000));

    let balance = engine.compute_balance(student, structure_id, None).await.unwrap();
    assert_eq!(balance.total_billed, cents(55_000));

    let err = engine
        .update_fee_structure(structure_id, "Tuition", cents(-1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .update_fee_structure(Uuid::new_v4(), "Tuition", cents(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn delete_fee_structure_removes_dependents() {
    let (engine, db) = engine_with_db().await;
    let school = school(&engine).await;
    let roster = students(&engine, Some(school.class), &["Ada", "Ben"]).await;
    let (structure_id, _) = fee(&engine, "Tuition", 50_000, school.year, Some(school.class)).await;
    let (other_id, _) = fee(&engine, "Books", 5_000, school.year, Some(school.class)).await;
    engine
        .create_discount(DiscountCmd::percentage("Sibling", 1_000).fee_structure_id(structure_id))
        .await
        .unwrap();
    engine
        .create_discount(DiscountCmd::fixed("Bursary", cents(1_000)).student_id(roster[0]))
        .await
        .unwrap();
    assert_eq!(count(&db, "fee_assignments").await, 4);

    engine.delete_fee_structure(structure_id).await.unwrap();

    let err = engine.fee_structure(structure_id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert_eq!(count(&db, "fee_assignments").await, 2);
    assert_eq!(count(&db, "fee_items").await, 1);
    assert_eq!(count(&db, "discounts").await, 1);

    let remaining = engine.list_fee_structures(Some(school.year)).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, other_id);

    let err = engine.delete_fee_structure(structure_id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn delete_fee_structure_keeps_student_scoped_discounts() {
    let (engine, db) = engine_with_db().await;
    let school = school(&engine).await;
    let ada = engine.create_student("Ada", Some(school.class)).await.unwrap();
    let (tuition, _) = fee(&engine, "Tuition", 50_000, school.year, Some(school.class)).await;
    let (uniform, _) = fee(&engine, "Uniform", 8_000, school.year, Some(school.class)).await;
    let discount_id = engine
        .create_discount(
            DiscountCmd::fixed("Staff child", cents(5_000))
                .student_id(ada)
                .fee_structure_id(uniform),
        )
        .await
        .unwrap();
    let before = engine.compute_balance(ada, tuition, None).await.unwrap();
    assert_eq!(before.total_discount, cents(5_000));

    engine.delete_fee_structure(uniform).await.unwrap();

    let after = engine.compute_balance(ada, tuition, None).await.unwrap();
    assert_eq!(after.total_discount, cents(5_000));
    let discount = engine.discount(discount_id).await.unwrap();
    assert_eq!(discount.student_id, Some(ada));
    assert_eq!(discount.fee_structure_id, None);
    assert_eq!(count(&db, "discounts").await, 1);
}

#[tokio::test]
async fn delete_fee_structure_rolls_back_when_last_delete_fails() {
    let (engine, db) = engine_with_db().await;
    let school = school(&engine).await;
    students(&engine, Some(school.class), &["Ada", "Ben"]).await;
    let (structure_id, _) = fee(&engine, "Tuition", 50_000, school.year, Some(school.class)).await;
    exec(
        &db,
        "CREATE TRIGGER fail_fee_structures BEFORE DELETE ON fee_structures \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
    )
    .await;

    let err = engine.delete_fee_structure(structure_id).await.unwrap_err();

    assert!(matches!(err, EngineError::Database(_)));
    assert_eq!(count(&db, "fee_structures").await, 1);
    assert_eq!(count(&db, "fee_items").await, 1);
    assert_eq!(count(&db, "fee_assignments").await, 2);
}

#[tokio::test]
async fn list_fee_structures_filters_by_year_and_sorts_by_name() {
    let (engine, _db) = engine_with_db().await;
    let school = school(&engine).await;
    let next_year = engine.create_academic_year("2026/2027").await.unwrap();
    fee(&engine, "Tuition", 50_000, school.year, None).await;
    fee(&engine, "Books", 5_000, school.year, None).await;
    fee(&engine, "Tuition", 52_000, next_year, None).await;

    let names: Vec<String> = engine
        .list_fee_structures(Some(school.year))
        .await
        .unwrap()
        .into_iter()
        .map(|structure| structure.name)
        .collect();
    assert_eq!(names, vec!["Books", "Tuition"]);
    assert_eq!(engine.list_fee_structures(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn reference_names_are_unique_ignoring_case() {
    let (engine, _db) = engine_with_db().await;
    let school = school(&engine).await;

    let err = engine.create_class("grade 1").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
    assert!(err.is_retryable());

    let err = engine.create_academic_year("2025/2026").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    assert_eq!(engine.list_classes().await.unwrap().len(), 1);
    assert_eq!(engine.list_terms(Some(school.year)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn create_term_rejects_inverted_window() {
    let (engine, _db) = engine_with_db().await;
    let school = school(&engine).await;

    let err = engine
        .create_term(school.year, "Spring", common::date(2026, 4, 1), common::date(2026, 1, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_term(Uuid::new_v4(), "Spring", common::date(2026, 1, 5), common::date(2026, 4, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
