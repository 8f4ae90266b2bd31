#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{CreateFeeStructureCmd, Engine, MoneyCents};
use migration::MigratorTrait;
use uuid::Uuid;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn exec(db: &DatabaseConnection, sql: &str) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(backend, sql.to_string()))
        .await
        .unwrap();
}

pub async fn count(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}

pub async fn receipt_sequence(db: &DatabaseConnection) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            "SELECT value FROM sequences WHERE name = 'receipt'".to_string(),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "value").unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
}

pub fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

/// One academic year with a single autumn term and one class.
pub struct School {
    pub year: Uuid,
    pub term: Uuid,
    pub class: Uuid,
}

pub async fn school(engine: &Engine) -> School {
    let year = engine.create_academic_year("2025/2026").await.unwrap();
    let term = engine
        .create_term(year, "Autumn", date(2025, 9, 1), date(2025, 12, 19))
        .await
        .unwrap();
    let class = engine.create_class("Grade 1").await.unwrap();
    School { year, term, class }
}

pub async fn students(engine: &Engine, class: Option<Uuid>, names: &[&str]) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        ids.push(engine.create_student(name, class).await.unwrap());
    }
    ids
}

/// Creates a fee structure and returns `(structure_id, fee_item_id)`.
pub async fn fee(
    engine: &Engine,
    name: &str,
    amount: i64,
    year: Uuid,
    class: Option<Uuid>,
) -> (Uuid, Uuid) {
    let mut cmd = CreateFeeStructureCmd::new(name, cents(amount), year);
    if let Some(class) = class {
        cmd = cmd.class_id(class);
    }
    let structure_id = engine.create_fee_structure(cmd).await.unwrap();
    let structure = engine.fee_structure(structure_id).await.unwrap();
    (structure_id, structure.items[0].id)
}
