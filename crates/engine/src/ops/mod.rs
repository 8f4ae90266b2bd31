use sea_orm::{DatabaseConnection, prelude::*};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    ChangeEvent, EngineError, Operation, ResultEngine, Term, academic_years, classes, fee_items,
    fee_structures, students, terms,
};

mod assignments;
mod balances;
mod catalog;
mod discounts;
mod payments;
mod reports;
mod school;

/// Run a block inside a DB transaction, committing on success and rolling
/// back on error.
///
/// The block is evaluated as an `async` block: `?` and `return` leave the
/// block, not the calling function, so the rollback branch always runs.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = sea_orm::TransactionTrait::begin(&$self.database).await?;
        let result: $crate::ResultEngine<_> = async { $body }.await;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::warn!("rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    events: broadcast::Sender<ChangeEvent>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Subscribe to the change feed. Events are sent after commit only.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    fn publish(&self, operation: Operation, subject_id: Uuid) {
        let event = ChangeEvent::new(operation, subject_id);
        tracing::debug!(?operation, %subject_id, views = ?event.views, "publishing change");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

async fn require_academic_year<C: ConnectionTrait>(
    conn: &C,
    academic_year_id: Uuid,
) -> ResultEngine<academic_years::Model> {
    academic_years::Entity::find_by_id(academic_year_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("academic year not exists".to_string()))
}

async fn require_term<C: ConnectionTrait>(conn: &C, term_id: Uuid) -> ResultEngine<terms::Model> {
    terms::Entity::find_by_id(term_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("term not exists".to_string()))
}

async fn load_term<C: ConnectionTrait>(conn: &C, term_id: Option<Uuid>) -> ResultEngine<Option<Term>> {
    match term_id {
        Some(term_id) => Ok(Some(Term::try_from(require_term(conn, term_id).await?)?)),
        None => Ok(None),
    }
}

async fn require_class<C: ConnectionTrait>(
    conn: &C,
    class_id: Uuid,
) -> ResultEngine<classes::Model> {
    classes::Entity::find_by_id(class_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("class not exists".to_string()))
}

async fn require_student<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
) -> ResultEngine<students::Model> {
    students::Entity::find_by_id(student_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("student not exists".to_string()))
}

async fn require_fee_structure<C: ConnectionTrait>(
    conn: &C,
    fee_structure_id: Uuid,
) -> ResultEngine<fee_structures::Model> {
    fee_structures::Entity::find_by_id(fee_structure_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("fee structure not exists".to_string()))
}

async fn require_fee_item<C: ConnectionTrait>(
    conn: &C,
    fee_item_id: Uuid,
) -> ResultEngine<fee_items::Model> {
    fee_items::Entity::find_by_id(fee_item_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("fee item not exists".to_string()))
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    event_capacity: Option<usize>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How many change events a slow subscriber may lag behind before it
    /// starts missing them.
    pub fn event_capacity(mut self, capacity: usize) -> EngineBuilder {
        self.event_capacity = Some(capacity);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let capacity = self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY);
        if capacity == 0 {
            return Err(EngineError::Validation(
                "event capacity must be greater than zero".to_string(),
            ));
        }
        let (events, _) = broadcast::channel(capacity);
        Ok(Engine {
            database: self.database,
            events,
        })
    }
}
