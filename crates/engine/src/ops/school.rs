use chrono::NaiveDate;
use sea_orm::{
    QueryFilter, QueryOrder, prelude::*,
    sea_query::{Expr, Func, SimpleExpr},
};
use uuid::Uuid;

use crate::{
    AcademicYear, EngineError, Operation, ResultEngine, SchoolClass, Student, Term,
    academic_years, classes, students, terms,
};

use super::{
    Engine, assignments::assign_class_fees, normalize_required, require_academic_year,
    require_class, require_student, require_term, with_tx,
};

/// `LOWER(column) = lower(value)`
fn eq_ignore_case<C: ColumnTrait>(column: C, value: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).eq(value.to_lowercase())
}

impl Engine {
    /// Creates an academic year. Names are unique regardless of case.
    pub async fn create_academic_year(&self, name: &str) -> ResultEngine<Uuid> {
        let name = normalize_required(name, "academic year name")?;

        let year = with_tx!(self, |db_tx| {
            let duplicate = academic_years::Entity::find()
                .filter(eq_ignore_case(academic_years::Column::Name, &name))
                .one(&db_tx)
                .await?;
            if duplicate.is_some() {
                return Err(EngineError::ExistingKey(format!("academic year {name}")));
            }

            let year = AcademicYear::new(name.clone());
            academic_years::ActiveModel::from(&year).insert(&db_tx).await?;
            Ok(year)
        })?;

        tracing::info!(academic_year_id = %year.id, name = %year.name, "academic year created");
        self.publish(Operation::AcademicYearCreated, year.id);
        Ok(year.id)
    }

    pub async fn list_academic_years(&self) -> ResultEngine<Vec<AcademicYear>> {
        academic_years::Entity::find()
            .order_by_asc(academic_years::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(AcademicYear::try_from)
            .collect()
    }

    /// Creates a term of an academic year. `ends_on` may equal `starts_on`
    /// but never precede it.
    pub async fn create_term(
        &self,
        academic_year_id: Uuid,
        name: &str,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required(name, "term name")?;
        let term = Term::new(academic_year_id, name, starts_on, ends_on)?;

        with_tx!(self, |db_tx| {
            require_academic_year(&db_tx, academic_year_id).await?;
            terms::ActiveModel::from(&term).insert(&db_tx).await?;
            Ok(())
        })?;

        tracing::info!(term_id = %term.id, %academic_year_id, %starts_on, %ends_on, "term created");
        self.publish(Operation::TermCreated, term.id);
        Ok(term.id)
    }

    pub async fn term(&self, term_id: Uuid) -> ResultEngine<Term> {
        Term::try_from(require_term(&self.database, term_id).await?)
    }

    /// Lists terms by start date, optionally for one academic year.
    pub async fn list_terms(&self, academic_year_id: Option<Uuid>) -> ResultEngine<Vec<Term>> {
        let mut query = terms::Entity::find();
        if let Some(year_id) = academic_year_id {
            query = query.filter(terms::Column::AcademicYearId.eq(year_id.to_string()));
        }
        query
            .order_by_asc(terms::Column::StartsOn)
            .order_by_asc(terms::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Term::try_from)
            .collect()
    }

    /// Creates a class. Names are unique regardless of case.
    pub async fn create_class(&self, name: &str) -> ResultEngine<Uuid> {
        let name = normalize_required(name, "class name")?;

        let class = with_tx!(self, |db_tx| {
            let duplicate = classes::Entity::find()
                .filter(eq_ignore_case(classes::Column::Name, &name))
                .one(&db_tx)
                .await?;
            if duplicate.is_some() {
                return Err(EngineError::ExistingKey(format!("class {name}")));
            }

            let class = SchoolClass::new(name.clone());
            classes::ActiveModel::from(&class).insert(&db_tx).await?;
            Ok(class)
        })?;

        tracing::info!(class_id = %class.id, name = %class.name, "class created");
        self.publish(Operation::ClassCreated, class.id);
        Ok(class.id)
    }

    pub async fn list_classes(&self) -> ResultEngine<Vec<SchoolClass>> {
        classes::Entity::find()
            .order_by_asc(classes::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(SchoolClass::try_from)
            .collect()
    }

    /// Creates a student. With a class, the student is billed for every
    /// fee bound to that class in the same transaction.
    pub async fn create_student(&self, name: &str, class_id: Option<Uuid>) -> ResultEngine<Uuid> {
        let name = normalize_required(name, "student name")?;
        let student = Student::new(name, class_id);

        let assigned = with_tx!(self, |db_tx| {
            if let Some(class_id) = class_id {
                require_class(&db_tx, class_id).await?;
            }
            students::ActiveModel::from(&student).insert(&db_tx).await?;
            match class_id {
                Some(class_id) => assign_class_fees(&db_tx, student.id, class_id).await,
                None => Ok(0),
            }
        })?;

        tracing::info!(student_id = %student.id, class_id = ?class_id, assigned, "student created");
        self.publish(Operation::StudentCreated, student.id);
        Ok(student.id)
    }

    pub async fn student(&self, student_id: Uuid) -> ResultEngine<Student> {
        Student::try_from(require_student(&self.database, student_id).await?)
    }

    /// Students currently in a class, by name.
    pub async fn students_in_class(&self, class_id: Uuid) -> ResultEngine<Vec<Student>> {
        require_class(&self.database, class_id).await?;
        students::Entity::find()
            .filter(students::Column::ClassId.eq(class_id.to_string()))
            .order_by_asc(students::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Student::try_from)
            .collect()
    }
}
