use futures::future::join_all;
use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Balance, ClassReport, ClassSummary, ReportTotals, ResultEngine, SchoolClass, Student,
    StudentBalanceRow, StudentReport, Term, TermReport, classes, students,
};

use super::{Engine, balances::statement, load_term, require_class, require_student, require_term};

impl Engine {
    /// The statement of one student: assignment lines, payments and
    /// discounts, with the student-wide balance computed from them.
    pub async fn report_by_student(
        &self,
        student_id: Uuid,
        term_id: Option<Uuid>,
    ) -> ResultEngine<StudentReport> {
        let student = Student::try_from(require_student(&self.database, student_id).await?)?;
        let term = load_term(&self.database, term_id).await?;
        let statement = statement(&self.database, student_id, term.as_ref()).await?;

        Ok(StudentReport {
            student,
            term,
            fees: statement.fees,
            payments: statement.payments,
            discounts: statement.discounts,
            balance: statement.balance,
        })
    }

    /// Balances of every student currently in the class, with totals.
    ///
    /// A student whose balance cannot be computed shows up as a zeroed row
    /// flagged `degraded`; only an unknown class or term fails the report.
    pub async fn report_by_class(
        &self,
        class_id: Uuid,
        term_id: Option<Uuid>,
    ) -> ResultEngine<ClassReport> {
        let class = SchoolClass::try_from(require_class(&self.database, class_id).await?)?;
        let term = load_term(&self.database, term_id).await?;
        let students = self.class_rows(class.id, term.as_ref()).await?;

        let mut totals = ReportTotals::default();
        for row in &students {
            totals.add_balance(&row.balance);
        }

        Ok(ClassReport {
            class,
            term,
            students,
            totals,
        })
    }

    /// Totals of every class for the term, plus a school-wide total.
    pub async fn report_by_term(&self, term_id: Uuid) -> ResultEngine<TermReport> {
        let term = Term::try_from(require_term(&self.database, term_id).await?)?;
        let classes = classes::Entity::find()
            .order_by_asc(classes::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(SchoolClass::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let classes = join_all(classes.into_iter().map(|class| self.class_summary(class, &term))).await;

        let mut totals = ReportTotals::default();
        for summary in &classes {
            totals.add_totals(&summary.totals);
        }
        tracing::debug!(%term_id, classes = classes.len(), "term report built");

        Ok(TermReport {
            term,
            classes,
            totals,
        })
    }

    async fn class_rows(
        &self,
        class_id: Uuid,
        term: Option<&Term>,
    ) -> ResultEngine<Vec<StudentBalanceRow>> {
        let roster = students::Entity::find()
            .filter(students::Column::ClassId.eq(class_id.to_string()))
            .order_by_asc(students::Column::Name)
            .order_by_asc(students::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Student::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(join_all(roster.into_iter().map(|student| self.student_row(student, term))).await)
    }

    async fn student_row(&self, student: Student, term: Option<&Term>) -> StudentBalanceRow {
        match statement(&self.database, student.id, term).await {
            Ok(statement) => StudentBalanceRow {
                student_id: student.id,
                student_name: student.name,
                balance: statement.balance,
                degraded: false,
            },
            Err(err) => {
                tracing::warn!(student_id = %student.id, "student balance degraded: {err}");
                StudentBalanceRow {
                    student_id: student.id,
                    student_name: student.name,
                    balance: Balance::default(),
                    degraded: true,
                }
            }
        }
    }

    async fn class_summary(&self, class: SchoolClass, term: &Term) -> ClassSummary {
        match self.class_rows(class.id, Some(term)).await {
            Ok(rows) => {
                let mut totals = ReportTotals::default();
                for row in &rows {
                    totals.add_balance(&row.balance);
                }
                ClassSummary {
                    class_id: class.id,
                    class_name: class.name,
                    student_count: rows.len(),
                    totals,
                    degraded: rows.iter().any(|row| row.degraded),
                }
            }
            Err(err) => {
                tracing::warn!(class_id = %class.id, "class summary degraded: {err}");
                ClassSummary {
                    class_id: class.id,
                    class_name: class.name,
                    student_count: 0,
                    totals: ReportTotals::default(),
                    degraded: true,
                }
            }
        }
    }
}
