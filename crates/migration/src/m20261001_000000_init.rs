//! Initial schema migration - creates all tables from scratch.
//!
//! - `academic_years`, `terms`: billing calendar
//! - `classes`, `students`: the roster fees are assigned over
//! - `fee_structures`, `fee_items`: the fee catalog
//! - `fee_assignments`: what each student owes, unique per (student, item)
//! - `discounts`: reductions scoped to a student and/or a structure
//! - `payments`, `receipts`: the payment ledger
//! - `sequences`: monotonic counters (receipt numbers)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum AcademicYears {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Terms {
    Table,
    Id,
    AcademicYearId,
    Name,
    StartsOn,
    EndsOn,
}

#[derive(Iden)]
enum Classes {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Students {
    Table,
    Id,
    Name,
    ClassId,
}

#[derive(Iden)]
enum FeeStructures {
    Table,
    Id,
    Name,
    AcademicYearId,
    ClassId,
}

#[derive(Iden)]
enum FeeItems {
    Table,
    Id,
    FeeStructureId,
    Name,
    AmountMinor,
    IsCompulsory,
}

#[derive(Iden)]
enum FeeAssignments {
    Table,
    Id,
    StudentId,
    FeeItemId,
}

#[derive(Iden)]
enum Discounts {
    Table,
    Id,
    Name,
    Kind,
    Value,
    StudentId,
    FeeStructureId,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    StudentId,
    AmountMinor,
    Method,
    Description,
    PaidAt,
    IdempotencyKey,
}

#[derive(Iden)]
enum Receipts {
    Table,
    Id,
    PaymentId,
    ReceiptNumber,
    Sequence,
    IssuedAt,
}

#[derive(Iden)]
enum Sequences {
    Table,
    Name,
    Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Calendar
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AcademicYears::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AcademicYears::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AcademicYears::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Terms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Terms::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Terms::AcademicYearId).string().not_null())
                    .col(ColumnDef::new(Terms::Name).string().not_null())
                    .col(ColumnDef::new(Terms::StartsOn).date().not_null())
                    .col(ColumnDef::new(Terms::EndsOn).date().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-terms-academic_year_id")
                            .from(Terms::Table, Terms::AcademicYearId)
                            .to(AcademicYears::Table, AcademicYears::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Roster
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Classes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Classes::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Classes::Name).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Students::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Students::Name).string().not_null())
                    .col(ColumnDef::new(Students::ClassId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-students-class_id")
                            .from(Students::Table, Students::ClassId)
                            .to(Classes::Table, Classes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-students-class_id")
                    .table(Students::Table)
                    .col(Students::ClassId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Fee catalog
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(FeeStructures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeeStructures::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FeeStructures::Name).string().not_null())
                    .col(
                        ColumnDef::new(FeeStructures::AcademicYearId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FeeStructures::ClassId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fee_structures-academic_year_id")
                            .from(FeeStructures::Table, FeeStructures::AcademicYearId)
                            .to(AcademicYears::Table, AcademicYears::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fee_structures-class_id")
                            .from(FeeStructures::Table, FeeStructures::ClassId)
                            .to(Classes::Table, Classes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FeeItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FeeItems::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(FeeItems::FeeStructureId).string().not_null())
                    .col(ColumnDef::new(FeeItems::Name).string().not_null())
                    .col(ColumnDef::new(FeeItems::AmountMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(FeeItems::IsCompulsory)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fee_items-fee_structure_id")
                            .from(FeeItems::Table, FeeItems::FeeStructureId)
                            .to(FeeStructures::Table, FeeStructures::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fee_items-fee_structure_id")
                    .table(FeeItems::Table)
                    .col(FeeItems::FeeStructureId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Assignments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(FeeAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeeAssignments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FeeAssignments::StudentId).string().not_null())
                    .col(ColumnDef::new(FeeAssignments::FeeItemId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fee_assignments-student_id")
                            .from(FeeAssignments::Table, FeeAssignments::StudentId)
                            .to(Students::Table, Students::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fee_assignments-fee_item_id")
                            .from(FeeAssignments::Table, FeeAssignments::FeeItemId)
                            .to(FeeItems::Table, FeeItems::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-fee_assignments-student_id-fee_item_id")
                    .table(FeeAssignments::Table)
                    .col(FeeAssignments::StudentId)
                    .col(FeeAssignments::FeeItemId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Discounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Discounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Discounts::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Discounts::Name).string().not_null())
                    .col(ColumnDef::new(Discounts::Kind).string().not_null())
                    .col(ColumnDef::new(Discounts::Value).big_integer().not_null())
                    .col(ColumnDef::new(Discounts::StudentId).string())
                    .col(ColumnDef::new(Discounts::FeeStructureId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-discounts-student_id")
                            .from(Discounts::Table, Discounts::StudentId)
                            .to(Students::Table, Students::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-discounts-fee_structure_id")
                            .from(Discounts::Table, Discounts::FeeStructureId)
                            .to(FeeStructures::Table, FeeStructures::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Payment ledger
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Payments::StudentId).string().not_null())
                    .col(ColumnDef::new(Payments::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(ColumnDef::new(Payments::Description).string())
                    .col(ColumnDef::new(Payments::PaidAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Payments::IdempotencyKey).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-student_id")
                            .from(Payments::Table, Payments::StudentId)
                            .to(Students::Table, Students::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-student_id-paid_at")
                    .table(Payments::Table)
                    .col(Payments::StudentId)
                    .col(Payments::PaidAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-payments-idempotency_key")
                    .table(Payments::Table)
                    .col(Payments::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Receipts::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Receipts::PaymentId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Receipts::ReceiptNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Receipts::Sequence)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Receipts::IssuedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipts-payment_id")
                            .from(Receipts::Table, Receipts::PaymentId)
                            .to(Payments::Table, Payments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Sequences
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sequences::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sequences::Name).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Sequences::Value)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        let seed = Query::insert()
            .into_table(Sequences::Table)
            .columns([Sequences::Name, Sequences::Value])
            .values(["receipt".into(), 0.into()])
            .map_err(|err| DbErr::Custom(err.to_string()))?
            .to_owned();
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sequences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Discounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FeeAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FeeItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FeeStructures::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Classes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Terms::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AcademicYears::Table).to_owned())
            .await?;
        Ok(())
    }
}
