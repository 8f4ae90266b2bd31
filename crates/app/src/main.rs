use std::error::Error;

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};
use engine::{
    ClassReport, CreateFeeStructureCmd, CreateReceiptCmd, DiscountCmd, Engine, MoneyCents,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

mod settings;

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "bursar")]
#[command(about = "School billing and payment reconciliation")]
struct Cli {
    /// Settings file, without extension (default: `bursar`).
    #[arg(long)]
    config: Option<String>,

    /// Database connection string; overrides the settings file.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Academic years.
    #[command(subcommand)]
    Year(YearCommand),
    /// Terms of an academic year.
    #[command(subcommand)]
    Term(TermCommand),
    /// Classes.
    #[command(subcommand)]
    Class(ClassCommand),
    /// Students.
    #[command(subcommand)]
    Student(StudentCommand),
    /// Fee structures and their assignment.
    #[command(subcommand)]
    Fee(FeeCommand),
    /// Discounts.
    #[command(subcommand)]
    Discount(DiscountCommand),
    /// Payments and their receipts.
    #[command(subcommand)]
    Receipt(ReceiptCommand),
    /// Balance of a student, overall or against one fee structure.
    Balance(BalanceArgs),
    /// Student, class and term reports.
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Subcommand, Debug)]
enum YearCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum TermCommand {
    Create {
        #[arg(long)]
        year: Uuid,
        #[arg(long)]
        name: String,
        /// First day of the term (YYYY-MM-DD).
        #[arg(long)]
        starts: NaiveDate,
        /// Last day of the term (YYYY-MM-DD), inclusive.
        #[arg(long)]
        ends: NaiveDate,
    },
    List {
        #[arg(long)]
        year: Option<Uuid>,
    },
}

#[derive(Subcommand, Debug)]
enum ClassCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum StudentCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        class: Option<Uuid>,
    },
    List {
        #[arg(long)]
        class: Uuid,
    },
}

#[derive(Subcommand, Debug)]
enum FeeCommand {
    Create {
        #[arg(long)]
        name: String,
        /// Amount in major units (e.g. 500.00).
        #[arg(long)]
        amount: MoneyCents,
        #[arg(long)]
        year: Uuid,
        /// Bill the class roster immediately.
        #[arg(long)]
        class: Option<Uuid>,
    },
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        amount: MoneyCents,
    },
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    List {
        #[arg(long)]
        year: Option<Uuid>,
    },
    /// Bill a fee item to every student of a class.
    Assign {
        #[arg(long)]
        item: Uuid,
        #[arg(long)]
        class: Uuid,
    },
}

#[derive(Subcommand, Debug)]
enum DiscountCommand {
    Create(DiscountCreateArgs),
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    List {
        #[arg(long)]
        student: Uuid,
    },
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("value").required(true).args(["percent", "fixed"])))]
struct DiscountCreateArgs {
    #[arg(long)]
    name: String,
    /// Percentage with up to two decimals (e.g. 12.5).
    #[arg(long, value_parser = parse_percent)]
    percent: Option<i64>,
    /// Fixed amount in major units.
    #[arg(long)]
    fixed: Option<MoneyCents>,
    #[arg(long)]
    student: Option<Uuid>,
    #[arg(long)]
    structure: Option<Uuid>,
}

#[derive(Subcommand, Debug)]
enum ReceiptCommand {
    Create {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        amount: MoneyCents,
        #[arg(long)]
        method: String,
        #[arg(long)]
        description: Option<String>,
        /// Makes the command safe to repeat.
        #[arg(long)]
        key: Option<String>,
    },
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    #[command(group(ArgGroup::new("receipt").required(true).args(["id", "number"])))]
    Show {
        #[arg(long)]
        id: Option<Uuid>,
        #[arg(long)]
        number: Option<String>,
    },
    List {
        #[arg(long)]
        student: Option<Uuid>,
    },
}

#[derive(Args, Debug)]
struct BalanceArgs {
    #[arg(long)]
    student: Uuid,
    #[arg(long)]
    structure: Option<Uuid>,
    #[arg(long)]
    term: Option<Uuid>,
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    Student {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        term: Option<Uuid>,
    },
    Class {
        #[arg(long)]
        class: Uuid,
        #[arg(long)]
        term: Option<Uuid>,
        /// Print one CSV row per student instead of JSON.
        #[arg(long)]
        csv: bool,
    },
    Term {
        #[arg(long)]
        term: Uuid,
    },
}

/// `12.5` percent is 1250 basis points.
fn parse_percent(raw: &str) -> Result<i64, String> {
    raw.parse::<MoneyCents>()
        .map(MoneyCents::cents)
        .map_err(|err| err.to_string())
}

#[derive(Serialize)]
struct Created {
    id: Uuid,
}

#[derive(Serialize)]
struct Assigned {
    assigned: u64,
}

#[derive(Serialize)]
struct CsvRow {
    student_id: Uuid,
    student_name: String,
    total_billed: String,
    total_discount: String,
    total_paid: String,
    outstanding: String,
    degraded: bool,
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_csv(report: &ClassReport) -> CliResult<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for row in &report.students {
        writer.serialize(CsvRow {
            student_id: row.student_id,
            student_name: row.student_name.clone(),
            total_billed: row.balance.total_billed.to_string(),
            total_discount: row.balance.total_discount.to_string(),
            total_paid: row.balance.total_paid.to_string(),
            outstanding: row.balance.outstanding.to_string(),
            degraded: row.degraded,
        })?;
    }
    writer.flush()?;
    Ok(())
}

async fn connect_db(database_url: &str) -> CliResult<DatabaseConnection> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

async fn run(engine: &Engine, command: Command) -> CliResult<()> {
    match command {
        Command::Year(YearCommand::Create { name }) => {
            print_json(&Created {
                id: engine.create_academic_year(&name).await?,
            })
        }
        Command::Year(YearCommand::List) => print_json(&engine.list_academic_years().await?),
        Command::Term(TermCommand::Create {
            year,
            name,
            starts,
            ends,
        }) => print_json(&Created {
            id: engine.create_term(year, &name, starts, ends).await?,
        }),
        Command::Term(TermCommand::List { year }) => print_json(&engine.list_terms(year).await?),
        Command::Class(ClassCommand::Create { name }) => print_json(&Created {
            id: engine.create_class(&name).await?,
        }),
        Command::Class(ClassCommand::List) => print_json(&engine.list_classes().await?),
        Command::Student(StudentCommand::Create { name, class }) => print_json(&Created {
            id: engine.create_student(&name, class).await?,
        }),
        Command::Student(StudentCommand::List { class }) => {
            print_json(&engine.students_in_class(class).await?)
        }
        Command::Fee(FeeCommand::Create {
            name,
            amount,
            year,
            class,
        }) => {
            let mut cmd = CreateFeeStructureCmd::new(name, amount, year);
            if let Some(class) = class {
                cmd = cmd.class_id(class);
            }
            print_json(&Created {
                id: engine.create_fee_structure(cmd).await?,
            })
        }
        Command::Fee(FeeCommand::Update { id, name, amount }) => {
            engine.update_fee_structure(id, &name, amount).await?;
            print_json(&engine.fee_structure(id).await?)
        }
        Command::Fee(FeeCommand::Delete { id }) => {
            engine.delete_fee_structure(id).await?;
            print_json(&Created { id })
        }
        Command::Fee(FeeCommand::List { year }) => {
            print_json(&engine.list_fee_structures(year).await?)
        }
        Command::Fee(FeeCommand::Assign { item, class }) => print_json(&Assigned {
            assigned: engine.assign_fee_to_class(item, class).await?,
        }),
        Command::Discount(DiscountCommand::Create(args)) => {
            let mut cmd = match (args.percent, args.fixed) {
                (Some(basis_points), _) => DiscountCmd::percentage(args.name, basis_points),
                (None, Some(amount)) => DiscountCmd::fixed(args.name, amount),
                (None, None) => return Err("either --percent or --fixed is required".into()),
            };
            if let Some(student) = args.student {
                cmd = cmd.student_id(student);
            }
            if let Some(structure) = args.structure {
                cmd = cmd.fee_structure_id(structure);
            }
            print_json(&Created {
                id: engine.create_discount(cmd).await?,
            })
        }
        Command::Discount(DiscountCommand::Delete { id }) => {
            engine.delete_discount(id).await?;
            print_json(&Created { id })
        }
        Command::Discount(DiscountCommand::List { student }) => {
            print_json(&engine.discounts_for_student(student).await?)
        }
        Command::Receipt(ReceiptCommand::Create {
            student,
            amount,
            method,
            description,
            key,
        }) => {
            let mut cmd = CreateReceiptCmd::new(student, amount, method);
            if let Some(description) = description {
                cmd = cmd.description(description);
            }
            if let Some(key) = key {
                cmd = cmd.idempotency_key(key);
            }
            let receipt_id = engine.create_receipt(cmd).await?;
            print_json(&engine.receipt(receipt_id).await?)
        }
        Command::Receipt(ReceiptCommand::Delete { id }) => {
            engine.delete_payment_and_receipt(id).await?;
            print_json(&Created { id })
        }
        Command::Receipt(ReceiptCommand::Show { id, number }) => {
            let detail = match (id, number) {
                (Some(id), _) => engine.receipt(id).await?,
                (None, Some(number)) => engine.receipt_by_number(&number).await?,
                (None, None) => return Err("either --id or --number is required".into()),
            };
            print_json(&detail)
        }
        Command::Receipt(ReceiptCommand::List { student }) => {
            print_json(&engine.list_receipts(student).await?)
        }
        Command::Balance(BalanceArgs {
            student,
            structure,
            term,
        }) => {
            let balance = match structure {
                Some(structure) => engine.compute_balance(student, structure, term).await?,
                None => engine.student_balance(student, term).await?,
            };
            print_json(&balance)
        }
        Command::Report(ReportCommand::Student { student, term }) => {
            print_json(&engine.report_by_student(student, term).await?)
        }
        Command::Report(ReportCommand::Class { class, term, csv }) => {
            let report = engine.report_by_class(class, term).await?;
            if report.degraded_rows() > 0 {
                tracing::warn!(degraded = report.degraded_rows(), "class report is incomplete");
            }
            if csv {
                print_csv(&report)
            } else {
                print_json(&report)
            }
        }
        Command::Report(ReportCommand::Term { term }) => {
            print_json(&engine.report_by_term(term).await?)
        }
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "bursar={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let database_url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    tracing::debug!(%database_url, "connecting");
    let db = connect_db(&database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    run(&engine, cli.command).await
}
