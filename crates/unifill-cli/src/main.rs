mod config;
mod redaction;
mod registry;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use uuid::Uuid;

use config::{ConfigError, FillConfig, Overrides, Settings, parse_row_override};
use redaction::redact_connection;
use registry::{
    RunContext, RunStatus, RunSummary, TableSummary, init_run_logging, start_run, write_summary,
};
use unifill_generate::university::{TableJob, catalog, memory_session};
use unifill_generate::{GenerateOptions, GenerationError, ReferentialGenerator, Target};
use unifill_load::{BatchBound, LoadError, PostgresSession, Session, SessionError, SessionOptions};

/// Row count of a `--dry-run` job that has no `--rows` override.
const DRY_RUN_ROW_CAP: u64 = 1_000;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("core error: {0}")]
    Core(#[from] unifill_core::Error),
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("database error: {0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Generation(#[from] GenerationError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "unifill", version, about = "Fill a university database with referentially consistent test data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and load the selected tables, parents first.
    Fill(FillArgs),
    /// List the table jobs in load order.
    Tables,
}

#[derive(Args, Debug)]
struct FillArgs {
    /// Database connection string (flag form).
    #[arg(long, value_name = "CONNECTION_STRING", conflicts_with = "conn_pos")]
    conn: Option<String>,
    /// Database connection string (positional form).
    #[arg(value_name = "CONNECTION_STRING")]
    conn_pos: Option<String>,
    /// Config file; `unifill.toml` is read when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Table to fill; repeat for several. Defaults to every table.
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,
    /// Records per bulk write.
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Candidate cap for unique tables, as a multiple of the requested count.
    #[arg(long)]
    attempt_factor: Option<u64>,
    /// Count override, e.g. `students=1000` or `faculties=2` (per parent).
    #[arg(long = "rows", value_name = "TABLE=COUNT", value_parser = parse_row_override)]
    rows: Vec<(String, u64)>,
    /// Run against an in-memory database instead of Postgres.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Fill(args) => run_fill(args).await,
        Command::Tables => list_tables(),
    }
}

async fn run_fill(args: FillArgs) -> Result<(), CliError> {
    let file = FillConfig::load(args.config.as_deref())?;
    let overrides = Overrides {
        connection: args.conn.or(args.conn_pos),
        batch_size: args.batch_size,
        seed: args.seed,
        attempt_factor: args.attempt_factor,
        tables: args.tables,
        rows: args.rows,
    };
    let settings = Settings::resolve(file, overrides, std::env::var("DATABASE_URL").ok());

    let jobs = catalog();
    let selected = select_jobs(&jobs, &settings)?;
    let options = GenerateOptions {
        attempt_factor: settings.attempt_factor,
        batch: BatchBound::new(settings.batch_size)?,
    };

    let (engine, conn) = if args.dry_run {
        ("memory", None)
    } else {
        let conn = settings.connection.clone().ok_or_else(|| {
            CliError::InvalidConfig(
                "connection string is required (flag, config file or DATABASE_URL)".to_string(),
            )
        })?;
        (detect_engine(&conn)?, Some(conn))
    };

    let run_id = Uuid::new_v4().to_string();
    let started_at = chrono::Utc::now();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at,
        engine: engine.to_string(),
        dry_run: args.dry_run,
        run_dir: args.run_dir,
        connection: conn.as_deref().map(redact_connection),
        settings: settings.clone(),
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        engine = %engine,
        tables = selected.len(),
        seed = settings.seed,
        batch_size = settings.batch_size
    );
    if let Some(connection) = &run_ctx.connection {
        tracing::info!(event = "connection_target", connection = %connection.redacted);
    }

    let timer = Instant::now();
    let mut session: Box<dyn Session> = match conn {
        Some(conn) => Box::new(PostgresSession::connect(&conn, &SessionOptions::default()).await?),
        None => Box::new(memory_session(&jobs)),
    };

    let generator = ReferentialGenerator::new(options);
    let mut tables = Vec::with_capacity(selected.len());
    let mut failure = None;
    for job in selected {
        let count = job_count(job, &settings, args.dry_run);
        let result = match job.request(settings.seed, count) {
            Ok(request) => {
                let mut synth = job.synth;
                generator.run(session.as_mut(), &request, &mut synth).await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(outcome) => tables.push(TableSummary::from(outcome)),
            Err(err) => {
                tracing::error!(event = "table_failed", table = %job.table, error = %err);
                failure = Some(err);
                break;
            }
        }
    }

    let duration_ms = timer.elapsed().as_millis();
    let summary = RunSummary {
        run_id,
        status: if failure.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Success
        },
        finished_at: chrono::Utc::now().to_rfc3339(),
        duration_ms,
        tables,
        error: failure.as_ref().map(ToString::to_string),
    };
    write_summary(&run_paths, &summary)?;
    print_summary(&summary);

    tracing::info!(
        event = "run_finished",
        status = ?summary.status,
        duration_ms = duration_ms,
        run = %run_paths.root.display()
    );

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Jobs named in `settings`, in catalog order; every job when none are named.
fn select_jobs<'a>(jobs: &'a [TableJob], settings: &Settings) -> Result<Vec<&'a TableJob>, CliError> {
    let known = |table: &str| jobs.iter().any(|job| job.table == table);
    for table in settings.tables.iter().chain(settings.rows.keys()) {
        if !known(table) {
            return Err(CliError::InvalidConfig(format!("unknown table '{table}'")));
        }
    }
    Ok(jobs
        .iter()
        .filter(|job| settings.tables.is_empty() || settings.tables.iter().any(|table| table == job.table))
        .collect())
}

/// Explicit override, else the default, capped for dry runs.
fn job_count(job: &TableJob, settings: &Settings, dry_run: bool) -> Option<u64> {
    if let Some(count) = settings.rows.get(job.table) {
        return Some(*count);
    }
    match job.target {
        Target::Rows(default) if dry_run && default > DRY_RUN_ROW_CAP => {
            tracing::warn!(
                event = "dry_run_capped",
                table = %job.table,
                default = default,
                cap = DRY_RUN_ROW_CAP,
                "default row count capped for the in-memory run, pass --rows to change it"
            );
            Some(DRY_RUN_ROW_CAP)
        }
        _ => None,
    }
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(redact_connection(conn).redacted))
    }
}

fn print_summary(summary: &RunSummary) {
    println!("{:<36} {:>10} {:>10} {:>8}", "table", "written", "skipped", "short");
    for table in &summary.tables {
        println!(
            "{:<36} {:>10} {:>10} {:>8}",
            table.table, table.written, table.skipped, table.short
        );
    }
    if let Some(error) = &summary.error {
        println!("run stopped: {error}");
    }
}

fn list_tables() -> Result<(), CliError> {
    for job in catalog() {
        let columns = job.operation()?.arity();
        let parents = job.parents();
        println!(
            "{:<36} {:<28} {:>2} columns  parents: {}",
            job.table,
            job.describe_target(),
            columns,
            if parents.is_empty() {
                "-".to_string()
            } else {
                parents.join(", ")
            }
        );
    }
    Ok(())
}
