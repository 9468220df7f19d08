use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use unifill_generate::GenerationOutcome;

use super::RegistryResult;
use crate::config::Settings;
use crate::redaction::RedactedConnection;

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub engine: String,
    pub dry_run: bool,
    pub run_dir: PathBuf,
    pub settings: Settings,
    pub connection: Option<RedactedConnection>,
}

/// `config.json` of a run directory.
#[derive(Debug, Serialize)]
struct RunConfig<'a> {
    run_id: &'a str,
    started_at: String,
    engine: &'a str,
    dry_run: bool,
    settings: &'a Settings,
    connection: Option<&'a RedactedConnection>,
    git: GitInfo,
}

#[derive(Debug, Serialize)]
struct GitInfo {
    commit: Option<String>,
    dirty: Option<bool>,
}

/// Artifact paths of one run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub summary_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Per-table line of `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub requested: u64,
    pub written: u64,
    pub skipped: u64,
    pub short: u64,
    pub rejected: u64,
    pub outcome: GenerationOutcome,
}

impl From<GenerationOutcome> for TableSummary {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            table: outcome.table.clone(),
            requested: outcome.requested,
            written: outcome.written(),
            skipped: outcome.skipped(),
            short: outcome.shortfall(),
            rejected: outcome.rejected,
            outcome,
        }
    }
}

/// `summary.json` of a run directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub finished_at: String,
    pub duration_ms: u128,
    pub tables: Vec<TableSummary>,
    pub error: Option<String>,
}

/// Create `{run_dir}/{timestamp}__run_{id}` with its `config.json` and an
/// empty log file.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));
    create_dir_all(&root)?;

    let config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        engine: &ctx.engine,
        dry_run: ctx.dry_run,
        settings: &ctx.settings,
        connection: ctx.connection.as_ref(),
        git: collect_git_info(),
    };
    write_json(&root.join("config.json"), &config)?;

    let logs_path = root.join("logs.ndjson");
    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        summary_path: root.join("summary.json"),
        logs_path,
        root,
    })
}

pub fn write_summary(paths: &RunPaths, summary: &RunSummary) -> RegistryResult<()> {
    write_json(&paths.summary_path, summary)
}

fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
