use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use schemaforge_core::{DatabaseSchema, GenerationConfig, RedactedConnection};

use super::{RegistryError, RegistryResult};

/// Serializable options for runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub schema_file: Option<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub generation: GenerationConfig,
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub command: String,
    pub dialect: String,
    pub schema_version: String,
    pub run_dir: PathBuf,
    pub options: RunOptions,
    pub connection: Option<RedactedConnection>,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub command: String,
    pub dialect: String,
    pub schema_version: String,
    pub options: RunOptions,
    pub connection: Option<RedactedConnection>,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub schema_path: PathBuf,
    pub logs_path: PathBuf,
}

impl RunPaths {
    pub fn report_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let schema_path = root.join("schema.json");
    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        command: ctx.command.clone(),
        dialect: ctx.dialect.clone(),
        schema_version: ctx.schema_version.clone(),
        options: ctx.options.clone(),
        connection: ctx.connection.clone(),
        git: collect_git_info(),
    };

    write_json(&config_path, &config)?;

    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        root,
        schema_path,
        logs_path,
    })
}

pub fn write_schema(
    paths: &RunPaths,
    schema: &DatabaseSchema,
    out_path: Option<&Path>,
) -> RegistryResult<()> {
    write_json(&paths.schema_path, schema)?;

    if let Some(out_path) = out_path {
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        write_json(out_path, schema)?;
    }

    Ok(())
}

/// Write `<name>.json` into the run directory and return its path.
pub fn write_report<T: Serialize>(
    paths: &RunPaths,
    name: &str,
    report: &T,
) -> RegistryResult<PathBuf> {
    let path = paths.report_path(name);
    write_json(&path, report)?;
    Ok(path)
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
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
    let file = OpenOptions::new().create(true).truncate(true).write(true).open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_directory_holds_config_and_logs() {
        let run_dir = std::env::temp_dir().join(format!("schemaforge-runs-{}", uuid::Uuid::new_v4()));
        let ctx = RunContext {
            run_id: "abc".to_string(),
            started_at: Utc::now(),
            command: "generate".to_string(),
            dialect: "postgres".to_string(),
            schema_version: "0.1".to_string(),
            run_dir: run_dir.clone(),
            options: RunOptions {
                config_file: None,
                schema_file: None,
                include: vec!["users".to_string()],
                exclude: Vec::new(),
                generation: GenerationConfig::default(),
            },
            connection: None,
        };

        let paths = start_run(&ctx).expect("run");
        assert!(paths.root.ends_with(format!(
            "{}__run_abc",
            ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ")
        )));
        assert!(paths.logs_path.is_file());
        let config = std::fs::read_to_string(paths.root.join("config.json")).expect("config");
        assert!(config.contains("\"command\": \"generate\""));
        assert!(config.contains("\"users\""));

        let report = write_report(&paths, "export_report", &serde_json::json!({"ok": true}))
            .expect("report");
        assert!(report.ends_with("export_report.json"));

        std::fs::remove_dir_all(&run_dir).ok();
    }
}
