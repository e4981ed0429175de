//! One-shot script runner.
//!
//! `scripthost-worker <filename> [context.json]` runs one script from the
//! configured library and prints its completion payload as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use scripthost_core::error::CoreError;
use scripthost_core::external::ExternalContext;
use scripthost_engine::{HostConfig, ReqwestTransport, RunReport, Supervisor, TransportError};
use scripthost_events::TracingSink;

pub const USAGE: &str = "usage: scripthost-worker <script-filename> [external-context.json]";

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("HTTP client setup failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid external context: {0}")]
    Context(#[from] serde_json::Error),
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerArgs {
    pub filename: String,
    pub context_path: Option<PathBuf>,
}

impl WorkerArgs {
    /// Parse arguments, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self, WorkerError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let filename = args
            .next()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| WorkerError::Usage(USAGE.to_string()))?;
        let context_path = args.next().map(PathBuf::from);
        if args.next().is_some() {
            return Err(WorkerError::Usage(USAGE.to_string()));
        }
        Ok(Self {
            filename,
            context_path,
        })
    }
}

/// Load the optional external context file.
pub fn load_context(path: Option<&PathBuf>) -> Result<Option<ExternalContext>, WorkerError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(path).map_err(CoreError::from)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Run the script named in `args` once against `config`.
pub async fn run(config: HostConfig, args: &WorkerArgs) -> Result<RunReport, WorkerError> {
    let external = load_context(args.context_path.as_ref())?;
    let sink = Arc::new(TracingSink);
    let supervisor = Supervisor::new(config, Arc::new(ReqwestTransport::new()?), sink.clone(), sink);

    let report = supervisor.run_report(&args.filename, external).await;
    tracing::info!(
        script = %report.filename,
        status = report.status.label(),
        duration_ms = report.duration_ms,
        "Worker run finished"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use scripthost_engine::RunStatus;
    use serde_json::json;

    use super::*;

    fn args(list: &[&str]) -> Result<WorkerArgs, WorkerError> {
        WorkerArgs::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parse_filename_and_optional_context() {
        assert_eq!(
            args(&["a.rhai"]).expect("valid"),
            WorkerArgs {
                filename: "a.rhai".to_string(),
                context_path: None,
            }
        );
        assert_eq!(
            args(&["a.rhai", "ctx.json"]).expect("valid").context_path,
            Some(PathBuf::from("ctx.json"))
        );
    }

    #[test]
    fn parse_rejects_missing_or_extra_arguments() {
        assert_matches!(args(&[]), Err(WorkerError::Usage(_)));
        assert_matches!(args(&["a", "b", "c"]), Err(WorkerError::Usage(_)));
    }

    #[test]
    fn bad_context_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ctx.json");
        std::fs::write(&path, "{broken").expect("write");
        assert_matches!(load_context(Some(&path)), Err(WorkerError::Context(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_script_with_context() {
        let dir = tempfile::tempdir().expect("tempdir");
        let scripts = dir.path().join("scripts");
        std::fs::create_dir(&scripts).expect("mkdir");
        std::fs::write(scripts.join("echo.rhai"), "done(#{ mode: mode });").expect("write");
        let ctx = dir.path().join("ctx.json");
        std::fs::write(&ctx, r#"{"mode": "batch"}"#).expect("write");

        let config = HostConfig {
            script_dir: scripts,
            store_dir: dir.path().join("store"),
            exec_timeout: Duration::from_secs(2),
            ..HostConfig::default()
        };
        let worker_args = WorkerArgs {
            filename: "echo.rhai".to_string(),
            context_path: Some(ctx),
        };

        let report = run(config, &worker_args).await.expect("run");
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.done, json!({"mode": "batch"}));
    }
}
