use scripthost_engine::{HostConfig, RunStatus};
use scripthost_worker::{run, WorkerArgs, WorkerError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scripthost_worker=info,scripthost=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = match execute().await {
        Ok(RunStatus::Completed) => 0,
        Ok(_) => 1,
        Err(WorkerError::Usage(usage)) => {
            eprintln!("{usage}");
            2
        }
        Err(e) => {
            tracing::error!(error = %e, "Worker failed");
            1
        }
    };
    std::process::exit(code);
}

async fn execute() -> Result<RunStatus, WorkerError> {
    let args = WorkerArgs::parse(std::env::args().skip(1))?;
    let config = HostConfig::from_env()?;
    tracing::info!(script = %args.filename, script_dir = %config.script_dir.display(), "Worker starting");

    let report = run(config, &args).await?;
    println!("{}", report.done);
    Ok(report.status)
}
