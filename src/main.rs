use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{CliMode, parse_cli_args, run_events_mode, test_events_from_env};

use hellscore_attendance::api::{self, AppState};
use hellscore_attendance::storage::config::{Config, LoggingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match parse_cli_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", cli::usage());
            return Ok(());
        }
    };

    let mut config = match &args.config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_or_create().context("loading default config")?,
    };
    if args.test_events || test_events_from_env() {
        config.submission.test_events = true;
    }

    let _guard = setup_logging(&config.logging);

    let state = match AppState::from_config(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    match args.mode {
        CliMode::Serve => api::serve(&config.server, state).await?,
        CliMode::Events(email) => run_events_mode(&state.service, &email).await?,
    }

    Ok(())
}

fn setup_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = logging
        .filter
        .as_deref()
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("hellscore_attendance=info,tower_http=info"));

    let guard = match &logging.directory {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).ok();
            let file_appender = tracing_appender::rolling::daily(log_dir, "hellscore-attendance.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    };

    tracing::info!("hellscore-attendance started");
    guard
}
