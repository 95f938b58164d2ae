//! contend CLI - runs the scenario suite and reports one outcome per scenario.
//!
//! ```text
//! main() -> Args::parse -> load_settings -> Harness::run(root scope) -> report
//!                                                  ^
//!                                     Ctrl-C cancels the root scope
//! ```
//!
//! The process exits non-zero when any scenario failed, so the harness can
//! gate CI on concurrency regressions.

mod args;
mod report;

use std::{
    env,
    fs::OpenOptions,
    path::PathBuf,
    process::ExitCode,
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use contend_config::EnvOverrides;
use contend_core::Harness;
use contend_engine::Scope;

use crate::args::Args;

const LOG_FILE_ENV: &str = "CONTEND_LOG_FILE";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_path = env::var_os(LOG_FILE_ENV).map(PathBuf::from);
    if let Some(path) = log_path {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                    .with(env_filter)
                    .init();
                tracing::info!(path = %path.display(), "Logging initialized");
                return;
            }
            Err(e) => {
                eprintln!("Failed to open log file {}: {e}; logging to stderr", path.display());
            }
        }
    }

    // Reports go to stdout; logs stay on stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    init_tracing();

    let overrides = EnvOverrides::from_env();
    let mut settings = contend_config::load_settings(args.config.as_deref(), &overrides)
        .context("failed to load configuration")?;
    if let Some(target) = &args.target {
        settings.endpoint.base_url = target.base_url();
    }

    let harness = Harness::new(settings)
        .context("failed to prepare harness")?
        .only(args.only());

    let root = Scope::new();
    let interrupt = root.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling scenarios");
            interrupt.cancel();
        }
    });

    let report = harness.run(&root).await.context("harness run failed")?;

    if args.json {
        println!("{}", report::render_json(&report)?);
    } else {
        print!("{}", report::render_table(&report));
    }

    Ok(if report.failed() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
