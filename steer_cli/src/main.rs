#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `steer` binary: run sessions and process recorded data.

mod cli;
mod error_fmt;
mod process;
mod session;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::Result;
use serde_json::json;
use steer_config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::cli::{Cli, Commands, JSON_MODE, LAST_PARTICIPANT};
use crate::error_fmt::{ConfigError, exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let code = match real_main(cli) {
        Ok(()) => 0,
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: Cli) -> Result<()> {
    let Cli {
        config,
        json,
        log_level,
        cmd,
    } = cli;
    let cfg = load_config(config.as_deref())?;
    // Flushes the file writer when dropped at the end of this function.
    let _guard = init_logging(json, &log_level, &cfg.logging)?;

    let result = dispatch(cmd, &cfg, json);
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "command failed");
    }
    result
}

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = match path {
        Some(p) => {
            let text = fs::read_to_string(p).map_err(|source| ConfigError::Read {
                path: p.to_path_buf(),
                source,
            })?;
            steer_config::load_toml(&text)?
        }
        None => Config::default(),
    };
    cfg.validate()
        .map_err(|e| ConfigError::Invalid(format!("{e:#}")))?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout carries only command results.
fn init_logging(
    json: bool,
    level: &str,
    logging: &steer_config::Logging,
) -> Result<Option<WorkerGuard>> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    }
    .with_filter(console_filter);

    let (file_layer, guard) = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(logging.level.as_deref().unwrap_or("info")));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()?;
    Ok(guard)
}

fn dispatch(cmd: Commands, cfg: &Config, json: bool) -> Result<()> {
    match cmd {
        Commands::Run {
            participant,
            sim,
            seed,
            out,
            realtime,
        } => {
            let _ = LAST_PARTICIPANT.set(participant.trim().to_string());
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "Ctrl-C handler not installed");
            }

            let outcome = session::run(
                cfg,
                session::RunArgs {
                    participant,
                    sim,
                    seed,
                    out,
                    realtime,
                },
                shutdown,
            )?;
            let r = &outcome.report;
            if json {
                println!(
                    "{}",
                    json!({
                        "participant": outcome.participant,
                        "trials_planned": r.trials_planned,
                        "completed": r.completed,
                        "timed_out": r.timed_out,
                        "empty": r.empty,
                        "dropped": r.dropped,
                        "elapsed_s": r.elapsed_s,
                        "raw": outcome.raw_path,
                        "scores": outcome.scores_path,
                    })
                );
            } else {
                println!(
                    "session complete for {}: {} of {} trials completed ({} timed out, {} empty, {} dropped)",
                    outcome.participant,
                    r.completed,
                    r.trials_planned,
                    r.timed_out,
                    r.empty,
                    r.dropped
                );
                println!("raw: {}", outcome.raw_path.display());
                println!("scores: {}", outcome.scores_path.display());
            }
        }
        Commands::Process {
            input,
            metadata,
            out,
            workers,
        } => {
            let report = process::process(
                cfg,
                process::ProcessArgs {
                    input,
                    metadata,
                    out,
                    workers,
                },
            )?;
            if json {
                let failed: Vec<_> = report
                    .failed
                    .iter()
                    .map(|(file, error)| json!({ "file": file, "error": error }))
                    .collect();
                println!(
                    "{}",
                    json!({
                        "files": report.files,
                        "processed": report.processed,
                        "failed": failed,
                        "trials": report.trials,
                        "skipped": report.skipped,
                        "features": report.features_path,
                    })
                );
            } else {
                println!(
                    "processed {}/{} files: {} trials, {} skipped",
                    report.processed, report.files, report.trials, report.skipped
                );
                for (file, error) in &report.failed {
                    println!("failed: {}: {error}", file.display());
                }
                match &report.features_path {
                    Some(p) => println!("features: {}", p.display()),
                    None => println!("features: none"),
                }
            }
        }
        Commands::SelfCheck => {
            let planned = session::self_check(cfg)?;
            if json {
                println!("{}", json!({ "status": "OK", "planned_trials": planned }));
            } else {
                println!("OK: {planned} trials planned, simulated trial completed");
            }
        }
    }
    Ok(())
}
