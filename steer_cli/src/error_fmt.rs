//! Human-readable error descriptions and structured JSON error formatting.

use std::path::PathBuf;

use steer_analysis::AnalysisError;
use steer_core::{AbortReason, BuildError, SteerError};

use crate::cli::LAST_PARTICIPANT;

/// Problems with the configuration file itself; always exit code 4.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub fn abort_reason_name(reason: &AbortReason) -> &'static str {
    match reason {
        AbortReason::UserAbort => "UserAbort",
        AbortReason::PersistFailure => "PersistFailure",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<ConfigError>() {
        return match ce {
            ConfigError::Read { path, .. } => format!(
                "What happened: The config file {} could not be read.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the --config path, or omit it to use the built-in defaults.",
                path.display()
            ),
            ConfigError::Parse(e) => format!(
                "What happened: The config file is not valid TOML for this program ({}).\nLikely causes: A typo in a key, a string where a number is expected, or an unknown enum value.\nHow to fix: Correct the reported line and rerun.",
                e.message()
            ),
            ConfigError::Invalid(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDigitizer => {
                "What happened: No digitizer was provided to the session.\nLikely causes: The tablet backend failed to initialize.\nHow to fix: Check the tablet connection, or use --sim for a dry run.".to_string()
            }
            BuildError::MissingCue => {
                "What happened: No audio cue was provided to the session.\nLikely causes: The audio backend failed to initialize.\nHow to fix: Check the audio device, or use --sim for a dry run.".to_string()
            }
            BuildError::MissingSink => {
                "What happened: No trial storage was provided to the session.\nLikely causes: The output directory could not be prepared.\nHow to fix: Check storage.raw_dir or --out.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid session settings ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SteerError>() {
        return match se {
            SteerError::Abort {
                reason: AbortReason::UserAbort,
                discarded_samples,
            } => format!(
                "What happened: The session was stopped by the operator; {discarded_samples} samples of the active trial were discarded.\nLikely causes: Ctrl-C or the abort key.\nHow to fix: Trials finished before the abort are already saved; start a new session to continue."
            ),
            SteerError::Abort {
                reason: AbortReason::PersistFailure,
                ..
            } => "What happened: A finished trial could not be written to disk and the session stopped.\nLikely causes: The RAW or SCORES file is open in another program, the disk is full, or the directory is read-only.\nHow to fix: Close other programs using the files and free space; set storage.on_write_error = \"warn\" to keep going instead.".to_string(),
            SteerError::Timeout => "What happened: The tablet did not report within the read timeout.\nLikely causes: The stylus driver stalled or the tablet went to sleep.\nHow to fix: Wake or reconnect the tablet and rerun.".to_string(),
            SteerError::DigitizerFault(msg) => format!(
                "What happened: The tablet failed ({msg}).\nLikely causes: The cable was unplugged or the driver crashed.\nHow to fix: Reconnect the tablet and start a new session."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<AnalysisError>() {
        return format!(
            "What happened: {ae}.\nLikely causes: A RAW file is truncated, has a different header, or the output directory is not writable.\nHow to fix: Check the file named above; other participants are unaffected."
        );
    }

    // String-based heuristics over the whole context chain
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("no tablet backend") {
        return "What happened: This build has no tablet backend.\nLikely causes: The session was started without --sim.\nHow to fix: Add --sim for a simulated participant.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: abort 2, persistence 3, configuration 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return 4;
    }
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return 4;
    }
    match err.downcast_ref::<SteerError>() {
        Some(SteerError::Abort {
            reason: AbortReason::UserAbort,
            ..
        }) => 2,
        Some(SteerError::Abort {
            reason: AbortReason::PersistFailure,
            ..
        })
        | Some(SteerError::Persist(_)) => 3,
        Some(SteerError::Config(_)) => 4,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(SteerError::Abort {
        reason,
        discarded_samples,
    }) = err.downcast_ref::<SteerError>()
    {
        return json!({
            "reason": abort_reason_name(reason),
            "details": {
                "participant": LAST_PARTICIPANT.get(),
                "discarded_samples": discarded_samples,
            },
            "message": humanize(err),
        })
        .to_string();
    }

    let reason = if err.downcast_ref::<ConfigError>().is_some() {
        "Config"
    } else {
        "Error"
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
