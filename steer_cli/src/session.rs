//! `run` and `self-check`: drive a session end to end.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::{Result, WrapErr};
use steer_config::Config;
use steer_core::mocks::MemorySink;
use steer_core::sequence::generate_plan;
use steer_core::{
    CsvTrialSink, EngineSettings, PauseMode, SequenceCfg, SessionReport, TrialSink, TrialSpec,
    build_engine, run_session,
};
use steer_hardware::{SimProfile, simulated_pair};
use steer_traits::{Clock, MonotonicClock, VirtualClock};

pub struct RunArgs {
    pub participant: String,
    pub sim: bool,
    pub seed: Option<u64>,
    pub out: Option<PathBuf>,
    pub realtime: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub participant: String,
    pub report: SessionReport,
    pub raw_path: PathBuf,
    pub scores_path: PathBuf,
}

fn sim_profile(cfg: &Config, settings: &EngineSettings, plan: &[TrialSpec]) -> SimProfile {
    SimProfile {
        center: (settings.center.x, settings.center.y),
        radii: plan.iter().map(|s| s.geometry.radius).collect(),
        pressure: cfg.session.target_force_raw / cfg.session.raw_max,
        ..SimProfile::default()
    }
}

/// Settings for a scripted participant, which cannot press a confirm key.
fn sim_settings(cfg: &Config) -> EngineSettings {
    let mut settings = EngineSettings::from(cfg);
    if settings.capabilities.pause == PauseMode::Interactive {
        tracing::warn!("simulated participant cannot confirm screens; using timed pauses");
        settings.capabilities.pause = PauseMode::Timed;
    }
    settings
}

fn drive<K>(
    clock: K,
    profile: SimProfile,
    sink: Box<dyn TrialSink>,
    settings: EngineSettings,
    plan: Vec<TrialSpec>,
    abort: Option<Box<dyn Fn() -> bool>>,
) -> Result<SessionReport>
where
    K: Clock + Clone + Send + Sync + 'static,
{
    let (participant, cue) = simulated_pair(profile, clock.clone());
    let mut engine = build_engine(
        participant,
        cue,
        sink,
        settings,
        Some(plan),
        None,
        abort,
        Some(Box::new(clock)),
    )?;
    run_session(&mut engine)
}

pub fn run(cfg: &Config, args: RunArgs, shutdown: Arc<AtomicBool>) -> Result<RunOutcome> {
    let participant = args.participant.trim().to_string();
    if participant.is_empty() {
        eyre::bail!("participant id must not be empty");
    }
    if !args.sim {
        eyre::bail!("no tablet backend in this build; rerun with --sim");
    }

    let mut sequence = SequenceCfg::from(cfg);
    if args.seed.is_some() {
        sequence.seed = args.seed;
    }
    let plan = generate_plan(&sequence)?;
    let settings = sim_settings(cfg);
    let profile = sim_profile(cfg, &settings, &plan);

    let dir = args
        .out
        .unwrap_or_else(|| PathBuf::from(&cfg.storage.raw_dir));
    let sink = CsvTrialSink::new(&dir, participant.as_str());
    let raw_path = sink.raw_path();
    let scores_path = sink.scores_path();

    tracing::info!(
        participant = %participant,
        trials = plan.len(),
        seed = ?sequence.seed,
        dir = %dir.display(),
        realtime = args.realtime,
        "starting simulated session"
    );

    let abort: Box<dyn Fn() -> bool> = Box::new(move || shutdown.load(Ordering::Relaxed));
    let report = if args.realtime {
        drive(
            MonotonicClock::new(),
            profile,
            Box::new(sink),
            settings,
            plan,
            Some(abort),
        )
    } else {
        drive(
            VirtualClock::new(),
            profile,
            Box::new(sink),
            settings,
            plan,
            Some(abort),
        )
    }
    .wrap_err_with(|| format!("session for participant {participant}"))?;

    Ok(RunOutcome {
        participant,
        report,
        raw_path,
        scores_path,
    })
}

/// Run the first trial of the configured plan against the simulated
/// participant in memory and confirm it completes.
pub fn self_check(cfg: &Config) -> Result<usize> {
    let plan = generate_plan(&SequenceCfg::from(cfg))?;
    let planned = plan.len();
    let first: Vec<TrialSpec> = plan.into_iter().take(1).collect();
    let settings = sim_settings(cfg);
    let profile = sim_profile(cfg, &settings, &first);
    let sink = MemorySink::new();

    let report = drive(
        VirtualClock::new(),
        profile,
        Box::new(sink.clone()),
        settings,
        first,
        None,
    )
    .wrap_err("simulated trial")?;
    if report.completed != 1 || sink.len() != 1 {
        eyre::bail!(
            "simulated trial did not complete (completed {}, timed out {}, empty {})",
            report.completed,
            report.timed_out,
            report.empty
        );
    }
    Ok(planned)
}
