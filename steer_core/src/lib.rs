#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Online trial logic for the circular steering experiment (hardware-agnostic).
//!
//! All device interactions go through `steer_traits::Digitizer` and
//! `steer_traits::Cue`; time comes from an injectable `steer_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Plan**: randomized four-block trial sequence (`sequence` module)
//! - **State machine**: trial lifecycle driven by `step` (`engine` module)
//! - **Collection**: onset detection, per-sample geometry, lap tracking (`collector`)
//! - **Feedback**: live pointer color and trace thickness (`feedback`)
//! - **Persistence**: append-only CSV storage with a failure policy (`persist`)
//! - **Configuration**: runtime config structs (`config`) and TOML bridging (`conversions`)

pub mod builder;
pub mod collector;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod hw_error;
pub mod mocks;
pub mod persist;
pub mod record;
pub mod runner;
pub mod sequence;
pub mod status;
pub mod types;
pub mod util;

pub use builder::{Session, SessionBuilder, build_engine};
pub use config::{
    Capabilities, EngagementCfg, EngineSettings, ExitRule, PauseMode, PersistPolicy, SequenceCfg,
    TimingCfg, TraceCfg,
};
pub use engine::{Phase, PointerFeedback, SessionTally, TrialEngine};
pub use error::{AbortReason, BuildError, SteerError};
pub use feedback::{FeedbackState, ForceBand};
pub use persist::{CsvTrialSink, TrialSink};
pub use record::{RawRow, Sample, ScoreRow, TrialRecord, TrialSummary};
pub use runner::{SessionReport, run_session};
pub use status::SessionStatus;
pub use types::{Condition, Point, Task, TrialSpec, TunnelGeometry};
