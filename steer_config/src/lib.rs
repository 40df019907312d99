#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and participant metadata parsing for the steering experiment.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; defaults reproduce the reference protocol.
//! - The participant metadata CSV loader finds its columns by name and normalizes IDs.
use serde::Deserialize;

/// Participant metadata CSV schema.
///
/// Required headers are `ID` and `Group`; `ProficiencyScore` (or the legacy
/// `OSATS_Score`) is optional. An empty score cell is read as a missing score.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ParticipantMeta {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "ProficiencyScore", alias = "OSATS_Score")]
    pub proficiency_score: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionCfg {
    /// Target stylus force in raw digitizer units (0..raw_max).
    pub target_force_raw: f64,
    /// Half-width of the accepted force band, in percent of the target.
    pub force_tolerance_pct: f64,
    /// Raw units corresponding to a normalized pressure of 1.0.
    pub raw_max: f64,
    /// Recording is cut off after this many seconds.
    pub max_trial_s: f64,
    pub rest_s: f64,
    pub long_break_s: f64,
    /// Auto-advance delay for the intro screen in timed pause mode.
    pub intro_s: f64,
    pub reps_per_level: u32,
    /// Engagement must hold continuously for this long before the countdown.
    pub stationary_delay_s: f64,
    /// Movement onset speed, px/s.
    pub velocity_threshold: f64,
    /// Loop period in milliseconds.
    pub tick_ms: u64,
    /// Optional RNG seed for a reproducible trial order.
    pub seed: Option<u64>,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            target_force_raw: 3200.0,
            force_tolerance_pct: 5.0,
            raw_max: 8192.0,
            max_trial_s: 15.0,
            rest_s: 5.0,
            long_break_s: 30.0,
            intro_s: 0.0,
            reps_per_level: 2,
            stationary_delay_s: 0.5,
            velocity_threshold: 10.0,
            tick_ms: 8,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StartCfg {
    /// The pointer must be strictly closer than this to the start marker.
    pub capture_radius_px: f64,
    /// Normalized pressure above which the stylus counts as touching.
    pub touch_threshold: f64,
}

impl Default for StartCfg {
    fn default() -> Self {
        Self {
            capture_radius_px: 30.0,
            touch_threshold: 0.05,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TraceCfg {
    pub base_thickness: f64,
    /// Thickness added at full pressure when feedback is shown.
    pub max_thickness: f64,
}

impl Default for TraceCfg {
    fn default() -> Self {
        Self {
            base_thickness: 4.0,
            max_thickness: 40.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayCfg {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    /// The trace edge (`error + thickness / 2`) must stay inside the half-width.
    #[default]
    HalfThickness,
    /// Only the pointer centerline is tested against the half-width.
    Centerline,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PauseMode {
    /// Intro screens advance on their own after `session.intro_s`.
    #[default]
    Timed,
    /// Intro screens wait for an operator confirmation.
    Interactive,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedbackCfg {
    pub exit_rule: ExitRule,
    pub pause: PauseMode,
    /// Show force feedback while waiting at the start marker in the force task.
    pub wait_override: bool,
}

impl Default for FeedbackCfg {
    fn default() -> Self {
        Self {
            exit_rule: ExitRule::HalfThickness,
            pause: PauseMode::Timed,
            wait_override: true,
        }
    }
}

/// One tunnel difficulty: ring radius and width in pixels.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TunnelLevel {
    pub radius: f64,
    pub width: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TunnelCfg {
    pub levels: Vec<TunnelLevel>,
}

/// Reference difficulty table, ordered by level.
pub const DEFAULT_LEVELS: [TunnelLevel; 5] = [
    TunnelLevel {
        radius: 250.0,
        width: 100.0,
    },
    TunnelLevel {
        radius: 400.0,
        width: 100.0,
    },
    TunnelLevel {
        radius: 250.0,
        width: 50.0,
    },
    TunnelLevel {
        radius: 400.0,
        width: 50.0,
    },
    TunnelLevel {
        radius: 400.0,
        width: 30.0,
    },
];

impl Default for TunnelCfg {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteErrorPolicy {
    /// Drop the trial silently.
    Ignore,
    /// Drop the trial and log a warning.
    #[default]
    Warn,
    /// Stop the session with the write error.
    Abort,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageCfg {
    /// Directory receiving `<ID>_RAW.csv` and `<ID>_SCORES.csv`.
    pub raw_dir: String,
    pub on_write_error: WriteErrorPolicy,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            raw_dir: "data".to_string(),
            on_write_error: WriteErrorPolicy::Warn,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisCfg {
    pub cutoff_hz: f64,
    /// Sampling rate assumed when it cannot be derived from timestamps.
    pub default_fs_hz: f64,
    /// Channels shorter than this are passed through unfiltered.
    pub min_filter_len: usize,
    /// Trials with fewer samples are skipped.
    pub min_trial_samples: usize,
    /// A drop in relative time larger than this starts a new trial.
    pub boundary_drop_s: f64,
    /// Upper bound on concurrent participant files.
    pub workers: usize,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            cutoff_hz: 10.0,
            default_fs_hz: 120.0,
            min_filter_len: 15,
            min_trial_samples: 5,
            boundary_drop_s: 0.5,
            workers: 4,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub session: SessionCfg,
    pub start: StartCfg,
    pub trace: TraceCfg,
    pub display: DisplayCfg,
    pub feedback: FeedbackCfg,
    pub tunnel: TunnelCfg,
    pub storage: StorageCfg,
    pub analysis: AnalysisCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Load the participant metadata table.
///
/// Columns are found by name, so extra or reordered columns are fine. The
/// separator is whichever of `,` `;` or tab occurs most in the header line.
/// A missing score column reads as no score for everyone. IDs are trimmed
/// and uppercased; group labels are trimmed. A UTF-8 byte order mark before
/// the first header is tolerated.
pub fn load_metadata_csv(path: &std::path::Path) -> eyre::Result<Vec<ParticipantMeta>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("open metadata CSV {:?}: {}", path, e))?;
    let text = text.trim_start_matches('\u{feff}');

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(sniff_delimiter(text))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let (Some(id_col), Some(group_col)) = (column(&["ID"]), column(&["Group"])) else {
        eyre::bail!(
            "metadata CSV must have headers 'ID,Group,ProficiencyScore', got: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        );
    };
    let score_col = column(&["ProficiencyScore", "OSATS_Score"]);

    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let line = idx + 2;
        let rec = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", line, e))?;
        let id = rec.get(id_col).unwrap_or_default().to_uppercase();
        if id.is_empty() {
            continue;
        }
        let proficiency_score = match score_col.and_then(|c| rec.get(c)) {
            None | Some("") => None,
            Some(v) => Some(
                v.parse::<f64>()
                    .map_err(|e| eyre::eyre!("invalid CSV row {}: score {:?}: {}", line, v, e))?,
            ),
        };
        rows.push(ParticipantMeta {
            id,
            group: rec.get(group_col).unwrap_or_default().to_string(),
            proficiency_score,
        });
    }
    Ok(rows)
}

fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|&d| header.bytes().filter(|&b| b == d).count())
        .filter(|&d| header.as_bytes().contains(&d))
        .unwrap_or(b',')
}

fn finite_nonneg(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn finite_pos(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Session
        let s = &self.session;
        if !finite_pos(s.raw_max) {
            eyre::bail!("session.raw_max must be > 0");
        }
        if !finite_pos(s.target_force_raw) || s.target_force_raw > s.raw_max {
            eyre::bail!("session.target_force_raw must be in (0, raw_max]");
        }
        if !(s.force_tolerance_pct.is_finite()
            && s.force_tolerance_pct > 0.0
            && s.force_tolerance_pct < 100.0)
        {
            eyre::bail!("session.force_tolerance_pct must be in (0, 100)");
        }
        if !finite_pos(s.max_trial_s) {
            eyre::bail!("session.max_trial_s must be > 0");
        }
        if !finite_nonneg(s.rest_s) {
            eyre::bail!("session.rest_s must be >= 0");
        }
        if !finite_nonneg(s.long_break_s) {
            eyre::bail!("session.long_break_s must be >= 0");
        }
        if !finite_nonneg(s.intro_s) {
            eyre::bail!("session.intro_s must be >= 0");
        }
        if s.reps_per_level == 0 {
            eyre::bail!("session.reps_per_level must be >= 1");
        }
        if !finite_nonneg(s.stationary_delay_s) {
            eyre::bail!("session.stationary_delay_s must be >= 0");
        }
        if !finite_nonneg(s.velocity_threshold) {
            eyre::bail!("session.velocity_threshold must be >= 0");
        }
        if s.tick_ms == 0 {
            eyre::bail!("session.tick_ms must be >= 1");
        }
        if s.tick_ms > 1000 {
            eyre::bail!("session.tick_ms is unreasonably large (>1s)");
        }

        // Start marker
        if !finite_pos(self.start.capture_radius_px) {
            eyre::bail!("start.capture_radius_px must be > 0");
        }
        if !(self.start.touch_threshold.is_finite()
            && (0.0..1.0).contains(&self.start.touch_threshold))
        {
            eyre::bail!("start.touch_threshold must be in [0.0, 1.0)");
        }

        // Trace
        if !finite_nonneg(self.trace.base_thickness) {
            eyre::bail!("trace.base_thickness must be >= 0");
        }
        if !finite_nonneg(self.trace.max_thickness) {
            eyre::bail!("trace.max_thickness must be >= 0");
        }

        // Display
        if self.display.width == 0 || self.display.height == 0 {
            eyre::bail!("display.width and display.height must be > 0");
        }

        // Tunnel
        if self.tunnel.levels.is_empty() {
            eyre::bail!("tunnel.levels must contain at least one level");
        }
        for (i, lvl) in self.tunnel.levels.iter().enumerate() {
            if !finite_pos(lvl.radius) || !finite_pos(lvl.width) {
                eyre::bail!("tunnel.levels[{i}] radius and width must be > 0");
            }
            if lvl.width >= 2.0 * lvl.radius {
                eyre::bail!("tunnel.levels[{i}].width must be < 2 * radius");
            }
        }

        // Storage
        if self.storage.raw_dir.trim().is_empty() {
            eyre::bail!("storage.raw_dir must not be empty");
        }

        // Analysis
        let a = &self.analysis;
        if !finite_pos(a.cutoff_hz) {
            eyre::bail!("analysis.cutoff_hz must be > 0");
        }
        if !finite_pos(a.default_fs_hz) {
            eyre::bail!("analysis.default_fs_hz must be > 0");
        }
        if a.min_filter_len == 0 {
            eyre::bail!("analysis.min_filter_len must be >= 1");
        }
        if a.min_trial_samples < 2 {
            eyre::bail!("analysis.min_trial_samples must be >= 2");
        }
        if !finite_pos(a.boundary_drop_s) {
            eyre::bail!("analysis.boundary_drop_s must be > 0");
        }
        if a.workers == 0 {
            eyre::bail!("analysis.workers must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
