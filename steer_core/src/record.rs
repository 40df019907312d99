//! Trial samples, the finished-trial summary and their CSV row schemas.
//!
//! `RawRow` is the shared data contract between the online engine, which
//! appends it, and the offline pipeline, which reads it back (and writes the
//! cleaned stream with the same schema).

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::types::TrialSpec;
use crate::util::{mean, pop_std, round_dp};

/// One recorded tick after movement onset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since session start.
    pub time_abs: f64,
    /// Seconds since movement onset.
    pub time_rel: f64,
    pub x: f64,
    pub y: f64,
    /// Pressure in raw digitizer units.
    pub pressure_raw: f64,
    pub thickness: f64,
    /// `|distance to center − R|`.
    pub radial_error: f64,
    pub in_tunnel: bool,
    /// Polar angle about the tunnel center, radians.
    pub angle: f64,
}

/// Ordered samples of the active trial.
#[derive(Debug, Clone, Default)]
pub struct TrialRecord {
    samples: Vec<Sample>,
}

impl TrialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            samples: Vec::with_capacity(n),
        }
    }

    #[inline]
    pub fn push(&mut self, s: Sample) {
        self.samples.push(s);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Derive the trial summary; `None` when nothing was recorded.
    pub fn summarize(&self, timeout: bool) -> Option<TrialSummary> {
        let last = self.samples.last()?;
        let n = self.samples.len() as f64;
        let sq: f64 = self.samples.iter().map(|s| s.radial_error.powi(2)).sum();
        let inside = self.samples.iter().filter(|s| s.in_tunnel).count() as f64;
        let force: Vec<f64> = self.samples.iter().map(|s| s.pressure_raw).collect();
        Some(TrialSummary {
            movement_time: round_dp(last.time_rel, 3),
            rmse: round_dp((sq / n).sqrt(), 2),
            pct_in_tunnel: round_dp(inside / n * 100.0, 1),
            mean_force: round_dp(mean(&force).unwrap_or(0.0), 1),
            sd_force: round_dp(pop_std(&force).unwrap_or(0.0), 1),
            timeout,
        })
    }
}

/// Per-trial outcome written to the scores file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialSummary {
    /// Seconds from onset to the last sample.
    pub movement_time: f64,
    pub rmse: f64,
    pub pct_in_tunnel: f64,
    pub mean_force: f64,
    /// Population standard deviation of raw pressure.
    pub sd_force: f64,
    pub timeout: bool,
}

fn ser_flag<S: Serializer>(v: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(true) => s.serialize_u8(1),
        Some(false) => s.serialize_u8(0),
        None => s.serialize_none(),
    }
}

/// Accepts `1/0`, `true/false` in any case, or an empty cell.
fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) if t == "1" || t.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(t) if t == "0" || t.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid InTunnelFlag {other:?}"
        ))),
    }
}

/// Row of `<ID>_RAW.csv` and `<ID>_CLEAN.csv`.
///
/// Trial markers are optional on read so that streams without them can be
/// segmented by the time-reset fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "BlockLabel", default)]
    pub block_label: Option<String>,
    #[serde(rename = "DifficultyLevel", default)]
    pub difficulty_level: Option<u32>,
    #[serde(rename = "RepetitionIndex", default)]
    pub repetition_index: Option<u32>,
    #[serde(rename = "OrderInBlock", default)]
    pub order_in_block: Option<u32>,
    #[serde(rename = "TimeAbs")]
    pub time_abs: f64,
    #[serde(rename = "TimeRel")]
    pub time_rel: f64,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "PressureRaw")]
    pub pressure_raw: f64,
    #[serde(rename = "TraceThickness")]
    pub trace_thickness: f64,
    #[serde(rename = "RadialError", default)]
    pub radial_error: Option<f64>,
    #[serde(
        rename = "InTunnelFlag",
        default,
        serialize_with = "ser_flag",
        deserialize_with = "de_flag"
    )]
    pub in_tunnel: Option<bool>,
    #[serde(rename = "Angle", default)]
    pub angle: Option<f64>,
}

impl RawRow {
    pub fn from_sample(participant: &str, spec: &TrialSpec, s: &Sample) -> Self {
        Self {
            id: participant.to_string(),
            block_label: Some(spec.condition.label()),
            difficulty_level: Some(spec.level),
            repetition_index: Some(spec.repetition),
            order_in_block: Some(spec.order_in_block),
            time_abs: s.time_abs,
            time_rel: s.time_rel,
            x: s.x,
            y: s.y,
            pressure_raw: s.pressure_raw,
            trace_thickness: s.thickness,
            radial_error: Some(s.radial_error),
            in_tunnel: Some(s.in_tunnel),
            angle: Some(s.angle),
        }
    }

    /// Trial marker pair, when both halves are present.
    pub fn marker(&self) -> Option<(&str, u32)> {
        Some((self.block_label.as_deref()?, self.order_in_block?))
    }
}

/// Row of `<ID>_SCORES.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "BlockLabel")]
    pub block_label: String,
    #[serde(rename = "Task")]
    pub task: String,
    #[serde(rename = "FeedbackFlag")]
    pub feedback: u8,
    #[serde(rename = "DifficultyLevel")]
    pub difficulty_level: u32,
    #[serde(rename = "R")]
    pub radius: f64,
    #[serde(rename = "W")]
    pub width: f64,
    #[serde(rename = "RepetitionIndex")]
    pub repetition_index: u32,
    #[serde(rename = "OrderInBlock")]
    pub order_in_block: u32,
    #[serde(rename = "MovementTime")]
    pub movement_time: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "PercentInTunnel")]
    pub percent_in_tunnel: f64,
    #[serde(rename = "MeanForce")]
    pub mean_force: f64,
    #[serde(rename = "SDForce")]
    pub sd_force: f64,
    #[serde(rename = "TimeoutFlag")]
    pub timeout: u8,
}

impl ScoreRow {
    pub fn new(participant: &str, spec: &TrialSpec, summary: &TrialSummary) -> Self {
        Self {
            id: participant.to_string(),
            block_label: spec.condition.label(),
            task: spec.task().code().to_string(),
            feedback: u8::from(spec.condition.feedback),
            difficulty_level: spec.level,
            radius: spec.geometry.radius,
            width: spec.geometry.width,
            repetition_index: spec.repetition,
            order_in_block: spec.order_in_block,
            movement_time: summary.movement_time,
            rmse: summary.rmse,
            percent_in_tunnel: summary.pct_in_tunnel,
            mean_force: summary.mean_force,
            sd_force: summary.sd_force,
            timeout: u8::from(summary.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, err: f64, inside: bool, p: f64) -> Sample {
        Sample {
            time_abs: 10.0 + t,
            time_rel: t,
            x: 0.0,
            y: 0.0,
            pressure_raw: p,
            thickness: 4.0,
            radial_error: err,
            in_tunnel: inside,
            angle: 0.0,
        }
    }

    #[test]
    fn empty_record_has_no_summary() {
        assert!(TrialRecord::new().summarize(false).is_none());
    }

    #[test]
    fn summary_matches_hand_computation() {
        let mut r = TrialRecord::new();
        r.push(sample(0.1, 3.0, true, 3000.0));
        r.push(sample(0.2, 4.0, true, 3400.0));
        r.push(sample(1.23456, 0.0, false, 3200.0));
        r.push(sample(1.5, 0.0, true, 3200.0));
        let s = r.summarize(true).unwrap();
        assert_eq!(s.movement_time, 1.5);
        // sqrt((9 + 16) / 4) = 2.5
        assert_eq!(s.rmse, 2.5);
        assert_eq!(s.pct_in_tunnel, 75.0);
        assert_eq!(s.mean_force, 3200.0);
        // pop std of [3000, 3400, 3200, 3200] = sqrt(20000) = 141.42..
        assert_eq!(s.sd_force, 141.4);
        assert!(s.timeout);
    }

    #[test]
    fn raw_rows_read_back_without_optional_columns() {
        let data = "ID,TimeAbs,TimeRel,X,Y,PressureRaw,TraceThickness\nP1,0.0,0.0,1,2,3,4\n";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let row: RawRow = rdr.deserialize().next().unwrap().unwrap();
        assert_eq!(row.id, "P1");
        assert!(row.marker().is_none());
        assert!(row.in_tunnel.is_none());
        assert_eq!(row.trace_thickness, 4.0);
    }

    #[test]
    fn in_tunnel_flag_accepts_legacy_spelling() {
        let data = "ID,TimeAbs,TimeRel,X,Y,PressureRaw,TraceThickness,InTunnelFlag\n\
                    P1,0,0,0,0,0,4,True\nP1,0,0,0,0,0,4,0\n";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<RawRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0].in_tunnel, Some(true));
        assert_eq!(rows[1].in_tunnel, Some(false));
    }
}
