//! Splitting a participant stream into trials.
//!
//! When every row carries the `(BlockLabel, OrderInBlock)` marker, a trial is
//! a maximal run of rows with the same marker. Otherwise a trial starts at
//! the first row and wherever relative time drops by more than the boundary
//! threshold; an unchanged or slightly decreasing time does not split.

use std::ops::Range;

use steer_core::RawRow;

/// How a stream was split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segmentation {
    Markers,
    TimeReset,
}

/// Disjoint, ordered index ranges covering `rows`.
pub fn segment(rows: &[RawRow], boundary_drop_s: f64) -> (Segmentation, Vec<Range<usize>>) {
    if !rows.is_empty() && rows.iter().all(|r| r.marker().is_some()) {
        let cuts = split_where(rows.len(), |i| rows[i].marker() != rows[i - 1].marker());
        (Segmentation::Markers, cuts)
    } else {
        let cuts = split_where(rows.len(), |i| {
            rows[i].time_rel - rows[i - 1].time_rel < -boundary_drop_s
        });
        (Segmentation::TimeReset, cuts)
    }
}

/// Ranges over `0..n` starting a new one at every `i >= 1` where `is_cut(i)`.
fn split_where(n: usize, is_cut: impl Fn(usize) -> bool) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    if n == 0 {
        return out;
    }
    let mut start = 0;
    for i in 1..n {
        if is_cut(i) {
            out.push(start..i);
            start = i;
        }
    }
    out.push(start..n);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(marker: Option<(&str, u32)>, time_rel: f64) -> RawRow {
        RawRow {
            id: "P1".into(),
            block_label: marker.map(|m| m.0.to_string()),
            difficulty_level: Some(1),
            repetition_index: Some(1),
            order_in_block: marker.map(|m| m.1),
            time_abs: 0.0,
            time_rel,
            x: 0.0,
            y: 0.0,
            pressure_raw: 0.0,
            trace_thickness: 4.0,
            radial_error: None,
            in_tunnel: None,
            angle: None,
        }
    }

    #[test]
    fn markers_split_on_every_change() {
        let rows = vec![
            row(Some(("VP_FB", 1)), 0.0),
            row(Some(("VP_FB", 1)), 0.1),
            row(Some(("VP_FB", 2)), 0.0),
            row(Some(("FVP_FB", 2)), 0.0),
            row(Some(("FVP_FB", 2)), 0.1),
            row(Some(("VP_FB", 1)), 0.0),
        ];
        let (kind, segs) = segment(&rows, 0.5);
        assert_eq!(kind, Segmentation::Markers);
        assert_eq!(segs, vec![0..2, 2..3, 3..5, 5..6]);
    }

    #[test]
    fn time_reset_fallback() {
        let rows = vec![
            row(None, 0.0),
            row(None, 0.5),
            row(None, 1.0),
            row(None, 0.2), // drop of 0.8
            row(None, 0.2), // exact zero delta
            row(None, 0.0), // drop of 0.2 only
            row(None, 3.0),
            row(None, 2.4), // drop of 0.6
        ];
        let (kind, segs) = segment(&rows, 0.5);
        assert_eq!(kind, Segmentation::TimeReset);
        assert_eq!(segs, vec![0..3, 3..7, 7..8]);
    }

    #[test]
    fn one_unmarked_row_forces_fallback() {
        let rows = vec![row(Some(("VP_FB", 1)), 0.0), row(None, 0.1)];
        let (kind, segs) = segment(&rows, 0.5);
        assert_eq!(kind, Segmentation::TimeReset);
        assert_eq!(segs, vec![0..2]);
    }

    #[test]
    fn empty_stream_has_no_segments() {
        assert!(segment(&[], 0.5).1.is_empty());
    }
}
