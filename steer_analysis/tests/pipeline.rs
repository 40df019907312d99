use std::f64::consts::TAU;
use std::fs;
use std::path::Path;

use steer_analysis::metadata::UNKNOWN_GROUP;
use steer_analysis::pipeline::write_csv;
use steer_analysis::{
    FeatureRow, MetadataIndex, OutputLayout, PipelineCfg, discover_raw_files, run_batch,
};
use steer_config::ParticipantMeta;
use steer_core::RawRow;

/// `trials` laps of 120 samples each at 125 Hz; markers optional.
fn session(id: &str, trials: u32, markers: bool) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let mut t_abs = 0.0;
    for trial in 1..=trials {
        for i in 0..120 {
            let theta = TAU * f64::from(i) / 120.0;
            rows.push(RawRow {
                id: id.to_string(),
                block_label: markers.then(|| "VP_FB".to_string()),
                difficulty_level: markers.then_some(1),
                repetition_index: markers.then_some(1),
                order_in_block: markers.then_some(trial),
                time_abs: t_abs,
                time_rel: f64::from(i) * 0.008,
                x: 960.0 + 250.0 * theta.cos(),
                y: 540.0 + 250.0 * theta.sin(),
                pressure_raw: 3200.0,
                trace_thickness: 16.0,
                radial_error: Some(0.0),
                in_tunnel: Some(true),
                angle: Some(theta),
            });
            t_abs += 0.008;
        }
    }
    rows
}

fn write_session(dir: &Path, name: &str, rows: &[RawRow]) {
    write_csv(&dir.join(name), rows).unwrap();
}

#[test]
fn batch_cleans_segments_and_joins_metadata() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_session(input.path(), "p02_RAW.csv", &session(" p02 ", 3, false));
    write_session(input.path(), "P01_RAW.csv", &session("P01", 2, true));
    fs::write(input.path().join("P03_RAW.csv"), "ID,X\nP03,not-a-number\n").unwrap();
    fs::write(input.path().join("notes.txt"), "ignored").unwrap();

    let files = discover_raw_files(input.path()).unwrap();
    assert_eq!(files.len(), 3);

    let meta = MetadataIndex::new([ParticipantMeta {
        id: "P01".into(),
        group: "Novice".into(),
        proficiency_score: Some(12.0),
    }]);
    let cfg = PipelineCfg {
        workers: 2,
        ..PipelineCfg::default()
    };
    let layout = OutputLayout::under(out.path());
    let report = run_batch(&files, &layout, &cfg, &meta).unwrap();

    assert_eq!(report.files, 3);
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("P03_RAW.csv"));
    assert_eq!(report.trials, 5);

    // cleaned copies keep every row, named by normalized ID
    let clean = fs::read_to_string(layout.clean_dir.join("P02_CLEAN.csv")).unwrap();
    assert_eq!(clean.lines().count(), 1 + 3 * 120);
    assert!(layout.clean_dir.join("P01_CLEAN.csv").exists());

    let mut rdr = csv::Reader::from_path(report.features_path.unwrap()).unwrap();
    let rows: Vec<FeatureRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["P01", "P01", "P02", "P02", "P02"]);

    assert_eq!(rows[0].group, "Novice");
    assert_eq!(rows[0].proficiency_score, Some(12.0));
    assert_eq!(rows[0].condition, "VP_FB");
    assert_eq!(rows[1].trial_index, 2);

    assert_eq!(rows[2].group, UNKNOWN_GROUP);
    assert_eq!(rows[2].proficiency_score, None);
    assert_eq!(rows[2].condition, "VP");
    assert_eq!(
        rows[2..].iter().map(|r| r.trial_index).collect::<Vec<_>>(),
        [1, 2, 3]
    );

    for r in &rows {
        assert!((r.duration - 119.0 * 0.008).abs() < 1e-9);
        assert!(r.error_rate < 1.0, "error rate {}", r.error_rate);
        assert!(r.mean_velocity > 1000.0);
    }
}

#[test]
fn short_trials_are_skipped() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut rows = session("P09", 1, true);
    // a four-sample trial after the real one
    for (i, mut r) in session("P09", 1, true).into_iter().take(4).enumerate() {
        r.order_in_block = Some(2);
        r.time_abs = 10.0 + i as f64 * 0.008;
        rows.push(r);
    }
    write_session(input.path(), "P09_RAW.csv", &rows);

    let files = discover_raw_files(input.path()).unwrap();
    let report = run_batch(
        &files,
        &OutputLayout::under(out.path()),
        &PipelineCfg::default(),
        &MetadataIndex::default(),
    )
    .unwrap();
    assert_eq!(report.trials, 1);
    assert_eq!(report.skipped, 1);
}

#[test]
fn empty_stream_is_a_file_failure() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    fs::write(
        input.path().join("P05_RAW.csv"),
        "ID,BlockLabel,DifficultyLevel,RepetitionIndex,OrderInBlock,TimeAbs,TimeRel,X,Y,PressureRaw,TraceThickness,RadialError,InTunnelFlag,Angle\n",
    )
    .unwrap();
    let files = discover_raw_files(input.path()).unwrap();
    let layout = OutputLayout::under(out.path());
    let report = run_batch(&files, &layout, &PipelineCfg::default(), &MetadataIndex::default())
        .unwrap();
    assert_eq!(report.processed, 0);
    assert!(report.failed[0].1.contains("no samples"));
    assert!(report.features_path.is_none());
    assert!(!layout.features_path.exists());
}
