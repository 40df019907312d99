//! Round trip through the on-disk RAW file as the analysis side reads it.

use std::fs::File;

use steer_core::{
    Condition, CsvTrialSink, RawRow, Sample, TrialRecord, TrialSink, TrialSpec, TunnelGeometry,
};

#[test]
fn raw_rows_read_back_with_markers_and_flags() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvTrialSink::new(dir.path(), "P07");
    let spec = TrialSpec {
        condition: Condition::ALL[0],
        geometry: TunnelGeometry::new(250.0, 50.0),
        level: 3,
        repetition: 1,
        order_in_block: 4,
    };
    let mut record = TrialRecord::new();
    for (i, inside) in [true, false, true].into_iter().enumerate() {
        record.push(Sample {
            time_abs: 10.0 + i as f64 * 0.008,
            time_rel: i as f64 * 0.008,
            x: 960.0,
            y: 790.0 + i as f64,
            pressure_raw: 2000.0,
            thickness: 13.8,
            radial_error: i as f64,
            in_tunnel: inside,
            angle: 1.5,
        });
    }
    let summary = record.summarize(false).unwrap();
    sink.persist(&spec, &record, &summary).unwrap();

    let mut rdr = csv::Reader::from_reader(File::open(sink.raw_path()).unwrap());
    let rows: Vec<RawRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].marker(), Some(("VP_FB", 4)));
    let flags: Vec<Option<bool>> = rows.iter().map(|r| r.in_tunnel).collect();
    assert_eq!(flags, [Some(true), Some(false), Some(true)]);
    assert_eq!(summary.pct_in_tunnel, 66.7);
}
