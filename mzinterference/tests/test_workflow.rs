use std::fs;

use mzinterference::isos::IsosChargeHints;
use mzinterference::report::{read_score_table, ScoreTableWriter};
use mzinterference::source::InMemoryScanSource;
use mzinterference::workflow::process_scans;
use mzinterference::{
    InterferenceEngine, ScanMetadata, ScanPeaks, ScanRange, ScanSource, ScoreStatus,
};

fn load_ms1() -> ScanPeaks {
    let text = fs::read_to_string("../test/data/ms1_scan_10444.tsv").unwrap();
    let mut mzs = Vec::new();
    let mut intensities = Vec::new();
    for line in text.lines().skip(1).filter(|l| !l.is_empty()) {
        let (mz, inten) = line.split_once('\t').unwrap();
        mzs.push(mz.parse().unwrap());
        intensities.push(inten.parse().unwrap());
    }
    ScanPeaks::new(10444, mzs, intensities)
}

fn make_run() -> InMemoryScanSource {
    let mut source = InMemoryScanSource::new();
    source.add_scan(10444, ScanMetadata::ms1(), load_ms1());
    let precursors = [
        (428.9168, Some(3)),
        (443.7350, None),
        (457.2725, Some(4)),
        (720.3926, None),
        (449.2640, None),
    ];
    for (i, (mz, charge)) in precursors.into_iter().enumerate() {
        source.add_scan(
            10445 + i as u32,
            ScanMetadata::new(2, Some(mz), Some(2.0), charge, Some(50.0)),
            ScanPeaks::default(),
        );
    }
    // No isolation width
    source.add_scan(
        10450,
        ScanMetadata::new(2, Some(500.0), None, None, None),
        ScanPeaks::default(),
    );
    source
}

#[test_log::test]
fn test_score_run() {
    let mut source = make_run();
    assert_eq!(source.scan_numbers().len(), 7);
    let engine = InterferenceEngine::default();
    let (descriptors, summary) =
        process_scans(&engine, &mut source, None, ScanRange::default()).unwrap();

    assert_eq!(summary.ms1_scans, 1);
    assert_eq!(summary.skipped_scans, 1);
    assert_eq!(summary.precursors, 5);
    assert_eq!(summary.charge_estimated, 3);
    assert_eq!(summary.scored, 5);

    let charges: Vec<i32> = descriptors.iter().map(|d| d.charge()).collect();
    assert_eq!(charges, vec![3, 2, 4, 1, 3]);
    for desc in descriptors.iter() {
        assert_eq!(desc.status, ScoreStatus::Scored);
        assert_eq!(desc.precursor_scan_number, Some(10444));
        assert!((0.0..=1.0).contains(&desc.interference));
        assert!(desc.actual_mz.is_some());
        assert!(desc.precursor_intensity > 0.0);
    }
}

#[test_log::test]
fn test_score_run_with_hints() {
    let mut source = make_run();
    let hints = IsosChargeHints::from_reader(
        "scan_num,charge,abundance,mz\n10444,2,1000,720.3927\n".as_bytes(),
    )
    .unwrap();
    let engine = InterferenceEngine::default();
    let (descriptors, summary) =
        process_scans(&engine, &mut source, Some(&hints), ScanRange::new(10444, 10448)).unwrap();
    assert_eq!(summary.precursors, 4);
    // Taken from the hints, not estimated
    assert_eq!(descriptors[3].charge(), 2);
    assert_eq!(summary.charge_estimated, 1);
}

#[test]
fn test_write_and_read_scores() {
    let mut source = make_run();
    let engine = InterferenceEngine::default();
    let (descriptors, _) =
        process_scans(&engine, &mut source, None, ScanRange::default()).unwrap();

    let mut writer = ScoreTableWriter::new(Vec::new(), true).unwrap();
    writer.write_precursors("QC_Shew", &descriptors).unwrap();
    let buffer = writer.into_inner().unwrap();
    let records = read_score_table(buffer.as_slice()).unwrap();

    assert_eq!(records.len(), descriptors.len());
    for (record, desc) in records.iter().zip(descriptors.iter()) {
        assert_eq!(record.dataset_id, "QC_Shew");
        assert_eq!(record.scan_number, desc.scan_number);
        assert_eq!(record.precursor_scan, 10444);
        assert_eq!(record.charge, desc.charge());
        assert!((record.interference - desc.interference).abs() <= 5e-5);
        assert_eq!(record.ion_collection_time, 50.0);
    }
}
