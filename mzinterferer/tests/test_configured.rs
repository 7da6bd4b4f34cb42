use std::path::PathBuf;

use figment::{
    providers::{Format, Toml},
    Figment,
};

use mzinterferer::{ArgChargeRange, MZInterferer, MZInterfererError};
use mzinterference::ScanRange;

const CONFIG: &str = r#"
input_files = ["../test/data/does_not_exist.mzML"]
output_file = "-"
threads = 1
scan_range = "100-200"
charge_range = "2-5"
precursor_tolerance = 10.0
"#;

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_configured_missing_input() {
    let config = Figment::new().merge(Toml::string(CONFIG));
    let driver: MZInterferer = config.extract().unwrap();
    assert_eq!(
        driver.input_files,
        vec![PathBuf::from("../test/data/does_not_exist.mzML")]
    );
    assert_eq!(driver.scan_range, Some(ScanRange::new(100, 200)));
    assert_eq!(driver.charge_range, ArgChargeRange(2, 5));
    // Unset values keep their defaults
    assert_eq!(driver.charge_tolerance, 0.01);
    assert_eq!(driver.isotopes_to_check, 2);

    let params = driver.interference_params();
    assert_eq!(params.charge_range, (2, 5));
    assert_eq!(params.precursor_tolerance_ppm, 10.0);

    match driver.main() {
        Err(MZInterfererError::DatasetsFailed(1, 1)) => {}
        other => panic!("Expected the dataset to fail, got {other:?}"),
    }
}

#[test_log::test]
fn test_configured_score_file() {
    let config = Figment::new().merge(Toml::string(
        r#"
input_files = ["../test/data/small_interference.mzML"]
threads = 1
"#,
    ));
    let driver: MZInterferer = config.extract().unwrap();
    let engine = mzinterference::InterferenceEngine::new(driver.interference_params());
    let scores = driver
        .process_dataset(&engine, 0, &driver.input_files[0])
        .unwrap();
    assert_eq!(scores.dataset_id, "small_interference");
    assert_eq!(scores.summary.ms1_scans, 1);
    assert_eq!(scores.summary.precursors, 3);
    let charges: Vec<i32> = scores.descriptors.iter().map(|d| d.charge()).collect();
    assert_eq!(charges, vec![3, 2, 3]);
    for desc in scores.descriptors.iter() {
        assert_eq!(desc.precursor_scan_number, Some(10444));
        assert_eq!(desc.isolation_width(), 2.0);
        assert!(desc.status.is_scored());
    }
}
