//! Walking a run of scans, describing each fragmented precursor and scoring it
use std::ops::{Add, AddAssign};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{InterferenceEngine, InterferenceError};
use crate::precursor::{PrecursorDescriptor, ScoreStatus};
use crate::scan_range::ScanRange;
use crate::source::{ChargeHintSource, ScanPeakCache, ScanSource, SourceError};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    SourceError(#[from] SourceError),
    #[error("Failed to score scan {0}: {1}")]
    InterferenceError(u32, InterferenceError),
}

/// Counts of what happened while processing a run
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ScoringSummary {
    pub ms1_scans: usize,
    pub msn_scans: usize,
    pub skipped_scans: usize,
    pub precursors: usize,
    pub scored: usize,
    pub charge_estimated: usize,
    pub unscorable: usize,
}

impl Add for ScoringSummary {
    type Output = ScoringSummary;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for ScoringSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.ms1_scans += rhs.ms1_scans;
        self.msn_scans += rhs.msn_scans;
        self.skipped_scans += rhs.skipped_scans;
        self.precursors += rhs.precursors;
        self.scored += rhs.scored;
        self.charge_estimated += rhs.charge_estimated;
        self.unscorable += rhs.unscorable;
    }
}

impl ScoringSummary {
    pub fn log(&self, dataset_id: &str) {
        info!(
            "{dataset_id}: MS1 Scans: {} | MSn Scans: {} | Skipped: {}",
            self.ms1_scans, self.msn_scans, self.skipped_scans
        );
        info!(
            "{dataset_id}: Precursors: {} | Scored: {} | Charge Estimated: {} | Unscorable: {}",
            self.precursors, self.scored, self.charge_estimated, self.unscorable
        );
    }
}

/// Describe every fragmented precursor in `scan_range`.
///
/// MS1 scans become the current precursor scan for the MSn scans that follow. A precursor's
/// charge comes from its scan's metadata, then from `hints` looked up in its precursor scan,
/// and is otherwise left unknown. Scans without a parent m/z or isolation width are skipped.
pub fn collect_precursors<S: ScanSource + ?Sized>(
    source: &mut S,
    hints: Option<&dyn ChargeHintSource>,
    scan_range: ScanRange,
) -> Result<(Vec<PrecursorDescriptor>, ScoringSummary), SourceError> {
    let scan_numbers: Vec<u32> = source
        .scan_numbers()
        .into_iter()
        .filter(|n| scan_range.contains(*n))
        .collect();

    let mut summary = ScoringSummary::default();
    let mut descriptors = Vec::new();
    let mut current_precursor_scan: Option<u32> = None;

    let n = scan_numbers.len();
    let mut progress_threshold = 0.05;

    for (i, scan_number) in scan_numbers.into_iter().enumerate() {
        if n > 1 && i as f64 / (n - 1) as f64 >= progress_threshold {
            info!("{:.0}% of scans read", progress_threshold * 100.0);
            while i as f64 / (n - 1) as f64 >= progress_threshold {
                progress_threshold += 0.05;
            }
        }

        let meta = source.scan_metadata(scan_number)?;
        if meta.ms_level <= 1 {
            summary.ms1_scans += 1;
            current_precursor_scan = Some(scan_number);
            continue;
        }
        summary.msn_scans += 1;

        let Some(parent_mz) = meta.parent_mz else {
            warn!("Skipping scan {scan_number} since it does not report a precursor m/z");
            summary.skipped_scans += 1;
            continue;
        };
        let Some(isolation_width) = meta.isolation_width else {
            warn!("Skipping scan {scan_number} since it does not report an isolation width");
            summary.skipped_scans += 1;
            continue;
        };

        let mut charge = meta.charge_hint.filter(|z| *z > 0).unwrap_or_default();
        if charge == 0 {
            if let (Some(hints), Some(prec)) = (hints, current_precursor_scan) {
                if let Some(z) = hints.charge_hint(prec, parent_mz) {
                    debug!("Charge {z} for scan {scan_number} taken from charge hints");
                    charge = z;
                }
            }
        }

        let descriptor = PrecursorDescriptor::new(parent_mz, isolation_width, charge)
            .with_scan_number(scan_number)
            .with_precursor_scan_number(current_precursor_scan)
            .with_ion_collection_time(meta.injection_time.unwrap_or_default());
        descriptors.push(descriptor);
    }
    summary.precursors = descriptors.len();
    Ok((descriptors, summary))
}

/// Score each descriptor against the peaks of its precursor scan.
///
/// Descriptors with no precursor scan are scored against an empty spectrum, which leaves
/// them unscorable.
pub fn score_precursors<S: ScanSource + ?Sized>(
    engine: &InterferenceEngine,
    source: &mut S,
    descriptors: &mut [PrecursorDescriptor],
) -> Result<ScoringSummary, WorkflowError> {
    let mut summary = ScoringSummary::default();
    let mut cache = ScanPeakCache::new();
    for descriptor in descriptors.iter_mut() {
        let had_charge = descriptor.has_charge();
        let status = match descriptor.precursor_scan_number {
            Some(prec) => {
                let peaks = cache.get_or_load(source, prec)?;
                engine
                    .compute_interference_from_arrays(
                        descriptor,
                        &peaks.mz_array,
                        &peaks.intensity_array,
                    )
                    .map_err(|e| WorkflowError::InterferenceError(descriptor.scan_number, e))?
            }
            None => {
                debug!("{descriptor} has no precursor scan");
                engine
                    .compute_interference_from_arrays(descriptor, &[], &[])
                    .map_err(|e| WorkflowError::InterferenceError(descriptor.scan_number, e))?
            }
        };
        if !had_charge && descriptor.has_charge() {
            summary.charge_estimated += 1;
        }
        match status {
            ScoreStatus::Scored => summary.scored += 1,
            _ => summary.unscorable += 1,
        }
    }
    debug!(
        "Peak cache hits: {}, misses: {}",
        cache.hits(),
        cache.misses()
    );
    Ok(summary)
}

/// Collect and score all precursors of a run
pub fn process_scans<S: ScanSource + ?Sized>(
    engine: &InterferenceEngine,
    source: &mut S,
    hints: Option<&dyn ChargeHintSource>,
    scan_range: ScanRange,
) -> Result<(Vec<PrecursorDescriptor>, ScoringSummary), WorkflowError> {
    let (mut descriptors, mut summary) = collect_precursors(source, hints, scan_range)?;
    summary += score_precursors(engine, source, &mut descriptors)?;
    Ok((descriptors, summary))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isotopic::NEUTRON_SHIFT;
    use crate::peaks::ScanPeaks;
    use crate::source::{InMemoryScanSource, ScanMetadata};

    struct FixedHint(i32);

    impl ChargeHintSource for FixedHint {
        fn charge_hint(&self, _precursor_scan: u32, _mz: f64) -> Option<i32> {
            Some(self.0)
        }
    }

    fn make_source() -> InMemoryScanSource {
        let mut source = InMemoryScanSource::new();
        let shift = NEUTRON_SHIFT / 2.0;
        source.add_scan(
            1,
            ScanMetadata::ms1(),
            ScanPeaks::new(
                0,
                vec![499.2, 500.0 - shift, 500.0, 500.0 + shift, 500.0 + 2.0 * shift],
                vec![1e5, 3e5, 1e6, 7e5, 2e5],
            ),
        );
        source.add_scan(2, ScanMetadata::new(2, Some(500.0), Some(2.0), Some(2), Some(12.5)), ScanPeaks::default());
        source.add_scan(3, ScanMetadata::new(2, Some(500.0), Some(2.0), None, None), ScanPeaks::default());
        source.add_scan(4, ScanMetadata::new(2, Some(500.0), None, None, None), ScanPeaks::default());
        source.add_scan(5, ScanMetadata::new(2, None, Some(2.0), None, None), ScanPeaks::default());
        source
    }

    #[test_log::test]
    fn test_collect_precursors() {
        let mut source = make_source();
        let (descs, summary) = collect_precursors(&mut source, None, ScanRange::default()).unwrap();
        assert_eq!(descs.len(), 2);
        assert_eq!(summary.ms1_scans, 1);
        assert_eq!(summary.msn_scans, 4);
        assert_eq!(summary.skipped_scans, 2);
        assert_eq!(descs[0].charge(), 2);
        assert_eq!(descs[0].ion_collection_time, 12.5);
        assert_eq!(descs[0].precursor_scan_number, Some(1));
        assert_eq!(descs[1].charge(), 0);

        let hint = FixedHint(3);
        let (descs, _) = collect_precursors(&mut source, Some(&hint), ScanRange::new(1, 3)).unwrap();
        assert_eq!(descs.len(), 2);
        // The hint is only consulted when the scan has no charge of its own
        assert_eq!(descs[0].charge(), 2);
        assert_eq!(descs[1].charge(), 3);

        // The range started after the MS1 scan, so there is nowhere to look up a hint
        let (descs, _) = collect_precursors(&mut source, Some(&hint), ScanRange::new(2, 3)).unwrap();
        assert_eq!(descs[1].precursor_scan_number, None);
        assert_eq!(descs[1].charge(), 0);
    }

    #[test_log::test]
    fn test_process_scans() {
        let mut source = make_source();
        let engine = InterferenceEngine::default();
        let (descs, summary) =
            process_scans(&engine, &mut source, None, ScanRange::default()).unwrap();
        assert_eq!(summary.precursors, 2);
        assert_eq!(summary.scored, 2);
        assert_eq!(summary.charge_estimated, 1);
        assert_eq!(summary.unscorable, 0);
        let expected = (3e5 + 1e6 + 7e5) / (1e5 + 3e5 + 1e6 + 7e5);
        for desc in descs.iter() {
            assert_eq!(desc.charge(), 2);
            assert!((desc.interference - expected).abs() < 1e-9, "{}", desc.interference);
        }
    }

    #[test_log::test]
    fn test_missing_precursor_scan() {
        let mut source = make_source();
        let engine = InterferenceEngine::default();
        let (descs, summary) =
            process_scans(&engine, &mut source, None, ScanRange::new(2, 5)).unwrap();
        assert_eq!(summary.ms1_scans, 0);
        assert_eq!(summary.unscorable, 2);
        assert_eq!(descs[0].status, ScoreStatus::NoPeaksInWindow);
        assert_eq!(descs[1].status, ScoreStatus::ChargeUndetermined);
    }

    #[test]
    fn test_summary_add() {
        let a = ScoringSummary {
            precursors: 2,
            scored: 1,
            ..Default::default()
        };
        let b = ScoringSummary {
            precursors: 3,
            unscorable: 1,
            ..Default::default()
        };
        let c = a + b;
        assert_eq!(c.precursors, 5);
        assert_eq!(c.scored, 1);
        assert_eq!(c.unscorable, 1);
    }
}
