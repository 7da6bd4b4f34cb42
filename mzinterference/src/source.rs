//! Traits for the spectrum and charge-hint data the scoring workflow consumes
use std::collections::BTreeMap;
use std::io;

use thiserror::Error;

use crate::peaks::ScanPeaks;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("An I/O error occurred: {0}")]
    Io(#[from] io::Error),
    #[error("Scan {0} was not found")]
    ScanNotFound(u32),
    #[error("Failed to read the signal arrays of scan {0}: {1}")]
    ArrayError(u32, String),
    #[error("Failed to open spectrum source: {0}")]
    OpenError(String),
}

/// The properties of a scan that are needed to describe the precursor it fragmented
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanMetadata {
    pub ms_level: u8,
    /// The m/z the instrument reported isolating
    pub parent_mz: Option<f64>,
    /// The full width of the isolation window
    pub isolation_width: Option<f64>,
    /// The precursor charge the instrument reported, if any
    pub charge_hint: Option<i32>,
    /// The ion injection time in milliseconds
    pub injection_time: Option<f64>,
}

impl ScanMetadata {
    pub fn new(
        ms_level: u8,
        parent_mz: Option<f64>,
        isolation_width: Option<f64>,
        charge_hint: Option<i32>,
        injection_time: Option<f64>,
    ) -> Self {
        Self {
            ms_level,
            parent_mz,
            isolation_width,
            charge_hint,
            injection_time,
        }
    }

    pub fn ms1() -> Self {
        Self {
            ms_level: 1,
            ..Default::default()
        }
    }
}

/// A run of scans that can be looked up by scan number
pub trait ScanSource {
    /// All scan numbers in the run, in acquisition order
    fn scan_numbers(&self) -> Vec<u32>;

    fn scan_metadata(&mut self, scan_number: u32) -> Result<ScanMetadata, SourceError>;

    /// The centroided peaks of a scan, sorted by m/z
    fn scan_peaks(&mut self, scan_number: u32) -> Result<ScanPeaks, SourceError>;
}

impl<T: ScanSource + ?Sized> ScanSource for Box<T> {
    fn scan_numbers(&self) -> Vec<u32> {
        (**self).scan_numbers()
    }

    fn scan_metadata(&mut self, scan_number: u32) -> Result<ScanMetadata, SourceError> {
        (**self).scan_metadata(scan_number)
    }

    fn scan_peaks(&mut self, scan_number: u32) -> Result<ScanPeaks, SourceError> {
        (**self).scan_peaks(scan_number)
    }
}

/// Supplies charge states for precursors whose scans do not report one
pub trait ChargeHintSource {
    fn charge_hint(&self, precursor_scan: u32, mz: f64) -> Option<i32>;
}

/// Holds the peaks of the most recently loaded scan so that consecutive precursors
/// selected from the same MS1 scan decode it only once.
#[derive(Debug, Default)]
pub struct ScanPeakCache {
    entry: Option<ScanPeaks>,
    hits: usize,
    misses: usize,
}

impl ScanPeakCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<S: ScanSource + ?Sized>(
        &mut self,
        source: &mut S,
        scan_number: u32,
    ) -> Result<&ScanPeaks, SourceError> {
        let cached = matches!(&self.entry, Some(peaks) if peaks.scan_number == scan_number);
        if cached {
            self.hits += 1;
        } else {
            self.misses += 1;
            let peaks = source.scan_peaks(scan_number)?;
            self.entry = Some(peaks);
        }
        self.entry
            .as_ref()
            .ok_or(SourceError::ScanNotFound(scan_number))
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

/// A [`ScanSource`] over scans held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryScanSource {
    scans: BTreeMap<u32, (ScanMetadata, ScanPeaks)>,
}

impl InMemoryScanSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scan(&mut self, scan_number: u32, metadata: ScanMetadata, mut peaks: ScanPeaks) {
        peaks.scan_number = scan_number;
        self.scans.insert(scan_number, (metadata, peaks));
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }
}

impl ScanSource for InMemoryScanSource {
    fn scan_numbers(&self) -> Vec<u32> {
        self.scans.keys().copied().collect()
    }

    fn scan_metadata(&mut self, scan_number: u32) -> Result<ScanMetadata, SourceError> {
        self.scans
            .get(&scan_number)
            .map(|(meta, _)| meta.clone())
            .ok_or(SourceError::ScanNotFound(scan_number))
    }

    fn scan_peaks(&mut self, scan_number: u32) -> Result<ScanPeaks, SourceError> {
        self.scans
            .get(&scan_number)
            .map(|(_, peaks)| peaks.clone())
            .ok_or(SourceError::ScanNotFound(scan_number))
    }
}
