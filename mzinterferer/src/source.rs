use std::collections::HashMap;
use std::fs;
use std::path::Path;

use mzdata::io::MZReaderType;
use mzdata::prelude::*;
use mzdata::spectrum::{MultiLayerSpectrum, SignalContinuity};
use mzpeaks::prelude::*;
use mzpeaks::{CentroidPeak, DeconvolutedPeak};
use tracing::{debug, info, warn};

use mzinterference::{ScanMetadata, ScanPeaks, ScanSource, SourceError};

pub type CPeak = CentroidPeak;
pub type DPeak = DeconvolutedPeak;
pub type SpectrumType = MultiLayerSpectrum<CPeak, DPeak>;
pub type SpectrumReader = MZReaderType<fs::File, CPeak, DPeak>;

/// Pull the scan number out of a native ID like `controllerType=0 controllerNumber=1 scan=42`
pub fn scan_number_from_id(id: &str) -> Option<u32> {
    id.split_ascii_whitespace()
        .find_map(|token| token.strip_prefix("scan="))
        .and_then(|value| value.parse().ok())
}

/// Describe the precursor a spectrum fragmented, if any
pub fn metadata_of(spectrum: &SpectrumType) -> ScanMetadata {
    let injection_time = spectrum
        .acquisition()
        .first_scan()
        .map(|event| event.injection_time as f64)
        .filter(|t| *t > 0.0);
    match spectrum.precursor() {
        Some(prec) => {
            let window = &prec.isolation_window;
            let isolation_width = (window.upper_bound - window.lower_bound) as f64;
            let ion = prec.ion();
            ScanMetadata::new(
                spectrum.ms_level(),
                ion.map(|ion| ion.mz),
                (isolation_width > 0.0).then_some(isolation_width),
                ion.and_then(|ion| ion.charge).filter(|z| *z != 0),
                injection_time,
            )
        }
        None => ScanMetadata::new(spectrum.ms_level(), None, None, None, injection_time),
    }
}

/// Copy the centroided signal of `spectrum` into a [`ScanPeaks`]
pub fn peaks_of(scan_number: u32, spectrum: &SpectrumType) -> Result<ScanPeaks, SourceError> {
    if let Some(peaks) = spectrum.peaks.as_ref() {
        let mzs: Vec<f64> = peaks.iter().map(|p| p.mz()).collect();
        let intensities: Vec<f32> = peaks.iter().map(|p| p.intensity()).collect();
        return Ok(ScanPeaks::from_arrays(scan_number, &mzs, &intensities));
    }
    match spectrum.arrays.as_ref() {
        Some(arrays) => {
            let mzs = arrays
                .mzs()
                .map_err(|e| SourceError::ArrayError(scan_number, e.to_string()))?;
            let intensities = arrays
                .intensities()
                .map_err(|e| SourceError::ArrayError(scan_number, e.to_string()))?;
            Ok(ScanPeaks::from_arrays(scan_number, &mzs, &intensities))
        }
        None => Ok(ScanPeaks::new(scan_number, Vec::new(), Vec::new())),
    }
}

/// A [`ScanSource`] over any file format `mzdata` can read with random access.
///
/// Metadata for every spectrum is read once when the source is opened. Signal arrays are
/// decoded only when a scan's peaks are requested.
pub struct MzDataScanSource {
    reader: SpectrumReader,
    scan_numbers: Vec<u32>,
    index_of: HashMap<u32, usize>,
    metadata: HashMap<u32, ScanMetadata>,
}

impl MzDataScanSource {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SourceError::OpenError(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let reader = SpectrumReader::open_path(path)?;
        info!("Reading scan metadata from {}", path.display());
        Ok(Self::from_reader(reader))
    }

    pub fn from_reader(mut reader: SpectrumReader) -> Self {
        let mut scan_numbers = Vec::new();
        let mut index_of = HashMap::new();
        let mut metadata = HashMap::new();
        let mut profile_scans = 0usize;

        for spectrum in reader.by_ref() {
            let index = spectrum.index();
            let scan_number = scan_number_from_id(spectrum.id()).unwrap_or(index as u32 + 1);
            if index_of.contains_key(&scan_number) {
                warn!(
                    "Scan number {scan_number} from {} was seen more than once, keeping the first",
                    spectrum.id()
                );
                continue;
            }
            if spectrum.signal_continuity() == SignalContinuity::Profile {
                profile_scans += 1;
            }
            scan_numbers.push(scan_number);
            index_of.insert(scan_number, index);
            metadata.insert(scan_number, metadata_of(&spectrum));
        }
        reader.reset();

        if profile_scans > 0 {
            warn!("{profile_scans} scans contain profile data, which will be treated as centroids");
        }
        debug!("Found {} scans", scan_numbers.len());
        Self {
            reader,
            scan_numbers,
            index_of,
            metadata,
        }
    }

    pub fn len(&self) -> usize {
        self.scan_numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scan_numbers.is_empty()
    }
}

impl ScanSource for MzDataScanSource {
    fn scan_numbers(&self) -> Vec<u32> {
        self.scan_numbers.clone()
    }

    fn scan_metadata(&mut self, scan_number: u32) -> Result<ScanMetadata, SourceError> {
        self.metadata
            .get(&scan_number)
            .cloned()
            .ok_or(SourceError::ScanNotFound(scan_number))
    }

    fn scan_peaks(&mut self, scan_number: u32) -> Result<ScanPeaks, SourceError> {
        let index = *self
            .index_of
            .get(&scan_number)
            .ok_or(SourceError::ScanNotFound(scan_number))?;
        let spectrum = self
            .reader
            .get_spectrum_by_index(index)
            .ok_or(SourceError::ScanNotFound(scan_number))?;
        peaks_of(scan_number, &spectrum)
    }
}
