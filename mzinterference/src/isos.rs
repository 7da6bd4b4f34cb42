//! Reading charge states from DeconTools `_isos.csv` feature tables
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::debug;

use crate::source::ChargeHintSource;

/// The m/z distance within which an isotopic feature is taken to be the precursor
pub const ISOS_MZ_TOLERANCE: f64 = 0.005;

#[derive(Debug, Error)]
pub enum ChargeHintError {
    #[error("An I/O error occurred while reading charge hints: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse charge hint table: {0}")]
    Csv(#[from] csv::Error),
    #[error("Isos file does not have column: {0}")]
    MissingColumn(String),
}

/// One deisotoped feature from the table
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct IsosEntry {
    pub scan_number: u32,
    pub mz: f64,
    pub charge: i32,
    pub abundance: f64,
}

/// Charge states of features detected in MS1 scans, grouped by scan number
#[derive(Debug, Default, Clone)]
pub struct IsosChargeHints {
    scans: HashMap<u32, Vec<IsosEntry>>,
}

const REQUIRED_COLUMNS: [&str; 4] = ["abundance", "mz", "scan_num", "charge"];

fn parse_or_zero<T: std::str::FromStr + Default>(value: Option<&str>) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

impl IsosChargeHints {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChargeHintError> {
        let handle = fs::File::open(path.as_ref())?;
        let hints = Self::from_reader(handle)?;
        debug!(
            "Loaded {} features across {} scans from {}",
            hints.len(),
            hints.scans.len(),
            path.as_ref().display()
        );
        Ok(hints)
    }

    /// Read a comma or tab separated table. The delimiter is chosen by looking for a tab
    /// in the header line.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ChargeHintError> {
        let mut buffered = BufReader::new(reader);
        let delimiter = {
            let buf = buffered.fill_buf()?;
            let header_end = buf.iter().position(|b| *b == b'\n').unwrap_or(buf.len());
            if buf[..header_end].contains(&b'\t') {
                b'\t'
            } else {
                b','
            }
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(buffered);

        let headers = reader.headers()?.clone();
        let mut column_indices = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            column_indices
                .entry(header.trim().to_lowercase())
                .or_insert(i);
        }

        let mut indices = [0usize; 4];
        for (slot, name) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = *column_indices
                .get(name)
                .ok_or_else(|| ChargeHintError::MissingColumn(name.to_string()))?;
        }
        let [abundance_idx, mz_idx, scan_idx, charge_idx] = indices;

        let mut hints = Self::default();
        for record in reader.records() {
            let record = record?;
            let entry = IsosEntry {
                scan_number: parse_or_zero(record.get(scan_idx)),
                mz: parse_or_zero(record.get(mz_idx)),
                charge: parse_or_zero(record.get(charge_idx)),
                abundance: parse_or_zero(record.get(abundance_idx)),
            };
            hints.push(entry);
        }
        Ok(hints)
    }

    pub fn push(&mut self, entry: IsosEntry) {
        self.scans.entry(entry.scan_number).or_default().push(entry);
    }

    pub fn len(&self) -> usize {
        self.scans.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    pub fn has_scan(&self, scan_number: u32) -> bool {
        self.scans.contains_key(&scan_number)
    }

    /// The first feature in `scan_number` within [`ISOS_MZ_TOLERANCE`] of `mz`
    pub fn find(&self, scan_number: u32, mz: f64) -> Option<&IsosEntry> {
        self.scans.get(&scan_number)?.iter().find(|entry| {
            entry.mz > mz - ISOS_MZ_TOLERANCE && entry.mz < mz + ISOS_MZ_TOLERANCE
        })
    }
}

impl FromIterator<IsosEntry> for IsosChargeHints {
    fn from_iter<T: IntoIterator<Item = IsosEntry>>(iter: T) -> Self {
        let mut this = Self::default();
        for entry in iter {
            this.push(entry);
        }
        this
    }
}

impl ChargeHintSource for IsosChargeHints {
    fn charge_hint(&self, precursor_scan: u32, mz: f64) -> Option<i32> {
        self.find(precursor_scan, mz)
            .map(|entry| entry.charge)
            .filter(|charge| *charge != 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ISOS: &str = "\
scan_num,charge,abundance,mz,fit,average_mw
10,2,150000,500.2500,0.01,998.48
10,3,90000,500.2530,0.02,1497.7
10,0,1000,612.1000,0.2,611.1
12,1,5000,400.1000,0.03,399.09
12,x,5000,401.1000,0.03,400.09
";

    #[test]
    fn test_read_comma() {
        let hints = IsosChargeHints::from_reader(ISOS.as_bytes()).unwrap();
        assert_eq!(hints.len(), 5);
        assert!(hints.has_scan(10));
        assert!(!hints.has_scan(11));

        // First row wins when several are within tolerance
        assert_eq!(hints.charge_hint(10, 500.252), Some(2));
        assert_eq!(hints.charge_hint(10, 500.256), Some(3));
        assert_eq!(hints.charge_hint(10, 500.244), None);
        // Zero charge means no hint
        assert_eq!(hints.charge_hint(10, 612.1), None);
        assert_eq!(hints.charge_hint(12, 400.1), Some(1));
        // Unparsable charge becomes zero
        assert_eq!(hints.find(12, 401.1).unwrap().charge, 0);
        assert_eq!(hints.charge_hint(13, 400.1), None);
    }

    #[test]
    fn test_read_tab_mixed_case() {
        let text = "Scan_Num\tMZ\tCharge\tAbundance\n5\t700.5\t4\t100\n";
        let hints = IsosChargeHints::from_reader(text.as_bytes()).unwrap();
        assert_eq!(hints.charge_hint(5, 700.5), Some(4));
    }

    #[test]
    fn test_missing_column() {
        let text = "scan_num,mz,abundance\n1,500.0,100\n";
        let err = IsosChargeHints::from_reader(text.as_bytes()).unwrap_err();
        match err {
            ChargeHintError::MissingColumn(name) => assert_eq!(name, "charge"),
            other => panic!("Unexpected error {other}"),
        }
    }

    #[test]
    fn test_open_missing_file() {
        let err = IsosChargeHints::open("../test/data/does_not_exist_isos.csv").unwrap_err();
        assert!(matches!(err, ChargeHintError::Io(_)));
    }
}
