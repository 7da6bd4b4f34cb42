//! Reading and writing the tab-delimited interference score table
use std::io::{self, Read, Write};

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::precursor::PrecursorDescriptor;

pub const SCORE_TABLE_HEADER: [&str; 9] = [
    "Dataset_ID",
    "ScanNumber",
    "PrecursorScan",
    "ParentMZ",
    "ChargeState",
    "IsoWidth",
    "Interference",
    "PreIntensity",
    "IonCollectionTime",
];

#[derive(Debug, Error)]
pub enum ScoreTableError {
    #[error("An I/O error occurred while writing scores: {0}")]
    Io(#[from] io::Error),
    #[error("A formatting error occurred in the score table: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to parse score table: {0}")]
    Parse(String),
}

/// Render `value` rounded to `digits` decimal places, with trailing zeros and any
/// dangling decimal point removed.
pub fn format_decimal(value: f64, digits: usize) -> String {
    let text = format!("{value:.digits$}");
    let text = if digits > 0 {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// One row of the score table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(rename = "Dataset_ID")]
    pub dataset_id: String,
    #[serde(rename = "ScanNumber")]
    pub scan_number: u32,
    #[serde(rename = "PrecursorScan")]
    pub precursor_scan: u32,
    #[serde(rename = "ParentMZ")]
    pub parent_mz: f64,
    #[serde(rename = "ChargeState")]
    pub charge: i32,
    #[serde(rename = "IsoWidth")]
    pub isolation_width: f64,
    #[serde(rename = "Interference")]
    pub interference: f64,
    #[serde(rename = "PreIntensity")]
    pub precursor_intensity: f64,
    #[serde(rename = "IonCollectionTime")]
    pub ion_collection_time: f64,
}

impl ScoreRecord {
    fn to_fields(&self) -> [String; 9] {
        [
            self.dataset_id.clone(),
            self.scan_number.to_string(),
            self.precursor_scan.to_string(),
            format_decimal(self.parent_mz, 5),
            self.charge.to_string(),
            format_decimal(self.isolation_width, 3),
            format_decimal(self.interference, 4),
            format_decimal(self.precursor_intensity, 2),
            format_decimal(self.ion_collection_time, 2),
        ]
    }

    pub fn from_descriptor(dataset_id: &str, descriptor: &PrecursorDescriptor) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            scan_number: descriptor.scan_number,
            precursor_scan: descriptor.precursor_scan_number.unwrap_or_default(),
            parent_mz: descriptor.isolation_mz(),
            charge: descriptor.charge(),
            isolation_width: descriptor.isolation_width(),
            interference: descriptor.interference,
            precursor_intensity: descriptor.precursor_intensity,
            ion_collection_time: descriptor.ion_collection_time,
        }
    }
}

/// Writes score table rows, with numeric columns rounded to their fixed precision
pub struct ScoreTableWriter<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl<W: Write> ScoreTableWriter<W> {
    /// Create a writer, emitting the header line first when `write_header` is set
    pub fn new(handle: W, write_header: bool) -> Result<Self, ScoreTableError> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(handle);
        if write_header {
            writer.write_record(SCORE_TABLE_HEADER)?;
        }
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &ScoreRecord) -> Result<(), ScoreTableError> {
        self.writer.write_record(record.to_fields())?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn write_precursors(
        &mut self,
        dataset_id: &str,
        descriptors: &[PrecursorDescriptor],
    ) -> Result<(), ScoreTableError> {
        for descriptor in descriptors {
            self.write_record(&ScoreRecord::from_descriptor(dataset_id, descriptor))?;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> Result<(), ScoreTableError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, ScoreTableError> {
        self.writer
            .into_inner()
            .map_err(|e| ScoreTableError::Io(io::Error::other(e.to_string())))
    }
}

/// Read a score table with a header line
pub fn read_score_table<R: Read>(reader: R) -> Result<Vec<ScoreRecord>, ScoreTableError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    if headers.iter().ne(SCORE_TABLE_HEADER.iter().copied()) {
        return Err(ScoreTableError::Parse(format!(
            "Unexpected header {:?}",
            headers.iter().collect::<Vec<_>>()
        )));
    }
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::precursor::ScoreStatus;

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(641.68, 5), "641.68");
        assert_eq!(format_decimal(2.0, 3), "2");
        assert_eq!(format_decimal(0.94982751, 4), "0.9498");
        assert_eq!(format_decimal(0.0, 4), "0");
        assert_eq!(format_decimal(1.0, 4), "1");
        assert_eq!(format_decimal(883178.0, 2), "883178");
        assert_eq!(format_decimal(12.345, 0), "12");
        assert_eq!(format_decimal(0.0, 0), "0");
        assert_eq!(format_decimal(-0.00001, 2), "0");
        assert_eq!(format_decimal(100.0, 0), "100");
    }

    fn descriptors() -> Vec<PrecursorDescriptor> {
        let mut a = PrecursorDescriptor::new(641.68, 2.0, 3)
            .with_scan_number(11)
            .with_precursor_scan_number(Some(10))
            .with_ion_collection_time(35.126);
        a.interference = 0.949827;
        a.precursor_intensity = 883178.0;
        a.actual_mz = Some(641.6791);
        a.status = ScoreStatus::Scored;
        let b = PrecursorDescriptor::new(583.660004, 1.6, 0)
            .with_scan_number(12)
            .with_precursor_scan_number(Some(10));
        vec![a, b]
    }

    #[test]
    fn test_write_table() {
        let mut writer = ScoreTableWriter::new(Vec::new(), true).unwrap();
        writer.write_precursors("1234", &descriptors()).unwrap();
        assert_eq!(writer.rows_written(), 2);
        let buf = writer.into_inner().unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Dataset_ID\tScanNumber\tPrecursorScan\tParentMZ\tChargeState\tIsoWidth\tInterference\tPreIntensity\tIonCollectionTime"
        );
        assert_eq!(lines[1], "1234\t11\t10\t641.68\t3\t2\t0.9498\t883178\t35.13");
        assert_eq!(lines[2], "1234\t12\t10\t583.66\t0\t1.6\t0\t0\t0");
    }

    #[test]
    fn test_round_trip() {
        let mut writer = ScoreTableWriter::new(Vec::new(), true).unwrap();
        let descs = descriptors();
        writer.write_precursors("1234", &descs).unwrap();
        let buf = writer.into_inner().unwrap();
        let records = read_score_table(buf.as_slice()).unwrap();
        assert_eq!(records.len(), 2);
        for (rec, desc) in records.iter().zip(descs.iter()) {
            assert_eq!(rec.scan_number, desc.scan_number);
            assert_eq!(rec.charge, desc.charge());
            assert!((rec.interference - desc.interference).abs() <= 5e-5);
            assert!((rec.parent_mz - desc.isolation_mz()).abs() <= 5e-6);
        }
    }

    #[test]
    fn test_read_bad_header() {
        let text = "ScanNumber\tInterference\n1\t0.5\n";
        assert!(matches!(
            read_score_table(text.as_bytes()),
            Err(ScoreTableError::Parse(_))
        ));
    }

    #[test]
    fn test_no_header_for_append() {
        let mut writer = ScoreTableWriter::new(Vec::new(), false).unwrap();
        writer.write_precursors("7", &descriptors()[..1]).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert!(text.starts_with("7\t11\t"));
        assert_eq!(text.lines().count(), 1);
    }
}
