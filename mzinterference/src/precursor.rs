//! The precursor ion record that interference scores are written to
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How far scoring got for a [`PrecursorDescriptor`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreStatus {
    /// The precursor has not been scored yet
    #[default]
    Unscored,
    /// An interference score was computed
    Scored,
    /// No charge state was supplied and none could be estimated
    ChargeUndetermined,
    /// The isolation window contained no signal
    NoPeaksInWindow,
}

impl ScoreStatus {
    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored)
    }
}

impl Display for ScoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ScoreStatus::Unscored => "unscored",
            ScoreStatus::Scored => "scored",
            ScoreStatus::ChargeUndetermined => "charge undetermined",
            ScoreStatus::NoPeaksInWindow => "no peaks in window",
        };
        f.write_str(label)
    }
}

/// An isolated precursor ion and the interference measured for it.
///
/// A `charge` of zero or less means the charge state is unknown and should be estimated
/// before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecursorDescriptor {
    /// The MSn scan that fragmented this precursor
    pub scan_number: u32,
    /// The MS1 scan the precursor was selected from
    pub precursor_scan_number: Option<u32>,
    isolation_mz: f64,
    isolation_width: f64,
    charge: i32,
    /// The observed peak closest to the isolation m/z
    pub actual_mz: Option<f64>,
    /// The fraction of isolation window signal explained by the precursor's isotopic peaks
    pub interference: f64,
    pub precursor_intensity: f64,
    /// The ion injection time in milliseconds
    pub ion_collection_time: f64,
    pub status: ScoreStatus,
}

impl PrecursorDescriptor {
    pub fn new(isolation_mz: f64, isolation_width: f64, charge: i32) -> Self {
        Self {
            scan_number: 0,
            precursor_scan_number: None,
            isolation_mz,
            isolation_width,
            charge,
            actual_mz: None,
            interference: 0.0,
            precursor_intensity: 0.0,
            ion_collection_time: 0.0,
            status: ScoreStatus::Unscored,
        }
    }

    pub fn with_scan_number(mut self, scan_number: u32) -> Self {
        self.scan_number = scan_number;
        self
    }

    pub fn with_precursor_scan_number(mut self, precursor_scan_number: Option<u32>) -> Self {
        self.precursor_scan_number = precursor_scan_number;
        self
    }

    pub fn with_ion_collection_time(mut self, ion_collection_time: f64) -> Self {
        self.ion_collection_time = ion_collection_time;
        self
    }

    pub fn isolation_mz(&self) -> f64 {
        self.isolation_mz
    }

    pub fn isolation_width(&self) -> f64 {
        self.isolation_width
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn has_charge(&self) -> bool {
        self.charge > 0
    }

    pub fn update_charge(&mut self, charge: i32) {
        self.charge = charge;
    }

    /// The bounds of the isolation window, exclusive at both ends
    pub fn isolation_window(&self) -> (f64, f64) {
        let half = self.isolation_width / 2.0;
        (self.isolation_mz - half, self.isolation_mz + half)
    }

    /// Clear any previous result so the descriptor can be scored again
    pub fn reset_score(&mut self) {
        self.actual_mz = None;
        self.interference = 0.0;
        self.precursor_intensity = 0.0;
        self.status = ScoreStatus::Unscored;
    }
}

impl Display for PrecursorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MS2 scan {} @ {:.2} m/z, charge {}",
            self.scan_number, self.isolation_mz, self.charge
        )?;
        if let Some(prec) = self.precursor_scan_number {
            write!(f, ", precursor scan {prec}")?;
        }
        Ok(())
    }
}
