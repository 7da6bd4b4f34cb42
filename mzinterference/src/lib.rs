//! Estimate how much of the signal isolated for fragmentation in a tandem mass spectrum
//! belongs to the intended precursor ion.
//!
//! The [`InterferenceEngine`] takes a [`PrecursorDescriptor`] and the centroided peaks of the
//! scan the precursor was selected from, estimates the precursor's charge if it is unknown, and
//! reports the fraction of isolation window intensity that falls on the precursor's isotopic
//! series.
pub mod charge;
pub mod isotopic;
pub mod peaks;
pub mod precursor;
pub mod api;

pub mod isos;
pub mod report;
pub mod scan_range;
pub mod source;
pub mod workflow;

pub use api::{InterferenceEngine, InterferenceError, InterferenceParams};
pub use charge::{ChargeRange, ChargeStateEstimator};
pub use peaks::ScanPeaks;
pub use precursor::{PrecursorDescriptor, ScoreStatus};
pub use scan_range::ScanRange;
pub use source::{ChargeHintSource, ScanMetadata, ScanSource, SourceError};
pub use isos::{ChargeHintError, IsosChargeHints};
pub use report::{ScoreTableError, ScoreTableWriter};
pub use workflow::{process_scans, ScoringSummary, WorkflowError};
