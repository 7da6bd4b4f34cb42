//! High level APIs for scoring precursor interference
use mzpeaks::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::charge::{ChargeRange, ChargeStateEstimator, DEFAULT_CHARGE_RANGE};
use crate::isotopic::isotopic_offset_error;
use crate::peaks::{
    approximate_binary_search, closest_peak, peaks_from_arrays, peaks_in_window,
    DEFAULT_SEARCH_TOLERANCE,
};
use crate::precursor::{PrecursorDescriptor, ScoreStatus};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterferenceError {
    #[error("The m/z array has {mz_len} points but the intensity array has {intensity_len}")]
    ArrayLengthMismatch { mz_len: usize, intensity_len: usize },
}

/// The tunable parameters of [`InterferenceEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterferenceParams {
    /// The absolute m/z tolerance for matching isotopic peaks while estimating charge
    pub charge_tolerance: f64,
    /// The mass error tolerance, in PPM, for a peak to count as part of the precursor's
    /// isotopic series
    pub precursor_tolerance_ppm: f64,
    /// The number of isotopic peaks on each side of the isolation m/z to check when
    /// estimating charge
    pub isotopes_to_check: usize,
    /// The range of charge states to consider when estimating charge
    pub charge_range: ChargeRange,
    /// The absolute m/z tolerance of the binary search used to slice peak arrays
    pub search_tolerance: f64,
}

impl Default for InterferenceParams {
    fn default() -> Self {
        Self {
            charge_tolerance: 0.01,
            precursor_tolerance_ppm: 15.0,
            isotopes_to_check: 2,
            charge_range: DEFAULT_CHARGE_RANGE,
            search_tolerance: DEFAULT_SEARCH_TOLERANCE,
        }
    }
}

impl InterferenceParams {
    pub fn new(
        charge_tolerance: f64,
        precursor_tolerance_ppm: f64,
        isotopes_to_check: usize,
        charge_range: ChargeRange,
        search_tolerance: f64,
    ) -> Self {
        Self {
            charge_tolerance,
            precursor_tolerance_ppm,
            isotopes_to_check,
            charge_range,
            search_tolerance,
        }
    }

    pub fn charge_estimator(&self) -> ChargeStateEstimator {
        ChargeStateEstimator::new(
            self.charge_range,
            self.isotopes_to_check,
            self.charge_tolerance,
        )
    }
}

/// Scores how much of the signal in a precursor's isolation window belongs to the
/// precursor's own isotopic series.
///
/// The engine holds no state besides its parameters, so a single instance may be shared
/// across threads and used to score any number of precursors.
#[derive(Debug, Clone, PartialEq)]
pub struct InterferenceEngine {
    params: InterferenceParams,
    estimator: ChargeStateEstimator,
}

impl Default for InterferenceEngine {
    fn default() -> Self {
        Self::new(InterferenceParams::default())
    }
}

impl InterferenceEngine {
    pub fn new(params: InterferenceParams) -> Self {
        Self {
            estimator: params.charge_estimator(),
            params,
        }
    }

    /// Guess the charge state of the ion isolated at `isolation_mz`, returning `0` if
    /// no charge state could be determined.
    pub fn estimate_charge<C: CentroidLike>(&self, isolation_mz: f64, peaks: &[C]) -> i32 {
        self.estimator.estimate(isolation_mz, peaks)
    }

    /// The m/z interval that must be extracted from a spectrum to score `descriptor`,
    /// including the isotopic peaks needed to estimate charge when it is unknown.
    pub fn extraction_window(&self, descriptor: &PrecursorDescriptor) -> (f64, f64) {
        let isolation_mz = descriptor.isolation_mz();
        let width = descriptor.isolation_width() + self.params.search_tolerance;
        let mut low = isolation_mz - width;
        let mut high = isolation_mz + width;
        if !descriptor.has_charge() {
            let extent = self.estimator.required_extent() + self.params.search_tolerance;
            low = low.min(isolation_mz - extent);
            high = high.max(isolation_mz + extent);
        }
        (low, high)
    }

    /// Compute the interference score for `descriptor` from a peak list.
    ///
    /// If the descriptor's charge is unknown, it is estimated from `peaks` first and written
    /// back to the descriptor. `actual_mz`, `precursor_intensity`, `interference` and `status`
    /// are always updated.
    pub fn compute_interference<C: CentroidLike>(
        &self,
        descriptor: &mut PrecursorDescriptor,
        peaks: &[C],
    ) -> ScoreStatus {
        descriptor.reset_score();
        if !descriptor.has_charge() {
            let charge = self.estimate_charge(descriptor.isolation_mz(), peaks);
            descriptor.update_charge(charge);
            if !descriptor.has_charge() {
                warn!(
                    "charge undetermined for precursor at {:.2} in scan {}",
                    descriptor.isolation_mz(),
                    descriptor.scan_number
                );
                descriptor.status = ScoreStatus::ChargeUndetermined;
                return descriptor.status;
            }
            debug!("Estimated charge {charge} for {descriptor}");
        }

        let (low, high) = descriptor.isolation_window();
        let window = peaks_in_window(peaks, low, high);

        if let Some(peak) = closest_peak(&window, descriptor.isolation_mz()) {
            descriptor.actual_mz = Some(peak.mz());
            descriptor.precursor_intensity = peak.intensity() as f64;
        }

        let reference_mz = match descriptor.actual_mz {
            Some(mz) => mz,
            None => {
                warn!(
                    "Did not find the precursor for {:.2} in scan {}",
                    descriptor.isolation_mz(),
                    descriptor.scan_number
                );
                descriptor.status = ScoreStatus::NoPeaksInWindow;
                return descriptor.status;
            }
        };

        let charge = descriptor.charge();
        let isolation_mz = descriptor.isolation_mz();
        let mut precursor_total = 0.0;
        let mut window_total = 0.0;
        for peak in window.iter() {
            let intensity = peak.intensity() as f64;
            let (_, ppm_error) =
                isotopic_offset_error(peak.mz(), reference_mz, isolation_mz, charge);
            if ppm_error < self.params.precursor_tolerance_ppm {
                precursor_total += intensity;
            }
            window_total += intensity;
        }

        if window_total > 0.0 {
            descriptor.interference = precursor_total / window_total;
            descriptor.status = ScoreStatus::Scored;
        } else {
            warn!(
                "Did not find the precursor for {:.2} in scan {}",
                isolation_mz, descriptor.scan_number
            );
            descriptor.interference = 0.0;
            descriptor.status = ScoreStatus::NoPeaksInWindow;
        }
        descriptor.status
    }

    /// Compute the interference score for `descriptor` from parallel m/z and intensity
    /// arrays sorted by m/z.
    ///
    /// Only the region of the arrays around the isolation window is converted into peaks
    /// before scoring.
    pub fn compute_interference_from_arrays(
        &self,
        descriptor: &mut PrecursorDescriptor,
        mz_array: &[f64],
        intensity_array: &[f32],
    ) -> Result<ScoreStatus, InterferenceError> {
        if mz_array.len() != intensity_array.len() {
            return Err(InterferenceError::ArrayLengthMismatch {
                mz_len: mz_array.len(),
                intensity_len: intensity_array.len(),
            });
        }
        let (low, high) = self.extraction_window(descriptor);
        let n = mz_array.len();
        let tol = self.params.search_tolerance;
        let low_index = approximate_binary_search(mz_array, 0, n, low, tol);
        let high_index = approximate_binary_search(mz_array, low_index, n, high, tol);
        let peaks = peaks_from_arrays(mz_array, intensity_array, low_index, high_index);
        Ok(self.compute_interference(descriptor, &peaks))
    }
}
