//! Charge state estimation from isotopic peak spacing
use std::cmp;

use mzpeaks::prelude::*;
use tracing::trace;

use crate::isotopic::isotopic_shift;

/// An inclusive range of charge states, ordered by absolute magnitude
pub type ChargeRange = (i32, i32);

pub const DEFAULT_CHARGE_RANGE: ChargeRange = (1, 4);

#[derive(Debug, Clone)]
pub struct ChargeRangeIter {
    pub min: i32,
    pub max: i32,
    pub sign: i32,
    index: usize,
    size: usize,
}

impl ChargeRangeIter {
    pub fn new(min: i32, max: i32) -> ChargeRangeIter {
        let low = cmp::min(min.abs(), max.abs());
        let high = cmp::max(min.abs(), max.abs());
        let sign = if min < 0 || max < 0 { -1 } else { 1 };
        let size = if low == 0 && high == 0 {
            0
        } else {
            (high - low.max(1) + 1) as usize
        };
        ChargeRangeIter {
            min: low.max(1),
            max: high,
            sign,
            index: 0,
            size,
        }
    }

    pub fn next_charge(&mut self) -> Option<i32> {
        if self.index >= self.size {
            None
        } else {
            let i = (self.min + self.index as i32) * self.sign;
            self.index += 1;
            Some(i)
        }
    }
}

impl Iterator for ChargeRangeIter {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.next_charge()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.size - self.index;
        (remaining, Some(remaining))
    }
}

impl From<ChargeRange> for ChargeRangeIter {
    fn from(pair: ChargeRange) -> ChargeRangeIter {
        ChargeRangeIter::new(pair.0, pair.1)
    }
}

/// A theoretical m/z that would be observed if the isolated ion carried `charge`
#[derive(Debug, Clone, Copy, PartialEq)]
struct CandidateMZ {
    mz: f64,
    charge: i32,
}

/// Guess the charge state of an isolated ion by summing the abundance of peaks
/// found at the isotopic spacings each candidate charge state predicts.
///
/// For every charge in `charge_range`, the isolation m/z and `isotopes_to_check` isotopic
/// peaks on either side of it are looked up. The charge state whose predicted peaks collect the
/// most intensity wins, unless the only signal found was at the isolation m/z itself, in which
/// case no charge state is reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeStateEstimator {
    /// The range of charge states to consider
    pub charge_range: ChargeRange,
    /// How many isotopic peaks above and below the isolation m/z to look for
    pub isotopes_to_check: usize,
    /// The absolute m/z error tolerance for matching a peak to a predicted m/z
    pub mz_tolerance: f64,
}

impl Default for ChargeStateEstimator {
    fn default() -> Self {
        Self {
            charge_range: DEFAULT_CHARGE_RANGE,
            isotopes_to_check: 2,
            mz_tolerance: 0.01,
        }
    }
}

impl ChargeStateEstimator {
    pub fn new(charge_range: ChargeRange, isotopes_to_check: usize, mz_tolerance: f64) -> Self {
        Self {
            charge_range,
            isotopes_to_check,
            mz_tolerance,
        }
    }

    fn candidates(&self, isolation_mz: f64) -> Vec<CandidateMZ> {
        let charges = ChargeRangeIter::from(self.charge_range);
        let mut candidates = Vec::with_capacity(charges.size_hint().0 * (self.isotopes_to_check * 2 + 1));
        for charge in charges {
            candidates.push(CandidateMZ {
                mz: isolation_mz,
                charge,
            });
            let shift = isotopic_shift(charge.abs());
            for i in 1..=self.isotopes_to_check {
                let delta = shift * i as f64;
                candidates.push(CandidateMZ {
                    mz: isolation_mz - delta,
                    charge,
                });
                candidates.push(CandidateMZ {
                    mz: isolation_mz + delta,
                    charge,
                });
            }
        }
        candidates.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        candidates
    }

    /// The half-width of the m/z window around an isolation m/z that must be present
    /// for [`ChargeStateEstimator::estimate`] to see every peak it could use.
    pub fn required_extent(&self) -> f64 {
        let min_charge = ChargeRangeIter::from(self.charge_range)
            .map(|z| z.abs())
            .min()
            .unwrap_or(1);
        isotopic_shift(min_charge) * (self.isotopes_to_check + 1) as f64
    }

    /// Estimate the charge state of the ion isolated at `isolation_mz`.
    ///
    /// Returns `0` when no charge state explains any peak other than the one at
    /// `isolation_mz`, or when there are no peaks near it at all.
    pub fn estimate<C: CentroidLike>(&self, isolation_mz: f64, peaks: &[C]) -> i32 {
        let candidates = self.candidates(isolation_mz);
        let (first, last) = match (candidates.first(), candidates.last()) {
            (Some(first), Some(last)) => (first.mz, last.mz),
            _ => return 0,
        };
        let tol = self.mz_tolerance;
        let min_mz = first - tol;
        let max_mz = last + tol;

        let charges: Vec<i32> = ChargeRangeIter::from(self.charge_range).collect();
        let mut abundances = vec![0.0f64; charges.len()];
        let mut isolation_abundance = 0.0f64;

        let mut ordered: Vec<&C> = peaks.iter().filter(|p| p.intensity() > 0.0).collect();
        ordered.sort_by(|a, b| a.mz().total_cmp(&b.mz()));

        for peak in ordered {
            let mz = peak.mz();
            if mz < min_mz {
                continue;
            }
            if mz > max_mz {
                break;
            }
            let intensity = peak.intensity() as f64;
            if isolation_mz - tol <= mz && mz <= isolation_mz + tol {
                isolation_abundance += intensity;
            }
            for candidate in candidates
                .iter()
                .filter(|c| mz - tol <= c.mz && c.mz <= mz + tol)
            {
                if let Some(i) = charges.iter().position(|z| *z == candidate.charge) {
                    abundances[i] += intensity;
                }
            }
        }

        let mut best_charge = 0;
        let mut best_abundance = 0.0;
        for (charge, abundance) in charges.iter().zip(abundances.iter()) {
            trace!("Charge {charge} accumulated {abundance:0.1} around {isolation_mz:0.4}");
            if *abundance > best_abundance {
                best_abundance = *abundance;
                best_charge = *charge;
            }
        }

        // Only the isolation m/z matched, which every charge state predicts equally
        if best_abundance == isolation_abundance {
            return 0;
        }
        best_charge
    }
}
