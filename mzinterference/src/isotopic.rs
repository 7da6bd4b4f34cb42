//! Isotopic spacing arithmetic

/// The mass difference between isotopes `C[13]` and `C[12]`. Not precisely universal, but the
/// majority of expected applications are carbon-based
pub const NEUTRON_SHIFT: f64 = 1.0033548378;

const ISOTOPIC_SHIFT: [f64; 10] = [
    NEUTRON_SHIFT / 1.0,
    NEUTRON_SHIFT / 2.0,
    NEUTRON_SHIFT / 3.0,
    NEUTRON_SHIFT / 4.0,
    NEUTRON_SHIFT / 5.0,
    NEUTRON_SHIFT / 6.0,
    NEUTRON_SHIFT / 7.0,
    NEUTRON_SHIFT / 8.0,
    NEUTRON_SHIFT / 9.0,
    NEUTRON_SHIFT / 10.0,
];

/// Get the m/z difference between isotopic peaks at a given charge state
#[inline(always)]
pub fn isotopic_shift(charge: i32) -> f64 {
    if charge > 0 && charge < 11 {
        ISOTOPIC_SHIFT[(charge - 1) as usize]
    } else {
        NEUTRON_SHIFT / charge as f64
    }
}

/// The number of whole isotopic spacings separating `mz` from `reference_mz` at `charge`,
/// and the mass error of that assignment in parts-per-million of `isolation_mz`.
///
/// The error is measured on the neutral mass scale, `(mz - reference_mz) * charge`, so the
/// same tolerance applies regardless of charge.
pub fn isotopic_offset_error(mz: f64, reference_mz: f64, isolation_mz: f64, charge: i32) -> (f64, f64) {
    let difference = (mz - reference_mz) * charge as f64;
    let steps = difference.round();
    let expected = steps * NEUTRON_SHIFT;
    let ppm_error = ((expected - difference) / (isolation_mz * charge as f64)).abs() * 1e6;
    (steps, ppm_error)
}
