//! Locating and extracting peaks in an m/z window
use mzpeaks::prelude::*;
use mzpeaks::CentroidPeak;

/// The default absolute m/z tolerance used by [`approximate_binary_search`]
pub const DEFAULT_SEARCH_TOLERANCE: f64 = 0.1;

/// Search the m/z-sorted `mz_array` between `low_index` and `high_index` for a position
/// near `target`.
///
/// This is not an exact search. It stops as soon as it lands on an index whose m/z is within
/// `tolerance` of `target`, or when the bracket stops moving, and returns that index. The caller
/// should treat the result as "the vicinity of `target`".
pub fn approximate_binary_search(
    mz_array: &[f64],
    low_index: usize,
    high_index: usize,
    target: f64,
    tolerance: f64,
) -> usize {
    let n = mz_array.len();
    if n == 0 {
        return 0;
    }
    let mut lo = low_index.min(n - 1);
    let mut hi = high_index.min(n).max(lo);
    let mut mid = lo;

    loop {
        if (mz_array[mid] - target).abs() < tolerance || mid == (hi + lo) / 2 {
            break;
        }
        mid = (hi + lo) / 2;
        let mz = mz_array[mid];
        if mz < target {
            lo = mid;
        }
        if mz > target {
            hi = mid;
        }
    }
    mid
}

/// Build peaks from the positions `low_index..=high_index` of a pair of parallel arrays,
/// skipping any point without signal. Out-of-range bounds are clamped.
pub fn peaks_from_arrays(
    mz_array: &[f64],
    intensity_array: &[f32],
    low_index: usize,
    high_index: usize,
) -> Vec<CentroidPeak> {
    let n = mz_array.len().min(intensity_array.len());
    if n == 0 || low_index >= n {
        return Vec::new();
    }
    let high_index = high_index.min(n - 1);
    (low_index..=high_index)
        .filter(|i| intensity_array[*i] > 0.0)
        .map(|i| CentroidPeak::new(mz_array[i], intensity_array[i], i as u32))
        .collect()
}

/// Select the peaks with signal in `low < mz < high`, in ascending m/z order
pub fn peaks_in_window<C: CentroidLike>(peaks: &[C], low: f64, high: f64) -> Vec<&C> {
    let mut selected: Vec<&C> = peaks
        .iter()
        .filter(|p| {
            let mz = p.mz();
            low < mz && mz < high && p.intensity() > 0.0
        })
        .collect();
    selected.sort_by(|a, b| a.mz().total_cmp(&b.mz()));
    selected
}

/// Find the peak closest to `mz`. The first of several equally close peaks wins.
pub fn closest_peak<'a, C: CentroidLike>(peaks: &[&'a C], mz: f64) -> Option<&'a C> {
    let mut best: Option<&'a C> = None;
    let mut best_err = f64::INFINITY;
    for peak in peaks.iter() {
        let err = (peak.mz() - mz).abs();
        if err < best_err {
            best_err = err;
            best = Some(*peak);
        }
    }
    best
}

/// The centroided m/z and intensity arrays of a single scan, sorted by m/z
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanPeaks {
    pub scan_number: u32,
    pub mz_array: Vec<f64>,
    pub intensity_array: Vec<f32>,
}

impl ScanPeaks {
    pub fn new(scan_number: u32, mz_array: Vec<f64>, intensity_array: Vec<f32>) -> Self {
        Self {
            scan_number,
            mz_array,
            intensity_array,
        }
    }

    /// Build from a peak list in any order, discarding peaks without signal
    pub fn from_peaks<C: CentroidLike>(scan_number: u32, peaks: &[C]) -> Self {
        let mut pairs: Vec<(f64, f32)> = peaks
            .iter()
            .filter(|p| p.intensity() > 0.0)
            .map(|p| (p.mz(), p.intensity()))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (mz_array, intensity_array) = pairs.into_iter().unzip();
        Self::new(scan_number, mz_array, intensity_array)
    }

    /// Build from parallel arrays that may be unsorted or contain points without signal
    pub fn from_arrays(scan_number: u32, mz_array: &[f64], intensity_array: &[f32]) -> Self {
        let mut pairs: Vec<(f64, f32)> = mz_array
            .iter()
            .copied()
            .zip(intensity_array.iter().copied())
            .filter(|(_, inten)| *inten > 0.0)
            .collect();
        if !pairs.is_sorted_by(|a, b| a.0 <= b.0) {
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        let (mz_array, intensity_array) = pairs.into_iter().unzip();
        Self::new(scan_number, mz_array, intensity_array)
    }

    pub fn len(&self) -> usize {
        self.mz_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_array.is_empty()
    }

    pub fn to_peaks(&self) -> Vec<CentroidPeak> {
        peaks_from_arrays(&self.mz_array, &self.intensity_array, 0, usize::MAX)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mzs() -> Vec<f64> {
        (0..100).map(|i| 400.0 + i as f64 * 0.5).collect()
    }

    #[test]
    fn test_approximate_search() {
        let mzs = mzs();
        let i = approximate_binary_search(&mzs, 0, mzs.len(), 425.02, DEFAULT_SEARCH_TOLERANCE);
        assert_eq!(mzs[i], 425.0);

        // Lands next to the target when nothing is within tolerance
        let i = approximate_binary_search(&mzs, 0, mzs.len(), 425.25, DEFAULT_SEARCH_TOLERANCE);
        assert!((mzs[i] - 425.25).abs() <= 0.5, "{}", mzs[i]);

        // Starting from a later index
        let j = approximate_binary_search(&mzs, i, mzs.len(), 430.0, DEFAULT_SEARCH_TOLERANCE);
        assert!(j >= i);
        assert_eq!(mzs[j], 430.0);
    }

    #[test]
    fn test_approximate_search_out_of_range() {
        let mzs = mzs();
        let i = approximate_binary_search(&mzs, 0, mzs.len(), 100.0, DEFAULT_SEARCH_TOLERANCE);
        assert_eq!(i, 0);
        let i = approximate_binary_search(&mzs, 0, mzs.len(), 1000.0, DEFAULT_SEARCH_TOLERANCE);
        assert_eq!(i, mzs.len() - 1);
        assert_eq!(approximate_binary_search(&[], 0, 0, 500.0, 0.1), 0);
        assert_eq!(approximate_binary_search(&[500.0], 0, 1, 100.0, 0.1), 0);
    }

    #[test]
    fn test_peaks_from_arrays() {
        let mzs = [100.0, 101.0, 102.0, 103.0];
        let ints = [10.0, 0.0, 30.0, 40.0];
        let peaks = peaks_from_arrays(&mzs, &ints, 0, 2);
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[1].mz, 102.0);
        assert_eq!(peaks[1].index, 2);

        let peaks = peaks_from_arrays(&mzs, &ints, 2, 50);
        assert_eq!(peaks.len(), 2);
        assert!(peaks_from_arrays(&mzs, &ints, 10, 50).is_empty());
    }

    #[test]
    fn test_window_is_exclusive() {
        let peaks = ScanPeaks::new(1, vec![99.0, 100.0, 100.5, 101.0, 102.0], vec![1.0; 5]).to_peaks();
        let window = peaks_in_window(&peaks, 100.0, 101.0);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].mz, 100.5);
    }

    #[test]
    fn test_closest_peak() {
        let peaks = ScanPeaks::new(1, vec![99.95, 100.1, 100.3], vec![5.0, 7.0, 9.0]).to_peaks();
        let window = peaks_in_window(&peaks, 99.0, 101.0);
        let best = closest_peak(&window, 100.0).unwrap();
        assert_eq!(best.intensity, 5.0);
        let empty: Vec<&CentroidPeak> = Vec::new();
        assert!(closest_peak(&empty, 100.0).is_none());
    }

    #[test]
    fn test_from_peaks_sorts() {
        let peaks = vec![
            CentroidPeak::new(300.0, 3.0, 0),
            CentroidPeak::new(100.0, 1.0, 1),
            CentroidPeak::new(200.0, 0.0, 2),
        ];
        let scan = ScanPeaks::from_peaks(7, &peaks);
        assert_eq!(scan.mz_array, vec![100.0, 300.0]);
        assert_eq!(scan.intensity_array, vec![1.0, 3.0]);
        assert_eq!(scan.len(), 2);

        let scan = ScanPeaks::from_arrays(7, &[300.0, 100.0, 200.0], &[3.0, 1.0, 0.0]);
        assert_eq!(scan.mz_array, vec![100.0, 300.0]);
        assert_eq!(scan.intensity_array, vec![1.0, 3.0]);
    }
}
