//! A basic demonstration of how to use [`mzinterference::InterferenceEngine`]

use std::{fs, io};

use mzinterference::{InterferenceEngine, InterferenceParams, PrecursorDescriptor, ScanPeaks};

fn main() -> io::Result<()> {
    // Set up for example, read the centroids of an MS1 scan from a table.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(fs::File::open("test/data/ms1_scan_10444.tsv")?);
    let mut mzs = Vec::new();
    let mut intensities = Vec::new();
    for row in reader.deserialize::<(f64, f32)>() {
        let (mz, intensity) = row.map_err(io::Error::other)?;
        mzs.push(mz);
        intensities.push(intensity);
    }
    let scan = ScanPeaks::new(10444, mzs, intensities);

    // The default parameters check charge states 1 through 4, two isotopic peaks on either side
    // of the isolation m/z, and accept isotopic peaks within 15 PPM.
    let engine = InterferenceEngine::new(InterferenceParams::default());

    // A charge of 0 asks the engine to estimate it from the spectrum
    for isolation_mz in [428.9168, 443.7350, 457.2725, 720.3926, 447.7539] {
        let mut precursor = PrecursorDescriptor::new(isolation_mz, 2.0, 0).with_precursor_scan_number(Some(10444));
        let status = engine
            .compute_interference_from_arrays(&mut precursor, &scan.mz_array, &scan.intensity_array)
            .map_err(io::Error::other)?;
        eprintln!(
            "{isolation_mz:.4} => charge {}, interference {:.4} ({status})",
            precursor.charge(),
            precursor.interference
        );
    }

    Ok(())
}
