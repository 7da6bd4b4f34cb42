use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Instant;

use clap::parser::ValueSource;
use clap::{ArgMatches, FromArgMatches, Parser};
use figment::{providers::Serialized, value::Dict, Figment};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use mzinterference::peaks::DEFAULT_SEARCH_TOLERANCE;
use mzinterference::{
    process_scans, ChargeHintError, ChargeHintSource, InterferenceEngine, InterferenceParams,
    IsosChargeHints, PrecursorDescriptor, ScanRange, ScoreTableError, ScoreTableWriter,
    ScoringSummary, SourceError, WorkflowError,
};

use crate::args::{make_interference_params, parse_tolerance, ArgChargeRange};
use crate::source::MzDataScanSource;

#[derive(Debug, Error)]
pub enum MZInterfererError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error(transparent)]
    SourceError(#[from] SourceError),
    #[error(transparent)]
    WorkflowError(#[from] WorkflowError),
    #[error(transparent)]
    ChargeHintError(#[from] ChargeHintError),
    #[error(transparent)]
    ScoreTableError(#[from] ScoreTableError),
    #[error("{0} isos files were given for {1} input files")]
    IsosFileCountMismatch(usize, usize),
    #[error("{0} of {1} datasets failed")]
    DatasetsFailed(usize, usize),
}

/// The scored precursors of one input file
#[derive(Debug)]
pub struct DatasetScores {
    pub dataset_id: String,
    pub descriptors: Vec<PrecursorDescriptor>,
    pub summary: ScoringSummary,
}

/// The name a dataset is reported under, its file name without extension
pub fn dataset_id_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The charge hint file expected beside `path` when none is given explicitly
pub fn default_isos_path(path: &Path) -> PathBuf {
    path.with_file_name(format!("{}_isos.csv", dataset_id_of(path)))
}

/// Score the isolation interference of every precursor in one or more mass spectrometry files.
///
/// For each MSn scan, estimate what fraction of the signal in its isolation window came from
/// the selected precursor in the preceding MS1 scan, and write a tab-delimited table with one
/// row per precursor.
#[derive(Parser, Debug, Deserialize, Serialize)]
#[command(author, version)]
#[serde(default)]
pub struct MZInterferer {
    /// The paths to read spectra from. Any format `mzdata` can read with random access is
    /// supported.
    #[arg(required = true)]
    pub input_files: Vec<PathBuf>,

    /// The path to write the score table to, or if '-' is passed, write to STDOUT.
    ///
    /// An existing file is appended to without writing the header again.
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mzinterferer.toml` in the working directory.
    /// Environment variables prefixed with `MZINTERFERER_` will be read too, and take
    /// precedence over both files. Options given on the command line take precedence
    /// over all of them.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// DeconTools `_isos.csv` files to read precursor charge states from, one per input file.
    ///
    /// When not given, `<name>_isos.csv` beside each input file is used if it exists.
    #[arg(short = 'i', long = "isos-file")]
    pub isos_files: Vec<PathBuf>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='t',
        long="threads",
        default_value_t=-1,
    )]
    pub threads: i32,

    /// The scan range to process, denoted (start?)-(end?)
    #[arg(
        short='r',
        long="scan-range",
        value_parser=ScanRange::from_str,
        value_name="START-END",
        long_help=r#"The scan range to process, denoted (start?)-(end?)

If a start is not specified, processing begins from the first scan of the run.
If an end is not specified, processing stops at the last scan of the run.
An MSn scan in range whose MS1 scan falls before the start is still written, with a
PrecursorScan of 0 and an interference of 0.
"#
    )]
    pub scan_range: Option<ScanRange>,

    /// The range of positive charge states to consider when estimating a precursor's charge,
    /// denoted (low)-(high) or (high)
    #[arg(
        short = 'z',
        long = "charge-range",
        default_value_t=ArgChargeRange(1, 4),
    )]
    pub charge_range: ArgChargeRange,

    /// The m/z tolerance for matching isotopic peaks when estimating a precursor's charge
    #[arg(long = "charge-tolerance", default_value_t = 0.01, value_parser = parse_tolerance)]
    pub charge_tolerance: f64,

    /// The PPM error tolerance for assigning a peak to the precursor's isotopic series
    #[arg(
        short = 'p',
        long = "precursor-tolerance",
        default_value_t = 15.0,
        value_parser = parse_tolerance
    )]
    pub precursor_tolerance: f64,

    /// The number of isotopic peaks on either side of the precursor to check when
    /// estimating its charge
    #[arg(long = "isotopes", default_value_t = 2)]
    pub isotopes_to_check: usize,

    #[arg(
        skip = DEFAULT_SEARCH_TOLERANCE,
        help = "The m/z tolerance used when locating the isolation window in a peak list"
    )]
    pub search_tolerance: f64,
}

impl Default for MZInterferer {
    fn default() -> Self {
        let params = InterferenceParams::default();
        Self {
            input_files: Vec::new(),
            output_file: PathBuf::from("-"),
            log_file: None,
            config_file: None,
            isos_files: Vec::new(),
            threads: -1,
            scan_range: None,
            charge_range: ArgChargeRange(params.charge_range.0, params.charge_range.1),
            charge_tolerance: params.charge_tolerance,
            precursor_tolerance: params.precursor_tolerance_ppm,
            isotopes_to_check: params.isotopes_to_check,
            search_tolerance: params.search_tolerance,
        }
    }
}

impl MZInterferer {
    /// Combine parsed command line arguments with configuration `sources`.
    ///
    /// Values from `sources` replace clap's defaults, but not options the user typed.
    pub fn configure(matches: &ArgMatches, sources: Figment) -> Result<Self, figment::Error> {
        let args =
            Self::from_arg_matches(matches).map_err(|e| figment::Error::from(e.to_string()))?;
        let cli = Figment::from(Serialized::defaults(&args));

        let mut explicit = Dict::new();
        for id in matches.ids() {
            if matches.value_source(id.as_str()) != Some(ValueSource::CommandLine) {
                continue;
            }
            if let Ok(value) = cli.find_value(id.as_str()) {
                explicit.insert(id.to_string(), value);
            }
        }

        cli.merge(sources).merge(Serialized::defaults(explicit)).extract()
    }

    fn create_threadpool(&self) -> io::Result<rayon::ThreadPool> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()?.into()
        };
        let num_threads = num_threads.min(self.input_files.len().max(1));
        debug!("Using {} threads", num_threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(io::Error::other)
    }

    pub fn interference_params(&self) -> InterferenceParams {
        make_interference_params(
            self.charge_range,
            self.charge_tolerance,
            self.precursor_tolerance,
            self.isotopes_to_check,
            self.search_tolerance,
        )
    }

    pub fn main(&self) -> Result<(), MZInterfererError> {
        info!(
            "mzinterferer v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        if !self.isos_files.is_empty() && self.isos_files.len() != self.input_files.len() {
            return Err(MZInterfererError::IsosFileCountMismatch(
                self.isos_files.len(),
                self.input_files.len(),
            ));
        }
        for path in self.input_files.iter() {
            info!("Input: {}", path.display());
        }
        info!("Output: {}", self.output_file.display());

        let params = self.interference_params();
        debug!("Scoring parameters: {params:?}");
        let engine = InterferenceEngine::new(params);

        let mut writer = self.open_output()?;

        let start = Instant::now();
        let results: Vec<Result<DatasetScores, MZInterfererError>> =
            self.create_threadpool()?.install(|| {
                self.input_files
                    .par_iter()
                    .enumerate()
                    .map(|(i, path)| self.process_dataset(&engine, i, path))
                    .collect()
            });

        let mut failures = 0;
        let mut total = ScoringSummary::default();
        for (path, result) in self.input_files.iter().zip(results) {
            match result {
                Ok(scores) => {
                    writer.write_precursors(&scores.dataset_id, &scores.descriptors)?;
                    total += scores.summary;
                }
                Err(e) => {
                    error!("Failed to process {}: {e}", path.display());
                    failures += 1;
                }
            }
        }
        writer.flush()?;
        info!("Wrote {} rows", writer.rows_written());

        if self.input_files.len() > 1 {
            total.log("All datasets");
        }
        info!("Total Elapsed Time: {:0.3?}", start.elapsed());

        if failures > 0 {
            Err(MZInterfererError::DatasetsFailed(
                failures,
                self.input_files.len(),
            ))
        } else {
            Ok(())
        }
    }

    fn open_output(&self) -> Result<ScoreTableWriter<Box<dyn Write + Send>>, MZInterfererError> {
        if self.output_file == PathBuf::from("-") {
            let handle: Box<dyn Write + Send> = Box::new(io::BufWriter::new(io::stdout()));
            return Ok(ScoreTableWriter::new(handle, true)?);
        }
        let is_new = fs::metadata(&self.output_file)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        if !is_new {
            info!(
                "Appending to existing score table {}",
                self.output_file.display()
            );
        }
        let handle = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_file)?;
        let handle: Box<dyn Write + Send> = Box::new(io::BufWriter::new(handle));
        Ok(ScoreTableWriter::new(handle, is_new)?)
    }

    fn load_charge_hints(
        &self,
        index: usize,
        path: &Path,
    ) -> Result<Option<IsosChargeHints>, MZInterfererError> {
        let (isos_path, explicit) = match self.isos_files.get(index) {
            Some(isos_path) => (isos_path.clone(), true),
            None => (default_isos_path(path), false),
        };
        if !explicit && !isos_path.exists() {
            debug!("No charge hints found at {}", isos_path.display());
            return Ok(None);
        }
        match IsosChargeHints::open(&isos_path) {
            Ok(hints) => {
                info!(
                    "Read {} charge hints from {}",
                    hints.len(),
                    isos_path.display()
                );
                Ok(Some(hints))
            }
            Err(ChargeHintError::Io(e)) => {
                warn!(
                    "Failed to open charge hints {}, charge states will be estimated: {e}",
                    isos_path.display()
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read, describe, and score all the precursors in one input file
    pub fn process_dataset(
        &self,
        engine: &InterferenceEngine,
        index: usize,
        path: &Path,
    ) -> Result<DatasetScores, MZInterfererError> {
        let dataset_id = dataset_id_of(path);
        let start = Instant::now();
        let mut source = MzDataScanSource::open_path(path)?;
        info!("{dataset_id}: {} scans", source.len());

        let hints = self.load_charge_hints(index, path)?;
        let scan_range = self.scan_range.unwrap_or_default();
        let (descriptors, summary) = process_scans(
            engine,
            &mut source,
            hints.as_ref().map(|h| h as &dyn ChargeHintSource),
            scan_range,
        )?;
        summary.log(&dataset_id);
        info!("{dataset_id}: Elapsed Time: {:0.3?}", start.elapsed());
        Ok(DatasetScores {
            dataset_id,
            descriptors,
            summary,
        })
    }
}
