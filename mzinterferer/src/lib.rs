mod args;
mod driver;
mod source;

pub use args::{ArgChargeRange, ChargeRangeParseError};
pub use driver::{dataset_id_of, default_isos_path, DatasetScores, MZInterferer, MZInterfererError};
pub use source::{metadata_of, peaks_of, scan_number_from_id, MzDataScanSource};
