//! Readers and writers for analytical-ultracentrifuge scan files.
//!
//! | Format | Module     | Decode | Encode |
//! |--------|------------|--------|--------|
//! | AUC    | [`auc`]    | yes    | yes    |
//! | MWRS   | [`mwrs`]   | yes    | yes    |
//! | MW     | [`mw`]     |        | yes    |
//! | TMST   | [`tmst`]   | yes    |        |
//!
//! Every decode call materializes a whole file; every encode call builds the
//! whole image in memory before anything is written.

pub mod error;
pub mod field;
pub mod quantize;
pub mod auc;
pub mod mwrs;
pub mod mw;
pub mod tmst;
pub mod convert;

pub use error::{Error, Result};
pub use quantize::Quantizer;
pub use auc::{AucDataset, ExperimentType, ScanRecord};
pub use mwrs::{MwrsHeader, MwrsRecord};
pub use mw::MwDataset;
pub use tmst::{TmstDataset, TmstRecord};
pub use convert::{auc_to_mw, ConvertOptions};
