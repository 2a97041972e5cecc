pub mod archive;
pub mod calibration;
pub mod catalog;
pub mod collect;
pub mod config;
pub mod correction;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod polynomial;

pub use config::ThermexConfig;
pub use error::{ErrorKind, PipelineError, Result};
pub use pipeline::{process_directory, Pipeline, RunOutcome, RunSummary};
pub use polynomial::{Polynomial, FIT_DEGREE};
