pub mod checks;
pub mod config;
pub mod error;
pub mod models;
pub mod processors;
pub mod utils;

pub use error::{QcError, Result};
pub use models::QualityFlag;
pub use processors::{QcPipeline, StationReport};
