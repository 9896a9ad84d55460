pub mod combiner;
pub mod consolidator;
pub mod pipeline;

pub use combiner::combine_outputs;
pub use consolidator::DailyConsolidator;
pub use pipeline::{QcPipeline, StationReport};
