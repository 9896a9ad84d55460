pub mod daily;
pub mod flag;
pub mod series;

pub use daily::DailyAggregateRecord;
pub use flag::{combine, QualityFlag};
pub use series::{CheckOutput, FlaggedPoint, FlaggedSeries, StationBatch};
