pub mod advisory;
pub mod correlation;
pub mod multivariate;
pub mod range;
pub mod spike;
pub mod stuck;

pub use advisory::{Advisory, RunoffAdvisory, SpikeMargin};
pub use correlation::{CorrelationCheck, CorrelationQuality, ExpectedCorrelation, PairQuality};
pub use multivariate::{AnomalyDetector, IsolationForest, MultivariateCheck};
pub use range::check_range;
pub use spike::check_spikes;
pub use stuck::check_stuck_values;
