/// Canonical parameter names
///
/// Ingestion resolves raw sensor column headers to these names before the
/// engine sees them; every rule table and cross-parameter check keys on them.
pub const PARAM_PH: &str = "ph";
pub const PARAM_DISSOLVED_OXYGEN: &str = "dissolved_oxygen";
pub const PARAM_WATER_TEMP_0_5M: &str = "water_temp_0_5m";
pub const PARAM_WATER_TEMP_1M: &str = "water_temp_1m";
pub const PARAM_WATER_TEMP_2M: &str = "water_temp_2m";
pub const PARAM_CONDUCTIVITY: &str = "conductivity";
pub const PARAM_TURBIDITY: &str = "turbidity";
pub const PARAM_CHLOROPHYLL_A: &str = "chlorophyll_a";
pub const PARAM_PHYCOCYANIN: &str = "phycocyanin";
pub const PARAM_NITRATE: &str = "nitrate";
pub const PARAM_REDOX_POTENTIAL: &str = "redox_potential";
pub const PARAM_DOC: &str = "doc";
pub const PARAM_TOC: &str = "toc";
pub const PARAM_AIR_TEMPERATURE: &str = "air_temperature";

/// Daylight window for time-of-day-aware plausibility checks (inclusive)
pub const DAYLIGHT_START_HOUR: u32 = 6;
pub const DAYLIGHT_END_HOUR: u32 = 20;

/// Day-level flag thresholds on the good-value ratio, percent
pub const GOOD_RATIO_THRESHOLD: f64 = 75.0;
pub const SUSPECT_RATIO_THRESHOLD: f64 = 50.0;

/// Daily consolidation defaults
pub const DEFAULT_PRECISION: u32 = 2;
pub const DEFAULT_MAX_INTERPOLATION_GAP: usize = 3;

/// Stuck-value detection default
pub const DEFAULT_STUCK_TOLERANCE: usize = 3;

/// Multivariate anomaly detection defaults
pub const DEFAULT_CONTAMINATION: f64 = 0.02;
pub const DEFAULT_DETECTOR_SEED: u64 = 42;

/// Benson-Krause oxygen saturation coefficients, freshwater
pub const O2_SAT_A1: f64 = -173.4292;
pub const O2_SAT_A2: f64 = 249.6339;
pub const O2_SAT_A3: f64 = 143.3483;
pub const O2_SAT_A4: f64 = -21.8492;
/// Conversion of ln-saturation (mL/L) to mg/L
pub const O2_SAT_MG_PER_ML: f64 = 1.42905;

/// Minimum paired points for a trailing-window correlation quality metric
pub const MIN_CORRELATION_POINTS: usize = 10;
