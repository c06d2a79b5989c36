/// Tokens recognized as missing values on ingestion
pub const MISSING_TOKENS: [&str; 5] = ["", "NA", "N/A", "-999", "-9999"];

/// Standard monitoring-file column names
pub const COL_STATION: &str = "station";
pub const COL_DATE: &str = "date";
pub const COL_TEMP: &str = "temp_c";
pub const COL_DO: &str = "do_mg_l";
pub const COL_PH: &str = "ph";
pub const COL_TURBIDITY: &str = "turbidity_ntu";

/// Date format in monitoring files
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Plausible physical ranges (min, max)
pub const TEMP_RANGE: (f64, f64) = (0.0, 35.0);
pub const DO_RANGE: (f64, f64) = (0.0, 15.0);
pub const PH_RANGE: (f64, f64) = (6.0, 9.0);

/// Dissolved-oxygen status thresholds (mg/L)
pub const DO_HYPOXIC_THRESHOLD: f64 = 2.0;
pub const DO_STRESS_THRESHOLD: f64 = 5.0;
pub const DO_ADEQUATE_THRESHOLD: f64 = 8.0;

/// Temperature above which otherwise-acceptable readings count as heat stress
pub const HEAT_STRESS_TEMP: f64 = 28.0;

/// Simplified full-saturation DO concentration (mg/L)
pub const DO_FULL_SATURATION: f64 = 8.0;

/// Status labels, DO-only classifier
pub const STATUS_UNKNOWN: &str = "Unknown";
pub const STATUS_HYPOXIC: &str = "Hypoxic";
pub const STATUS_STRESSED: &str = "Stressed";
pub const STATUS_ADEQUATE: &str = "Adequate";
pub const STATUS_HEALTHY: &str = "Healthy";

/// Status labels, DO + temperature classifier
pub const QUALITY_CRITICAL: &str = "Critical";
pub const QUALITY_HEAT_STRESS: &str = "Heat Stress";
pub const QUALITY_GOOD: &str = "Good";
