pub mod constants;
pub mod filename;
pub mod progress;
pub mod units;

pub use constants::*;
pub use filename::default_enriched_filename;
pub use progress::ProgressReporter;
pub use units::{
    celsius_to_fahrenheit, do_percent_saturation, do_saturation_at, fahrenheit_to_celsius,
    saturation_deficit,
};
