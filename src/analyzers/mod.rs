pub mod profile;

pub use profile::{ColumnProfile, DataProfile, ProfileAnalyzer};
