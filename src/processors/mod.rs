pub mod aggregator;
pub mod merger;
pub mod reshaper;
pub mod transformer;
pub mod validator;

pub use aggregator::{AggFn, AggSpec, GroupBy};
pub use merger::{JoinKind, Merger};
pub use reshaper::Reshaper;
pub use transformer::{classify_quality, Derivation, StatusClassifier, Transformer};
pub use validator::{PlausibleRange, RangeValidator, ValidationReport};
