pub mod schema;
pub mod table;
pub mod value;

pub use schema::{monitoring_schema, ColumnType, Field, Schema};
pub use table::Table;
pub use value::{CategoryDict, KeyValue, Truth, Value};
