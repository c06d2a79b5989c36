use serde::{Deserialize, Serialize};

use crate::models::value::Value;
use crate::utils::constants::{
    COL_DATE, COL_DO, COL_PH, COL_STATION, COL_TEMP, COL_TURBIDITY,
};

/// Semantic type of an observation-table column, fixed at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Categorical,
    Date,
    Float,
    Int,
    Str,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Categorical => "categorical",
            ColumnType::Date => "date",
            ColumnType::Float => "float",
            ColumnType::Int => "int",
            ColumnType::Str => "str",
        }
    }

    /// Whether a non-missing cell matches this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ColumnType::Categorical, Value::Cat(_)) => true,
            (ColumnType::Date, Value::Date(_)) => true,
            (ColumnType::Float, Value::Float(_)) => true,
            (ColumnType::Int, Value::Int(_)) => true,
            (ColumnType::Str, Value::Str(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: true,
        }
    }

    pub fn required(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: false,
        }
    }
}

/// Column name -> semantic type mapping, validated once at ingestion.
/// Downstream stages trust the schema rather than re-inspecting cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The standard monitoring-file schema: station, timestamp and the four
/// measured quantities. All columns nullable; a malformed cell degrades to
/// missing at ingestion rather than aborting the file.
pub fn monitoring_schema() -> Schema {
    Schema::new(vec![
        Field::new(COL_STATION, ColumnType::Categorical),
        Field::new(COL_DATE, ColumnType::Date),
        Field::new(COL_TEMP, ColumnType::Float),
        Field::new(COL_DO, ColumnType::Float),
        Field::new(COL_PH, ColumnType::Float),
        Field::new(COL_TURBIDITY, ColumnType::Float),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitoring_schema_shape() {
        let schema = monitoring_schema();
        assert_eq!(schema.len(), 6);
        assert_eq!(
            schema.field(COL_STATION).unwrap().column_type,
            ColumnType::Categorical
        );
        assert_eq!(schema.field(COL_DATE).unwrap().column_type, ColumnType::Date);
        assert_eq!(schema.field(COL_DO).unwrap().column_type, ColumnType::Float);
        assert_eq!(schema.index_of(COL_TURBIDITY), Some(5));
        assert!(!schema.contains("salinity"));
    }

    #[test]
    fn test_column_type_accepts() {
        assert!(ColumnType::Float.accepts(&Value::Float(7.2)));
        assert!(!ColumnType::Float.accepts(&Value::Int(7)));
        assert!(!ColumnType::Date.accepts(&Value::Str("2025-06-15".into())));
    }
}
