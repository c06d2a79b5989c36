use std::collections::HashMap;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::{Field, KeyValue, Schema, Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Keep only rows whose key appears on both sides
    Inner,
    /// Keep every left row; unmatched right columns become missing
    Left,
}

/// Joins two tables on a shared key set.
///
/// Duplicate keys on the right side fan out: each left row is emitted once
/// per matching right row. A missing key component never matches anything,
/// including another missing key. Categorical keys compare by label, so a
/// metadata table typed `Str` joins against a monitoring table typed
/// `Categorical`.
pub struct Merger {
    kind: JoinKind,
}

impl Merger {
    pub fn new(kind: JoinKind) -> Self {
        Self { kind }
    }

    pub fn inner() -> Self {
        Self::new(JoinKind::Inner)
    }

    pub fn left() -> Self {
        Self::new(JoinKind::Left)
    }

    pub fn join(&self, left: &Table, right: &Table, keys: &[&str]) -> Result<Table> {
        if keys.is_empty() {
            return Err(PipelineError::Join("join requires at least one key".to_string()));
        }

        let mut left_keys = Vec::with_capacity(keys.len());
        let mut right_keys = Vec::with_capacity(keys.len());
        for key in keys {
            left_keys.push(left.column(key)?);
            right_keys.push(right.column(key)?);
        }

        // Right-side columns carried into the output, keys excluded
        let carried: Vec<&Field> = right
            .schema()
            .fields()
            .iter()
            .filter(|field| !keys.contains(&field.name.as_str()))
            .collect();
        for field in &carried {
            if left.schema().contains(&field.name) {
                return Err(PipelineError::Join(format!(
                    "column '{}' exists on both sides; rename before joining",
                    field.name
                )));
            }
        }
        let carried_columns: Vec<&[Value]> = carried
            .iter()
            .map(|field| right.column(&field.name))
            .collect::<Result<_>>()?;

        // Hash the right side once; duplicate keys accumulate for fan-out
        let mut right_rows: HashMap<Vec<KeyValue>, Vec<usize>> = HashMap::new();
        for row in 0..right.n_rows() {
            let key: Vec<KeyValue> = right_keys.iter().map(|c| c[row].key()).collect();
            if key.iter().any(KeyValue::is_missing) {
                continue;
            }
            right_rows.entry(key).or_default().push(row);
        }

        let mut fields: Vec<Field> = left.schema().fields().to_vec();
        for field in &carried {
            // Right columns are nullable in the output: a left join fills
            // unmatched rows with missing
            let mut field = (*field).clone();
            field.nullable = true;
            fields.push(field);
        }

        let n_left_cols = left.n_cols();
        let left_columns: Vec<&[Value]> = left
            .schema()
            .fields()
            .iter()
            .map(|field| left.column(&field.name))
            .collect::<Result<_>>()?;
        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); fields.len()];
        let mut matched = 0usize;

        for row in 0..left.n_rows() {
            let key: Vec<KeyValue> = left_keys.iter().map(|c| c[row].key()).collect();
            let matches = if key.iter().any(KeyValue::is_missing) {
                None
            } else {
                right_rows.get(&key)
            };

            match matches {
                Some(right_matches) => {
                    matched += 1;
                    for &right_row in right_matches {
                        for (position, column) in columns.iter_mut().enumerate() {
                            if position < n_left_cols {
                                column.push(left_columns[position][row].clone());
                            } else {
                                column.push(
                                    carried_columns[position - n_left_cols][right_row].clone(),
                                );
                            }
                        }
                    }
                }
                None => {
                    if self.kind == JoinKind::Left {
                        for (position, column) in columns.iter_mut().enumerate() {
                            if position < n_left_cols {
                                column.push(left_columns[position][row].clone());
                            } else {
                                column.push(Value::Missing);
                            }
                        }
                    }
                }
            }
        }

        debug!(
            matched,
            left_rows = left.n_rows(),
            kind = ?self.kind,
            "joined tables"
        );
        Table::new(Schema::new(fields), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnType;

    fn readings(stations: &[&str]) -> Table {
        let schema = Schema::new(vec![
            Field::new("station", ColumnType::Str),
            Field::new("do_mg_l", ColumnType::Float),
        ]);
        Table::new(
            schema,
            vec![
                stations
                    .iter()
                    .map(|s| Value::Str(s.to_string()))
                    .collect(),
                (0..stations.len())
                    .map(|i| Value::Float(5.0 + i as f64))
                    .collect(),
            ],
        )
        .unwrap()
    }

    fn metadata(stations: &[&str]) -> Table {
        let schema = Schema::new(vec![
            Field::new("station", ColumnType::Str),
            Field::new("region", ColumnType::Str),
        ]);
        Table::new(
            schema,
            vec![
                stations
                    .iter()
                    .map(|s| Value::Str(s.to_string()))
                    .collect(),
                stations
                    .iter()
                    .map(|_| Value::Str("Main Stem".into()))
                    .collect(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_left_join_keeps_all_left_rows() {
        let left = readings(&["S1", "S2", "S3", "S4", "S5", "S6", "S7", "S8", "S9", "S10"]);
        let right = metadata(&["S1", "S2", "S3", "S4", "S5", "S6", "S7"]);

        let joined = Merger::left().join(&left, &right, &["station"]).unwrap();
        assert_eq!(joined.n_rows(), 10);

        let regions = joined.column("region").unwrap();
        let missing = regions.iter().filter(|cell| cell.is_missing()).count();
        assert_eq!(missing, 3);
    }

    #[test]
    fn test_inner_join_drops_unmatched_rows() {
        let left = readings(&["S1", "S2", "S3", "S4", "S5", "S6", "S7", "S8", "S9", "S10"]);
        let right = metadata(&["S1", "S2", "S3", "S4", "S5", "S6", "S7"]);

        let joined = Merger::inner().join(&left, &right, &["station"]).unwrap();
        assert_eq!(joined.n_rows(), 7);
        assert!(joined
            .column("region")
            .unwrap()
            .iter()
            .all(|cell| !cell.is_missing()));
    }

    #[test]
    fn test_duplicate_right_keys_fan_out() {
        let left = readings(&["S1", "S2"]);
        let right = metadata(&["S1", "S1"]);

        let joined = Merger::left().join(&left, &right, &["station"]).unwrap();
        // S1 matches twice, S2 once with missing metadata
        assert_eq!(joined.n_rows(), 3);
    }

    #[test]
    fn test_missing_key_never_matches() {
        let schema = Schema::new(vec![
            Field::new("station", ColumnType::Str),
            Field::new("do_mg_l", ColumnType::Float),
        ]);
        let left = Table::new(
            schema,
            vec![
                vec![Value::Missing, Value::Str("S1".into())],
                vec![Value::Float(5.0), Value::Float(6.0)],
            ],
        )
        .unwrap();
        let meta_schema = Schema::new(vec![
            Field::new("station", ColumnType::Str),
            Field::new("region", ColumnType::Str),
        ]);
        let right = Table::new(
            meta_schema,
            vec![
                vec![Value::Missing, Value::Str("S1".into())],
                vec![Value::Str("Ghost".into()), Value::Str("Main Stem".into())],
            ],
        )
        .unwrap();

        let joined = Merger::left().join(&left, &right, &["station"]).unwrap();
        assert_eq!(joined.n_rows(), 2);
        // The missing-key row did not pick up the right side's missing-key row
        assert_eq!(joined.column("region").unwrap()[0], Value::Missing);

        let inner = Merger::inner().join(&left, &right, &["station"]).unwrap();
        assert_eq!(inner.n_rows(), 1);
    }

    #[test]
    fn test_multi_key_join() {
        let schema = Schema::new(vec![
            Field::new("station", ColumnType::Str),
            Field::new("date", ColumnType::Str),
            Field::new("do_mg_l", ColumnType::Float),
        ]);
        let left = Table::new(
            schema,
            vec![
                vec![Value::Str("S1".into()), Value::Str("S1".into())],
                vec![Value::Str("2025-06-15".into()), Value::Str("2025-06-16".into())],
                vec![Value::Float(5.0), Value::Float(6.0)],
            ],
        )
        .unwrap();
        let nutrient_schema = Schema::new(vec![
            Field::new("station", ColumnType::Str),
            Field::new("date", ColumnType::Str),
            Field::new("nitrogen_mg_l", ColumnType::Float),
        ]);
        let right = Table::new(
            nutrient_schema,
            vec![
                vec![Value::Str("S1".into())],
                vec![Value::Str("2025-06-15".into())],
                vec![Value::Float(1.2)],
            ],
        )
        .unwrap();

        let joined = Merger::left()
            .join(&left, &right, &["station", "date"])
            .unwrap();
        assert_eq!(joined.n_rows(), 2);
        assert_eq!(joined.column("nitrogen_mg_l").unwrap()[0], Value::Float(1.2));
        assert_eq!(joined.column("nitrogen_mg_l").unwrap()[1], Value::Missing);
    }

    #[test]
    fn test_overlapping_non_key_columns_rejected() {
        let left = readings(&["S1"]);
        let right = readings(&["S1"]);
        let result = Merger::inner().join(&left, &right, &["station"]);
        assert!(matches!(result, Err(PipelineError::Join(_))));
    }
}
