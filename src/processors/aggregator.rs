use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::models::{ColumnType, Field, KeyValue, Schema, Table, Value};

/// A per-group reduction function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggFn {
    Mean,
    Max,
    /// Count of non-missing cells
    Count,
    /// Fraction of non-missing cells strictly below the threshold.
    /// Missing is excluded from numerator and denominator both.
    PropBelow(f64),
    /// Fraction of non-missing cells strictly above the threshold
    PropAbove(f64),
}

#[derive(Debug, Clone)]
pub struct AggSpec {
    pub column: String,
    pub func: AggFn,
    pub output: String,
}

impl AggSpec {
    pub fn new(column: &str, func: AggFn, output: &str) -> Self {
        Self {
            column: column.to_string(),
            func,
            output: output.to_string(),
        }
    }
}

/// A single-pass partition of a table by one key column.
///
/// Groups are held in first-seen order of their key; rows with a missing
/// key belong to no group (broadcast and rank give them missing results).
pub struct GroupBy<'a> {
    table: &'a Table,
    key_name: String,
    groups: Vec<(Value, Vec<usize>)>,
    row_group: Vec<Option<usize>>,
}

impl<'a> GroupBy<'a> {
    pub fn new(table: &'a Table, key: &str) -> Result<Self> {
        let key_column = table.column(key)?;
        let mut seen: HashMap<KeyValue, usize> = HashMap::new();
        let mut groups: Vec<(Value, Vec<usize>)> = Vec::new();
        let mut row_group = Vec::with_capacity(table.n_rows());

        for (row, cell) in key_column.iter().enumerate() {
            if cell.is_missing() {
                row_group.push(None);
                continue;
            }
            let group_index = match seen.get(&cell.key()) {
                Some(&index) => index,
                None => {
                    seen.insert(cell.key(), groups.len());
                    groups.push((cell.clone(), Vec::new()));
                    groups.len() - 1
                }
            };
            groups[group_index].1.push(row);
            row_group.push(Some(group_index));
        }

        debug!(key, groups = groups.len(), "partitioned table");
        Ok(Self {
            table,
            key_name: key.to_string(),
            groups,
            row_group,
        })
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.groups.iter().map(|(key, _)| key)
    }

    pub fn group_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.groups.iter().map(|(_, rows)| rows.len())
    }

    /// Reduce each group to one row, emitted in first-seen key order.
    /// Per-group reductions run in parallel; the output order is unaffected.
    pub fn aggregate(&self, specs: &[AggSpec]) -> Result<Table> {
        let mut spec_columns = Vec::with_capacity(specs.len());
        for spec in specs {
            spec_columns.push(self.table.column(&spec.column)?);
        }

        let rows: Vec<Vec<Value>> = self
            .groups
            .par_iter()
            .map(|(key, indices)| {
                let mut row = Vec::with_capacity(specs.len() + 1);
                row.push(key.clone());
                for (spec, column) in specs.iter().zip(&spec_columns) {
                    row.push(reduce(spec.func, indices.iter().map(|&i| &column[i])));
                }
                row
            })
            .collect();

        let key_field = self
            .table
            .schema()
            .field(&self.key_name)
            .expect("key column exists by construction")
            .clone();
        let mut fields = vec![key_field];
        for spec in specs {
            let column_type = match spec.func {
                AggFn::Count => ColumnType::Int,
                AggFn::Max => {
                    self.table
                        .schema()
                        .field(&spec.column)
                        .expect("spec column exists by construction")
                        .column_type
                }
                _ => ColumnType::Float,
            };
            fields.push(Field::new(&spec.output, column_type));
        }

        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); fields.len()];
        for row in rows {
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
        }
        Table::new(Schema::new(fields), columns)
    }

    /// Write each group's reduction back onto every row of that group.
    /// Preserves row count and original row order.
    pub fn broadcast(&self, column: &str, func: AggFn) -> Result<Vec<Value>> {
        let cells = self.table.column(column)?;
        let reduced: Vec<Value> = self
            .groups
            .iter()
            .map(|(_, indices)| reduce(func, indices.iter().map(|&i| &cells[i])))
            .collect();

        Ok(self
            .row_group
            .iter()
            .map(|group| match group {
                Some(index) => reduced[*index].clone(),
                None => Value::Missing,
            })
            .collect())
    }

    /// Within-group rank of a column, descending by default semantics of
    /// the caller. Ranks are distinct integers 1..k per group; ties keep
    /// the first-seen row first, and missing cells order after all
    /// non-missing ones.
    pub fn rank(&self, column: &str, descending: bool) -> Result<Vec<Value>> {
        let cells = self.table.column(column)?;
        let mut ranks = vec![Value::Missing; self.table.n_rows()];

        for (_, indices) in &self.groups {
            let mut present: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|&row| !cells[row].is_missing())
                .collect();
            // Stable sort: ties stay in original row order
            present.sort_by(|&a, &b| {
                let ordering = cells[a].compare(&cells[b]).unwrap_or(Ordering::Equal);
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
            let absent = indices
                .iter()
                .copied()
                .filter(|&row| cells[row].is_missing());

            for (position, row) in present.into_iter().chain(absent).enumerate() {
                ranks[row] = Value::Int(position as i64 + 1);
            }
        }
        Ok(ranks)
    }
}

fn reduce<'v>(func: AggFn, cells: impl Iterator<Item = &'v Value>) -> Value {
    match func {
        AggFn::Mean => {
            let values: Vec<f64> = cells.filter_map(Value::as_float).collect();
            if values.is_empty() {
                Value::Missing
            } else {
                Value::Float(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        AggFn::Max => cells
            .filter(|cell| !cell.is_missing())
            .max_by(|a, b| a.compare(b).unwrap_or(Ordering::Equal))
            .cloned()
            .unwrap_or(Value::Missing),
        AggFn::Count => Value::Int(cells.filter(|cell| !cell.is_missing()).count() as i64),
        AggFn::PropBelow(threshold) => proportion(cells, |x| x < threshold),
        AggFn::PropAbove(threshold) => proportion(cells, |x| x > threshold),
    }
}

fn proportion<'v>(
    cells: impl Iterator<Item = &'v Value>,
    predicate: impl Fn(f64) -> bool,
) -> Value {
    let mut total = 0usize;
    let mut satisfied = 0usize;
    for value in cells.filter_map(Value::as_float) {
        total += 1;
        if predicate(value) {
            satisfied += 1;
        }
    }
    if total == 0 {
        Value::Missing
    } else {
        Value::Float(satisfied as f64 / total as f64)
    }
}
