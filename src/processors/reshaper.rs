use std::collections::HashMap;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::{ColumnType, Field, KeyValue, Schema, Table, Value};

/// Wide <-> long reshaping primitives.
///
/// `melt` and `pivot` are inverses whenever no duplicate (index, variable)
/// pair exists; a duplicate during pivot is a hard error naming the
/// offending key, never a silent arbitrary pick.
pub struct Reshaper;

impl Reshaper {
    /// Wide to long: one output row per (identifier tuple, value column).
    /// Output row count = input rows x value columns. Value columns must
    /// share one type; rows are emitted column-major (all rows of the
    /// first value column first).
    pub fn melt(
        table: &Table,
        id_vars: &[&str],
        value_vars: &[&str],
        var_name: &str,
        value_name: &str,
    ) -> Result<Table> {
        if value_vars.is_empty() {
            return Err(PipelineError::SchemaMismatch(
                "melt requires at least one value column".to_string(),
            ));
        }

        let mut id_fields = Vec::with_capacity(id_vars.len());
        let mut id_columns = Vec::with_capacity(id_vars.len());
        for name in id_vars {
            let index = table.schema().index_of(name).ok_or_else(|| {
                PipelineError::ColumnNotFound {
                    name: name.to_string(),
                }
            })?;
            id_fields.push(table.schema().fields()[index].clone());
            id_columns.push(table.column(name)?);
        }

        let mut value_type = None;
        let mut value_columns = Vec::with_capacity(value_vars.len());
        for name in value_vars {
            let field = table.schema().field(name).ok_or_else(|| {
                PipelineError::ColumnNotFound {
                    name: name.to_string(),
                }
            })?;
            match value_type {
                None => value_type = Some(field.column_type),
                Some(expected) if expected != field.column_type => {
                    return Err(PipelineError::SchemaMismatch(format!(
                        "melt value columns must share one type: '{}' is {}, expected {}",
                        name,
                        field.column_type.name(),
                        expected.name()
                    )));
                }
                Some(_) => {}
            }
            value_columns.push(table.column(name)?);
        }
        let value_type = value_type.expect("at least one value column");

        let n_rows = table.n_rows();
        let n_out = n_rows * value_vars.len();
        let mut columns: Vec<Vec<Value>> = id_vars.iter().map(|_| Vec::with_capacity(n_out)).collect();
        let mut variable_cells = Vec::with_capacity(n_out);
        let mut value_cells = Vec::with_capacity(n_out);

        for (name, value_column) in value_vars.iter().zip(&value_columns) {
            for row in 0..n_rows {
                for (out, id_column) in columns.iter_mut().zip(&id_columns) {
                    out.push(id_column[row].clone());
                }
                variable_cells.push(Value::Str(name.to_string()));
                value_cells.push(value_column[row].clone());
            }
        }

        let mut fields = id_fields;
        fields.push(Field::new(var_name, ColumnType::Str));
        fields.push(Field::new(value_name, value_type));
        columns.push(variable_cells);
        columns.push(value_cells);

        debug!(rows = n_out, "melted table");
        Table::new(Schema::new(fields), columns)
    }

    /// Long to wide: one output row per distinct index tuple, one column
    /// per distinct variable name, both in first-seen order. A duplicate
    /// (index, variable) pair aborts the operation.
    pub fn pivot(table: &Table, index: &[&str], variable: &str, value: &str) -> Result<Table> {
        let mut index_fields = Vec::with_capacity(index.len());
        let mut index_columns = Vec::with_capacity(index.len());
        for name in index {
            let position = table.schema().index_of(name).ok_or_else(|| {
                PipelineError::ColumnNotFound {
                    name: name.to_string(),
                }
            })?;
            index_fields.push(table.schema().fields()[position].clone());
            index_columns.push(table.column(name)?);
        }

        let variable_field =
            table
                .schema()
                .field(variable)
                .ok_or_else(|| PipelineError::ColumnNotFound {
                    name: variable.to_string(),
                })?;
        if !matches!(
            variable_field.column_type,
            ColumnType::Str | ColumnType::Categorical
        ) {
            return Err(PipelineError::SchemaMismatch(format!(
                "pivot variable column '{}' must be string-like, found {}",
                variable,
                variable_field.column_type.name()
            )));
        }
        let variable_column = table.column(variable)?;

        let value_field =
            table
                .schema()
                .field(value)
                .ok_or_else(|| PipelineError::ColumnNotFound {
                    name: value.to_string(),
                })?;
        let value_column = table.column(value)?;

        // First-seen orders for both axes
        let mut row_of: HashMap<Vec<KeyValue>, usize> = HashMap::new();
        let mut index_rows: Vec<Vec<Value>> = Vec::new();
        let mut column_of: HashMap<String, usize> = HashMap::new();
        let mut variables: Vec<String> = Vec::new();
        let mut cells: HashMap<(usize, usize), Value> = HashMap::new();

        for row in 0..table.n_rows() {
            let key: Vec<KeyValue> = index_columns.iter().map(|c| c[row].key()).collect();
            let out_row = match row_of.get(&key) {
                Some(&existing) => existing,
                None => {
                    row_of.insert(key, index_rows.len());
                    index_rows.push(index_columns.iter().map(|c| c[row].clone()).collect());
                    index_rows.len() - 1
                }
            };

            let label = variable_column[row].as_label().ok_or_else(|| {
                PipelineError::SchemaMismatch(format!(
                    "missing variable name in column '{}' at row {}",
                    variable, row
                ))
            })?;
            let out_column = match column_of.get(label) {
                Some(&existing) => existing,
                None => {
                    column_of.insert(label.to_string(), variables.len());
                    variables.push(label.to_string());
                    variables.len() - 1
                }
            };

            if cells
                .insert((out_row, out_column), value_column[row].clone())
                .is_some()
            {
                let key_display = index_rows[out_row]
                    .iter()
                    .map(|cell| cell.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(PipelineError::PivotCollision {
                    index: key_display,
                    variable: variables[out_column].clone(),
                });
            }
        }

        let mut fields = index_fields;
        for label in &variables {
            if fields.iter().any(|f| &f.name == label) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "pivot variable '{}' collides with an index column",
                    label
                )));
            }
            fields.push(Field::new(label, value_field.column_type));
        }

        let n_out = index_rows.len();
        let mut columns: Vec<Vec<Value>> = Vec::with_capacity(fields.len());
        for position in 0..index.len() {
            columns.push(index_rows.iter().map(|row| row[position].clone()).collect());
        }
        for out_column in 0..variables.len() {
            columns.push(
                (0..n_out)
                    .map(|out_row| {
                        cells
                            .get(&(out_row, out_column))
                            .cloned()
                            .unwrap_or(Value::Missing)
                    })
                    .collect(),
            );
        }

        debug!(rows = n_out, columns = variables.len(), "pivoted table");
        Table::new(Schema::new(fields), columns)
    }

    /// Split a composite name column (e.g. "do_jun") into exactly two
    /// string columns at the source column's position. A value that does
    /// not split into two parts is a data-shape error naming the value;
    /// missing cells stay missing in both parts.
    pub fn split_column(
        table: &Table,
        source: &str,
        separator: &str,
        left_name: &str,
        right_name: &str,
    ) -> Result<Table> {
        let position = table.schema().index_of(source).ok_or_else(|| {
            PipelineError::ColumnNotFound {
                name: source.to_string(),
            }
        })?;
        let source_field = &table.schema().fields()[position];
        if !matches!(
            source_field.column_type,
            ColumnType::Str | ColumnType::Categorical
        ) {
            return Err(PipelineError::SchemaMismatch(format!(
                "cannot split non-string column '{}'",
                source
            )));
        }
        for name in [left_name, right_name] {
            if name != source && table.schema().contains(name) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "split target '{}' collides with an existing column",
                    name
                )));
            }
        }

        let column = table.column(source)?;
        let mut left = Vec::with_capacity(column.len());
        let mut right = Vec::with_capacity(column.len());
        for cell in column {
            match cell.as_label() {
                Some(label) => {
                    let parts: Vec<&str> = label.split(separator).collect();
                    if parts.len() != 2 {
                        return Err(PipelineError::NameSplitArity {
                            name: label.to_string(),
                            separator: separator.to_string(),
                        });
                    }
                    left.push(Value::Str(parts[0].to_string()));
                    right.push(Value::Str(parts[1].to_string()));
                }
                None => {
                    left.push(Value::Missing);
                    right.push(Value::Missing);
                }
            }
        }

        let mut fields = Vec::with_capacity(table.n_cols() + 1);
        let mut columns = Vec::with_capacity(table.n_cols() + 1);
        for (i, field) in table.schema().fields().iter().enumerate() {
            if i == position {
                fields.push(Field::new(left_name, ColumnType::Str));
                fields.push(Field::new(right_name, ColumnType::Str));
                columns.push(std::mem::take(&mut left));
                columns.push(std::mem::take(&mut right));
            } else {
                fields.push(field.clone());
                columns.push(table.column(&field.name)?.to_vec());
            }
        }
        Table::new(Schema::new(fields), columns)
    }

    /// Multi-variable tidy: melt every non-identifier column, split the
    /// composite names on `separator` into (variable, period), then pivot
    /// the variable axis back out. Composed entirely from the primitives
    /// above.
    pub fn tidy(
        table: &Table,
        id_vars: &[&str],
        separator: &str,
        period_name: &str,
    ) -> Result<Table> {
        let value_vars: Vec<&str> = table
            .schema()
            .names()
            .filter(|name| !id_vars.contains(name))
            .collect();

        let melted = Self::melt(table, id_vars, &value_vars, "name", "value")?;
        let split = Self::split_column(&melted, "name", separator, "variable", period_name)?;

        let mut index: Vec<&str> = id_vars.to_vec();
        index.push(period_name);
        Self::pivot(&split, &index, "variable", "value")
    }
}
