use crate::error::{PipelineError, Result};
use crate::models::schema::{Field, Schema};
use crate::models::value::Value;

/// An immutable, column-oriented observation table.
///
/// Rows are ordered; every column has the same length and its cells match
/// the declared schema type. All operations return a new table — no stage
/// of the pipeline mutates its input in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    columns: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking column lengths and cell types against the
    /// schema. This is the only place cells are inspected; later operations
    /// trust the schema.
    pub fn new(schema: Schema, columns: Vec<Vec<Value>>) -> Result<Self> {
        if schema.len() != columns.len() {
            return Err(PipelineError::SchemaMismatch(format!(
                "schema has {} fields but {} columns supplied",
                schema.len(),
                columns.len()
            )));
        }

        let n_rows = columns.first().map_or(0, Vec::len);
        for (field, column) in schema.fields().iter().zip(&columns) {
            if column.len() != n_rows {
                return Err(PipelineError::LengthMismatch {
                    column: field.name.clone(),
                    expected: n_rows,
                    found: column.len(),
                });
            }
            check_column(field, column)?;
        }

        Ok(Self { schema, columns })
    }

    pub fn empty(schema: Schema) -> Self {
        let columns = schema.fields().iter().map(|_| Vec::new()).collect();
        Self { schema, columns }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Result<&[Value]> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| PipelineError::ColumnNotFound {
                name: name.to_string(),
            })?;
        Ok(&self.columns[index])
    }

    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c[index]).collect()
    }

    /// Project a subset of columns, in the requested order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let mut fields = Vec::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let index = self
                .schema
                .index_of(name)
                .ok_or_else(|| PipelineError::ColumnNotFound {
                    name: name.to_string(),
                })?;
            fields.push(self.schema.fields()[index].clone());
            columns.push(self.columns[index].clone());
        }
        Ok(Table {
            schema: Schema::new(fields),
            columns,
        })
    }

    /// Keep rows where the mask is true. The mask has already resolved any
    /// three-valued logic; unknown must not reach here as true.
    pub fn filter(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.n_rows() {
            return Err(PipelineError::LengthMismatch {
                column: "<mask>".to_string(),
                expected: self.n_rows(),
                found: mask.len(),
            });
        }
        let columns = self
            .columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(value, _)| value.clone())
                    .collect()
            })
            .collect();
        Ok(Table {
            schema: self.schema.clone(),
            columns,
        })
    }

    /// Append a column, or replace the column of the same name. Replacement
    /// keeps derivations idempotent: re-deriving writes identical cells.
    pub fn with_column(&self, field: Field, values: Vec<Value>) -> Result<Table> {
        if values.len() != self.n_rows() && !self.schema.is_empty() {
            return Err(PipelineError::LengthMismatch {
                column: field.name.clone(),
                expected: self.n_rows(),
                found: values.len(),
            });
        }
        check_column(&field, &values)?;

        let mut fields: Vec<Field> = self.schema.fields().to_vec();
        let mut columns = self.columns.clone();
        match self.schema.index_of(&field.name) {
            Some(index) => {
                fields[index] = field;
                columns[index] = values;
            }
            None => {
                fields.push(field);
                columns.push(values);
            }
        }
        Ok(Table {
            schema: Schema::new(fields),
            columns,
        })
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<Table> {
        let index = self
            .schema
            .index_of(from)
            .ok_or_else(|| PipelineError::ColumnNotFound {
                name: from.to_string(),
            })?;
        if self.schema.contains(to) {
            return Err(PipelineError::SchemaMismatch(format!(
                "cannot rename '{}' to '{}': column already exists",
                from, to
            )));
        }
        let mut fields: Vec<Field> = self.schema.fields().to_vec();
        fields[index].name = to.to_string();
        Ok(Table {
            schema: Schema::new(fields),
            columns: self.columns.clone(),
        })
    }

    /// Stable sort by one column. Missing cells sort last regardless of
    /// direction.
    pub fn sort_by(&self, name: &str, ascending: bool) -> Result<Table> {
        let column = self.column(name)?;
        let mut order: Vec<usize> = (0..self.n_rows()).collect();
        order.sort_by(|&a, &b| {
            match (column[a].is_missing(), column[b].is_missing()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => {
                    let ordering = column[a]
                        .compare(&column[b])
                        .unwrap_or(std::cmp::Ordering::Equal);
                    if ascending {
                        ordering
                    } else {
                        ordering.reverse()
                    }
                }
            }
        });
        Ok(self.take(&order))
    }

    /// Row-concatenate a schema-identical table below this one.
    pub fn stack(&self, other: &Table) -> Result<Table> {
        if self.schema != other.schema {
            return Err(PipelineError::SchemaMismatch(
                "cannot stack tables with different schemas".to_string(),
            ));
        }
        let columns = self
            .columns
            .iter()
            .zip(&other.columns)
            .map(|(a, b)| {
                let mut merged = a.clone();
                merged.extend(b.iter().cloned());
                merged
            })
            .collect();
        Ok(Table {
            schema: self.schema.clone(),
            columns,
        })
    }

    pub fn head(&self, n: usize) -> Table {
        let n = n.min(self.n_rows());
        let columns = self
            .columns
            .iter()
            .map(|column| column[..n].to_vec())
            .collect();
        Table {
            schema: self.schema.clone(),
            columns,
        }
    }

    /// Reorder rows by an index permutation.
    fn take(&self, order: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|column| order.iter().map(|&i| column[i].clone()).collect())
            .collect();
        Table {
            schema: self.schema.clone(),
            columns,
        }
    }
}

fn check_column(field: &Field, values: &[Value]) -> Result<()> {
    for value in values {
        if value.is_missing() {
            if !field.nullable {
                return Err(PipelineError::TypeMismatch {
                    column: field.name.clone(),
                    expected: field.column_type.name().to_string(),
                    found: "missing".to_string(),
                });
            }
        } else if !field.column_type.accepts(value) {
            return Err(PipelineError::TypeMismatch {
                column: field.name.clone(),
                expected: field.column_type.name().to_string(),
                found: format!("{:?}", value),
            });
        }
    }
    Ok(())
}
