use crate::models::{ColumnType, Table, Value};

/// Per-column missing-data and descriptive statistics.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub name: String,
    pub column_type: ColumnType,
    pub missing_count: usize,
    pub missing_percent: f64,
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DataProfile {
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<ColumnProfile>,
}

impl DataProfile {
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Data Profile".to_string(),
            "============".to_string(),
            format!("Shape: {} rows x {} columns", self.n_rows, self.n_cols),
            String::new(),
            format!(
                "{:<16} {:<12} {:>8} {:>7} {:>9} {:>9} {:>9}",
                "column", "type", "missing", "%", "min", "mean", "max"
            ),
        ];
        for column in &self.columns {
            lines.push(format!(
                "{:<16} {:<12} {:>8} {:>6.1}% {:>9} {:>9} {:>9}",
                column.name,
                column.column_type.name(),
                column.missing_count,
                column.missing_percent,
                format_stat(column.min),
                format_stat(column.mean),
                format_stat(column.max),
            ));
        }
        lines.join("\n")
    }
}

fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Computes a missing-data and descriptive summary of a table, the
/// inspection step that precedes range validation.
pub struct ProfileAnalyzer;

impl ProfileAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn profile(&self, table: &Table) -> DataProfile {
        let n_rows = table.n_rows();
        let columns = table
            .schema()
            .fields()
            .iter()
            .map(|field| {
                let cells = table
                    .column(&field.name)
                    .expect("profiling the table's own schema");
                let missing_count = cells.iter().filter(|cell| cell.is_missing()).count();
                let missing_percent = if n_rows == 0 {
                    0.0
                } else {
                    missing_count as f64 / n_rows as f64 * 100.0
                };

                let values: Vec<f64> = cells.iter().filter_map(Value::as_float).collect();
                let (min, mean, max) = if values.is_empty() {
                    (None, None, None)
                } else {
                    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    (Some(min), Some(mean), Some(max))
                };

                ColumnProfile {
                    name: field.name.clone(),
                    column_type: field.column_type,
                    missing_count,
                    missing_percent,
                    min,
                    mean,
                    max,
                }
            })
            .collect();

        DataProfile {
            n_rows,
            n_cols: table.n_cols(),
            columns,
        }
    }
}

impl Default for ProfileAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
