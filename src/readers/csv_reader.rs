use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{CategoryDict, ColumnType, Field, Schema, Table, Value};
use crate::utils::constants::{DATE_FORMAT, MISSING_TOKENS};

/// Parses delimited monitoring files into typed observation tables.
///
/// Recognized missing tokens become the missing marker, and a cell that
/// fails to cast to its declared type also degrades to missing (counted,
/// logged, never fatal) so one malformed cell cannot abort a file.
///
/// The ingestor owns the [`CategoryDict`] for categorical columns; every
/// table it produces shares the same interned labels, so station identity
/// is reference-equal across all downstream stages.
pub struct Ingestor {
    missing_tokens: HashSet<String>,
    delimiter: u8,
    dict: CategoryDict,
    cast_failures: HashMap<String, usize>,
}

impl Ingestor {
    pub fn new() -> Self {
        Self {
            missing_tokens: MISSING_TOKENS.iter().map(|t| t.to_string()).collect(),
            delimiter: b',',
            dict: CategoryDict::new(),
            cast_failures: HashMap::new(),
        }
    }

    pub fn with_missing_tokens(tokens: &[&str]) -> Self {
        Self {
            missing_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read a delimited file into a table typed by `schema`.
    pub fn read_csv(&mut self, path: &Path, schema: &Schema) -> Result<Table> {
        let file = File::open(path)?;
        let table = self.ingest(file, schema)?;
        info!(
            rows = table.n_rows(),
            file = %path.display(),
            "ingested monitoring file"
        );
        Ok(table)
    }

    /// Ingest delimited text from any reader. The header row must contain
    /// every schema column; extra columns are ignored.
    pub fn ingest<R: Read>(&mut self, reader: R, schema: &Schema) -> Result<Table> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut positions = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            let position = headers
                .iter()
                .position(|h| h == field.name)
                .ok_or_else(|| {
                    PipelineError::SchemaMismatch(format!(
                        "input is missing column '{}'",
                        field.name
                    ))
                })?;
            positions.push(position);
        }

        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); schema.len()];
        for record in csv_reader.records() {
            let record = record?;
            for (column, (field, &position)) in columns
                .iter_mut()
                .zip(schema.fields().iter().zip(&positions))
            {
                let raw = record.get(position).unwrap_or("");
                column.push(self.cast_cell(raw, field));
            }
        }

        Table::new(schema.clone(), columns)
    }

    fn cast_cell(&mut self, raw: &str, field: &Field) -> Value {
        if self.missing_tokens.contains(raw) {
            return Value::Missing;
        }

        let cast = match field.column_type {
            ColumnType::Float => raw.parse::<f64>().ok().map(Value::Float),
            ColumnType::Int => raw.parse::<i64>().ok().map(Value::Int),
            ColumnType::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .map(Value::Date),
            ColumnType::Categorical => Some(Value::Cat(self.dict.intern(raw))),
            ColumnType::Str => Some(Value::Str(raw.to_string())),
        };

        match cast {
            Some(value) => value,
            None => {
                debug!(
                    column = %field.name,
                    cell = raw,
                    "cell failed to cast to {}, treated as missing",
                    field.column_type.name()
                );
                *self.cast_failures.entry(field.name.clone()).or_insert(0) += 1;
                Value::Missing
            }
        }
    }

    /// Stable station code <-> label mapping built during ingestion.
    pub fn dictionary(&self) -> &CategoryDict {
        &self.dict
    }

    /// Per-column counts of cells that failed to cast.
    pub fn cast_failures(&self) -> &HashMap<String, usize> {
        &self.cast_failures
    }
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::monitoring_schema;
    use crate::utils::constants::{COL_DATE, COL_DO, COL_STATION, COL_TEMP};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
station,date,temp_c,do_mg_l,ph,turbidity_ntu
CB-5.1,2025-06-15,24.5,6.8,7.8,12.0
CB-5.1,2025-06-16,NA,5.2,7.9,-999
CB-5.2,2025-06-15,25.1,N/A,8.0,9.5
";

    #[test]
    fn test_ingest_types_and_missing_tokens() {
        let mut ingestor = Ingestor::new();
        let table = ingestor
            .ingest(SAMPLE.as_bytes(), &monitoring_schema())
            .unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(
            table.column(COL_DATE).unwrap()[0],
            Value::Date(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
        );
        assert_eq!(table.column(COL_TEMP).unwrap()[1], Value::Missing);
        assert_eq!(table.column(COL_DO).unwrap()[2], Value::Missing);
        assert_eq!(table.column("turbidity_ntu").unwrap()[1], Value::Missing);
    }

    #[test]
    fn test_station_labels_are_interned_once() {
        let mut ingestor = Ingestor::new();
        let table = ingestor
            .ingest(SAMPLE.as_bytes(), &monitoring_schema())
            .unwrap();

        let stations = table.column(COL_STATION).unwrap();
        let (Value::Cat(first), Value::Cat(second)) = (&stations[0], &stations[1]) else {
            panic!("expected categorical station cells");
        };
        assert!(std::sync::Arc::ptr_eq(first, second));
        assert_eq!(ingestor.dictionary().code_of("CB-5.1"), Some(0));
        assert_eq!(ingestor.dictionary().code_of("CB-5.2"), Some(1));
    }

    #[test]
    fn test_cast_failure_degrades_to_missing() {
        let data = "\
station,date,temp_c,do_mg_l,ph,turbidity_ntu
CB-5.1,not-a-date,twenty,6.8,7.8,12.0
";
        let mut ingestor = Ingestor::new();
        let table = ingestor.ingest(data.as_bytes(), &monitoring_schema()).unwrap();

        assert_eq!(table.column(COL_DATE).unwrap()[0], Value::Missing);
        assert_eq!(table.column(COL_TEMP).unwrap()[0], Value::Missing);
        assert_eq!(ingestor.cast_failures().get(COL_DATE), Some(&1));
        assert_eq!(ingestor.cast_failures().get(COL_TEMP), Some(&1));
    }

    #[test]
    fn test_missing_header_column_is_fatal() {
        let data = "station,date\nCB-5.1,2025-06-15\n";
        let mut ingestor = Ingestor::new();
        let result = ingestor.ingest(data.as_bytes(), &monitoring_schema());
        assert!(matches!(result, Err(PipelineError::SchemaMismatch(_))));
    }

    #[test]
    fn test_read_csv_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{}", SAMPLE)?;

        let mut ingestor = Ingestor::new();
        let table = ingestor.read_csv(file.path(), &monitoring_schema())?;
        assert_eq!(table.n_rows(), 3);
        Ok(())
    }

    #[test]
    fn test_custom_missing_tokens() {
        let data = "station,date,temp_c,do_mg_l,ph,turbidity_ntu\nCB-5.1,2025-06-15,missing,6.8,7.8,12.0\n";
        let mut ingestor = Ingestor::with_missing_tokens(&["missing"]);
        let table = ingestor.ingest(data.as_bytes(), &monitoring_schema()).unwrap();

        assert_eq!(table.column(COL_TEMP).unwrap()[0], Value::Missing);
        // Not counted as a cast failure, it was a recognized token
        assert!(ingestor.cast_failures().is_empty());
    }
}
