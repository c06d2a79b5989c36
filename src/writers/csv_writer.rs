use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::models::{Table, Value};

/// Writes a table back to delimited text. Missing cells are written as the
/// "NA" token so the output round-trips through the ingestor.
pub struct TableWriter {
    delimiter: u8,
    missing_token: String,
}

impl TableWriter {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            missing_token: "NA".to_string(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_missing_token(mut self, token: &str) -> Self {
        self.missing_token = token.to_string();
        self
    }

    pub fn write_table(&self, table: &Table, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        self.write_to(table, file)?;
        info!(rows = table.n_rows(), file = %path.display(), "wrote table");
        Ok(())
    }

    pub fn write_to<W: Write>(&self, table: &Table, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);

        csv_writer.write_record(table.schema().names())?;
        for row in 0..table.n_rows() {
            let cells: Vec<String> = table
                .row(row)
                .into_iter()
                .map(|cell| match cell {
                    Value::Missing => self.missing_token.clone(),
                    other => other.to_string(),
                })
                .collect();
            csv_writer.write_record(&cells)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::monitoring_schema;
    use crate::readers::Ingestor;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
station,date,temp_c,do_mg_l,ph,turbidity_ntu
CB-5.1,2025-06-15,24.5,6.8,7.8,12.0
CB-5.2,2025-06-16,NA,5.2,7.9,9.5
";

    #[test]
    fn test_written_table_round_trips_through_ingestor() -> Result<()> {
        let schema = monitoring_schema();
        let mut ingestor = Ingestor::new();
        let table = ingestor.ingest(SAMPLE.as_bytes(), &schema)?;

        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");
        TableWriter::new().write_table(&table, &path)?;

        let mut again = Ingestor::new();
        let reread = again.read_csv(&path, &schema)?;
        assert_eq!(reread.n_rows(), table.n_rows());
        assert_eq!(
            reread.column("temp_c").unwrap(),
            table.column("temp_c").unwrap()
        );
        assert_eq!(reread.column("temp_c").unwrap()[1], Value::Missing);
        Ok(())
    }

    #[test]
    fn test_write_to_buffer() -> Result<()> {
        let schema = monitoring_schema();
        let mut ingestor = Ingestor::new();
        let table = ingestor.ingest(SAMPLE.as_bytes(), &schema)?;

        let mut buffer = Vec::new();
        TableWriter::new().write_to(&table, &mut buffer)?;
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("station,date,temp_c"));
        assert!(text.contains("CB-5.2,2025-06-16,NA,5.2"));
        Ok(())
    }
}
