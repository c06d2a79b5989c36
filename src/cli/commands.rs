use std::path::Path;

use crate::analyzers::ProfileAnalyzer;
use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::models::{monitoring_schema, Table, Value};
use crate::processors::{AggFn, AggSpec, GroupBy, RangeValidator, Transformer};
use crate::readers::Ingestor;
use crate::utils::constants::{COL_DO, COL_TEMP, COL_TURBIDITY, DO_STRESS_THRESHOLD};
use crate::utils::filename::default_enriched_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::TableWriter;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process {
            input,
            output,
            ranges,
            drop_flagged,
        } => {
            let progress = ProgressReporter::new_spinner("Processing monitoring data...", false);

            let mut ingestor = Ingestor::new();
            let table = ingestor.read_csv(&input, &monitoring_schema())?;
            report_cast_failures(&ingestor, &progress);

            let validator = load_validator(ranges.as_deref())?;
            let report = validator.check(&table)?;
            progress.println(&report.summary());

            let table = if drop_flagged {
                let keep: Vec<bool> = report.flags.iter().map(|flag| !flag).collect();
                table.filter(&keep)?
            } else {
                table
            };

            let enriched = Transformer::standard().apply(&table)?;
            progress.finish_with_message(&format!(
                "Derived {} columns over {} rows",
                enriched.n_cols() - table.n_cols(),
                enriched.n_rows()
            ));

            let output = output.unwrap_or_else(|| default_enriched_filename(&input));
            TableWriter::new().write_table(&enriched, &output)?;
            println!("Enriched table written to {}", output.display());
        }

        Commands::Validate { input, ranges } => {
            let mut ingestor = Ingestor::new();
            let table = ingestor.read_csv(&input, &monitoring_schema())?;

            let validator = load_validator(ranges.as_deref())?;
            let report = validator.check(&table)?;
            println!("{}", report.summary());

            if report.is_clean() {
                println!("All rows within plausible ranges");
            } else {
                println!("\nFlagged rows:");
                print_table(&report.violations);
            }
        }

        Commands::Summarize {
            input,
            group_by,
            json,
        } => {
            let mut ingestor = Ingestor::new();
            let table = ingestor.read_csv(&input, &monitoring_schema())?;

            let grouped = GroupBy::new(&table, &group_by)?;
            let summary = grouped.aggregate(&[
                AggSpec::new(COL_TEMP, AggFn::Mean, "mean_temp"),
                AggSpec::new(COL_DO, AggFn::Mean, "mean_do"),
                AggSpec::new(COL_TURBIDITY, AggFn::Max, "max_turbidity"),
                AggSpec::new(COL_TEMP, AggFn::Count, "n_obs"),
                AggSpec::new(
                    COL_DO,
                    AggFn::PropBelow(DO_STRESS_THRESHOLD),
                    "prop_stressed",
                ),
            ])?;

            if json {
                println!("{}", serde_json::to_string_pretty(&table_to_json(&summary))?);
            } else {
                println!("Summary by {} ({} groups):", group_by, grouped.n_groups());
                print_table(&summary);
            }
        }

        Commands::Profile { input } => {
            let mut ingestor = Ingestor::new();
            let table = ingestor.read_csv(&input, &monitoring_schema())?;
            let profile = ProfileAnalyzer::new().profile(&table);
            println!("{}", profile.summary());
        }
    }

    Ok(())
}

fn load_validator(ranges: Option<&Path>) -> Result<RangeValidator> {
    match ranges {
        Some(path) => RangeValidator::from_json_file(path),
        None => Ok(RangeValidator::new()),
    }
}

fn report_cast_failures(ingestor: &Ingestor, progress: &ProgressReporter) {
    for (column, count) in ingestor.cast_failures() {
        progress.println(&format!(
            "Warning: {} cell(s) in '{}' failed to cast and were treated as missing",
            count, column
        ));
    }
}

fn print_table(table: &Table) {
    let names: Vec<&str> = table.schema().names().collect();
    println!("{}", names.join("\t"));
    for row in 0..table.n_rows() {
        let cells: Vec<String> = table.row(row).iter().map(|cell| cell.to_string()).collect();
        println!("{}", cells.join("\t"));
    }
}

fn table_to_json(table: &Table) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = (0..table.n_rows())
        .map(|row| {
            let entries = table
                .schema()
                .names()
                .zip(table.row(row))
                .map(|(name, cell)| (name.to_string(), cell_to_json(cell)))
                .collect();
            serde_json::Value::Object(entries)
        })
        .collect();
    serde_json::Value::Array(rows)
}

fn cell_to_json(cell: &Value) -> serde_json::Value {
    match cell {
        Value::Missing => serde_json::Value::Null,
        Value::Float(v) => serde_json::json!(v),
        Value::Int(v) => serde_json::json!(v),
        Value::Str(v) => serde_json::json!(v),
        Value::Cat(v) => serde_json::json!(v.as_ref()),
        Value::Date(v) => serde_json::json!(v.format("%Y-%m-%d").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::monitoring_schema;

    #[test]
    fn test_table_to_json_maps_missing_to_null() {
        let data = "\
station,date,temp_c,do_mg_l,ph,turbidity_ntu
CB-5.1,2025-06-15,24.0,NA,7.8,12.0
";
        let table = Ingestor::new()
            .ingest(data.as_bytes(), &monitoring_schema())
            .unwrap();
        let json = table_to_json(&table);

        let row = &json[0];
        assert_eq!(row["station"], "CB-5.1");
        assert_eq!(row["do_mg_l"], serde_json::Value::Null);
        assert_eq!(row["temp_c"], 24.0);
        assert_eq!(row["date"], "2025-06-15");
    }
}
