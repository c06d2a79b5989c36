use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::models::{Table, Truth, Value};
use crate::utils::constants::{COL_DO, COL_PH, COL_TEMP, DO_RANGE, PH_RANGE, TEMP_RANGE};

/// A plausible physical range for one measurement column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_ordered"))]
pub struct PlausibleRange {
    pub min: f64,
    pub max: f64,
}

impl PlausibleRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

fn validate_ordered(range: &PlausibleRange) -> std::result::Result<(), ValidationError> {
    if range.min >= range.max {
        return Err(ValidationError::new("min_not_below_max"));
    }
    Ok(())
}

/// Flags rows whose measurements fall outside plausible physical ranges.
///
/// A row is flagged when any configured column violates its range under
/// three-valued logic; a missing measurement contributes `Unknown`, which
/// never counts as a violation. The validator never drops rows — it returns
/// the flags and the flagged subset, and dropping is the caller's decision.
pub struct RangeValidator {
    ranges: Vec<(String, PlausibleRange)>,
}

impl RangeValidator {
    /// Default ranges: temperature 0-35 C, dissolved oxygen 0-15 mg/L,
    /// pH 6-9.
    pub fn new() -> Self {
        Self {
            ranges: vec![
                (COL_TEMP.to_string(), PlausibleRange::new(TEMP_RANGE.0, TEMP_RANGE.1)),
                (COL_DO.to_string(), PlausibleRange::new(DO_RANGE.0, DO_RANGE.1)),
                (COL_PH.to_string(), PlausibleRange::new(PH_RANGE.0, PH_RANGE.1)),
            ],
        }
    }

    pub fn with_ranges(ranges: Vec<(String, PlausibleRange)>) -> Result<Self> {
        for (_, range) in &ranges {
            range.validate()?;
        }
        Ok(Self { ranges })
    }

    /// Load ranges from a JSON file: `{"temp_c": {"min": 0, "max": 35}, ...}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let parsed: BTreeMap<String, PlausibleRange> = serde_json::from_reader(file)?;
        Self::with_ranges(parsed.into_iter().collect())
    }

    pub fn ranges(&self) -> &[(String, PlausibleRange)] {
        &self.ranges
    }

    /// Compute per-row validity flags. Deterministic and side-effect-free.
    pub fn check(&self, table: &Table) -> Result<ValidationReport> {
        let mut flags = vec![false; table.n_rows()];
        let mut column_violations = Vec::with_capacity(self.ranges.len());

        for (name, range) in &self.ranges {
            let Ok(column) = table.column(name) else {
                warn!(column = %name, "configured range for a column not in the table, skipped");
                continue;
            };
            let min = Value::Float(range.min);
            let max = Value::Float(range.max);

            let mut violations = 0usize;
            for (flag, cell) in flags.iter_mut().zip(column) {
                let out_of_range = cell.lt(&min).or(cell.gt(&max));
                if out_of_range.is_true() {
                    violations += 1;
                    *flag = true;
                }
                debug_assert!(out_of_range != Truth::True || !cell.is_missing());
            }
            column_violations.push((name.clone(), violations));
        }

        let violations = table.filter(&flags)?;
        debug!(
            flagged = violations.n_rows(),
            total = table.n_rows(),
            "range validation complete"
        );

        Ok(ValidationReport {
            total_rows: table.n_rows(),
            flags,
            violations,
            column_violations,
        })
    }
}

impl Default for RangeValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a range check: flags aligned with the input rows, the flagged
/// subset, and per-column violation counts.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub total_rows: usize,
    pub flags: Vec<bool>,
    pub violations: Table,
    pub column_violations: Vec<(String, usize)>,
}

impl ValidationReport {
    pub fn violation_count(&self) -> usize {
        self.violations.n_rows()
    }

    pub fn is_clean(&self) -> bool {
        self.violation_count() == 0
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Range Validation Report".to_string(),
            "=======================".to_string(),
            format!("Total rows:     {}", self.total_rows),
            format!("Flagged rows:   {}", self.violation_count()),
        ];
        for (column, count) in &self.column_violations {
            lines.push(format!("  {:<14} {} violation(s)", column, count));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::monitoring_schema;
    use crate::readers::Ingestor;

    fn sample_table() -> Table {
        let data = "\
station,date,temp_c,do_mg_l,ph,turbidity_ntu
CB-5.1,2025-06-15,24.5,6.8,7.8,12.0
CB-5.1,2025-06-16,41.0,5.2,7.9,9.0
CB-5.2,2025-06-15,NA,-2.0,5.1,9.5
CB-5.2,2025-06-16,NA,NA,NA,NA
";
        Ingestor::new()
            .ingest(data.as_bytes(), &monitoring_schema())
            .unwrap()
    }

    #[test]
    fn test_flags_out_of_range_rows() {
        let report = RangeValidator::new().check(&sample_table()).unwrap();

        // Row 1: temp 41 > 35. Row 2: DO -2 < 0 and pH 5.1 < 6.
        assert_eq!(report.flags, vec![false, true, true, false]);
        assert_eq!(report.violation_count(), 2);
        assert_eq!(report.column_violations[0], (COL_TEMP.to_string(), 1));
        assert_eq!(report.column_violations[1], (COL_DO.to_string(), 1));
        assert_eq!(report.column_violations[2], (COL_PH.to_string(), 1));
    }

    #[test]
    fn test_missing_measurement_never_violates() {
        let report = RangeValidator::new().check(&sample_table()).unwrap();
        // Row 3 is all-missing and must not be flagged.
        assert!(!report.flags[3]);
    }

    #[test]
    fn test_validator_keeps_full_table() {
        let table = sample_table();
        let report = RangeValidator::new().check(&table).unwrap();
        // The input is untouched; the report only carries the flagged subset.
        assert_eq!(table.n_rows(), 4);
        assert_eq!(report.violations.n_rows(), 2);
        assert_eq!(report.violations.schema(), table.schema());
    }

    #[test]
    fn test_unconfigured_column_contributes_nothing() {
        let validator = RangeValidator::with_ranges(vec![(
            COL_PH.to_string(),
            PlausibleRange::new(6.0, 9.0),
        )])
        .unwrap();
        let report = validator.check(&sample_table()).unwrap();
        // Only the pH violation remains; temp 41 is no longer checked.
        assert_eq!(report.flags, vec![false, false, true, false]);
    }

    #[test]
    fn test_range_for_absent_column_is_skipped() {
        let validator = RangeValidator::with_ranges(vec![(
            "salinity_psu".to_string(),
            PlausibleRange::new(0.0, 40.0),
        )])
        .unwrap();
        let report = validator.check(&sample_table()).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let result = RangeValidator::with_ranges(vec![(
            COL_TEMP.to_string(),
            PlausibleRange::new(35.0, 0.0),
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_is_deterministic() {
        let table = sample_table();
        let validator = RangeValidator::new();
        let first = validator.check(&table).unwrap();
        let second = validator.check(&table).unwrap();
        assert_eq!(first.flags, second.flags);
    }
}
