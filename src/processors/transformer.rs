use chrono::Datelike;
use tracing::debug;

use crate::error::Result;
use crate::models::{ColumnType, Field, Table, Value};
use crate::utils::constants::{
    COL_DATE, COL_DO, COL_TEMP, COL_TURBIDITY, DO_ADEQUATE_THRESHOLD, DO_HYPOXIC_THRESHOLD,
    DO_STRESS_THRESHOLD, HEAT_STRESS_TEMP, QUALITY_CRITICAL, QUALITY_GOOD, QUALITY_HEAT_STRESS,
    STATUS_ADEQUATE, STATUS_HEALTHY, STATUS_HYPOXIC, STATUS_STRESSED, STATUS_UNKNOWN,
};
use crate::utils::units::saturation_deficit;

/// An ordered set of threshold predicates, evaluated top to bottom with
/// first match winning. The missing bucket takes priority over every
/// numeric predicate; the default bucket is the healthiest category.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    missing_label: &'static str,
    buckets: Vec<(f64, &'static str)>,
    default_label: &'static str,
}

impl StatusClassifier {
    pub fn new(
        missing_label: &'static str,
        buckets: Vec<(f64, &'static str)>,
        default_label: &'static str,
    ) -> Self {
        Self {
            missing_label,
            buckets,
            default_label,
        }
    }

    /// The standard five-bucket dissolved-oxygen classifier.
    pub fn do_status() -> Self {
        Self::new(
            STATUS_UNKNOWN,
            vec![
                (DO_HYPOXIC_THRESHOLD, STATUS_HYPOXIC),
                (DO_STRESS_THRESHOLD, STATUS_STRESSED),
                (DO_ADEQUATE_THRESHOLD, STATUS_ADEQUATE),
            ],
            STATUS_HEALTHY,
        )
    }

    pub fn classify(&self, value: Option<f64>) -> &'static str {
        let Some(value) = value else {
            return self.missing_label;
        };
        for (threshold, label) in &self.buckets {
            if value < *threshold {
                return label;
            }
        }
        self.default_label
    }
}

/// A derived column specification. Each derivation reads existing columns
/// and produces exactly one new column; the input table is never mutated.
#[derive(Debug, Clone)]
pub enum Derivation {
    /// `target = source * factor + offset` (invertible linear transform)
    LinearConvert {
        source: String,
        target: String,
        factor: f64,
        offset: f64,
    },
    /// Natural log; non-positive input degrades to missing
    NaturalLog { source: String, target: String },
    /// Five-bucket DO status classification
    DoStatus { source: String, target: String },
    /// Four-bucket DO + temperature classification with a heat-stress branch
    QualityClass {
        do_col: String,
        temp_col: String,
        target: String,
    },
    /// Full month name of a date column
    MonthName { source: String, target: String },
    /// Ordinal day within the year
    DayOfYear { source: String, target: String },
    /// Days elapsed since the earliest date in this table instance.
    /// Offsets shift if the table was filtered upstream; intentional.
    DaysSinceStart { source: String, target: String },
    /// `(x - mean) / sd` with the sample standard deviation (n - 1)
    ZScore { source: String, target: String },
    /// DO saturation deficit from measured DO and temperature
    SaturationDeficit {
        do_col: String,
        temp_col: String,
        target: String,
    },
}

impl Derivation {
    fn target(&self) -> &str {
        match self {
            Derivation::LinearConvert { target, .. }
            | Derivation::NaturalLog { target, .. }
            | Derivation::DoStatus { target, .. }
            | Derivation::QualityClass { target, .. }
            | Derivation::MonthName { target, .. }
            | Derivation::DayOfYear { target, .. }
            | Derivation::DaysSinceStart { target, .. }
            | Derivation::ZScore { target, .. }
            | Derivation::SaturationDeficit { target, .. } => target,
        }
    }
}

/// Applies derivation specs to a validated table, appending derived columns
/// while preserving the originals. Re-applying the same specs yields
/// identical columns.
pub struct Transformer {
    derivations: Vec<Derivation>,
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            derivations: Vec::new(),
        }
    }

    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivations.push(derivation);
        self
    }

    /// The standard enrichment set for monitoring tables: Fahrenheit
    /// temperature, DO percent saturation, log turbidity, both status
    /// classifications, calendar fields and the temperature z-score.
    pub fn standard() -> Self {
        Self::new()
            .with_derivation(Derivation::LinearConvert {
                source: COL_TEMP.into(),
                target: "temp_f".into(),
                factor: 9.0 / 5.0,
                offset: 32.0,
            })
            .with_derivation(Derivation::LinearConvert {
                source: COL_DO.into(),
                target: "do_percent_sat".into(),
                factor: 12.5,
                offset: 0.0,
            })
            .with_derivation(Derivation::NaturalLog {
                source: COL_TURBIDITY.into(),
                target: "log_turbidity".into(),
            })
            .with_derivation(Derivation::DoStatus {
                source: COL_DO.into(),
                target: "do_status".into(),
            })
            .with_derivation(Derivation::QualityClass {
                do_col: COL_DO.into(),
                temp_col: COL_TEMP.into(),
                target: "quality_class".into(),
            })
            .with_derivation(Derivation::MonthName {
                source: COL_DATE.into(),
                target: "month".into(),
            })
            .with_derivation(Derivation::DayOfYear {
                source: COL_DATE.into(),
                target: "day_of_year".into(),
            })
            .with_derivation(Derivation::DaysSinceStart {
                source: COL_DATE.into(),
                target: "days_since_start".into(),
            })
            .with_derivation(Derivation::ZScore {
                source: COL_TEMP.into(),
                target: "temp_zscore".into(),
            })
    }

    pub fn apply(&self, table: &Table) -> Result<Table> {
        let mut result = table.clone();
        for derivation in &self.derivations {
            let (field, values) = self.derive(&result, derivation)?;
            debug!(column = %field.name, "derived column");
            result = result.with_column(field, values)?;
        }
        Ok(result)
    }

    fn derive(&self, table: &Table, derivation: &Derivation) -> Result<(Field, Vec<Value>)> {
        let target = derivation.target();
        match derivation {
            Derivation::LinearConvert {
                source,
                factor,
                offset,
                ..
            } => {
                let values = map_floats(table.column(source)?, |x| Some(x * factor + offset));
                Ok((Field::new(target, ColumnType::Float), values))
            }

            Derivation::NaturalLog { source, .. } => {
                let values = map_floats(table.column(source)?, |x| {
                    (x > 0.0).then(|| x.ln())
                });
                Ok((Field::new(target, ColumnType::Float), values))
            }

            Derivation::DoStatus { source, .. } => {
                let classifier = StatusClassifier::do_status();
                let values = table
                    .column(source)?
                    .iter()
                    .map(|cell| Value::Str(classifier.classify(cell.as_float()).to_string()))
                    .collect();
                Ok((Field::new(target, ColumnType::Str), values))
            }

            Derivation::QualityClass {
                do_col, temp_col, ..
            } => {
                let do_column = table.column(do_col)?;
                let temp_column = table.column(temp_col)?;
                let values = do_column
                    .iter()
                    .zip(temp_column)
                    .map(|(do_cell, temp_cell)| {
                        let label = classify_quality(do_cell.as_float(), temp_cell.as_float());
                        Value::Str(label.to_string())
                    })
                    .collect();
                Ok((Field::new(target, ColumnType::Str), values))
            }

            Derivation::MonthName { source, .. } => {
                let values = table
                    .column(source)?
                    .iter()
                    .map(|cell| match cell.as_date() {
                        Some(date) => Value::Str(date.format("%B").to_string()),
                        None => Value::Missing,
                    })
                    .collect();
                Ok((Field::new(target, ColumnType::Str), values))
            }

            Derivation::DayOfYear { source, .. } => {
                let values = table
                    .column(source)?
                    .iter()
                    .map(|cell| match cell.as_date() {
                        Some(date) => Value::Int(date.ordinal() as i64),
                        None => Value::Missing,
                    })
                    .collect();
                Ok((Field::new(target, ColumnType::Int), values))
            }

            Derivation::DaysSinceStart { source, .. } => {
                let column = table.column(source)?;
                let start = column.iter().filter_map(Value::as_date).min();
                let values = column
                    .iter()
                    .map(|cell| match (cell.as_date(), start) {
                        (Some(date), Some(start)) => {
                            Value::Int((date - start).num_days())
                        }
                        _ => Value::Missing,
                    })
                    .collect();
                Ok((Field::new(target, ColumnType::Int), values))
            }

            Derivation::ZScore { source, .. } => {
                let column = table.column(source)?;
                let values = match sample_stats(column) {
                    Some((mean, sd)) if sd > 0.0 => map_floats(column, |x| Some((x - mean) / sd)),
                    // Fewer than two observations, or zero spread: the
                    // z-score is undefined, never infinite.
                    _ => vec![Value::Missing; column.len()],
                };
                Ok((Field::new(target, ColumnType::Float), values))
            }

            Derivation::SaturationDeficit {
                do_col, temp_col, ..
            } => {
                let do_column = table.column(do_col)?;
                let temp_column = table.column(temp_col)?;
                let values = do_column
                    .iter()
                    .zip(temp_column)
                    .map(|(do_cell, temp_cell)| {
                        match (do_cell.as_float(), temp_cell.as_float()) {
                            (Some(do_value), Some(temp)) => {
                                Value::Float(saturation_deficit(do_value, temp))
                            }
                            _ => Value::Missing,
                        }
                    })
                    .collect();
                Ok((Field::new(target, ColumnType::Float), values))
            }
        }
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Four-bucket DO + temperature classification: missing first, then DO
/// severity, then heat stress, default healthy.
pub fn classify_quality(do_mg_l: Option<f64>, temp_c: Option<f64>) -> &'static str {
    let (Some(do_value), Some(temp)) = (do_mg_l, temp_c) else {
        return STATUS_UNKNOWN;
    };
    if do_value < DO_HYPOXIC_THRESHOLD {
        QUALITY_CRITICAL
    } else if do_value < DO_STRESS_THRESHOLD {
        STATUS_STRESSED
    } else if temp > HEAT_STRESS_TEMP {
        QUALITY_HEAT_STRESS
    } else {
        QUALITY_GOOD
    }
}

fn map_floats<F>(column: &[Value], f: F) -> Vec<Value>
where
    F: Fn(f64) -> Option<f64>,
{
    column
        .iter()
        .map(|cell| match cell.as_float() {
            Some(x) => f(x).map_or(Value::Missing, Value::Float),
            None => Value::Missing,
        })
        .collect()
}

/// Mean and sample standard deviation (n - 1 denominator) of the
/// non-missing cells. `None` when fewer than two observations exist.
fn sample_stats(column: &[Value]) -> Option<(f64, f64)> {
    let values: Vec<f64> = column.iter().filter_map(Value::as_float).collect();
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}
