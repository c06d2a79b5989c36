use std::io::Write;

use tempfile::NamedTempFile;

use wq_processor::models::{monitoring_schema, Value};
use wq_processor::processors::{
    AggFn, AggSpec, GroupBy, Merger, RangeValidator, Reshaper, Transformer,
};
use wq_processor::readers::Ingestor;

const MONITORING_CSV: &str = "\
station,date,temp_c,do_mg_l,ph,turbidity_ntu
CB-5.1,2025-06-15,24.5,1.5,7.8,12.0
CB-5.1,2025-06-16,25.0,6.0,7.9,9.0
CB-5.1,2025-06-17,41.0,5.5,7.7,8.5
CB-5.2,2025-06-15,25.1,NA,8.0,9.5
CB-5.2,2025-06-16,26.0,4.2,5.1,10.0
CB-5.2,2025-06-17,NA,7.1,8.1,11.0
";

#[test]
fn test_full_pipeline_ingest_validate_transform_aggregate() {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{}", MONITORING_CSV).expect("write sample");

    // Ingest
    let mut ingestor = Ingestor::new();
    let table = ingestor
        .read_csv(file.path(), &monitoring_schema())
        .expect("ingest");
    assert_eq!(table.n_rows(), 6);

    // Validate: temp 41 out of range, pH 5.1 out of range; missing cells
    // never contribute
    let report = RangeValidator::new().check(&table).expect("validate");
    assert_eq!(report.flags, vec![false, false, true, false, true, false]);
    assert_eq!(table.n_rows(), 6, "validator must not drop rows");

    // Transform
    let enriched = Transformer::standard().apply(&table).expect("transform");
    let statuses = enriched.column("do_status").expect("do_status");
    assert_eq!(statuses[0], Value::Str("Hypoxic".into()));
    assert_eq!(statuses[3], Value::Str("Unknown".into()));

    let quality = enriched.column("quality_class").expect("quality_class");
    assert_eq!(quality[0], Value::Str("Critical".into()));
    assert_eq!(quality[1], Value::Str("Good".into()));
    assert_eq!(quality[5], Value::Str("Unknown".into()));

    // Aggregate
    let grouped = GroupBy::new(&enriched, "station").expect("group");
    let summary = grouped
        .aggregate(&[
            AggSpec::new("do_mg_l", AggFn::Mean, "mean_do"),
            AggSpec::new("do_mg_l", AggFn::PropBelow(5.0), "prop_stressed"),
            AggSpec::new("temp_c", AggFn::Count, "n_temp"),
        ])
        .expect("aggregate");

    assert_eq!(summary.n_rows(), 2);
    let sizes: usize = grouped.group_sizes().sum();
    assert_eq!(sizes, enriched.n_rows());

    // CB-5.1 DO: 1.5, 6.0, 5.5
    let means = summary.column("mean_do").expect("mean_do");
    assert!((means[0].as_float().unwrap() - 13.0 / 3.0).abs() < 1e-12);

    // Broadcast equals the group's own reduction, row order preserved
    let broadcast = grouped.broadcast("do_mg_l", AggFn::Mean).expect("broadcast");
    assert_eq!(broadcast.len(), enriched.n_rows());
    assert_eq!(broadcast[0], means[0]);
    assert_eq!(broadcast[4], means[1]);
}

#[test]
fn test_do_classification_scenario() {
    let data = "\
station,date,temp_c,do_mg_l,ph,turbidity_ntu
S1,2025-06-15,24.0,1.5,7.8,12.0
S1,2025-06-16,25.0,6.0,7.9,9.0
S2,2025-06-15,26.0,NA,8.0,10.0
";
    let table = Ingestor::new()
        .ingest(data.as_bytes(), &monitoring_schema())
        .expect("ingest");

    let enriched = Transformer::standard().apply(&table).expect("transform");
    let quality = enriched.column("quality_class").expect("quality_class");
    assert_eq!(
        quality,
        &[
            Value::Str("Critical".into()),
            Value::Str("Good".into()),
            Value::Str("Unknown".into()),
        ]
    );

    let grouped = GroupBy::new(&table, "station").expect("group");
    let summary = grouped
        .aggregate(&[
            AggSpec::new("do_mg_l", AggFn::Mean, "mean_do"),
            AggSpec::new("do_mg_l", AggFn::PropBelow(5.0), "prop_below"),
        ])
        .expect("aggregate");

    let means = summary.column("mean_do").expect("mean_do");
    assert!((means[0].as_float().unwrap() - 3.75).abs() < 1e-12);
    let props = summary.column("prop_below").expect("prop_below");
    assert!((props[0].as_float().unwrap() - 0.5).abs() < 1e-12);
    assert_eq!(props[1], Value::Missing);
}

#[test]
fn test_melt_pivot_round_trip_scenario() {
    let data = "\
station,jan,jul
CB-5.1,4.2,26.8
CB-5.2,3.8,27.1
";
    use wq_processor::models::{ColumnType, Field, Schema};
    let schema = Schema::new(vec![
        Field::new("station", ColumnType::Categorical),
        Field::new("jan", ColumnType::Float),
        Field::new("jul", ColumnType::Float),
    ]);
    let wide = Ingestor::new()
        .ingest(data.as_bytes(), &schema)
        .expect("ingest");

    let long = Reshaper::melt(&wide, &["station"], &["jan", "jul"], "month", "temperature")
        .expect("melt");
    assert_eq!(long.n_rows(), wide.n_rows() * 2);

    let back = Reshaper::pivot(&long, &["station"], "month", "temperature").expect("pivot");
    assert_eq!(back, wide);
}

#[test]
fn test_join_scenario_left_and_inner() {
    use wq_processor::models::{ColumnType, Field, Schema, Table};

    let stations: Vec<Value> = (1..=10)
        .map(|i| Value::Str(format!("S{}", i)))
        .collect();
    let readings = Table::new(
        Schema::new(vec![
            Field::new("station", ColumnType::Str),
            Field::new("do_mg_l", ColumnType::Float),
        ]),
        vec![
            stations,
            (1..=10).map(|i| Value::Float(i as f64)).collect(),
        ],
    )
    .expect("left table");

    let metadata = Table::new(
        Schema::new(vec![
            Field::new("station", ColumnType::Str),
            Field::new("region", ColumnType::Str),
        ]),
        vec![
            (1..=7).map(|i| Value::Str(format!("S{}", i))).collect(),
            (1..=7).map(|_| Value::Str("Main Stem".into())).collect(),
        ],
    )
    .expect("right table");

    let left = Merger::left()
        .join(&readings, &metadata, &["station"])
        .expect("left join");
    assert_eq!(left.n_rows(), 10);
    let unmatched = left
        .column("region")
        .expect("region")
        .iter()
        .filter(|cell| cell.is_missing())
        .count();
    assert_eq!(unmatched, 3);

    let inner = Merger::inner()
        .join(&readings, &metadata, &["station"])
        .expect("inner join");
    assert_eq!(inner.n_rows(), 7);
}

#[test]
fn test_transformer_idempotent_over_full_pipeline() {
    let table = Ingestor::new()
        .ingest(MONITORING_CSV.as_bytes(), &monitoring_schema())
        .expect("ingest");
    let transformer = Transformer::standard();
    let once = transformer.apply(&table).expect("first pass");
    let twice = transformer.apply(&once).expect("second pass");
    assert_eq!(once, twice);
}

#[test]
fn test_rank_invariant_over_stations() {
    let table = Ingestor::new()
        .ingest(MONITORING_CSV.as_bytes(), &monitoring_schema())
        .expect("ingest");
    let grouped = GroupBy::new(&table, "station").expect("group");
    let ranks = grouped.rank("do_mg_l", true).expect("rank");

    // Each station has 3 rows; its ranks are a permutation of 1..=3
    let mut s1: Vec<i64> = [0usize, 1, 2]
        .iter()
        .map(|&row| match ranks[row] {
            Value::Int(r) => r,
            _ => panic!("expected integer rank"),
        })
        .collect();
    s1.sort_unstable();
    assert_eq!(s1, vec![1, 2, 3]);

    let mut s2: Vec<i64> = [3usize, 4, 5]
        .iter()
        .map(|&row| match ranks[row] {
            Value::Int(r) => r,
            _ => panic!("expected integer rank"),
        })
        .collect();
    s2.sort_unstable();
    assert_eq!(s2, vec![1, 2, 3]);

    // The missing DO reading at row 3 orders last in its group
    assert_eq!(ranks[3], Value::Int(3));
}
