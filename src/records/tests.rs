// Record store tests: raw export parsing, normalization round-trips and
// identifier deduplication.

use super::*;
use proptest::prelude::*;
use tempfile::TempDir;

const RAW_HEADER: &str = "modelId,library,datasets_size,co2_eq_emissions,co2_reported,source,training_type,geographical_location,hardware_used,performance_metrics,downloads,likes,library_name,created_at,domain,size,size_efficency,datasets,is_fine_tuned,auto";

fn raw_row(id: &str, datasets: &str, co2: &str, domain: &str, size: &str, auto: &str) -> String {
    format!(
        "{id},transformers,{datasets},{co2},{co2},code_carbon,pretraining,USA,T4,\"{{'accuracy': 0.9, 'f1': 0.8, 'rouge1': nan, 'rougeL': nan}}\",10,1,transformers,2023-01-01,{domain},{size},0.1,glue,False,{auto}"
    )
}

fn raw_csv(rows: &[String]) -> String {
    let mut csv = String::from(RAW_HEADER);
    for row in rows {
        csv.push('\n');
        csv.push_str(row);
    }
    csv.push('\n');
    csv
}

fn sample(id: &str, co2: f64, size: i64, auto: bool) -> CarbonEmission {
    CarbonEmission {
        model_id: id.to_string(),
        datasets_size: 1000,
        co2_emission: co2,
        co2_reported: co2,
        geographical_location: "Frankfurt, Germany".to_string(),
        accuracy: 0.9,
        f1: 0.8,
        rouge_1: 0.5,
        rouge_l: 0.4,
        domain: "nlp".to_string(),
        size,
        auto,
    }
}

#[test]
fn test_raw_row_parses_fixed_columns() {
    let csv = raw_csv(&[raw_row("org/bert-tiny", "12000", "3.5", "nlp", "4400000", "True")]);
    let records = read_records(csv.as_bytes(), CsvLayout::Raw).unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.model_id, "org/bert-tiny");
    assert_eq!(record.datasets_size, 12000);
    assert_eq!(record.co2_emission, 3.5);
    assert_eq!(record.co2_reported, 3.5);
    assert_eq!(record.geographical_location, "USA");
    assert_eq!(record.accuracy, 0.9);
    assert_eq!(record.f1, 0.8);
    assert!(record.rouge_1.is_nan());
    assert_eq!(record.domain, "nlp");
    assert_eq!(record.size, 4_400_000);
    assert!(record.auto);
}

#[test]
fn test_empty_numeric_fields_default_to_zero() {
    let csv = raw_csv(&[raw_row("org/empty", "", "", "vision", "", "False")]);
    let record = &read_records(csv.as_bytes(), CsvLayout::Raw).unwrap()[0];

    assert_eq!(record.datasets_size, 0);
    assert_eq!(record.co2_emission, 0.0);
    assert_eq!(record.size, 0);
    assert!(!record.auto);
}

#[test]
fn test_float_counts_are_truncated() {
    let csv = raw_csv(&[raw_row("org/float", "1500.7", "1.0", "nlp", "1.2e9", "True")]);
    let record = &read_records(csv.as_bytes(), CsvLayout::Raw).unwrap()[0];

    assert_eq!(record.datasets_size, 1500);
    assert_eq!(record.size, 1_200_000_000);
}

#[test]
fn test_auto_token_is_case_sensitive() {
    let csv = raw_csv(&[
        raw_row("a", "1", "1", "nlp", "1", "True"),
        raw_row("b", "1", "1", "nlp", "1", "true"),
        raw_row("c", "1", "1", "nlp", "1", "TRUE"),
        raw_row("d", "1", "1", "nlp", "1", "1"),
    ]);
    let records = read_records(csv.as_bytes(), CsvLayout::Raw).unwrap();
    let flags: Vec<bool> = records.iter().map(|r| r.auto).collect();

    assert_eq!(flags, vec![true, false, false, false]);
}

#[test]
fn test_bad_metrics_blob_is_malformed() {
    let row = raw_row("org/x", "1", "1", "nlp", "1", "True").replace("'f1'", "'f_1'");
    let result = read_records(raw_csv(&[row]).as_bytes(), CsvLayout::Raw);

    match result {
        Err(Error::MalformedRecord { line, .. }) => assert_eq!(line, 2),
        other => panic!("Expected MalformedRecord, got {:?}", other),
    }
}

#[test]
fn test_short_row_is_malformed() {
    let csv = format!("{}\norg/short,transformers,10\n", RAW_HEADER);
    assert!(matches!(
        read_records(csv.as_bytes(), CsvLayout::Raw),
        Err(Error::MalformedRecord { .. })
    ));
}

#[test]
fn test_negative_dataset_size_is_malformed() {
    let csv = raw_csv(&[raw_row("org/neg", "-5", "1", "nlp", "1", "True")]);
    assert!(matches!(
        read_records(csv.as_bytes(), CsvLayout::Raw),
        Err(Error::MalformedRecord { .. })
    ));
}

#[test]
fn test_normalized_header_matches_field_order() {
    let mut buffer = Vec::new();
    write_normalized(&mut buffer, &[sample("m", 1.0, 10, true)]).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let header = text.lines().next().unwrap();

    assert_eq!(
        header,
        "model_id,datasets_size,co2_emission,co2_reported,geographical_location,accuracy,f1,rouge_1,rouge_l,domain,size,auto"
    );
    assert!(text.lines().nth(1).unwrap().ends_with(",True"));
}

#[test]
fn test_dedup_ignores_case_and_whitespace() {
    let records = vec![
        sample("Org/Model", 1.0, 10, true),
        sample("  org/model ", 2.0, 10, false),
    ];
    let set = RecordSet::from_records(records, DuplicatePolicy::LastWins);

    assert_eq!(set.len(), 1);
    assert_eq!(set.as_slice()[0].co2_emission, 2.0);
}

#[test]
fn test_first_wins_policy_keeps_earliest() {
    let records = vec![
        sample("org/model", 1.0, 10, true),
        sample("ORG/MODEL", 2.0, 10, false),
    ];
    let set = RecordSet::from_records(records, DuplicatePolicy::FirstWins);

    assert_eq!(set.len(), 1);
    assert_eq!(set.as_slice()[0].co2_emission, 1.0);
}

#[test]
fn test_dedup_keeps_first_position() {
    let records = vec![
        sample("a", 1.0, 10, true),
        sample("b", 2.0, 10, true),
        sample("A", 3.0, 10, true),
    ];
    let set = RecordSet::from_records(records, DuplicatePolicy::LastWins);
    let ids: Vec<&str> = set.iter().map(|r| r.model_id.as_str()).collect();

    assert_eq!(ids, vec!["A", "b"]);
    assert_eq!(set.as_slice()[0].co2_emission, 3.0);
}

#[test]
fn test_emission_rate_requires_positive_size() {
    assert_eq!(sample("m", 10.0, 5, true).emission_rate(), Some(2.0));
    assert_eq!(sample("m", 10.0, 0, true).emission_rate(), None);
    assert!(!sample("m", 0.0, 5, true).is_rankable());
    assert!(!sample("m", 1.0, -3, true).is_rankable());
}

#[test]
fn test_strip_then_load() {
    let dir = TempDir::new().unwrap();
    let raw_path = dir.path().join("HFCO2.csv");
    let normalized_path = dir.path().join("co2_data.csv");

    std::fs::write(
        &raw_path,
        raw_csv(&[
            raw_row("org/a", "100", "1.5", "nlp", "1000", "True"),
            raw_row("org/b", "200", "2.5", "vision", "2000", "False"),
            raw_row("ORG/A", "300", "3.5", "nlp", "3000", "False"),
        ]),
    )
    .unwrap();

    let written = strip(&raw_path, &normalized_path).unwrap();
    assert_eq!(written, 3);

    let set = load(&normalized_path, CsvLayout::Normalized, DuplicatePolicy::LastWins).unwrap();
    assert_eq!(set.len(), 2);
    let a = &set.as_slice()[0];
    assert_eq!(a.key(), "org/a");
    assert_eq!(a.datasets_size, 300);
    assert!(!a.auto);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let result = load(
        "/nonexistent/co2_data.csv",
        CsvLayout::Normalized,
        DuplicatePolicy::LastWins,
    );
    assert!(matches!(result, Err(Error::Io(_))));
}

fn arb_record() -> impl Strategy<Value = CarbonEmission> {
    (
        "[a-zA-Z0-9/_-]{1,30}",
        0u64..10_000_000_000,
        0.0f64..1.0e9,
        0.0f64..1.0e9,
        "[a-zA-Z ,]{0,20}",
        (0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0),
        "[a-z]{0,10}",
        -10i64..100_000_000_000,
        any::<bool>(),
    )
        .prop_map(
            |(model_id, datasets_size, co2, reported, geo, (acc, f1, r1, rl), domain, size, auto)| {
                CarbonEmission {
                    model_id,
                    datasets_size,
                    co2_emission: co2,
                    co2_reported: reported,
                    geographical_location: geo,
                    accuracy: acc,
                    f1,
                    rouge_1: r1,
                    rouge_l: rl,
                    domain,
                    size,
                    auto,
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_normalized_roundtrip_is_lossless(records in prop::collection::vec(arb_record(), 1..20)) {
        let mut buffer = Vec::new();
        write_normalized(&mut buffer, &records).unwrap();
        let parsed = read_records(buffer.as_slice(), CsvLayout::Normalized).unwrap();

        prop_assert_eq!(parsed, records);
    }

    #[test]
    fn prop_dedup_yields_unique_keys(records in prop::collection::vec(arb_record(), 0..40)) {
        let set = RecordSet::from_records(records.clone(), DuplicatePolicy::LastWins);
        let mut keys: Vec<String> = set.iter().map(|r| r.key()).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();

        prop_assert_eq!(keys.len(), total);
        prop_assert!(set.len() <= records.len());
    }
}
