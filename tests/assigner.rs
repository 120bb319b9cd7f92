//! Integration tests for the bin assigner.

mod common;

use rstest::rstest;

use common::*;
use featbin::testing::contiguous_entries;
use featbin::{
    AssignConfig, AssignError, AssignStats, Assigner, BinTable, BinTableEntry, Boundary, Feature,
    FeatureRecord, OutputMode, Parallelism, UnmatchedPolicy,
};

fn legacy_assigner(config: AssignConfig) -> Assigner {
    Assigner::new(load_table("legacy_overlap.txt"), config).unwrap()
}

fn fired(assigner: &Assigner, name: &str, value: f64) -> Vec<String> {
    assigner
        .assign_feature(&Feature::new(name, value))
        .unwrap()
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

#[rstest]
#[case(Boundary::HalfOpen, 0.0, true)]
#[case(Boundary::HalfOpen, 1.0, false)]
#[case(Boundary::LeftOpen, 0.0, false)]
#[case(Boundary::LeftOpen, 1.0, true)]
fn unit_interval_boundaries(#[case] boundary: Boundary, #[case] value: f64, #[case] fires: bool) {
    let table = BinTable::from_entries([("Foo", BinTableEntry::new("Foo_0.0_1.0", 0.0, 1.0))]).unwrap();
    let config = AssignConfig::builder()
        .boundary(boundary)
        .unmatched(UnmatchedPolicy::Drop)
        .build()
        .unwrap();
    let assigner = Assigner::new(table, config).unwrap();
    assert_eq!(fired(&assigner, "Foo", value) == ["Foo_0.0_1.0"], fires);
}

#[test]
fn unrecognized_feature_aborts_naming_it() {
    let table = BinTable::from_entries(
        contiguous_entries("Foo", &[f64::NEG_INFINITY, 0.0, f64::INFINITY])
            .into_iter()
            .map(|e| ("Foo", e)),
    )
    .unwrap();
    let assigner = Assigner::new(table, AssignConfig::default()).unwrap();
    let err = assigner
        .process("[X] ||| a ||| b ||| Foo=1 Bar=3 ||| 0-0\n".as_bytes(), Vec::new())
        .unwrap_err();
    assert!(err.to_string().contains("Bar"), "{err}");
    assert!(matches!(
        err.innermost(),
        AssignError::SchemaMismatch { feature } if feature == "Bar"
    ));
}

#[rstest]
#[case(Boundary::HalfOpen, 0.916942, &["MaxLexEGivenF_0.5_3.0_Overlap1", "MaxLexEGivenF_0.916942_2.5_Overlap0"])]
#[case(Boundary::LeftOpen, 0.916942, &["MaxLexEGivenF_-0.000000_0.916822_Overlap0", "MaxLexEGivenF_0.5_3.0_Overlap1"])]
#[case(Boundary::HalfOpen, 0.25, &["MaxLexEGivenF_-0.000000_0.916822_Overlap0"])]
#[case(Boundary::HalfOpen, 2.75, &["MaxLexEGivenF_0.5_3.0_Overlap1", "MaxLexEGivenF_2.5_inf_Overlap0"])]
#[case(Boundary::HalfOpen, 9.0, &["MaxLexEGivenF_2.5_inf_Overlap0"])]
fn overlapping_entries_fire_together(
    #[case] boundary: Boundary,
    #[case] value: f64,
    #[case] expected: &[&str],
) {
    let assigner = legacy_assigner(AssignConfig::builder().boundary(boundary).build().unwrap());
    assert_eq!(fired(&assigner, "MaxLexEGivenF", value), expected);
}

#[test]
fn legacy_grammar_stream() {
    let assigner = legacy_assigner(AssignConfig::default());
    let mut out = Vec::new();
    let stats = assigner
        .process(load_records("grammar.txt").as_bytes(), &mut out)
        .unwrap();
    assert_eq!(
        stats,
        AssignStats {
            read: 5,
            written: 3,
            skipped: 2
        }
    );

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "[X] ||| le [X,1] chat ||| the [X,1] cat ||| MaxLexEGivenF_-0.000000_0.916822_Overlap0=1 EGivenFCoherent_lo=1 ||| 0-0 2-2"
    );
    assert_eq!(
        lines[1],
        "[X] ||| maison ||| house ||| MaxLexEGivenF_0.5_3.0_Overlap1=1 MaxLexEGivenF_0.916942_2.5_Overlap0=1 EGivenFCoherent_hi=1 ||| 0-0"
    );
    assert_eq!(
        lines[2],
        "[X] ||| [X,1] bleue ||| blue [X,1] ||| EGivenFCoherent_hi=1 MaxLexEGivenF_0.5_3.0_Overlap1=1 MaxLexEGivenF_2.5_inf_Overlap0=1 ||| 1-0"
    );
}

#[test]
fn real_mode_keeps_value_text() {
    let assigner = legacy_assigner(AssignConfig::builder().mode(OutputMode::Real).build().unwrap());
    let record = FeatureRecord::parse("[X] ||| a ||| b ||| EGivenFCoherent=2.000 ||| 0-0").unwrap();
    let out = assigner.assign_record(&record).unwrap();
    assert_eq!(out.to_string(), "[X] ||| a ||| b ||| EGivenFCoherent_hi=2.000 ||| 0-0");
}

#[test]
fn coverage_gap_reports_line() {
    let table = BinTable::from_entries([("Foo", BinTableEntry::new("Foo_unit", 0.0, 1.0))]).unwrap();
    let assigner = Assigner::new(table, AssignConfig::default()).unwrap();
    let input = "[X] ||| a ||| b ||| Foo=0.5 ||| 0-0\n[X] ||| a ||| b ||| Foo=4 ||| 0-0\n";
    let err = assigner.process(input.as_bytes(), Vec::new()).unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert!(matches!(
        err.innermost(),
        AssignError::CoverageGap { feature, value } if feature == "Foo" && *value == 4.0
    ));
}

#[test]
fn keep_original_then_strip_is_identity() {
    let table = load_table("legacy_overlap.txt");
    let assigner = Assigner::new(
        table.clone(),
        AssignConfig::builder().keep_original(true).build().unwrap(),
    )
    .unwrap();

    for line in load_records("grammar.txt").lines() {
        let Ok(record) = FeatureRecord::parse(line) else {
            continue;
        };
        let assigned = assigner.assign_record(&record).unwrap();
        let stripped: Vec<Feature> = assigned
            .features
            .iter()
            .filter(|f| !table.is_destination(f.name()))
            .cloned()
            .collect();
        assert_eq!(assigned.with_features(stripped), record);
    }
}

#[test]
fn parallel_stream_preserves_order() {
    let cuts: Vec<f64> = std::iter::once(f64::NEG_INFINITY)
        .chain((0..50).map(f64::from))
        .chain(std::iter::once(f64::INFINITY))
        .collect();
    let table = BinTable::from_entries(contiguous_entries("F", &cuts).into_iter().map(|e| ("F", e))).unwrap();

    let input: String = (0..500)
        .map(|i| format!("[X] ||| s{i} ||| t{i} ||| F={} ||| 0-0\n", (i * 7 % 60) as f64 - 5.0))
        .collect();

    let run = |parallelism: Parallelism| {
        let config = AssignConfig::builder()
            .parallelism(parallelism)
            .batch_size(64)
            .build()
            .unwrap();
        let assigner = Assigner::new(table.clone(), config).unwrap();
        let mut out = Vec::new();
        assigner.process(input.as_bytes(), &mut out).unwrap();
        out
    };

    let sequential = run(Parallelism::Sequential);
    let parallel = featbin::run_with_threads(4, run).unwrap();
    assert_eq!(sequential, parallel);
    assert_eq!(String::from_utf8(sequential).unwrap().lines().count(), 500);
}
