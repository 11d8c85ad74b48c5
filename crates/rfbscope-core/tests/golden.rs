use std::fs;
use std::path::Path;

use rfbscope_core::{AnalysisOptions, Report, analyze_stream_file};

fn load_expected_report(dir: &str) -> Report {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");
    let expected_path = root.join(dir).join("expected_report.json");

    let expected_json = fs::read_to_string(&expected_path).expect("read expected_report.json");
    serde_json::from_str(&expected_json).expect("parse expected report")
}

fn run_golden(dir: &str) {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");
    let input = root.join(dir).join("input.bin");
    let expected = load_expected_report(dir);

    let mut actual = analyze_stream_file(&input, &AnalysisOptions::default(), log::logger())
        .expect("analyze stream");
    actual.generated_at = expected.generated_at.clone();
    actual.input.path = expected.input.path.clone();

    let actual_value = serde_json::to_value(actual).expect("serialize actual");
    let expected_value = serde_json::to_value(expected).expect("serialize expected");

    assert_eq!(actual_value, expected_value, "golden mismatch in {dir}");
}

#[test]
fn golden_mixed() {
    run_golden("tests/golden/mixed");
}

#[test]
fn golden_truncated() {
    run_golden("tests/golden/truncated");
}

#[test]
fn golden_unsupported_encoding() {
    run_golden("tests/golden/unsupported_encoding");
}

#[test]
fn golden_color_map_wrap() {
    run_golden("tests/golden/color_map_wrap");
}

#[test]
fn golden_truncated_records_failure_position() {
    let report = load_expected_report("tests/golden/truncated");
    let failure = report.failure.expect("failure");
    assert_eq!(failure.message_index, 1);
    assert_eq!(failure.offset, 1);
    assert_eq!(failure.code, "truncated");
    assert!(report.color_map.is_none());
}

#[test]
fn golden_color_map_wrap_counts_wrapped_update() {
    let report = load_expected_report("tests/golden/color_map_wrap");
    let color_map = report.color_map.expect("color map");
    assert_eq!(color_map.wrapped_updates, 1);
    assert_eq!(color_map.distinct_entries, 4);
}
