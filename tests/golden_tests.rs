// Golden-file tests
//
// Runs every script under tests/scripts through the same runner as
// `toy test` and fails if any output differs from its .out file.

use std::path::Path;
use toy::golden::{run_dir, GoldenStatus};
use toy::interpreter::DEFAULT_MAX_CALL_DEPTH;

#[test]
fn test_golden_scripts() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("scripts");
    let report = run_dir(&dir, false, DEFAULT_MAX_CALL_DEPTH).unwrap();

    assert!(!report.cases.is_empty(), "no scripts found in {}", dir.display());

    for case in &report.cases {
        match &case.status {
            GoldenStatus::Passed => {}
            GoldenStatus::Recorded => panic!("{} has no .out file", case.path.display()),
            GoldenStatus::Failed { expected, actual } => panic!(
                "{} differs\n--- expected\n{}\n--- actual\n{}",
                case.path.display(),
                expected,
                actual
            ),
        }
    }
}
