//! Walks `tests/testdata/*.carbon` and checks each fixture against a
//! leading `// expect: ...` comment, instead of hand-writing one `#[test]`
//! per file — the directory is the test list (§8, "End-to-end scenarios").
//!
//! Expectation grammar, one per file:
//!   `// expect: run <int>`            — compiles and runs, `main` returns `<int>`.
//!   `// expect: resolve-error <text>` — name resolution reports a diagnostic containing `<text>`.
//!   `// expect: check-error <text>`   — type checking reports a diagnostic containing `<text>`.
//!   `// expect: runtime-error <text>` — interpretation faults with a message containing `<text>`.

use carbon::{compile_and_run, interpret::limits::StepLimits, span::FileTable, CarbonError};
use walkdir::WalkDir;

struct Fixture {
    path: std::path::PathBuf,
    source: String,
    expectation: String,
}

fn fixtures() -> Vec<Fixture> {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/testdata");
    let mut out = Vec::new();
    for entry in WalkDir::new(&dir).into_iter().filter_map(Result::ok) {
        if entry.path().extension().and_then(|e| e.to_str()) != Some("carbon") {
            continue;
        }
        let source = std::fs::read_to_string(entry.path()).unwrap_or_else(|e| panic!("{}: {e}", entry.path().display()));
        let expectation = source
            .lines()
            .find_map(|line| line.trim().strip_prefix("// expect:"))
            .unwrap_or_else(|| panic!("{}: missing a leading `// expect:` comment", entry.path().display()))
            .trim()
            .to_owned();
        out.push(Fixture { path: entry.path().to_owned(), source, expectation });
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    assert!(!out.is_empty(), "no fixtures found under {}", dir.display());
    out
}

#[test]
fn testdata_fixtures_match_their_expectations() {
    for fixture in fixtures() {
        check_one(&fixture);
    }
}

fn check_one(fixture: &Fixture) {
    let mut files = FileTable::new();
    let file = files.intern(fixture.path.display().to_string());
    let result = compile_and_run(&fixture.source, file, StepLimits::default());
    let (kind, rest) = fixture.expectation.split_once(' ').unwrap_or((fixture.expectation.as_str(), ""));

    match kind {
        "run" => {
            let expected: i64 = rest.trim().parse().unwrap_or_else(|_| panic!("{}: bad expected int `{rest}`", fixture.path.display()));
            match result {
                Ok(actual) => assert_eq!(actual, expected, "{}", fixture.path.display()),
                Err(e) => panic!("{}: expected to run to {expected}, got error: {e}", fixture.path.display()),
            }
        }
        "resolve-error" => assert_contains(fixture, result, rest, |e| matches!(e, CarbonError::Resolve(_))),
        "check-error" => assert_contains(fixture, result, rest, |e| matches!(e, CarbonError::Check(_))),
        "runtime-error" => assert_contains(fixture, result, rest, |e| matches!(e, CarbonError::Runtime(_))),
        other => panic!("{}: unknown expectation kind `{other}`", fixture.path.display()),
    }
}

fn assert_contains(
    fixture: &Fixture,
    result: Result<i64, CarbonError>,
    needle: &str,
    is_expected_kind: impl FnOnce(&CarbonError) -> bool,
) {
    match result {
        Ok(value) => panic!("{}: expected an error containing `{needle}`, ran to completion returning {value}", fixture.path.display()),
        Err(err) => {
            assert!(is_expected_kind(&err), "{}: wrong error kind: {err}", fixture.path.display());
            let rendered = err.to_string();
            assert!(rendered.contains(needle), "{}: `{rendered}` does not contain `{needle}`", fixture.path.display());
        }
    }
}
