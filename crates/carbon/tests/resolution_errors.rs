//! Checks that name resolution reports exactly the kinds of errors §4.1
//! and §7 describe, and that it never proceeds to type checking or
//! interpretation when it has anything to report.

use carbon::{compile_and_run, interpret::limits::StepLimits, span::FileTable, CarbonError};

fn resolve_err(src: &str) -> String {
    let mut files = FileTable::new();
    let file = files.intern("t.carbon");
    match compile_and_run(src, file, StepLimits::default()) {
        Err(CarbonError::Resolve(diags)) => diags.to_string(),
        Err(other) => panic!("expected a resolution error, got {other}"),
        Ok(value) => panic!("expected a resolution error, ran to completion returning {value}"),
    }
}

#[test]
fn undeclared_name_is_reported() {
    let msg = resolve_err("fn main() -> Int { return missing; }");
    assert!(msg.contains("undeclared name `missing`"), "{msg}");
}

#[test]
fn duplicate_top_level_function_is_reported() {
    let msg = resolve_err("fn f() -> Int { return 0; } fn f() -> Int { return 1; } fn main() -> Int { return f(); }");
    assert!(msg.contains("`f` is already declared"), "{msg}");
}

#[test]
fn duplicate_struct_member_is_reported() {
    let msg = resolve_err("struct X { var a: Int; var a: Int; } fn main() -> Int { return 0; }");
    assert!(msg.contains("`a` is already declared"), "{msg}");
}

#[test]
fn duplicate_choice_alternative_is_reported() {
    let msg = resolve_err("choice C { A(Int), A(Bool) } fn main() -> Int { return 0; }");
    assert!(msg.contains("`A` is already declared"), "{msg}");
}

#[test]
fn forward_reference_to_a_later_function_is_allowed() {
    // Top-level declaration order is irrelevant (§4.1): `main` can call a
    // function defined after it in the source.
    let mut files = FileTable::new();
    let file = files.intern("t.carbon");
    let result = compile_and_run(
        "fn main() -> Int { return later(); } fn later() -> Int { return 9; }",
        file,
        StepLimits::default(),
    );
    assert_eq!(result.unwrap(), 9);
}

#[test]
fn block_scoped_shadowing_does_not_leak_out() {
    let msg = resolve_err(
        "fn main() -> Int { \
             { var shadowed: Int = 1; } \
             return shadowed; \
         }",
    );
    assert!(msg.contains("undeclared name `shadowed`"), "{msg}");
}
