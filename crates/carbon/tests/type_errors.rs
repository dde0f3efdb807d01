//! Checks the type checker's diagnostics (§4.2, §7) for the representative
//! named failure shapes, including the two literal scenarios from §8's
//! end-to-end table (#5 and #6).

use carbon::{compile_and_run, interpret::limits::StepLimits, span::FileTable, CarbonError};

fn check_err(src: &str) -> String {
    let mut files = FileTable::new();
    let file = files.intern("t.carbon");
    match compile_and_run(src, file, StepLimits::default()) {
        Err(CarbonError::Check(diags)) => diags.to_string(),
        Err(other) => panic!("expected a type error, got {other}"),
        Ok(value) => panic!("expected a type error, ran to completion returning {value}"),
    }
}

#[test]
fn mutually_recursive_auto_returns_are_a_dependency_loop() {
    // Scenario #5.
    let msg = check_err("fn f() => g(); fn g() => f(); fn main() -> Int { f(); return 0; }");
    assert!(msg.contains("type dependency loop"), "{msg}");
}

#[test]
fn struct_member_type_must_be_a_type_expression() {
    // Scenario #6.
    let msg = check_err("struct X { var y: 42; } fn main() -> Int { return 0; }");
    assert!(msg.contains("Not a type expression (value has type Int)"), "{msg}");
}

#[test]
fn unary_not_rejects_an_int_operand() {
    // Scenario #7.
    let msg = check_err("fn f(a: Bool, b: Int) { not b; } fn main() -> Int { f(true, 1); return 0; }");
    assert!(msg.contains("Expected expression of type Bool, not Int"), "{msg}");
}

#[test]
fn call_argument_types_must_match_parameters() {
    let msg = check_err("fn f(a: Int) -> Int { return a; } fn main() -> Int { return f(true); }");
    assert!(msg.contains("do not match parameter types"), "{msg}");
}

#[test]
fn index_out_of_range_on_a_tuple_type() {
    let msg = check_err("fn main() -> Int { var t: auto = (1, 2); return t[5]; }");
    assert!(msg.contains("has no value at position 5"), "{msg}");
}

#[test]
fn member_access_on_an_unknown_struct_field() {
    let msg = check_err("struct X { var a: Int; } fn main() -> Int { var v: X = X(.a = 1); return v.b; }");
    assert!(msg.contains("struct X has no member 'b'"), "{msg}");
}

#[test]
fn member_access_on_an_unknown_choice_alternative() {
    let msg = check_err("choice C { A(Int) } fn main() -> Int { return C.B(); }");
    assert!(msg.contains("choice C has no alternative 'B'"), "{msg}");
}

#[test]
fn calling_a_non_function_value_is_rejected() {
    let msg = check_err("fn main() -> Int { var x: Int = 1; return x(); }");
    assert!(msg.contains("is not callable"), "{msg}");
}

#[test]
fn auto_without_an_initializer_is_rejected() {
    let msg = check_err("fn f(x: auto) -> Int { return x; } fn main() -> Int { return f(1); }");
    assert!(msg.contains("No initializer available to deduce type for auto"), "{msg}");
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let msg = check_err("fn main() -> Int { break; return 0; }");
    assert!(msg.contains("invalid outside a loop body"), "{msg}");
}
