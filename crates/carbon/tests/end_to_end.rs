//! Runs whole programs through the full pipeline and checks `main`'s
//! returned `Int`, the literal in/out scenarios a successfully checked
//! Carbon program is expected to produce.

use carbon::{compile_and_run, interpret::limits::StepLimits, span::FileTable};
use pretty_assertions::assert_eq;

fn run(src: &str) -> i64 {
    let mut files = FileTable::new();
    let file = files.intern("t.carbon");
    compile_and_run(src, file, StepLimits::default()).unwrap_or_else(|e| panic!("{e}"))
}

#[test]
fn returns_a_literal() {
    assert_eq!(run("fn main() -> Int { return 0; }"), 0);
}

#[test]
fn reassigns_a_local_before_returning() {
    assert_eq!(run("fn main() -> Int { var x: Int = 3; x = x + 4; return x; }"), 7);
}

#[test]
fn choice_construction_auto_typed_and_matched() {
    let src = "choice Ints { None, One(Int) } \
               fn main() -> Int { \
                   var y: auto = Ints.One(42); \
                   match (y) { \
                       case Ints.One(n: auto) => return n; \
                       default => return -1; \
                   } \
               }";
    assert_eq!(run(src), 42);
}

#[test]
fn struct_construction_and_field_sum() {
    let src = "struct X { var a: Int; var b: Int; } \
               fn main() -> Int { var v: X = X(.a = 3, .b = 4); return v.a + v.b; }";
    assert_eq!(run(src), 7);
}

#[test]
fn choice_alternative_with_no_payload_matches_by_name() {
    let src = "choice Ints { None, One(Int) } \
               fn main() -> Int { \
                   var y: Ints = Ints.None; \
                   match (y) { \
                       case Ints.None() => return 1; \
                       case Ints.One(n: Int) => return n; \
                   } \
               }";
    assert_eq!(run(src), 1);
}

#[test]
fn nullary_function_call_produces_an_empty_tuple() {
    let src = "fn unit() -> () { return (); } \
               fn main() -> Int { unit(); return 5; }";
    assert_eq!(run(src), 5);
}

#[test]
fn nested_struct_field_access() {
    let src = "struct Inner { var n: Int; } \
               struct Outer { var inner: Inner; } \
               fn main() -> Int { \
                   var o: Outer = Outer(.inner = Inner(.n = 9)); \
                   return o.inner.n; \
               }";
    assert_eq!(run(src), 9);
}

#[test]
fn if_else_branches() {
    let src = "fn classify(n: Int) -> Int { \
                   if (n == 0) { return 0; } else { return 1; } \
               } \
               fn main() -> Int { return classify(0) + classify(7); }";
    assert_eq!(run(src), 1);
}
