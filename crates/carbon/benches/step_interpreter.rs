//! Benchmarks the step-driven interpreter (§4.3) against a handful of
//! non-foldable Carbon programs, each exercised from source so the
//! measurement includes scanning, parsing, resolution, and type checking
//! alongside interpretation — the same pipeline `compile_and_run` drives
//! for a host.

use carbon::{compile_and_run, interpret::limits::StepLimits, span::FileTable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn run(src: &str) -> i64 {
    let mut files = FileTable::new();
    let file = files.intern("bench.carbon");
    compile_and_run(src, file, StepLimits::new(10_000_000, 8_192)).unwrap()
}

const ADD_TWO_LOCALS: &str = "
fn main() -> Int {
    var x: Int = 1;
    var y: Int = 2;
    return x + y;
}
";

const ADD_LOOP_1000: &str = "
fn main() -> Int {
    var total: Int = 0;
    var i: Int = 0;
    while (not (i == 1000)) {
        total = total + i;
        i = i + 1;
    }
    return total;
}
";

const RECURSIVE_FIBONACCI_20: &str = "
fn fib(n: Int) -> Int {
    if (n == 0) { return 0; }
    if (n == 1) { return 1; }
    return fib(n - 1) + fib(n - 2);
}
fn main() -> Int {
    return fib(20);
}
";

const STRUCT_FIELD_CHURN: &str = "
struct Point { var x: Int; var y: Int; }
fn main() -> Int {
    var total: Int = 0;
    var i: Int = 0;
    while (not (i == 500)) {
        var p: Point = Point(.x = i, .y = i + 1);
        total = total + p.x + p.y;
        i = i + 1;
    }
    return total;
}
";

const CHOICE_MATCH_LOOP: &str = "
choice Parity { Even(Int), Odd(Int) }
fn classify(n: Int, is_even: Bool) -> Parity {
    if (is_even) { return Parity.Even(n); }
    return Parity.Odd(n);
}
fn main() -> Int {
    var total: Int = 0;
    var i: Int = 0;
    var is_even: Bool = true;
    while (not (i == 300)) {
        match (classify(i, is_even)) {
            case Parity.Even(n: Int) => { total = total + n; }
            case Parity.Odd(n: Int) => { total = total - n; }
        }
        is_even = not is_even;
        i = i + 1;
    }
    return total;
}
";

fn bench_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_and_run");
    for (name, src) in [
        ("add_two_locals", ADD_TWO_LOCALS),
        ("add_loop_1000", ADD_LOOP_1000),
        ("recursive_fibonacci_20", RECURSIVE_FIBONACCI_20),
        ("struct_field_churn", STRUCT_FIELD_CHURN),
        ("choice_match_loop", CHOICE_MATCH_LOOP),
    ] {
        group.bench_function(name, |b| b.iter(|| black_box(run(src))));
    }
    group.finish();
}

criterion_group!(benches, bench_programs);
criterion_main!(benches);
