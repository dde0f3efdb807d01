use std::{env, fs, process::ExitCode};

use carbon::{
    compile_and_run,
    interpret::limits::StepLimits,
    span::FileTable,
    CarbonError,
};

/// Sample program run when no file is given on the command line, the way
/// the reference CLI falls back to its own bundled `example.py`.
const DEFAULT_SOURCE_PATH: &str = "demos/hello.carbon";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let (file_path, max_steps) = match parse_args(&args[1..]) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {file_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut files = FileTable::new();
    let file = files.intern(file_path.to_owned());
    let limits = match max_steps {
        Some(n) => StepLimits::new(n, StepLimits::default().max_call_depth),
        None => StepLimits::default(),
    };

    match compile_and_run(&source, file, limits) {
        Ok(result) => exit_code_for(result),
        Err(err) => {
            eprintln!("{}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: &[String]) -> Result<(&str, Option<u64>), String> {
    let mut file_path = None;
    let mut max_steps = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--max-steps" => {
                let value = args.get(i + 1).ok_or("`--max-steps` needs a value")?;
                max_steps = Some(value.parse::<u64>().map_err(|_| format!("invalid `--max-steps` value: {value}"))?);
                i += 2;
            }
            other => {
                if file_path.is_some() {
                    return Err(format!("unexpected argument: {other}"));
                }
                file_path = Some(other);
                i += 1;
            }
        }
    }
    Ok((file_path.unwrap_or(DEFAULT_SOURCE_PATH), max_steps))
}

/// Maps `main`'s `Int` return value to a process exit status. Carbon's
/// `Int` is 64-bit and signed; a process exit code is an unsigned byte, so
/// this truncates the way a shell's own `$?` does for any value outside
/// 0..=255.
fn exit_code_for(value: i64) -> ExitCode {
    ExitCode::from((value & 0xff) as u8)
}

fn describe(err: &CarbonError) -> String {
    match err {
        CarbonError::Scan(d) => format!("scan error(s):\n{d}"),
        CarbonError::Parse(d) => format!("parse error(s):\n{d}"),
        CarbonError::Resolve(d) => format!("name resolution error(s):\n{d}"),
        CarbonError::Check(d) => format!("type error(s):\n{d}"),
        CarbonError::Entry(msg) => format!("error: {msg}"),
        CarbonError::Runtime(e) => format!("runtime error: {e}"),
    }
}
