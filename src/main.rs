//! Command-line entry point: `analyzer <queue_size> <stage1> ... <stageK>`.
//!
//! Reads lines from standard input and feeds them through the requested
//! stage chain until the `<END>` sentinel arrives. Diagnostics go to
//! standard error; transform output and the completion line go to standard
//! output.

use analyzer::Pipeline;
use std::env;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Error: Not enough arguments.");
        print_usage();
        return ExitCode::from(1);
    }

    let Some(queue_size) = parse_queue_size(&args[1]) else {
        eprintln!("Error: Invalid queue size argument.");
        print_usage();
        return ExitCode::from(1);
    };

    let mut builder = Pipeline::builder(queue_size);
    for name in &args[2..] {
        builder = builder.add_stage(name);
    }

    let pipeline = match builder.build() {
        Ok(pipeline) => pipeline,
        Err(err) => {
            eprintln!("Error: failed to build pipeline: {err}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = pipeline.run(io::stdin().lock()) {
        eprintln!("Error: {err}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

/// Queue sizes are positive decimal integers up to one million
fn parse_queue_size(arg: &str) -> Option<usize> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let size: usize = arg.parse().ok()?;
    (1..=1_000_000).contains(&size).then_some(size)
}

fn print_usage() {
    println!("Usage: analyzer <queue_size> <stage1> <stage2> ... <stageN>");
    println!("Arguments:");
    println!("  queue_size  Maximum number of items in each stage's queue [1..1000000]");
    println!("  stage1..N   Names of transform stages to chain together");
    println!("Available stages:");
    println!("  logger      - Logs all strings that pass through");
    println!("  typewriter  - Simulates typewriter effect with delays");
    println!("  uppercaser  - Converts strings to uppercase");
    println!("  rotator     - Moves every character right; the last becomes first");
    println!("  flipper     - Reverses the order of characters");
    println!("  expander    - Inserts a space between characters");
    println!("Example:");
    println!("  echo 'hello' | analyzer 20 uppercaser rotator logger");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_size_bounds() {
        assert_eq!(parse_queue_size("1"), Some(1));
        assert_eq!(parse_queue_size("1000000"), Some(1_000_000));
        assert_eq!(parse_queue_size("0"), None);
        assert_eq!(parse_queue_size("1000001"), None);
    }

    #[test]
    fn test_queue_size_rejects_non_digits() {
        assert_eq!(parse_queue_size(""), None);
        assert_eq!(parse_queue_size("+5"), None);
        assert_eq!(parse_queue_size("-5"), None);
        assert_eq!(parse_queue_size("12a"), None);
    }
}
