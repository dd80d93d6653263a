// jstrace: single-step execution tracer emitting replay-visualizer JSON

use clap::Parser;
use jstrace::tracer::stepper::MAX_EXECUTED_LINES;
use jstrace::{trace, TracerConfig};
use std::fs;
use std::path::PathBuf;
use std::process;

/// Trace a JavaScript program step by step and emit a visualizer trace.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the user program
    #[arg(value_name = "FILE", required_unless_present = "code", conflicts_with = "code")]
    file: Option<PathBuf>,

    /// Inline user source instead of a file
    #[arg(short, long, value_name = "SRC")]
    code: Option<String>,

    /// Emit compact {code, trace} JSON to stdout (the default)
    #[arg(long)]
    json: bool,

    /// Emit deterministic pretty-printed JSON to stdout (for
    /// regression diffing)
    #[arg(long)]
    pretty: bool,

    /// Write `var trace = <json>;` to this path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Step budget before execution is cut off
    #[arg(short, long, default_value_t = MAX_EXECUTED_LINES)]
    max_steps: usize,

    /// Additional global names to filter out of the trace (repeatable)
    #[arg(long = "ignore-global", value_name = "NAME")]
    ignore_global: Vec<String>,

    /// Replace the built-in intrinsics ignore list instead of
    /// extending it
    #[arg(long)]
    no_default_ignores: bool,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("jstrace: {}", err);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let source = match (&args.file, &args.code) {
        (Some(path), None) => fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?,
        (None, Some(code)) => code.clone(),
        // clap enforces exactly one of the two
        _ => unreachable!("argument parsing guarantees one source"),
    };

    let config = TracerConfig {
        max_steps: args.max_steps,
        include_default_ignores: !args.no_default_ignores,
        extra_ignored_globals: args.ignore_global.clone(),
    };

    let output = trace(&source, &config)?;

    let mut emitted = false;
    if let Some(path) = &args.output {
        fs::write(path, output.to_js_var())
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
        emitted = true;
    }
    if args.pretty {
        println!("{}", output.to_pretty_json());
        emitted = true;
    }
    if args.json || !emitted {
        println!("{}", output.to_json());
    }

    Ok(())
}
