//! CLI driver (ambient, added per SPEC_FULL.md): parses arguments, runs
//! the lint pipeline over one configuration file, and prints results in
//! the shape spec.md §6 describes.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use log::LevelFilter;

use cbn_lint::{diag, udm, LintOutcome};

/// Static analyzer for CBN parser configurations.
#[derive(ClapParser, Debug)]
#[command(name = "cbn-lint", version, about)]
struct Args {
    /// Input configuration file.
    #[arg(short = 'f', long = "config_file")]
    config_file: PathBuf,

    /// Print accumulated errors.
    #[arg(short = 'e', long = "errors")]
    errors: bool,

    /// Print accumulated warnings.
    #[arg(short = 'w', long = "warnings")]
    warnings: bool,

    /// Print the final value table, sorted by name.
    #[arg(short = 's', long = "print_state")]
    print_state: bool,

    /// Redirect human-readable output here (default: standard output).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Print the UDM fields written by the configuration.
    #[arg(short = 'u', long = "udm")]
    udm: bool,

    /// Raise log verbosity (does not affect exit code or diagnostics).
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    if simple_logger::SimpleLogger::new().with_level(level).init().is_err() {
        // Already initialized (e.g. under a test harness); not fatal.
    }

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                eprintln!("cbn-lint: could not open {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(io::stdout()),
    };

    run(&args, sink.as_mut())
}

fn run(args: &Args, out: &mut dyn Write) -> ExitCode {
    let path_label = args.config_file.display().to_string();
    let outcome = match cbn_lint::lint_file(&args.config_file) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("cbn-lint: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let LintOutcome::ParseFailed(err) = &outcome {
        let _ = writeln!(out, "{}", diag::render_parse_error(&path_label, err));
        return ExitCode::FAILURE;
    }

    if args.errors {
        for d in outcome.diagnostics().iter().filter(|d| d.severity == diag::Severity::Error) {
            let _ = writeln!(out, "{}", d.format(&path_label));
        }
    }
    if args.warnings {
        for d in outcome.diagnostics().iter().filter(|d| d.severity == diag::Severity::Warning) {
            let _ = writeln!(out, "{}", d.format(&path_label));
        }
    }

    if args.print_state {
        if let LintOutcome::Analyzed(state) = &outcome {
            let mut leaves = std::collections::BTreeMap::new();
            state.value_table().collect_leaves("", &mut leaves);
            for (name, values) in leaves {
                let _ = writeln!(out, "{name}: {}", values.join(", "));
            }
        }
    }

    if args.udm {
        if let LintOutcome::Analyzed(state) = &outcome {
            for (name, values) in udm::extract(state) {
                let _ = writeln!(out, "udm: {name}: {}", values.join(", "));
            }
        }
    }

    if outcome.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
