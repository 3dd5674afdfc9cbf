use clap::{Arg, ArgAction, ArgGroup, Command};
use minipy::runner;
use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = Command::new("minipy")
        .about("Interpreter for a small indentation-based Python subset")
        .arg(
            Arg::new("files")
                .help("Script files to execute, one after another")
                .value_name("FILE")
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("eval")
                .short('e')
                .long("eval")
                .help("Execute SOURCE as a program (after any files)")
                .value_name("SOURCE")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("dump-lines")
                .long("dump-lines")
                .help("Print the structured lines with their depth instead of running")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log interpreter activity to stderr")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("program")
                .args(["files", "eval"])
                .multiple(true)
                .required(true),
        )
        .get_matches();

    init_tracing(matches.get_flag("verbose"));
    let dump = matches.get_flag("dump-lines");

    let mut sources = Vec::new();
    let mut ok = true;

    for path in matches.get_many::<String>("files").into_iter().flatten() {
        match read_file(path) {
            Some(source) => sources.push((source, Some(path.as_str()))),
            None => ok = false,
        }
    }
    for source in matches.get_many::<String>("eval").into_iter().flatten() {
        sources.push((source.clone(), None));
    }

    for (source, filename) in &sources {
        tracing::debug!(file = filename.unwrap_or("<eval>"), "running program");
        let succeeded = if dump {
            runner::dump_lines(&mut io::stdout().lock(), source, *filename)
        } else {
            runner::run(source, *filename)
        };
        ok &= succeeded;
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn read_file(path: &str) -> Option<String> {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return None;
    }

    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            None
        }
    }
}

/// Logging is off unless `--verbose` is given or `MINIPY_LOG` (else `RUST_LOG`)
/// holds a filter such as `minipy=trace`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let Some(directives) = log_directives(
        std::env::var("MINIPY_LOG").ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        verbose,
    ) else {
        return;
    };
    let filter = EnvFilter::new(directives);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

fn log_directives(
    minipy_log: Option<String>,
    rust_log: Option<String>,
    verbose: bool,
) -> Option<String> {
    let set = |value: Option<String>| value.filter(|directives| !directives.trim().is_empty());

    set(minipy_log)
        .or_else(|| set(rust_log))
        .or_else(|| verbose.then(|| "minipy=debug".to_string()))
}
