use crate::interpreter::Interpreter;
use crate::structurer::structure;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Runs `source` with the process's stdin and stdout as collaborators.
/// Returns `false` if the run stopped on a fatal error.
pub fn run(source: &str, filename: Option<&str>) -> bool {
    let mut interpreter = Interpreter::new(io::stdin().lock(), io::stdout().lock());
    run_with(&mut interpreter, source, filename)
}

/// Runs `source` on an existing interpreter, starting from an empty environment.
/// Diagnostics and any fatal error are rendered to stderr.
pub fn run_with<R: BufRead, W: Write>(
    interpreter: &mut Interpreter<R, W>,
    source: &str,
    filename: Option<&str>,
) -> bool {
    interpreter.reset();
    let result = interpreter.run_source(source);
    debug!(bindings = ?interpreter.environment().bindings(), "final environment");

    for diagnostic in interpreter.take_diagnostics() {
        diagnostic.report(source, filename);
    }

    match result {
        Ok(()) => true,
        Err(error) => {
            error.report(source, filename);
            false
        }
    }
}

/// Prints the structured lines of `source` instead of running it.
pub fn dump_lines<W: Write>(out: &mut W, source: &str, filename: Option<&str>) -> bool {
    let lines = match structure(source) {
        Ok(lines) => lines,
        Err(error) => {
            error.report(source, filename);
            return false;
        }
    };

    for line in &lines {
        if let Err(error) = writeln!(out, "{}", line) {
            eprintln!("Error writing output: {}", error);
            return false;
        }
    }
    true
}
