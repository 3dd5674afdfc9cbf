use crate::ast::{Condition, Expr, PrintArg, RangeArgs, Statement};
use crate::environment::Environment;
use crate::error::{ScriptError, Span};
use crate::evaluator::{apply_binary, Evaluator};
use crate::lexer::{Lexer, TokenType};
use crate::parser::parse_line;
use crate::structurer::{structure, Line};
use crate::value::Value;
use std::io::{BufRead, Write};
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Structured lines of one program plus the statements parsed from them so far.
/// Each line is parsed the first time execution reaches it.
struct Program<'a> {
    lines: &'a [Line],
    statements: Vec<Option<Rc<Statement>>>,
}

impl<'a> Program<'a> {
    fn new(lines: &'a [Line]) -> Self {
        Self {
            lines,
            statements: vec![None; lines.len()],
        }
    }

    fn statement(&mut self, index: usize) -> Result<Rc<Statement>, ScriptError> {
        if let Some(statement) = &self.statements[index] {
            return Ok(Rc::clone(statement));
        }

        let statement = Rc::new(parse_line(&self.lines[index])?);
        self.statements[index] = Some(Rc::clone(&statement));
        Ok(statement)
    }

    /// End (exclusive) of the block owned by the header at `header`: every
    /// following line indented deeper than the header.
    fn block_end(&self, header: usize) -> Result<usize, ScriptError> {
        let depth = self.lines[header].indent;
        let body_start = header + 1;

        match self.lines.get(body_start) {
            Some(line) if line.indent > depth => {}
            _ => {
                let line = &self.lines[header];
                return Err(ScriptError::syntax_error_with_help(
                    line.span(),
                    format!("Expected an indented block after '{}'", line.text),
                    "Indent the lines of the block by 4 more spaces than the header.".to_string(),
                ));
            }
        }

        let end = self.lines[body_start..]
            .iter()
            .position(|line| line.indent <= depth)
            .map_or(self.lines.len(), |offset| body_start + offset);
        Ok(end)
    }
}

/// `elif` or `else` when `line` starts with one of them. Only the first token
/// is looked at, so a line after an `if` chain is not parsed before it runs.
fn chain_keyword(line: &Line) -> Option<TokenType> {
    let first = Lexer::new(&line.text, line.offset).scan_tokens().into_iter().next()?;
    match first.token_type {
        TokenType::Elif | TokenType::Else => Some(first.token_type),
        _ => None,
    }
}

/// The statement executor. `input()` reads lines from `input`; prompts and
/// `print` output go to `output`.
pub struct Interpreter<R, W> {
    environment: Environment,
    input: R,
    output: W,
    diagnostics: Vec<ScriptError>,
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            environment: Environment::new(),
            input,
            output,
            diagnostics: Vec::new(),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    /// Non-fatal diagnostics reported since the last reset.
    pub fn diagnostics(&self) -> &[ScriptError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<ScriptError> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Clears variables and diagnostics so an unrelated program can run next.
    pub fn reset(&mut self) {
        self.environment.clear();
        self.diagnostics.clear();
    }

    /// Structures and executes `source` against the current environment.
    pub fn run_source(&mut self, source: &str) -> Result<(), ScriptError> {
        let lines = structure(source)?;
        debug!(lines = lines.len(), "structured program");
        self.execute(&lines)
    }

    pub fn execute(&mut self, lines: &[Line]) -> Result<(), ScriptError> {
        let mut program = Program::new(lines);
        let result = self.execute_block(&mut program, 0, lines.len(), 0);

        let flushed = self.output.flush();
        result?;
        flushed.map_err(|error| ScriptError::io_error(Span::new(0, 0), &error))
    }

    /// Executes lines `start..end`, all of which must sit at `depth` or inside
    /// blocks owned by headers at `depth`.
    fn execute_block(
        &mut self,
        program: &mut Program,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<(), ScriptError> {
        let mut index = start;

        while index < end {
            let line = &program.lines[index];
            if line.indent != depth {
                return Err(Self::indentation_mismatch(line, depth));
            }
            index = self.execute_line(program, index)?;
        }

        Ok(())
    }

    /// Runs the body of the header at `header`, which ends at `body_end`.
    fn execute_body(
        &mut self,
        program: &mut Program,
        header: usize,
        body_end: usize,
    ) -> Result<(), ScriptError> {
        let depth = program.lines[header + 1].indent;
        self.execute_block(program, header + 1, body_end, depth)
    }

    /// Executes the statement at `index`, returning the index of the next
    /// line to run at the same depth.
    fn execute_line(&mut self, program: &mut Program, index: usize) -> Result<usize, ScriptError> {
        let statement = program.statement(index)?;
        trace!(
            line = program.lines[index].number,
            kind = statement.keyword(),
            "execute"
        );

        match &*statement {
            Statement::Assignment {
                target,
                operator,
                value,
                span,
            } => {
                let evaluated = self.evaluate(value)?;
                let stored = match operator {
                    None => match value.as_boolean_literal() {
                        Some(b) => Value::Boolean(b),
                        None => Value::Integer(evaluated.as_integer()),
                    },
                    Some(operator) => {
                        let current = self.environment.lookup(target);
                        apply_binary(*operator, current, evaluated, span)?
                    }
                };
                self.environment.assign(target, stored);
                Ok(index + 1)
            }
            Statement::Input {
                target,
                prompt,
                span,
            } => {
                self.read_input(target, prompt.as_deref(), span)?;
                Ok(index + 1)
            }
            Statement::Print { args, span } => {
                self.print(args, span)?;
                Ok(index + 1)
            }
            Statement::Pass { .. } => Ok(index + 1),
            Statement::For {
                variable, range, ..
            } => {
                let body_end = program.block_end(index)?;
                self.execute_for(program, index, body_end, variable, range)?;
                Ok(body_end)
            }
            Statement::While { condition, .. } => {
                let body_end = program.block_end(index)?;
                let mut iterations: u64 = 0;
                while self.condition(condition)? {
                    self.execute_body(program, index, body_end)?;
                    iterations += 1;
                }
                debug!(line = program.lines[index].number, iterations, "while loop finished");
                Ok(body_end)
            }
            Statement::If { .. } => self.execute_if(program, index),
            Statement::Elif { span, .. } | Statement::Else { span } => {
                Err(ScriptError::syntax_error_with_help(
                    span.clone(),
                    format!("'{}' without a matching 'if'", statement.keyword()),
                    "'elif' and 'else' must directly follow the block of an 'if' at the same indentation."
                        .to_string(),
                ))
            }
            Statement::Unrecognized {
                text,
                opens_block,
                span,
            } => {
                self.warn(ScriptError::warning_with_help(
                    span.clone(),
                    format!("Unrecognized statement '{}' was skipped", text),
                    "Supported statements are assignment, input, print, for, while, if/elif/else and pass."
                        .to_string(),
                ));

                let owns_block = *opens_block
                    && program
                        .lines
                        .get(index + 1)
                        .is_some_and(|next| next.indent > program.lines[index].indent);
                if owns_block {
                    program.block_end(index)
                } else {
                    Ok(index + 1)
                }
            }
        }
    }

    fn execute_for(
        &mut self,
        program: &mut Program,
        header: usize,
        body_end: usize,
        variable: &str,
        range: &RangeArgs,
    ) -> Result<(), ScriptError> {
        let start = match &range.start {
            Some(start) => self.evaluate(start)?.as_integer(),
            None => 0,
        };
        let end = self.evaluate(&range.end)?.as_integer();
        let step = match &range.step {
            Some(step) => self.evaluate(step)?.as_integer(),
            None => 1,
        };
        if step == 0 {
            return Err(ScriptError::invalid_range(
                range.span.clone(),
                "range() step must not be zero".to_string(),
            ));
        }

        debug!(variable, start, end, step, "for loop");
        let mut current = start;
        while (step > 0 && current < end) || (step < 0 && current > end) {
            self.environment.assign(variable, Value::Integer(current));
            self.execute_body(program, header, body_end)?;

            current = match current.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(())
    }

    /// Executes an `if`/`elif`/`else` chain starting at `header` and returns
    /// the index just past its last block.
    fn execute_if(&mut self, program: &mut Program, header: usize) -> Result<usize, ScriptError> {
        let depth = program.lines[header].indent;
        let mut branches = vec![(header, program.block_end(header)?)];

        loop {
            let (_, next) = branches[branches.len() - 1];
            if next >= program.lines.len() || program.lines[next].indent != depth {
                break;
            }

            match chain_keyword(&program.lines[next]) {
                Some(TokenType::Elif) => branches.push((next, program.block_end(next)?)),
                Some(TokenType::Else) => {
                    branches.push((next, program.block_end(next)?));
                    break;
                }
                _ => break,
            }
        }

        let (_, chain_end) = branches[branches.len() - 1];

        for (branch, body_end) in branches {
            let taken = match &*program.statement(branch)? {
                Statement::If { condition, .. } | Statement::Elif { condition, .. } => {
                    self.condition(condition)?
                }
                _ => true,
            };

            if taken {
                trace!(line = program.lines[branch].number, "branch taken");
                self.execute_body(program, branch, body_end)?;
                break;
            }
        }

        Ok(chain_end)
    }

    fn read_input(
        &mut self,
        target: &str,
        prompt: Option<&str>,
        span: &Span,
    ) -> Result<(), ScriptError> {
        if let Some(prompt) = prompt {
            write!(self.output, "{}", prompt)
                .and_then(|()| self.output.flush())
                .map_err(|error| ScriptError::io_error(span.clone(), &error))?;
        }

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|error| ScriptError::io_error(span.clone(), &error))?;
        if read == 0 {
            return Err(ScriptError::input_exhausted(span.clone()));
        }

        let text = line.trim();
        let value = match text.parse::<i64>() {
            Ok(n) => n,
            Err(_) => {
                self.warn(ScriptError::warning_with_help(
                    span.clone(),
                    format!("Input '{}' is not an integer; '{}' set to 0", text, target),
                    "input() expects a whole number such as 42 or -7.".to_string(),
                ));
                0
            }
        };

        self.environment.assign(target, Value::Integer(value));
        Ok(())
    }

    fn print(&mut self, args: &[PrintArg], span: &Span) -> Result<(), ScriptError> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                PrintArg::Text(text) => parts.push(text.clone()),
                PrintArg::Expr(Expr::Variable { name, .. })
                    if self.environment.is_boolean(name) =>
                {
                    parts.push(self.environment.lookup(name).to_string())
                }
                PrintArg::Expr(expr) => parts.push(self.evaluate(expr)?.as_integer().to_string()),
            }
        }

        writeln!(self.output, "{}", parts.join(" "))
            .map_err(|error| ScriptError::io_error(span.clone(), &error))
    }

    fn evaluate(&self, expr: &Expr) -> Result<Value, ScriptError> {
        Evaluator::new(&self.environment).evaluate_expression(expr)
    }

    fn condition(&self, condition: &Condition) -> Result<bool, ScriptError> {
        Evaluator::new(&self.environment).evaluate_condition(condition)
    }

    fn warn(&mut self, diagnostic: ScriptError) {
        warn!(message = %diagnostic.message, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    fn indentation_mismatch(line: &Line, depth: usize) -> ScriptError {
        if line.indent > depth {
            ScriptError::syntax_error_with_help(
                line.span(),
                "Unexpected indent".to_string(),
                "Only the lines of a for, while, if, elif or else block are indented.".to_string(),
            )
        } else {
            ScriptError::syntax_error_with_help(
                line.span(),
                "Dedent does not match the indentation of its block".to_string(),
                "Every line of a block must be indented the same as the block's first line."
                    .to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn run_with_input(source: &str, input: &str) -> (Result<(), ScriptError>, String) {
        let mut interpreter = Interpreter::new(Cursor::new(input.as_bytes()), Vec::<u8>::new());
        let result = interpreter.run_source(source);
        let output = String::from_utf8(interpreter.into_output()).unwrap();
        (result, output)
    }

    fn run(source: &str) -> String {
        let (result, output) = run_with_input(source, "");
        result.unwrap();
        output
    }

    #[test]
    fn for_range_is_half_open() {
        assert_eq!(run("for i in range(2, 5):\n    print(i)"), "2\n3\n4\n");
        assert_eq!(run("for i in range(5, 2):\n    print(i)\nprint(\"done\")"), "done\n");
    }

    #[test]
    fn for_bounds_are_evaluated_once() {
        let source = "n = 3\nfor i in range(0, n):\n    n = n + 1\nprint(n)";
        assert_eq!(run(source), "6\n");
    }

    #[test]
    fn range_step_forms() {
        assert_eq!(run("for i in range(3):\n    print(i)"), "0\n1\n2\n");
        assert_eq!(run("for i in range(6, 0, -2):\n    print(i)"), "6\n4\n2\n");

        let (result, _) = run_with_input("for i in range(0, 5, 0):\n    print(i)", "");
        assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidRange);
    }

    #[test]
    fn while_with_false_condition_never_runs() {
        assert_eq!(run("x = 0\nwhile x > 0:\n    print(x)\nprint(\"end\")"), "end\n");
    }

    #[test]
    fn if_without_else_is_a_no_op_when_false() {
        assert_eq!(run("if 1 > 2:\n    print(1)\nprint(2)"), "2\n");
    }

    #[test]
    fn else_runs_only_when_condition_is_false() {
        let source = "x = 5\nif x > 3:\n    print(\"big\")\nelse:\n    print(\"small\")\nprint(\"after\")";
        assert_eq!(run(source), "big\nafter\n");

        let source = "x = 1\nif x > 3:\n    print(\"big\")\nelse:\n    print(\"small\")";
        assert_eq!(run(source), "small\n");
    }

    #[test]
    fn elif_chain_takes_first_true_branch() {
        let source = "\
for n in range(0, 4):
    if n == 0:
        print(\"zero\")
    elif n % 2 == 1:
        print(\"odd\")
    else:
        print(\"even\")
";
        assert_eq!(run(source), "zero\nodd\neven\nodd\n");
    }

    #[test]
    fn later_conditions_are_skipped_once_a_branch_runs() {
        let source = "if true:\n    print(1)\nelif 1 / 0 == 0:\n    print(2)";
        assert_eq!(run(source), "1\n");
    }

    #[test]
    fn nested_blocks_share_one_environment() {
        let source = "\
total = 0
for i in range(0, 3):
    for j in range(0, 2):
        inner = i * j
        total = total + inner
print(total)
print(inner)
print(j)
";
        assert_eq!(run(source), "3\n2\n1\n");
    }

    #[test]
    fn boolean_assignment_and_print() {
        let source = "flag = True\nprint(flag)\nflag = 2\nprint(flag)\nok = false\nprint(ok + 1)";
        assert_eq!(run(source), "true\n2\n1\n");
    }

    #[test]
    fn assignment_from_boolean_variable_stores_integer() {
        let mut interpreter = Interpreter::new(Cursor::new(&b""[..]), Vec::<u8>::new());
        interpreter.run_source("a = true\nb = a").unwrap();
        assert_eq!(interpreter.environment().get("a"), Some(Value::Boolean(true)));
        assert_eq!(interpreter.environment().get("b"), Some(Value::Integer(1)));
    }

    #[test]
    fn augmented_assignment() {
        assert_eq!(run("x = 10\nx += 5\nx -= 3\nx *= 2\nx /= 5\nx %= 3\nprint(x)"), "1\n");
    }

    #[test]
    fn print_forms() {
        assert_eq!(run("x = 4\nprint(\"x is\", x, x * 2)\nprint()"), "x is 4 8\n\n");
    }

    #[test]
    fn input_prompts_then_reads() {
        let (result, output) = run_with_input("n = input(\"Enter:\")\nprint(n * 2)", "21\n");
        result.unwrap();
        assert_eq!(output, "Enter:42\n");
    }

    #[test]
    fn bad_input_defaults_to_zero_with_diagnostic() {
        let mut interpreter = Interpreter::new(Cursor::new(&b"abc\n"[..]), Vec::<u8>::new());
        interpreter.run_source("n = int(input())\nprint(n)").unwrap();

        assert_eq!(interpreter.diagnostics().len(), 1);
        assert_eq!(interpreter.diagnostics()[0].kind, ErrorKind::Warning);
        assert_eq!(String::from_utf8(interpreter.into_output()).unwrap(), "0\n");
    }

    #[test]
    fn exhausted_input_is_fatal() {
        let (result, output) = run_with_input("a = input(\"a: \")\nb = input(\"b: \")", "1\n");
        assert_eq!(result.unwrap_err().kind, ErrorKind::InputExhausted);
        assert_eq!(output, "a: b: ");
    }

    #[test]
    fn unrecognized_lines_are_skipped_with_diagnostic() {
        let mut interpreter = Interpreter::new(Cursor::new(&b""[..]), Vec::<u8>::new());
        interpreter
            .run_source("import os\ndef f():\n    x = 1\nprint(\"still running\")")
            .unwrap();

        assert_eq!(interpreter.diagnostics().len(), 2);
        assert!(!interpreter.environment().contains("x"));
        assert_eq!(
            String::from_utf8(interpreter.into_output()).unwrap(),
            "still running\n"
        );
    }

    #[test]
    fn division_by_zero_aborts_the_run() {
        let (result, output) = run_with_input("print(1)\nx = 5 / 0\nprint(2)", "");
        assert_eq!(result.unwrap_err().kind, ErrorKind::DivisionByZero);
        assert_eq!(output, "1\n");
    }

    #[test]
    fn header_without_block_is_an_error() {
        let (result, _) = run_with_input("while true:\nprint(1)", "");
        let error = result.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Syntax);
        assert!(error.message.contains("Expected an indented block"));
    }

    #[test]
    fn stray_indentation_is_an_error() {
        let (result, _) = run_with_input("x = 1\n    y = 2", "");
        assert!(result.unwrap_err().message.contains("Unexpected indent"));

        let (result, _) = run_with_input("if true:\n        a = 1\n    b = 2", "");
        assert!(result.unwrap_err().message.contains("Dedent"));
    }

    #[test]
    fn line_after_if_chain_is_parsed_only_when_reached() {
        let (result, output) = run_with_input("if true:\n    print(1)\nx = 2.5", "");
        assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidLiteral);
        assert_eq!(output, "1\n");

        let (result, output) = run_with_input("if true:\n    x = 1 / 0\ny = 2.5", "");
        assert_eq!(result.unwrap_err().kind, ErrorKind::DivisionByZero);
        assert_eq!(output, "");
    }

    #[test]
    fn if_chain_recognizes_elif_and_else_by_first_word() {
        let source = "x = 7\nif x < 0:\n    print(1)\nelif x < 5:\n    print(2)\nelse:\n    print(3)\nelsewhere = 4\nprint(elsewhere)";
        assert_eq!(run(source), "3\n4\n");
    }

    #[test]
    fn only_boolean_variables_print_as_booleans() {
        assert_eq!(run("print(true)\nprint(false, 2)"), "1\n0 2\n");
        assert_eq!(run("flag = true\nprint(flag)\nprint((flag))\nprint(flag + 0)"), "true\n1\n1\n");
    }

    #[test]
    fn else_without_if_is_an_error() {
        let (result, _) = run_with_input("else:\n    print(1)", "");
        assert!(result.unwrap_err().message.contains("without a matching 'if'"));
    }

    #[test]
    fn errors_surface_only_when_a_line_runs() {
        assert_eq!(run("if false:\n    x = 3.5\nprint(1)"), "1\n");
    }

    #[test]
    fn seeded_variables_are_visible() {
        let mut interpreter = Interpreter::new(Cursor::new(&b""[..]), Vec::<u8>::new());
        interpreter
            .environment_mut()
            .assign("limit", Value::Integer(3));
        interpreter.run_source("for i in range(limit):\n    print(i)").unwrap();
        assert_eq!(String::from_utf8(interpreter.into_output()).unwrap(), "0\n1\n2\n");
    }

    #[test]
    fn reset_clears_environment() {
        let mut interpreter = Interpreter::new(Cursor::new(&b""[..]), Vec::<u8>::new());
        interpreter.run_source("x = 1").unwrap();
        interpreter.reset();
        assert!(interpreter.environment().bindings().is_empty());
    }
}
