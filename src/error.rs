use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range into the original program source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(&self, other: &Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedIndentation,
    InvalidLiteral,
    DivisionByZero,
    Syntax,
    InvalidRange,
    InputExhausted,
    Io,
    /// Non-fatal; collected as a diagnostic while the run continues.
    Warning,
}

impl ErrorKind {
    pub fn is_fatal(self) -> bool {
        self != ErrorKind::Warning
    }

    fn label(self) -> &'static str {
        match self {
            ErrorKind::MalformedIndentation => "Indentation Error",
            ErrorKind::InvalidLiteral => "Invalid Literal",
            ErrorKind::DivisionByZero => "Division By Zero",
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::InvalidRange => "Range Error",
            ErrorKind::InputExhausted => "Input Error",
            ErrorKind::Io => "I/O Error",
            ErrorKind::Warning => "Warning",
        }
    }

    fn color(self) -> Color {
        match self {
            ErrorKind::MalformedIndentation | ErrorKind::Syntax => Color::Yellow,
            ErrorKind::InvalidLiteral => Color::Red,
            ErrorKind::DivisionByZero | ErrorKind::InvalidRange => Color::Magenta,
            ErrorKind::InputExhausted | ErrorKind::Io => Color::Blue,
            ErrorKind::Warning => Color::Cyan,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn new_with_help(kind: ErrorKind, span: Span, message: String, help: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: Some(help),
        }
    }

    pub fn malformed_indentation(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::MalformedIndentation, span, message, help)
    }

    pub fn invalid_literal(span: Span, message: String) -> Self {
        Self::new(ErrorKind::InvalidLiteral, span, message)
    }

    pub fn invalid_literal_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::InvalidLiteral, span, message, help)
    }

    pub fn division_by_zero(span: Span, operator: &str) -> Self {
        Self::new_with_help(
            ErrorKind::DivisionByZero,
            span,
            format!("Right operand of '{}' evaluated to zero", operator),
            "Check the divisor before dividing, e.g. with an 'if' guard.".to_string(),
        )
    }

    pub fn syntax_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::Syntax, span, message)
    }

    pub fn syntax_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::Syntax, span, message, help)
    }

    pub fn invalid_range(span: Span, message: String) -> Self {
        Self::new(ErrorKind::InvalidRange, span, message)
    }

    pub fn input_exhausted(span: Span) -> Self {
        Self::new_with_help(
            ErrorKind::InputExhausted,
            span,
            "Input ended while waiting for a value".to_string(),
            "Every input() call reads one line; supply one line per call.".to_string(),
        )
    }

    pub fn io_error(span: Span, error: &std::io::Error) -> Self {
        Self::new(ErrorKind::Io, span, format!("I/O failure: {}", error))
    }

    pub fn warning_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::Warning, span, message, help)
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<eval>");
        let color = self.kind.color();
        let report_kind = if self.is_fatal() {
            ReportKind::Error
        } else {
            ReportKind::Warning
        };

        // ariadne panics on spans past the end of the source
        let end = self.span.end.min(source.len());
        let start = self.span.start.min(end);

        let mut report_builder = Report::build(report_kind, filename, start)
            .with_message(format!("{}: {}", self.kind.label().fg(color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        if let Err(error) = report_builder
            .finish()
            .eprint((filename, Source::from(source)))
        {
            eprintln!("{}: {} ({})", self.kind.label(), self.message, error);
        }
    }
}
