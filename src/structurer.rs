use crate::error::{ScriptError, Span};
use std::fmt;

/// Width of one indentation level, in spaces.
pub const INDENT_UNIT: usize = 4;

/// One logical source line with its indentation depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Text with indentation, trailing whitespace and any trailing comment removed.
    pub text: String,
    /// Depth in units of [`INDENT_UNIT`].
    pub indent: usize,
    /// 1-based line number in the source.
    pub number: usize,
    /// Byte offset of `text` in the source.
    pub offset: usize,
}

impl Line {
    pub fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.text.len())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:>4} | {}{}",
            self.number,
            " ".repeat(self.indent * INDENT_UNIT),
            self.text
        )
    }
}

/// Splits `source` into logical lines, dropping blank and comment-only lines.
pub fn structure(source: &str) -> Result<Vec<Line>, ScriptError> {
    let mut lines = Vec::new();
    let mut line_start = 0;

    for (index, raw) in source.split('\n').enumerate() {
        let offset = line_start;
        line_start += raw.len() + 1;

        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let code = strip_comment(raw).trim_end();
        let text = code.trim_start_matches([' ', '\t']);
        if text.is_empty() {
            continue;
        }

        let leading = &code[..code.len() - text.len()];
        let leading_span = Span::new(offset, offset + leading.len().max(1));
        if leading.contains('\t') {
            return Err(ScriptError::malformed_indentation(
                leading_span,
                format!("Line {} is indented with a tab", index + 1),
                format!("Indent with multiples of {} spaces.", INDENT_UNIT),
            ));
        }
        if leading.len() % INDENT_UNIT != 0 {
            return Err(ScriptError::malformed_indentation(
                leading_span,
                format!(
                    "Line {} is indented by {} spaces, which is not a multiple of {}",
                    index + 1,
                    leading.len(),
                    INDENT_UNIT
                ),
                format!("Each block level is exactly {} spaces deeper.", INDENT_UNIT),
            ));
        }

        lines.push(Line {
            text: text.to_string(),
            indent: leading.len() / INDENT_UNIT,
            number: index + 1,
            offset: offset + leading.len(),
        });
    }

    Ok(lines)
}

/// Cuts `raw` at the first `#` that is not inside a string literal.
fn strip_comment(raw: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (None, '#') => return &raw[..i],
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            _ => {}
        }
    }
    raw
}
