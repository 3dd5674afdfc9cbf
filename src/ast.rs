use crate::error::Span;
use crate::value::Value;

/// One executable line. Block bodies are not stored here: they are the
/// indented lines that follow a header, located by the interpreter.
#[derive(Debug, Clone)]
pub enum Statement {
    Assignment {
        target: String,
        /// `Some` for augmented forms such as `x += 1`.
        operator: Option<BinaryOp>,
        value: Expr,
        span: Span,
    },
    Input {
        target: String,
        prompt: Option<String>,
        span: Span,
    },
    Print {
        args: Vec<PrintArg>,
        span: Span,
    },
    For {
        variable: String,
        range: RangeArgs,
        span: Span,
    },
    While {
        condition: Condition,
        span: Span,
    },
    If {
        condition: Condition,
        span: Span,
    },
    Elif {
        condition: Condition,
        span: Span,
    },
    Else {
        span: Span,
    },
    Pass {
        span: Span,
    },
    Unrecognized {
        text: String,
        /// The line ends in `:` and may own an indented block.
        opens_block: bool,
        span: Span,
    },
}

impl Statement {
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Assignment { .. } => "assignment",
            Statement::Input { .. } => "input",
            Statement::Print { .. } => "print",
            Statement::For { .. } => "for",
            Statement::While { .. } => "while",
            Statement::If { .. } => "if",
            Statement::Elif { .. } => "elif",
            Statement::Else { .. } => "else",
            Statement::Pass { .. } => "pass",
            Statement::Unrecognized { .. } => "unrecognized",
        }
    }
}

#[derive(Debug, Clone)]
pub enum PrintArg {
    Text(String),
    Expr(Expr),
}

/// Arguments of `range(...)`; `start` defaults to 0 and `step` to 1.
#[derive(Debug, Clone)]
pub struct RangeArgs {
    pub start: Option<Expr>,
    pub end: Expr,
    pub step: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        value: Value,
        span: Span,
    },
    Variable {
        name: String,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Grouping {
        expr: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. } => span,
            Expr::Variable { span, .. } => span,
            Expr::Binary { span, .. } => span,
            Expr::Unary { span, .. } => span,
            Expr::Grouping { span, .. } => span,
        }
    }

    /// The boolean of a bare `true`/`false` literal.
    pub fn as_boolean_literal(&self) -> Option<bool> {
        match self {
            Expr::Literal {
                value: Value::Boolean(b),
                ..
            } => Some(*b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Condition {
    Compare {
        left: Expr,
        operator: CompareOp,
        right: Expr,
        span: Span,
    },
    /// A bare expression: booleans test as themselves, integers as `!= 0`.
    Test(Expr),
    Not {
        operand: Box<Condition>,
        span: Span,
    },
    Logical {
        left: Box<Condition>,
        operator: LogicalOp,
        right: Box<Condition>,
        span: Span,
    },
}

impl Condition {
    pub fn span(&self) -> &Span {
        match self {
            Condition::Compare { span, .. } => span,
            Condition::Test(expr) => expr.span(),
            Condition::Not { span, .. } => span,
            Condition::Logical { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl CompareOp {
    pub fn apply(self, left: i64, right: i64) -> bool {
        match self {
            CompareOp::Equal => left == right,
            CompareOp::NotEqual => left != right,
            CompareOp::Less => left < right,
            CompareOp::LessEqual => left <= right,
            CompareOp::Greater => left > right,
            CompareOp::GreaterEqual => left >= right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}
