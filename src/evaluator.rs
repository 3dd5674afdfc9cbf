use crate::ast::{BinaryOp, Condition, Expr, LogicalOp, UnaryOp};
use crate::environment::Environment;
use crate::error::{ScriptError, Span};
use crate::value::Value;

/// Evaluates expressions and conditions against a read-only view of the
/// environment. Integer arithmetic wraps at 64 bits.
pub struct Evaluator<'env> {
    environment: &'env Environment,
}

impl<'env> Evaluator<'env> {
    pub fn new(environment: &'env Environment) -> Self {
        Self { environment }
    }

    pub fn evaluate_expression(&self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Literal { value, .. } => Ok(*value),
            Expr::Variable { name, .. } => Ok(self.environment.lookup(name)),
            Expr::Grouping { expr, .. } => self.evaluate_expression(expr),
            Expr::Unary {
                operator, operand, ..
            } => {
                let operand = self.evaluate_expression(operand)?.as_integer();
                Ok(Value::Integer(match operator {
                    UnaryOp::Negate => operand.wrapping_neg(),
                    UnaryOp::Plus => operand,
                }))
            }
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left = self.evaluate_expression(left)?;
                let right = self.evaluate_expression(right)?;
                apply_binary(*operator, left, right, span)
            }
        }
    }

    pub fn evaluate_condition(&self, condition: &Condition) -> Result<bool, ScriptError> {
        match condition {
            Condition::Test(expr) => Ok(self.evaluate_expression(expr)?.is_truthy()),
            Condition::Compare {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.evaluate_expression(left)?.as_integer();
                let right = self.evaluate_expression(right)?.as_integer();
                Ok(operator.apply(left, right))
            }
            Condition::Not { operand, .. } => Ok(!self.evaluate_condition(operand)?),
            Condition::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.evaluate_condition(left)?;
                match operator {
                    LogicalOp::And if !left => Ok(false),
                    LogicalOp::Or if left => Ok(true),
                    _ => self.evaluate_condition(right),
                }
            }
        }
    }
}

/// Applies an arithmetic operator. Booleans take part as 1 and 0; `/` and `%`
/// truncate toward zero, so the remainder has the dividend's sign.
pub fn apply_binary(
    operator: BinaryOp,
    left: Value,
    right: Value,
    span: &Span,
) -> Result<Value, ScriptError> {
    let (l, r) = (left.as_integer(), right.as_integer());

    let result = match operator {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Subtract => l.wrapping_sub(r),
        BinaryOp::Multiply => l.wrapping_mul(r),
        BinaryOp::Divide | BinaryOp::Modulo if r == 0 => {
            return Err(ScriptError::division_by_zero(
                span.clone(),
                operator.symbol(),
            ));
        }
        BinaryOp::Divide => l.wrapping_div(r),
        BinaryOp::Modulo => l.wrapping_rem(r),
    };

    Ok(Value::Integer(result))
}
