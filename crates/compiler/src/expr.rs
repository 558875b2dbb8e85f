//! Expression typer
//!
//! The parser's reduction actions arrive in token order: operand, operator,
//! operand. Each open parenthesis pushes a fresh context; each close pops it
//! and feeds the accumulated result to the enclosing context as an operand.
//! Precedence is the grammar's business; this module only folds the types
//! it is handed, applying pending unary operators (nearest binds first)
//! before each operand and the single pending binary operator after it.

use crate::diagnostics::{CompileError, DiagnosticSink};
use crate::token::Token;
use crate::types::{self, Operator, Type};

/// Binary operators as delivered by the action stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseAnd,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    RelationalCompare,
    RelationalEquality,
}

/// Unary prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryKind {
    LogicalNot,
    ArithmeticNeg,
    BitwiseNot,
}

#[derive(Debug, Clone)]
pub struct PendingOperator {
    pub kind: OperatorKind,
    pub position: i32,
    pub length: i32,
    pub lexeme: String,
}

#[derive(Debug, Clone)]
struct PendingUnary {
    kind: UnaryKind,
    position: i32,
    length: i32,
    lexeme: String,
}

#[derive(Debug)]
struct ExpressionContext {
    has_accumulated: bool,
    accumulated: Type,
    pending_operator: Option<PendingOperator>,
    pending_unary: Vec<PendingUnary>,
}

impl Default for ExpressionContext {
    fn default() -> Self {
        ExpressionContext {
            has_accumulated: false,
            accumulated: Type::Int,
            pending_operator: None,
            pending_unary: Vec::new(),
        }
    }
}

/// Stack of expression contexts for the statement under construction
#[derive(Debug, Default)]
pub struct ExpressionTyper {
    stack: Vec<ExpressionContext>,
}

fn operator_info(token: Option<&Token>) -> (i32, i32, String) {
    match token {
        Some(t) => (t.diag_position(), t.diag_length(), t.lexeme.clone()),
        None => (-1, 1, String::new()),
    }
}

impl ExpressionTyper {
    pub fn new() -> Self {
        ExpressionTyper { stack: Vec::new() }
    }

    /// Drop every open context (statement boundary or aborted expression).
    pub fn reset(&mut self) {
        self.stack.clear();
    }

    /// Open a nested context on `(`.
    pub fn push_context(&mut self) {
        self.stack.push(ExpressionContext::default());
    }

    fn ensure_context(&mut self) -> &mut ExpressionContext {
        if self.stack.is_empty() {
            self.stack.push(ExpressionContext::default());
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Record a binary operator awaiting its right operand.
    pub fn note_binary(&mut self, kind: OperatorKind, token: Option<&Token>) {
        let (position, length, lexeme) = operator_info(token);
        self.ensure_context().pending_operator = Some(PendingOperator {
            kind,
            position,
            length,
            lexeme,
        });
    }

    /// Record a unary prefix operator for the next operand.
    pub fn note_unary(&mut self, kind: UnaryKind, token: Option<&Token>) {
        let (position, length, lexeme) = operator_info(token);
        self.ensure_context().pending_unary.push(PendingUnary {
            kind,
            position,
            length,
            lexeme,
        });
    }

    /// Fold an operand into the innermost context and return the context's
    /// new accumulated type (the caller publishes it as the pending
    /// expression type).
    pub fn note_operand(
        &mut self,
        operand: Type,
        sink: &mut DiagnosticSink,
    ) -> Result<Type, CompileError> {
        self.ensure_context();
        let last = self.stack.len() - 1;

        let mut operand = operand;
        // Nearest unary binds first.
        let pending_unary = std::mem::take(&mut self.stack[last].pending_unary);
        for unary in pending_unary.iter().rev() {
            operand = apply_unary(unary, operand, sink)?;
        }

        let ctx = &mut self.stack[last];
        if ctx.has_accumulated {
            if let Some(op) = ctx.pending_operator.take() {
                operand = apply_binary(&op, ctx.accumulated, operand, sink)?;
            }
        } else {
            ctx.has_accumulated = true;
        }
        ctx.accumulated = operand;
        Ok(ctx.accumulated)
    }

    /// Close the innermost context on `)`.
    ///
    /// Returns the accumulated type, if any, so the caller can feed it to
    /// the enclosing context as an operand. A binary operator still waiting
    /// for its right operand is an error anchored at the operator.
    pub fn pop_context(
        &mut self,
        sink: &mut DiagnosticSink,
    ) -> Result<Option<Type>, CompileError> {
        let Some(finished) = self.stack.pop() else {
            return Ok(None);
        };
        if let Some(pending) = finished.pending_operator {
            return Err(sink.error(
                format!("Operador '{}' sem operando à direita", pending.lexeme),
                pending.position,
                pending.length,
            ));
        }
        Ok(finished.has_accumulated.then_some(finished.accumulated))
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

fn apply_unary(
    unary: &PendingUnary,
    operand: Type,
    sink: &mut DiagnosticSink,
) -> Result<Type, CompileError> {
    if operand == Type::Error {
        return Ok(Type::Error);
    }
    match unary.kind {
        UnaryKind::LogicalNot => {
            if !operand.is_bool_convertible() {
                return Err(sink.error(
                    format!(
                        "Operador '{}' requer valor convertível para booleano, encontrado '{}'",
                        unary.lexeme, operand
                    ),
                    unary.position,
                    unary.length,
                ));
            }
            Ok(Type::Bool)
        }
        UnaryKind::BitwiseNot => {
            if operand != Type::Int {
                return Err(sink.error(
                    format!(
                        "Operador '{}' requer operando inteiro, encontrado '{}'",
                        unary.lexeme, operand
                    ),
                    unary.position,
                    unary.length,
                ));
            }
            Ok(Type::Int)
        }
        UnaryKind::ArithmeticNeg => {
            if !operand.is_numeric() {
                return Err(sink.error(
                    format!(
                        "Operador '{}' requer operando numérico, encontrado '{}'",
                        unary.lexeme, operand
                    ),
                    unary.position,
                    unary.length,
                ));
            }
            Ok(operand)
        }
    }
}

fn table_fold(
    op: Operator,
    lhs: Type,
    rhs: Type,
    info: &PendingOperator,
    sink: &mut DiagnosticSink,
) -> Result<Type, CompileError> {
    match types::result_type(lhs, rhs, op) {
        Some(result) => Ok(result),
        None => Err(sink.error(
            format!(
                "Tipos incompatíveis para operador '{}': '{}' e '{}'",
                info.lexeme, lhs, rhs
            ),
            info.position,
            info.length,
        )),
    }
}

fn apply_binary(
    op: &PendingOperator,
    lhs: Type,
    rhs: Type,
    sink: &mut DiagnosticSink,
) -> Result<Type, CompileError> {
    if lhs == Type::Error || rhs == Type::Error {
        return Ok(Type::Error);
    }
    match op.kind {
        OperatorKind::LogicalOr | OperatorKind::LogicalAnd => {
            if !lhs.is_bool_convertible() || !rhs.is_bool_convertible() {
                return Err(sink.error(
                    format!(
                        "Operador '{}' requer valores convertíveis para booleano, encontrados '{}' e '{}'",
                        op.lexeme, lhs, rhs
                    ),
                    op.position,
                    op.length,
                ));
            }
            Ok(Type::Bool)
        }
        OperatorKind::BitwiseOr
        | OperatorKind::BitwiseAnd
        | OperatorKind::BitwiseXor
        | OperatorKind::ShiftLeft
        | OperatorKind::ShiftRight => {
            if lhs != Type::Int || rhs != Type::Int {
                return Err(sink.error(
                    format!(
                        "Operador '{}' requer operandos inteiros, encontrados '{}' e '{}'",
                        op.lexeme, lhs, rhs
                    ),
                    op.position,
                    op.length,
                ));
            }
            Ok(Type::Int)
        }
        OperatorKind::Add => table_fold(Operator::Sum, lhs, rhs, op, sink),
        OperatorKind::Subtract => table_fold(Operator::Sub, lhs, rhs, op, sink),
        OperatorKind::Multiply => table_fold(Operator::Mul, lhs, rhs, op, sink),
        OperatorKind::Divide => table_fold(Operator::Div, lhs, rhs, op, sink),
        OperatorKind::Modulo => {
            if lhs != Type::Int || rhs != Type::Int {
                return Err(sink.error(
                    format!(
                        "Operador '{}' requer operandos inteiros, encontrados '{}' e '{}'",
                        op.lexeme, lhs, rhs
                    ),
                    op.position,
                    op.length,
                ));
            }
            table_fold(Operator::Mod, lhs, rhs, op, sink)
        }
        OperatorKind::Power => {
            if !lhs.is_numeric() || !rhs.is_numeric() {
                return Err(sink.error(
                    format!(
                        "Operador '{}' requer operandos numéricos, encontrados '{}' e '{}'",
                        op.lexeme, lhs, rhs
                    ),
                    op.position,
                    op.length,
                ));
            }
            table_fold(Operator::Pow, lhs, rhs, op, sink)
        }
        OperatorKind::RelationalCompare => {
            if !lhs.is_numeric() || !rhs.is_numeric() {
                return Err(sink.error(
                    format!(
                        "Operador '{}' requer operandos numéricos, encontrados '{}' e '{}'",
                        op.lexeme, lhs, rhs
                    ),
                    op.position,
                    op.length,
                ));
            }
            Ok(Type::Bool)
        }
        OperatorKind::RelationalEquality => {
            if lhs == rhs || (lhs.is_numeric() && rhs.is_numeric()) {
                Ok(Type::Bool)
            } else {
                Err(sink.error(
                    format!(
                        "Operador '{}' requer operandos comparáveis, encontrados '{}' e '{}'",
                        op.lexeme, lhs, rhs
                    ),
                    op.position,
                    op.length,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op_token(lexeme: &str, position: usize) -> Token {
        Token::new(lexeme, position)
    }

    #[test]
    fn test_single_operand_accumulates() {
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        let t = typer.note_operand(Type::Float, &mut sink).unwrap();
        assert_eq!(t, Type::Float);
    }

    #[test]
    fn test_binary_fold_in_token_order() {
        // 1 + 2 * 3.0 folds left to right: int+int -> int, int*float -> float
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.note_operand(Type::Int, &mut sink).unwrap();
        typer.note_binary(OperatorKind::Add, Some(&op_token("+", 2)));
        typer.note_operand(Type::Int, &mut sink).unwrap();
        typer.note_binary(OperatorKind::Multiply, Some(&op_token("*", 6)));
        let t = typer.note_operand(Type::Float, &mut sink).unwrap();
        assert_eq!(t, Type::Float);
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_unary_applies_nearest_first() {
        // !~5 : bitwise-not keeps int, logical-not turns it bool
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.note_unary(UnaryKind::LogicalNot, Some(&op_token("!", 0)));
        typer.note_unary(UnaryKind::BitwiseNot, Some(&op_token("~", 1)));
        let t = typer.note_operand(Type::Int, &mut sink).unwrap();
        assert_eq!(t, Type::Bool);
    }

    #[test]
    fn test_bitwise_not_rejects_float() {
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.note_unary(UnaryKind::BitwiseNot, Some(&op_token("~", 0)));
        let err = typer.note_operand(Type::Float, &mut sink).unwrap_err();
        assert!(err.message().contains("requer operando inteiro"));
        assert_eq!(err.position(), 0);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_modulo_rejects_float_operand() {
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.note_operand(Type::Int, &mut sink).unwrap();
        typer.note_binary(OperatorKind::Modulo, Some(&op_token("%", 4)));
        let err = typer.note_operand(Type::Float, &mut sink).unwrap_err();
        assert!(err.message().contains("requer operandos inteiros"));
    }

    #[test]
    fn test_ordered_comparison_of_strings_fails() {
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.note_operand(Type::String, &mut sink).unwrap();
        typer.note_binary(OperatorKind::RelationalCompare, Some(&op_token("<", 3)));
        let err = typer.note_operand(Type::String, &mut sink).unwrap_err();
        assert!(err.message().contains("requer operandos numéricos"));
    }

    #[test]
    fn test_string_equality_is_bool() {
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.note_operand(Type::String, &mut sink).unwrap();
        typer.note_binary(OperatorKind::RelationalEquality, Some(&op_token("==", 3)));
        let t = typer.note_operand(Type::String, &mut sink).unwrap();
        assert_eq!(t, Type::Bool);
    }

    #[test]
    fn test_pop_feeds_enclosing_context() {
        // (1 + 2) * 1.5
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.push_context();
        typer.note_operand(Type::Int, &mut sink).unwrap();
        typer.note_binary(OperatorKind::Add, Some(&op_token("+", 3)));
        typer.note_operand(Type::Int, &mut sink).unwrap();
        let inner = typer.pop_context(&mut sink).unwrap();
        assert_eq!(inner, Some(Type::Int));
        typer.note_operand(inner.unwrap(), &mut sink).unwrap();
        typer.note_binary(OperatorKind::Multiply, Some(&op_token("*", 8)));
        let t = typer.note_operand(Type::Float, &mut sink).unwrap();
        assert_eq!(t, Type::Float);
    }

    #[test]
    fn test_dangling_operator_reported_at_operator() {
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.push_context();
        typer.note_operand(Type::Int, &mut sink).unwrap();
        typer.note_binary(OperatorKind::Add, Some(&op_token("+", 5)));
        let err = typer.pop_context(&mut sink).unwrap_err();
        assert!(err.message().contains("sem operando à direita"));
        assert_eq!(err.position(), 5);
    }

    #[test]
    fn test_error_operand_poisons_silently() {
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.note_operand(Type::Error, &mut sink).unwrap();
        typer.note_binary(OperatorKind::Add, Some(&op_token("+", 1)));
        let t = typer.note_operand(Type::Int, &mut sink).unwrap();
        assert_eq!(t, Type::Error);
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_reset_clears_contexts() {
        let mut typer = ExpressionTyper::new();
        let mut sink = DiagnosticSink::new();
        typer.push_context();
        typer.note_operand(Type::Int, &mut sink).unwrap();
        typer.reset();
        assert!(typer.is_empty());
    }
}
