//! Semantic action dispatcher
//!
//! The parser driver reduces the grammar and calls [`Analyzer::execute_action`]
//! with a small, stable set of action IDs. The dispatcher accumulates a
//! transient "current variable" builder, feeds the expression typer, opens
//! and closes scopes on control-flow actions, and commits statements into
//! the symbol table. It also records every committed declaration and
//! assignment as a [`StatementEvent`] for the code generator's second pass.
//!
//! Grammar-delegated precedence: operator actions arrive between operand
//! actions in token order, so the typer folds as it goes and nothing here
//! re-derives precedence.

use crate::diagnostics::{CompileError, DiagnosticSink};
use crate::expr::{ExpressionTyper, OperatorKind, UnaryKind};
use crate::symbols::{Param, SymbolRecord, SymbolTable};
use crate::token::{offset_to_line_col, Token};
use crate::types::{self, Compat, Type};
use tracing::debug;

/// Scope kinds opened by control-flow actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    IfBranch,
    WhileLoop,
    DoLoop,
    ForLoop,
    SwitchRoot,
    CaseBranch,
}

/// Phases of a `for (init; cond; update)` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForHeaderPhase {
    Init,
    Condition,
    Update,
    Body,
}

#[derive(Debug)]
struct ForHeaderState {
    phase: ForHeaderPhase,
    paren_depth: u32,
    initializer_committed: bool,
}

impl Default for ForHeaderState {
    fn default() -> Self {
        ForHeaderState {
            phase: ForHeaderPhase::Init,
            paren_depth: 0,
            initializer_committed: false,
        }
    }
}

#[derive(Debug)]
struct ArrayLiteralState {
    declared_type: Type,
    has_declared_type: bool,
    element_type: Type,
    has_element_type: bool,
}

impl Default for ArrayLiteralState {
    fn default() -> Self {
        ArrayLiteralState {
            declared_type: Type::Int,
            has_declared_type: false,
            element_type: Type::Int,
            has_element_type: false,
        }
    }
}

/// The "current variable" record accumulated between statement commits
#[derive(Debug, Clone)]
struct Builder {
    name: String,
    ty: Type,
    value: Vec<String>,
    value_positions: Vec<i32>,
    value_lengths: Vec<i32>,
    is_constant: bool,
    is_array: bool,
    literal_is_array: bool,
    is_initialized: bool,
    is_used: bool,
    is_function: bool,
    is_parameter: bool,
    position: i32,
    line: i32,
    column: i32,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            name: String::new(),
            ty: Type::Nullable,
            value: Vec::new(),
            value_positions: Vec::new(),
            value_lengths: Vec::new(),
            is_constant: false,
            is_array: false,
            literal_is_array: false,
            is_initialized: false,
            is_used: false,
            is_function: false,
            is_parameter: false,
            position: -1,
            line: -1,
            column: -1,
        }
    }
}

/// Kind of a committed statement, as the code generator sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Declaration,
    Assignment,
}

/// A committed declaration or assignment, recorded for the second pass
#[derive(Debug, Clone)]
pub struct StatementEvent {
    pub kind: EventKind,
    pub name: String,
    pub ty: Type,
    pub is_array: bool,
    pub literal_is_array: bool,
    pub initialized: bool,
    pub values: Vec<String>,
    pub position: i32,
}

/// Semantic analyzer driven by the parser's action stream
#[derive(Debug, Default)]
pub struct Analyzer {
    source: String,
    symbols: SymbolTable,
    sink: DiagnosticSink,
    typer: ExpressionTyper,
    builder: Builder,
    parameters: Vec<Builder>,
    is_type_parameter: bool,
    active_scopes: Vec<ScopeKind>,
    for_headers: Vec<ForHeaderState>,
    waiting_do_while_condition: bool,
    array_literals: Vec<ArrayLiteralState>,
    events: Vec<StatementEvent>,
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer::default()
    }

    /// Install the source text used for position probing and line/column
    /// derivation.
    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    pub fn events(&self) -> &[StatementEvent] {
        &self.events
    }

    /// Return to a clean slate, ready for the next compile.
    pub fn reset_state(&mut self) {
        self.symbols.reset();
        self.sink.clear();
        self.typer.reset();
        self.builder = Builder::default();
        self.parameters.clear();
        self.is_type_parameter = false;
        self.active_scopes.clear();
        self.for_headers.clear();
        self.waiting_do_while_condition = false;
        self.array_literals.clear();
        self.events.clear();
        self.source.clear();
    }

    /// Entry point for the parser driver.
    pub fn execute_action(
        &mut self,
        action: i32,
        token: Option<&Token>,
    ) -> Result<(), CompileError> {
        debug!(action, token = token.map(|t| t.lexeme.as_str()), "semantic action");
        match action {
            1 => self.register_value(token),
            2 => Ok(self.typer.note_binary(OperatorKind::LogicalOr, token)),
            3 => Ok(self.typer.note_binary(OperatorKind::LogicalAnd, token)),
            4 => Ok(self.typer.note_binary(OperatorKind::BitwiseOr, token)),
            5 => Ok(self.typer.note_binary(OperatorKind::Power, token)),
            6 => Ok(self.typer.note_binary(OperatorKind::BitwiseAnd, token)),
            7 => {
                if let Some(token) = token {
                    let kind = if token.lexeme == "==" || token.lexeme == "!=" {
                        OperatorKind::RelationalEquality
                    } else {
                        OperatorKind::RelationalCompare
                    };
                    self.typer.note_binary(kind, Some(token));
                }
                Ok(())
            }
            8 => {
                if let Some(token) = token {
                    let kind = match token.lexeme.as_str() {
                        "^" => Some(OperatorKind::BitwiseXor),
                        "<<" => Some(OperatorKind::ShiftLeft),
                        ">>" => Some(OperatorKind::ShiftRight),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        self.typer.note_binary(kind, Some(token));
                    }
                }
                Ok(())
            }
            9 => {
                if let Some(token) = token {
                    let kind = if token.lexeme == "+" {
                        OperatorKind::Add
                    } else {
                        OperatorKind::Subtract
                    };
                    self.typer.note_binary(kind, Some(token));
                }
                Ok(())
            }
            10 => {
                if let Some(token) = token {
                    let kind = match token.lexeme.as_str() {
                        "*" => Some(OperatorKind::Multiply),
                        "/" => Some(OperatorKind::Divide),
                        "%" => Some(OperatorKind::Modulo),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        self.typer.note_binary(kind, Some(token));
                    }
                }
                Ok(())
            }
            11 => {
                if let Some(token) = token {
                    let kind = match token.lexeme.as_str() {
                        "!" => Some(UnaryKind::LogicalNot),
                        "~" => Some(UnaryKind::BitwiseNot),
                        "-" => Some(UnaryKind::ArithmeticNeg),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        self.typer.note_unary(kind, Some(token));
                    }
                }
                Ok(())
            }
            12 => {
                if let Some(header) = self.for_headers.last_mut() {
                    if header.phase != ForHeaderPhase::Body {
                        header.paren_depth += 1;
                    }
                }
                self.typer.push_context();
                Ok(())
            }
            13 => self.close_parenthesis(token),
            14 => {
                if let Some(token) = token {
                    if self.builder.name.is_empty() {
                        self.builder.name = token.lexeme.clone();
                        self.builder.position = token.diag_position();
                    }
                    self.symbols.mark_used(
                        &token.lexeme,
                        token.diag_position(),
                        token.diag_length(),
                        false,
                        &mut self.sink,
                    )?;
                }
                self.builder.is_used = true;
                Ok(())
            }
            15 => self.register_indexed_value(token),
            17 => {
                for idx in 0..self.builder.value.len() {
                    let value = self.builder.value[idx].clone();
                    let position = self
                        .builder
                        .value_positions
                        .get(idx)
                        .copied()
                        .unwrap_or(-1);
                    let length = self
                        .builder
                        .value_lengths
                        .get(idx)
                        .copied()
                        .unwrap_or(value.len().max(1) as i32);
                    if is_identifier_like(&value) && value != "true" && value != "false" {
                        self.symbols
                            .mark_used(&value, position, length, false, &mut self.sink)?;
                    }
                }
                self.builder.is_used = true;
                Ok(())
            }
            18 => {
                // Reads are deferred to the runtime phase; analysis only
                // records the produced type.
                self.builder.value.clear();
                self.builder.value_positions.clear();
                self.builder.value_lengths.clear();
                self.builder.is_initialized = true;
                self.symbols.note_expr_type(Type::Int);
                Ok(())
            }
            19 => self.apply_type(token),
            22 => {
                self.register_identifier_or_parameter(token);
                Ok(())
            }
            23 => {
                if let Some(token) = token {
                    self.builder.name = token.lexeme.clone();
                    self.builder.position = token.diag_position();
                    let (line, column) = offset_to_line_col(&self.source, self.builder.position);
                    self.builder.line = line;
                    self.builder.column = column;
                }
                Ok(())
            }
            24 => {
                if let Some(token) = token {
                    self.builder.name = token.lexeme.clone();
                    self.builder.position = token.diag_position();
                    let (line, column) = offset_to_line_col(&self.source, self.builder.position);
                    self.builder.line = line;
                    self.builder.column = column;
                    self.symbols.mark_used(
                        &token.lexeme,
                        token.diag_position(),
                        token.diag_length(),
                        false,
                        &mut self.sink,
                    )?;
                }
                Ok(())
            }
            25 => {
                if let Some(token) = token {
                    self.builder.is_constant = token.lexeme == "const";
                }
                Ok(())
            }
            27 => {
                self.builder.is_initialized = true;
                self.builder.is_used = true;
                Ok(())
            }
            30 => {
                self.builder.is_function = true;
                Ok(())
            }
            31 => {
                self.symbols.discard_pending_expression();
                self.reset_builder();
                Ok(())
            }
            34 => {
                let opens = token.map_or(true, |t| {
                    matches!(t.lexeme.as_str(), "if" | "elif" | "else")
                });
                if opens {
                    self.open_scope(ScopeKind::IfBranch);
                }
                Ok(())
            }
            35 => {
                self.open_scope(ScopeKind::DoLoop);
                self.waiting_do_while_condition = false;
                Ok(())
            }
            36 => {
                if self.waiting_do_while_condition {
                    self.waiting_do_while_condition = false;
                } else {
                    self.open_scope(ScopeKind::WhileLoop);
                }
                Ok(())
            }
            37 => {
                self.open_scope(ScopeKind::ForLoop);
                self.for_headers.push(ForHeaderState::default());
                Ok(())
            }
            38 => {
                if token.is_some() {
                    self.register_identifier_or_parameter(token);
                }
                Ok(())
            }
            39 => {
                if token.is_some() {
                    self.apply_type(token)?;
                }
                Ok(())
            }
            40 => self.for_header_value(token),
            41 => {
                if let Some(token) = token {
                    match token.lexeme.as_str() {
                        "switch" => self.open_scope(ScopeKind::SwitchRoot),
                        "case" | "default" => self.open_scope(ScopeKind::CaseBranch),
                        _ => {}
                    }
                }
                Ok(())
            }
            42 => self.semicolon(),
            43 => {
                self.symbols.maybe_close_function(&mut self.sink);
                Ok(())
            }
            44 => {
                self.close_scope(ScopeKind::IfBranch);
                self.discard_statement();
                Ok(())
            }
            45 => {
                self.close_scope(ScopeKind::WhileLoop);
                self.discard_statement();
                Ok(())
            }
            46 => {
                self.close_scope(ScopeKind::DoLoop);
                self.waiting_do_while_condition = true;
                self.discard_statement();
                Ok(())
            }
            47 => {
                self.waiting_do_while_condition = false;
                self.discard_statement();
                Ok(())
            }
            48 => {
                self.close_scope(ScopeKind::ForLoop);
                self.for_headers.pop();
                self.discard_statement();
                Ok(())
            }
            49 => {
                self.close_scope(ScopeKind::SwitchRoot);
                self.discard_statement();
                Ok(())
            }
            50 | 51 => {
                self.close_scope(ScopeKind::CaseBranch);
                self.discard_statement();
                Ok(())
            }
            99 => {
                self.symbols.close_all(&mut self.sink);
                Ok(())
            }
            // Comments, brackets, multi-declaration markers, break, throw.
            16 | 20 | 21 | 26 | 28 | 29 | 32 | 33 => Ok(()),
            other => {
                debug!(action = other, "unmapped semantic action");
                Ok(())
            }
        }
    }

    fn reset_builder(&mut self) {
        self.builder = Builder::default();
        self.is_type_parameter = false;
        self.typer.reset();
    }

    fn discard_statement(&mut self) {
        self.symbols.discard_pending_expression();
        self.reset_builder();
    }

    fn open_scope(&mut self, kind: ScopeKind) {
        self.symbols.enter_scope();
        self.active_scopes.push(kind);
    }

    fn close_scope(&mut self, expected: ScopeKind) {
        if self.active_scopes.last() == Some(&expected) {
            self.active_scopes.pop();
            self.symbols.exit_scope(&mut self.sink);
        }
    }

    fn note_operand(&mut self, ty: Type) -> Result<(), CompileError> {
        let accumulated = self.typer.note_operand(ty, &mut self.sink)?;
        self.symbols.note_expr_type(accumulated);
        Ok(())
    }

    fn close_parenthesis(&mut self, _token: Option<&Token>) -> Result<(), CompileError> {
        if let Some(header) = self.for_headers.last_mut() {
            if header.phase != ForHeaderPhase::Body && header.paren_depth > 0 {
                header.paren_depth -= 1;
                if header.paren_depth == 0 {
                    header.phase = ForHeaderPhase::Body;
                    self.symbols.discard_pending_expression();
                    self.reset_builder();
                    return Ok(());
                }
            }
        }
        if !self.typer.is_empty() {
            if let Some(ty) = self.typer.pop_context(&mut self.sink)? {
                self.note_operand(ty)?;
            }
        }
        Ok(())
    }

    fn register_identifier_or_parameter(&mut self, token: Option<&Token>) {
        let Some(token) = token else {
            return;
        };
        let name = token.lexeme.clone();

        if self.builder.is_function {
            let position = token.diag_position();
            let (line, column) = offset_to_line_col(&self.source, position);
            self.parameters.push(Builder {
                name,
                is_parameter: true,
                position,
                line,
                column,
                ..Builder::default()
            });
            self.is_type_parameter = true;
        } else {
            self.builder.is_array = self.symbols.is_array_symbol(&name);
            self.builder.name = name;
            self.is_type_parameter = false;
            self.builder.literal_is_array = false;
            self.builder.ty = Type::Nullable;
            self.builder.position = token.diag_position();
            let (line, column) = offset_to_line_col(&self.source, self.builder.position);
            self.builder.line = line;
            self.builder.column = column;
        }
    }

    fn apply_type(&mut self, token: Option<&Token>) -> Result<(), CompileError> {
        let Some(token) = token else {
            return Ok(());
        };
        let Some(ty) = Type::from_keyword(&token.lexeme) else {
            return Err(self.sink.error(
                format!("Tipo desconhecido: {}", token.lexeme),
                token.diag_position(),
                token.diag_length(),
            ));
        };

        let array_suffix = self.type_has_array_suffix(token);

        if self.is_type_parameter {
            if let Some(param) = self.parameters.last_mut() {
                param.ty = ty;
                param.is_used = false;
                param.is_array = array_suffix;
                param.literal_is_array = false;
            }
            self.is_type_parameter = false;
            return Ok(());
        }

        self.builder.ty = ty;
        self.builder.is_initialized = false;
        self.builder.is_array = array_suffix;
        self.builder.literal_is_array = false;

        if self.builder.is_function {
            let params: Vec<Param> = self
                .parameters
                .iter()
                .map(|p| Param {
                    name: p.name.clone(),
                    ty: if p.ty == Type::Nullable { Type::Int } else { p.ty },
                    position: p.position,
                    is_array: p.is_array,
                    line: p.line,
                    column: p.column,
                })
                .collect();
            let return_type = if self.builder.ty == Type::Nullable {
                Type::Int
            } else {
                self.builder.ty
            };
            let name = self.builder.name.clone();
            self.symbols.begin_function(
                &name,
                return_type,
                &params,
                self.builder.position,
                self.builder.line,
                self.builder.column,
                &mut self.sink,
            )?;
            self.parameters.clear();
            self.reset_builder();
        }
        Ok(())
    }

    fn register_indexed_value(&mut self, token: Option<&Token>) -> Result<(), CompileError> {
        let Some(token) = token else {
            return Ok(());
        };
        if self.builder.name.is_empty() {
            self.builder.name = token.lexeme.clone();
            self.builder.position = token.diag_position();
            let (line, column) = offset_to_line_col(&self.source, self.builder.position);
            self.builder.line = line;
            self.builder.column = column;
        }
        // The name slot of a `for` initialiser is being declared, not read.
        let suppress_use = matches!(
            self.for_headers.last(),
            Some(header)
                if header.phase == ForHeaderPhase::Init && self.builder.value.is_empty()
        );
        if !suppress_use {
            self.symbols.mark_used(
                &token.lexeme,
                token.diag_position(),
                token.diag_length(),
                true,
                &mut self.sink,
            )?;
        }
        self.builder.value.push(token.lexeme.clone());
        self.builder.value_positions.push(token.diag_position());
        self.builder.value_lengths.push(token.diag_length());
        Ok(())
    }

    fn for_header_value(&mut self, token: Option<&Token>) -> Result<(), CompileError> {
        let Some(phase) = self.for_headers.last().map(|h| h.phase) else {
            return Ok(());
        };
        match phase {
            ForHeaderPhase::Init => {
                if let Some(token) = token {
                    if !self.builder.is_function {
                        self.builder.value.push(token.lexeme.clone());
                        self.builder.value_positions.push(token.diag_position());
                        self.builder.value_lengths.push(token.diag_length());
                        self.builder.is_initialized = true;
                        let ty = self.infer_literal_type(&token.lexeme);
                        self.symbols.note_expr_type(ty);
                    }
                }
                Ok(())
            }
            ForHeaderPhase::Update => {
                self.finalize_statement()?;
                if let Some(header) = self.for_headers.last_mut() {
                    header.phase = ForHeaderPhase::Body;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn semicolon(&mut self) -> Result<(), CompileError> {
        let phase = self.for_headers.last().map(|h| h.phase);
        if let Some(phase) = phase {
            if phase != ForHeaderPhase::Body {
                match phase {
                    ForHeaderPhase::Init => {
                        self.finalize_statement()?;
                        if let Some(header) = self.for_headers.last_mut() {
                            header.phase = ForHeaderPhase::Condition;
                        }
                    }
                    ForHeaderPhase::Condition => {
                        self.discard_statement();
                        if let Some(header) = self.for_headers.last_mut() {
                            header.phase = ForHeaderPhase::Update;
                        }
                    }
                    _ => {
                        self.finalize_statement()?;
                    }
                }
                return Ok(());
            }
        }
        self.finalize_statement()
    }

    fn finalize_statement(&mut self) -> Result<(), CompileError> {
        let has_type = self.builder.ty != Type::Nullable;
        let entry = SymbolRecord {
            name: self.builder.name.clone(),
            ty: if has_type { self.builder.ty } else { Type::Int },
            has_explicit_type: has_type,
            initialized: self.builder.is_initialized,
            used: self.builder.is_used,
            is_parameter: self.builder.is_parameter,
            position: self.builder.position,
            line: self.builder.line,
            column: self.builder.column,
            is_array: self.builder.is_array,
            is_function: false,
            is_constant: self.builder.is_constant,
            ..SymbolRecord::default()
        };

        if self.builder.literal_is_array && !self.builder.is_array {
            return Err(self.sink.error(
                format!("Variável não declarada como vetor: '{}'", entry.name),
                self.builder.position,
                entry.name.len().max(1) as i32,
            ));
        }

        let event = StatementEvent {
            kind: if has_type {
                EventKind::Declaration
            } else {
                EventKind::Assignment
            },
            name: entry.name.clone(),
            ty: entry.ty,
            is_array: entry.is_array,
            literal_is_array: self.builder.literal_is_array,
            initialized: self.builder.is_initialized,
            values: self.builder.value.clone(),
            position: self.builder.position,
        };

        self.symbols.commit_statement(entry, &mut self.sink)?;
        if !event.name.is_empty() {
            self.events.push(event);
        }
        self.reset_builder();
        Ok(())
    }

    fn ensure_for_initializer_committed(&mut self) -> Result<(), CompileError> {
        let pending = matches!(
            self.for_headers.last(),
            Some(header)
                if header.phase == ForHeaderPhase::Init && !header.initializer_committed
        );
        if !pending {
            return Ok(());
        }

        if !self.builder.name.is_empty() {
            self.finalize_statement()?;
        }
        if let Some(header) = self.for_headers.last_mut() {
            header.initializer_committed = true;
            header.phase = ForHeaderPhase::Condition;
        }
        Ok(())
    }

    fn register_value(&mut self, token: Option<&Token>) -> Result<(), CompileError> {
        let Some(token) = token else {
            return Ok(());
        };
        if self.builder.is_function {
            return Ok(());
        }
        self.ensure_for_initializer_committed()?;

        let lexeme = token.lexeme.clone();
        if matches!(lexeme.as_str(), "[" | "]" | "(" | ")" | "{" | "}") {
            return Ok(());
        }

        if self.has_opening_bracket_before(token) {
            self.builder.literal_is_array = true;
            let mut state = ArrayLiteralState::default();
            if self.builder.ty != Type::Nullable {
                state.has_declared_type = true;
                state.declared_type = self.builder.ty;
                state.element_type = state.declared_type;
            } else if !self.builder.name.is_empty() && self.symbols.has_symbol(&self.builder.name)
            {
                state.has_declared_type = true;
                state.declared_type = self.symbols.symbol_type(&self.builder.name);
                state.element_type = state.declared_type;
            }
            self.array_literals.push(state);
        }

        if is_identifier_like(&lexeme) && lexeme != "true" && lexeme != "false" {
            let requires_array = self.has_indexing_after(token);
            self.symbols.mark_used(
                &lexeme,
                token.diag_position(),
                token.diag_length(),
                requires_array,
                &mut self.sink,
            )?;
        }

        self.builder.value.push(lexeme.clone());
        self.builder.value_positions.push(token.diag_position());
        self.builder.value_lengths.push(token.diag_length());
        self.builder.is_initialized = true;

        let literal_type = self.infer_literal_type(&lexeme);
        if !self.array_literals.is_empty() {
            self.check_array_element(literal_type, token)?;
        }

        self.note_operand(literal_type)?;

        if self.closes_array_after(token) && !self.array_literals.is_empty() {
            let state = self.array_literals.pop().unwrap_or_default();
            if !state.has_element_type {
                if state.has_declared_type {
                    self.symbols.note_expr_type(state.declared_type);
                } else {
                    return Err(self.sink.error(
                        "Não é possível inferir o tipo de um vetor vazio".to_string(),
                        token.diag_position(),
                        token.diag_length(),
                    ));
                }
            } else {
                let element = if state.has_declared_type {
                    state.declared_type
                } else {
                    state.element_type
                };
                if !state.has_declared_type {
                    self.builder.ty = element;
                }
                self.symbols.note_expr_type(element);
            }
            self.builder.is_initialized = true;
        }
        Ok(())
    }

    fn check_array_element(
        &mut self,
        literal_type: Type,
        token: &Token,
    ) -> Result<(), CompileError> {
        let Some(state) = self.array_literals.last_mut() else {
            return Ok(());
        };
        if !state.has_element_type {
            if state.has_declared_type {
                if types::assign_compat(state.declared_type, literal_type) != Compat::Ok {
                    let expected = state.declared_type;
                    return Err(self.sink.error(
                        format!(
                            "Tipos incompatíveis no elemento do vetor: esperado '{}', encontrado '{}'",
                            expected, literal_type
                        ),
                        token.diag_position(),
                        token.diag_length(),
                    ));
                }
                state.element_type = state.declared_type;
            } else {
                state.element_type = literal_type;
            }
            state.has_element_type = true;
        } else {
            let expected = if state.has_declared_type {
                state.declared_type
            } else {
                state.element_type
            };
            if types::assign_compat(expected, literal_type) != Compat::Ok {
                return Err(self.sink.error(
                    format!(
                        "Tipos incompatíveis no elemento do vetor: esperado '{}', encontrado '{}'",
                        expected, literal_type
                    ),
                    token.diag_position(),
                    token.diag_length(),
                ));
            }
        }
        Ok(())
    }

    /// Literal-type inference: booleans and quoted strings classify
    /// directly; identifier-shaped lexemes take the type of the symbol they
    /// refer to (`int` when unknown); the rest is scanned as a number.
    fn infer_literal_type(&self, lexeme: &str) -> Type {
        if lexeme == "true" || lexeme == "false" {
            return Type::Bool;
        }
        let bytes = lexeme.as_bytes();
        if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
            return Type::String;
        }
        let Some(&first) = bytes.first() else {
            return Type::String;
        };
        if first.is_ascii_alphabetic() || first == b'_' {
            return self.symbols.symbol_type(lexeme);
        }

        let mut idx = 0;
        let mut has_digit = false;
        let mut has_dot = false;
        if bytes[idx] == b'+' || bytes[idx] == b'-' {
            idx += 1;
        }
        while idx < bytes.len() {
            let c = bytes[idx];
            if c.is_ascii_digit() {
                has_digit = true;
            } else if c == b'.' && !has_dot {
                has_dot = true;
            } else {
                return Type::String;
            }
            idx += 1;
        }
        if !has_digit {
            return Type::String;
        }
        if has_dot { Type::Float } else { Type::Int }
    }

    /// True when the token is the first element of an array literal: the
    /// previous non-space character is `[` and the one before that is not
    /// part of an indexing expression.
    fn has_opening_bracket_before(&self, token: &Token) -> bool {
        let bytes = self.source.as_bytes();
        let mut i = token.position as isize - 1;
        while i >= 0 && bytes[i as usize].is_ascii_whitespace() {
            i -= 1;
        }
        if i < 0 || bytes[i as usize] != b'[' {
            return false;
        }
        let mut j = i - 1;
        while j >= 0 && bytes[j as usize].is_ascii_whitespace() {
            j -= 1;
        }
        if j < 0 {
            return true;
        }
        let before = bytes[j as usize];
        !(before.is_ascii_alphanumeric() || before == b'_' || before == b']')
    }

    fn next_non_space_after(&self, token: &Token) -> Option<u8> {
        let bytes = self.source.as_bytes();
        let mut pos = token.position + token.lexeme.len();
        while pos < bytes.len() {
            if bytes[pos].is_ascii_whitespace() {
                pos += 1;
                continue;
            }
            return Some(bytes[pos]);
        }
        None
    }

    fn closes_array_after(&self, token: &Token) -> bool {
        self.next_non_space_after(token) == Some(b']')
    }

    fn has_indexing_after(&self, token: &Token) -> bool {
        self.next_non_space_after(token) == Some(b'[')
    }

    /// True when the type keyword is followed by `[]` (array declaration).
    fn type_has_array_suffix(&self, token: &Token) -> bool {
        let bytes = self.source.as_bytes();
        let mut pos = token.position + token.lexeme.len();
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b'[' {
            return false;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos < bytes.len() && bytes[pos] == b']'
    }
}

fn is_identifier_like(lexeme: &str) -> bool {
    lexeme
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
}
