//! Multi-scope symbol table
//!
//! A stack of scope frames, each mapping identifier to an index into the
//! flat symbol list. Declaration order assigns ascending indices; shadowing
//! is allowed across frames but re-declaration inside one frame is an
//! error. Frames opened by a function declaration are marked so that inner
//! references to bindings *above* the function frame are rejected: the
//! language has no closure capture. Constants (and function bindings, which
//! are constant by construction) reject assignment. Leaving a scope emits
//! an unused-identifier warning for every binding that was never read.
//!
//! `commit_statement` is the hybrid operation that makes `var x: int = 1`
//! and `x = 1` share one code path: presence of the name at the current
//! depth forces a duplicate error, absence forces a declaration, presence
//! at an outer depth forces an assignment.

use crate::diagnostics::{CompileError, DiagnosticSink};
use crate::types::{self, Compat, Type};
use std::collections::HashMap;
use std::fmt::Write as _;

/// One declared identifier
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRecord {
    pub name: String,
    pub ty: Type,
    pub has_explicit_type: bool,
    pub initialized: bool,
    pub used: bool,
    /// Depth of the frame the symbol lives in; `-1` before declaration
    pub scope: i32,
    pub is_parameter: bool,
    pub position: i32,
    pub line: i32,
    pub column: i32,
    pub is_array: bool,
    pub is_function: bool,
    pub is_constant: bool,
}

impl Default for SymbolRecord {
    fn default() -> Self {
        SymbolRecord {
            name: String::new(),
            ty: Type::Int,
            has_explicit_type: false,
            initialized: false,
            used: false,
            scope: -1,
            is_parameter: false,
            position: -1,
            line: -1,
            column: -1,
            is_array: false,
            is_function: false,
            is_constant: false,
        }
    }
}

/// A function parameter handed to [`SymbolTable::begin_function`]
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub position: i32,
    pub is_array: bool,
    pub line: i32,
    pub column: i32,
}

#[derive(Debug, Default)]
struct ScopeFrame {
    bindings: HashMap<String, usize>,
}

/// Scope-stacked symbol table with the pending expression type the typer
/// publishes between operand folds and statement commits.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<ScopeFrame>,
    symbols: Vec<SymbolRecord>,
    open_functions: Vec<String>,
    function_scope_depths: Vec<usize>,
    pending_expr_type: Option<Type>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            scopes: Vec::new(),
            symbols: Vec::new(),
            open_functions: Vec::new(),
            function_scope_depths: Vec::new(),
            pending_expr_type: None,
        };
        table.enter_scope();
        table
    }

    pub fn reset(&mut self) {
        self.scopes.clear();
        self.symbols.clear();
        self.open_functions.clear();
        self.function_scope_depths.clear();
        self.pending_expr_type = None;
        self.enter_scope();
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(ScopeFrame::default());
    }

    /// Close the innermost frame, warning about every binding in it that
    /// was never used. Warnings come out in declaration order.
    pub fn exit_scope(&mut self, sink: &mut DiagnosticSink) {
        let Some(frame) = self.scopes.last() else {
            return;
        };

        let mut indices: Vec<usize> = frame.bindings.values().copied().collect();
        indices.sort_unstable();
        for idx in indices {
            let sym = &self.symbols[idx];
            if !sym.used {
                sink.warning(
                    format!(
                        "Identificador declarado e não usado: '{}' (escopo {})",
                        sym.name, sym.scope
                    ),
                    sym.position,
                    sym.name.len().max(1) as i32,
                );
            }
        }

        if self
            .function_scope_depths
            .last()
            .is_some_and(|depth| *depth == self.scopes.len() - 1)
        {
            self.function_scope_depths.pop();
        }

        self.scopes.pop();
    }

    /// Unwind every frame including the root (end of analysis).
    pub fn close_all(&mut self, sink: &mut DiagnosticSink) {
        while self.scopes.len() > 1 {
            self.exit_scope(sink);
        }
        if self.scopes.len() == 1 {
            self.exit_scope(sink);
        }
    }

    pub fn current_depth(&self) -> i32 {
        self.scopes.len() as i32 - 1
    }

    /// Declare a symbol in the current frame; duplicate names in one frame
    /// are rejected.
    pub fn declare(
        &mut self,
        entry: SymbolRecord,
        sink: &mut DiagnosticSink,
    ) -> Result<(), CompileError> {
        let depth = self.current_depth();
        let Some(frame) = self.scopes.last_mut() else {
            return Ok(());
        };
        if frame.bindings.contains_key(&entry.name) {
            return Err(sink.error(
                format!(
                    "Identificador já declarado neste escopo: '{}'",
                    entry.name
                ),
                entry.position,
                entry.name.len().max(1) as i32,
            ));
        }

        let mut record = entry;
        record.scope = depth;
        let idx = self.symbols.len();
        frame.bindings.insert(record.name.clone(), idx);
        self.symbols.push(record);
        Ok(())
    }

    fn lookup_index(&self, name: &str) -> Option<usize> {
        for frame in self.scopes.iter().rev() {
            if let Some(idx) = frame.bindings.get(name) {
                return Some(*idx);
            }
        }
        None
    }

    /// Nearest enclosing binding, if any.
    pub fn lookup(&self, name: &str) -> Option<&SymbolRecord> {
        self.lookup_index(name).map(|idx| &self.symbols[idx])
    }

    /// Mark a referenced identifier as used.
    ///
    /// Errors: undeclared name; reference across a function boundary (no
    /// closure capture); `require_array` on a non-array binding. Reading an
    /// uninitialised non-function binding warns.
    pub fn mark_used(
        &mut self,
        name: &str,
        position: i32,
        length: i32,
        require_array: bool,
        sink: &mut DiagnosticSink,
    ) -> Result<(), CompileError> {
        let Some(idx) = self.lookup_index(name) else {
            return Err(sink.error(
                format!("Uso de identificador não declarado: '{}'", name),
                position,
                length,
            ));
        };

        if let Some(function_depth) = self.function_scope_depths.last() {
            let sym = &self.symbols[idx];
            if !sym.is_function && sym.scope < *function_depth as i32 {
                return Err(sink.error(
                    format!("Identificador não declarado neste escopo: '{}'", name),
                    position,
                    length,
                ));
            }
        }

        if require_array && !self.symbols[idx].is_array {
            return Err(sink.error(
                format!("Identificador não é um vetor: '{}'", name),
                position,
                length,
            ));
        }

        self.symbols[idx].used = true;
        if !self.symbols[idx].initialized && !self.symbols[idx].is_function {
            sink.warning(
                format!("Possível uso sem inicialização: '{}'", name),
                position,
                length,
            );
        }
        Ok(())
    }

    /// Commit a finished statement built from the declaration builder.
    ///
    /// Declaration-or-assignment is decided here, not in the grammar: an
    /// explicit type (or parameter flag) makes the statement a declaration
    /// attempt, an unknown name without a type is an undeclared-identifier
    /// error, and a known name at an outer depth is an assignment.
    pub fn commit_statement(
        &mut self,
        entry: SymbolRecord,
        sink: &mut DiagnosticSink,
    ) -> Result<(), CompileError> {
        if entry.name.is_empty() || entry.is_function {
            self.pending_expr_type = None;
            return Ok(());
        }

        let index = self.lookup_index(&entry.name);
        let depth = self.current_depth();
        let declaration_attempt = entry.has_explicit_type || entry.is_parameter;

        let result = if declaration_attempt {
            let same_frame = index.is_some_and(|idx| self.symbols[idx].scope == depth);
            if same_frame {
                Err(sink.error(
                    format!(
                        "Identificador já declarado neste escopo: '{}'",
                        entry.name
                    ),
                    entry.position,
                    entry.name.len().max(1) as i32,
                ))
            } else {
                self.commit_new_declaration(entry, sink)
            }
        } else if let Some(idx) = index {
            self.commit_existing_use(entry, idx, sink)
        } else {
            self.commit_new_declaration(entry, sink)
        };

        self.pending_expr_type = None;
        result
    }

    fn commit_new_declaration(
        &mut self,
        entry: SymbolRecord,
        sink: &mut DiagnosticSink,
    ) -> Result<(), CompileError> {
        if !entry.has_explicit_type {
            return Err(sink.error(
                format!("Uso de identificador não declarado: '{}'", entry.name),
                entry.position,
                entry.name.len().max(1) as i32,
            ));
        }

        let was_initialized = entry.initialized;
        let position = entry.position;
        let length = entry.name.len().max(1) as i32;
        let name = entry.name.clone();
        self.declare(entry, sink)?;

        let Some(idx) = self.lookup_index(&name) else {
            return Ok(());
        };

        if let Some(pending) = self.pending_expr_type {
            match types::assign_compat(self.symbols[idx].ty, pending) {
                Compat::Err => {
                    return Err(sink.error(
                        format!("Tipos incompatíveis na inicialização de '{}'", name),
                        position,
                        length,
                    ));
                }
                Compat::Warning => {
                    self.symbols[idx].initialized = true;
                    sink.warning(
                        format!("Conversão implícita na inicialização de '{}'", name),
                        position,
                        length,
                    );
                }
                Compat::Ok => {
                    self.symbols[idx].initialized = true;
                }
            }
        } else if was_initialized {
            self.symbols[idx].initialized = true;
        }
        Ok(())
    }

    fn commit_existing_use(
        &mut self,
        entry: SymbolRecord,
        idx: usize,
        sink: &mut DiagnosticSink,
    ) -> Result<(), CompileError> {
        // Writing a binding is not reading it: `used` only advances when the
        // statement itself read the name (calls, increments, prints).
        if entry.used {
            self.symbols[idx].used = true;
        }
        let length = entry.name.len().max(1) as i32;

        let assignment_attempt = entry.initialized || self.pending_expr_type.is_some();
        if assignment_attempt && self.symbols[idx].is_constant {
            return Err(sink.error(
                format!("Não é permitido modificar constante: '{}'", entry.name),
                entry.position,
                length,
            ));
        }

        if let Some(pending) = self.pending_expr_type {
            match types::assign_compat(self.symbols[idx].ty, pending) {
                Compat::Err => {
                    return Err(sink.error(
                        format!("Tipos incompatíveis na atribuição para '{}'", entry.name),
                        entry.position,
                        length,
                    ));
                }
                Compat::Warning => {
                    self.symbols[idx].initialized = true;
                    sink.warning(
                        format!(
                            "Possível perda de precisão na atribuição para '{}'",
                            entry.name
                        ),
                        entry.position,
                        length,
                    );
                }
                Compat::Ok => {
                    self.symbols[idx].initialized = true;
                }
            }
        } else if entry.initialized {
            self.symbols[idx].initialized = true;
        } else if !self.symbols[idx].initialized && !self.symbols[idx].is_function {
            sink.warning(
                format!("Possível uso sem inicialização: '{}'", entry.name),
                entry.position,
                length,
            );
        }
        Ok(())
    }

    /// Declare a function symbol and open its frame with the parameters
    /// already bound. Function bindings are constant and initialised.
    pub fn begin_function(
        &mut self,
        name: &str,
        return_type: Type,
        params: &[Param],
        position: i32,
        line: i32,
        column: i32,
        sink: &mut DiagnosticSink,
    ) -> Result<(), CompileError> {
        let function = SymbolRecord {
            name: name.to_string(),
            ty: return_type,
            has_explicit_type: true,
            initialized: true,
            is_function: true,
            is_constant: true,
            position,
            line,
            column,
            ..SymbolRecord::default()
        };
        self.declare(function, sink)?;

        self.enter_scope();
        self.function_scope_depths.push(self.scopes.len() - 1);
        for param in params {
            let record = SymbolRecord {
                name: param.name.clone(),
                ty: param.ty,
                has_explicit_type: true,
                initialized: true,
                is_parameter: true,
                is_array: param.is_array,
                position: param.position,
                line: param.line,
                column: param.column,
                ..SymbolRecord::default()
            };
            self.declare(record, sink)?;
        }
        self.open_functions.push(name.to_string());
        Ok(())
    }

    /// Close the innermost function frame, if one is still open.
    pub fn maybe_close_function(&mut self, sink: &mut DiagnosticSink) {
        if !self.open_functions.is_empty() {
            self.exit_scope(sink);
            self.open_functions.pop();
        }
    }

    pub fn note_expr_type(&mut self, ty: Type) {
        self.pending_expr_type = Some(ty);
    }

    pub fn discard_pending_expression(&mut self) {
        self.pending_expr_type = None;
    }

    pub fn pending_expr_type(&self) -> Option<Type> {
        self.pending_expr_type
    }

    /// Declared type of the nearest binding; `Int` when unknown, matching
    /// the conservative literal-inference fallback.
    pub fn symbol_type(&self, name: &str) -> Type {
        self.lookup(name).map_or(Type::Int, |sym| sym.ty)
    }

    pub fn is_array_symbol(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|sym| sym.is_array)
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.lookup_index(name).is_some()
    }

    pub fn symbols(&self) -> &[SymbolRecord] {
        &self.symbols
    }

    /// Aligned text rendering of the table, as shown by the CLI.
    pub fn render_table(&self) -> String {
        fn sim(flag: bool) -> &'static str {
            if flag { "sim" } else { "nao" }
        }

        let mut out = String::new();
        let _ = writeln!(out, "\n==== TABELA DE SÍMBOLOS ====");
        let _ = writeln!(
            out,
            "{:<18}{:<8}{:<12}{:<12}{:<6}{:<6}{:<10}{:<10}{:<6}{:<6}",
            "Nome",
            "Tipo",
            "Mutab.",
            "Inicializada",
            "Usada",
            "Escopo",
            "Posição",
            "Parâmetro",
            "Vetor",
            "Função"
        );
        let _ = writeln!(out, "{}", "-".repeat(102));
        for sym in &self.symbols {
            let pos = if sym.line >= 0 {
                format!("{}:{}", sym.line, sym.column.max(1))
            } else {
                "-".to_string()
            };
            let _ = writeln!(
                out,
                "{:<18}{:<8}{:<12}{:<12}{:<6}{:<6}{:<10}{:<10}{:<6}{:<6}",
                sym.name,
                sym.ty.to_string(),
                if sym.is_constant { "const" } else { "var" },
                sim(sym.initialized),
                sim(sym.used),
                sym.scope,
                pos,
                sim(sym.is_parameter),
                sim(sym.is_array),
                sim(sym.is_function)
            );
        }
        let _ = writeln!(out, "{}", "-".repeat(102));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            ..SymbolRecord::default()
        }
    }

    fn typed_entry(name: &str, ty: Type) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            ty,
            has_explicit_type: true,
            ..SymbolRecord::default()
        }
    }

    #[test]
    fn test_declare_sets_current_depth() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table.enter_scope();
        table.declare(typed_entry("x", Type::Int), &mut sink).unwrap();
        assert_eq!(table.lookup("x").unwrap().scope, table.current_depth());
    }

    #[test]
    fn test_duplicate_in_same_frame_rejected() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table.declare(typed_entry("x", Type::Int), &mut sink).unwrap();
        let err = table
            .declare(typed_entry("x", Type::Float), &mut sink)
            .unwrap_err();
        assert!(err.message().contains("já declarado"));
    }

    #[test]
    fn test_shadowing_across_frames() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table.declare(typed_entry("x", Type::Int), &mut sink).unwrap();
        table.enter_scope();
        table
            .declare(typed_entry("x", Type::String), &mut sink)
            .unwrap();
        assert_eq!(table.lookup("x").unwrap().ty, Type::String);
        table.exit_scope(&mut sink);
        assert_eq!(table.lookup("x").unwrap().ty, Type::Int);
    }

    #[test]
    fn test_exit_scope_warns_unused_in_declaration_order() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table.enter_scope();
        table.declare(typed_entry("a", Type::Int), &mut sink).unwrap();
        table.declare(typed_entry("b", Type::Int), &mut sink).unwrap();
        table.mark_used("b", 0, 1, false, &mut sink).unwrap();
        table.exit_scope(&mut sink);
        let unused: Vec<_> = sink
            .entries()
            .iter()
            .filter(|d| d.message.contains("não usado"))
            .collect();
        assert_eq!(unused.len(), 1);
        assert!(unused[0].message.contains("'a'"));
        assert!(unused[0].message.contains("(escopo 1)"));
    }

    #[test]
    fn test_mark_used_undeclared_errors() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let err = table.mark_used("ghost", 7, 5, false, &mut sink).unwrap_err();
        assert!(err.message().contains("não declarado"));
        assert_eq!(err.position(), 7);
    }

    #[test]
    fn test_mark_used_warns_without_initialisation() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table.declare(typed_entry("x", Type::Int), &mut sink).unwrap();
        table.mark_used("x", 2, 1, false, &mut sink).unwrap();
        assert!(table.lookup("x").unwrap().used);
        assert!(sink.entries()[0].message.contains("sem inicialização"));
    }

    #[test]
    fn test_mark_used_requires_array() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let mut e = typed_entry("x", Type::Int);
        e.initialized = true;
        table.declare(e, &mut sink).unwrap();
        let err = table.mark_used("x", 0, 1, true, &mut sink).unwrap_err();
        assert!(err.message().contains("não é um vetor"));
    }

    #[test]
    fn test_function_frame_blocks_outer_reference() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let mut global = typed_entry("g", Type::Int);
        global.initialized = true;
        table.declare(global, &mut sink).unwrap();
        table
            .begin_function("f", Type::Void, &[], -1, -1, -1, &mut sink)
            .unwrap();
        let err = table.mark_used("g", 12, 1, false, &mut sink).unwrap_err();
        assert!(err.message().contains("não declarado neste escopo"));
        // The function binding itself stays reachable.
        table.mark_used("f", 20, 1, false, &mut sink).unwrap();
    }

    #[test]
    fn test_begin_function_binds_parameters() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let params = vec![Param {
            name: "n".to_string(),
            ty: Type::Int,
            position: 10,
            is_array: false,
            line: 1,
            column: 11,
        }];
        table
            .begin_function("f", Type::Int, &params, 0, 1, 1, &mut sink)
            .unwrap();
        let n = table.lookup("n").unwrap();
        assert!(n.is_parameter && n.initialized);
        let f = table.lookup("f").unwrap();
        assert!(f.is_function && f.is_constant && f.initialized);
        table.maybe_close_function(&mut sink);
        assert!(table.lookup("n").is_none());
    }

    #[test]
    fn test_commit_declares_then_assigns() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();

        // var x: int = 1;
        table.note_expr_type(Type::Int);
        let mut decl = typed_entry("x", Type::Int);
        decl.initialized = true;
        table.commit_statement(decl, &mut sink).unwrap();
        assert!(table.lookup("x").unwrap().initialized);
        assert!(table.pending_expr_type().is_none());

        // x = 2; a write alone never marks the binding as used.
        table.note_expr_type(Type::Int);
        let mut assign = entry("x");
        assign.initialized = true;
        table.commit_statement(assign, &mut sink).unwrap();
        assert!(!table.lookup("x").unwrap().used);
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_commit_duplicate_declaration_same_frame() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table
            .commit_statement(typed_entry("x", Type::Int), &mut sink)
            .unwrap();
        let err = table
            .commit_statement(typed_entry("x", Type::Float), &mut sink)
            .unwrap_err();
        assert!(err.message().contains("já declarado"));
    }

    #[test]
    fn test_commit_undeclared_assignment_errors() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table.note_expr_type(Type::Int);
        let mut e = entry("x");
        e.initialized = true;
        let err = table.commit_statement(e, &mut sink).unwrap_err();
        assert!(err.message().contains("não declarado"));
    }

    #[test]
    fn test_commit_constant_reassignment_errors() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let mut decl = typed_entry("pi", Type::Float);
        decl.is_constant = true;
        table.note_expr_type(Type::Float);
        table.commit_statement(decl, &mut sink).unwrap();

        table.note_expr_type(Type::Float);
        let mut assign = entry("pi");
        assign.initialized = true;
        let err = table.commit_statement(assign, &mut sink).unwrap_err();
        assert!(err.message().contains("modificar constante"));
        assert!(err.message().contains("'pi'"));
    }

    #[test]
    fn test_commit_incompatible_initialisation() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table.note_expr_type(Type::String);
        let err = table
            .commit_statement(typed_entry("x", Type::Int), &mut sink)
            .unwrap_err();
        assert!(err.message().contains("Tipos incompatíveis na inicialização"));
    }

    #[test]
    fn test_commit_narrowing_assignment_warns() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let mut decl = typed_entry("x", Type::Int);
        decl.initialized = true;
        table.note_expr_type(Type::Int);
        table.commit_statement(decl, &mut sink).unwrap();

        table.note_expr_type(Type::Float);
        let mut assign = entry("x");
        assign.initialized = true;
        table.commit_statement(assign, &mut sink).unwrap();
        assert!(sink.entries()[0].message.contains("perda de precisão"));
    }

    #[test]
    fn test_close_all_unwinds_to_empty() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        table.enter_scope();
        table.enter_scope();
        table.declare(typed_entry("x", Type::Int), &mut sink).unwrap();
        table.close_all(&mut sink);
        assert_eq!(table.current_depth(), -1);
        assert!(sink.entries().iter().any(|d| d.message.contains("'x'")));
    }

    #[test]
    fn test_render_table_lists_symbols() {
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let mut e = typed_entry("contador", Type::Int);
        e.line = 1;
        e.column = 5;
        table.declare(e, &mut sink).unwrap();
        let rendered = table.render_table();
        assert!(rendered.contains("TABELA DE SÍMBOLOS"));
        assert!(rendered.contains("contador"));
        assert!(rendered.contains("1:5"));
    }
}
