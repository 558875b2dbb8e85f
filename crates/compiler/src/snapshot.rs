//! Language-neutral view of a compile's results
//!
//! Flat records with primitive fields only, consumed identically by the CLI
//! and the FFI boundary. Field names on the wire match the host contract
//! (`isParameter`, `isArray`, …), so the structs carry serde renames.

use crate::analyzer::Analyzer;
use crate::diagnostics::Severity;
use crate::token::offset_to_line_col;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ExportedSymbol {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub initialized: bool,
    pub used: bool,
    pub scope: i32,
    #[serde(rename = "isParameter")]
    pub is_parameter: bool,
    pub position: i32,
    pub line: i32,
    pub column: i32,
    #[serde(rename = "isArray")]
    pub is_array: bool,
    #[serde(rename = "isFunction")]
    pub is_function: bool,
    #[serde(rename = "isConstant")]
    pub is_constant: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub position: i32,
    pub length: i32,
}

/// Snapshot of everything a host consumes after a compile
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub ok: bool,
    #[serde(rename = "symbolTable")]
    pub symbol_table: Vec<ExportedSymbol>,
    pub diagnostics: Vec<ExportedDiagnostic>,
}

/// Capture the current analyzer state. Safe to call after a fault: the
/// partial symbol table and the accumulated diagnostics are returned as-is.
pub fn snapshot(analyzer: &Analyzer, ok: bool) -> Snapshot {
    let source = analyzer.source();

    let symbol_table = analyzer
        .symbols()
        .symbols()
        .iter()
        .map(|sym| {
            let (mut line, mut column) = (sym.line, sym.column);
            if (line < 0 || column < 0) && sym.position >= 0 {
                let derived = offset_to_line_col(source, sym.position);
                line = derived.0;
                column = derived.1;
            }
            ExportedSymbol {
                name: sym.name.clone(),
                type_name: sym.ty.to_string(),
                initialized: sym.initialized,
                used: sym.used,
                scope: sym.scope,
                is_parameter: sym.is_parameter,
                position: sym.position,
                line,
                column,
                is_array: sym.is_array,
                is_function: sym.is_function,
                is_constant: sym.is_constant,
            }
        })
        .collect();

    let diagnostics = analyzer
        .sink()
        .entries()
        .iter()
        .map(|d| ExportedDiagnostic {
            severity: d.severity,
            message: d.message.clone(),
            position: d.position,
            length: d.length,
        })
        .collect();

    Snapshot {
        ok,
        symbol_table,
        diagnostics,
    }
}
