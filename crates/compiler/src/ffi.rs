//! FFI boundary
//!
//! A one-shot compile returning JSON, plus the C-ABI pair
//! `uniscript_compile` / `uniscript_free` for hosts that embed the
//! compiler. The payload shape is the host contract: `ok`, an optional
//! fault (`kind`/`message`/`pos`/`length`), the symbol table and the
//! diagnostics, with partial state included after a fault.

use crate::diagnostics::{CompileError, Severity};
use crate::snapshot::ExportedDiagnostic;
use crate::Compiler;
use serde_json::json;
use std::ffi::{c_char, CStr, CString};

/// Compile `source` and serialise the outcome as JSON.
pub fn compile_to_json(source: &str) -> String {
    let mut compiler = Compiler::new();
    compiler.set_source(source);
    match compiler.parse() {
        Ok(()) => {
            let snapshot = compiler.snapshot(true);
            serde_json::to_string(&snapshot).unwrap_or_else(|_| fallback_payload())
        }
        Err(error) => error_payload(&compiler, &error),
    }
}

fn error_payload(compiler: &Compiler, error: &CompileError) -> String {
    let snapshot = compiler.snapshot(false);
    let mut diagnostics = snapshot.diagnostics;
    // Lexical and syntactic faults never pass through the sink; semantic
    // faults already sit there as the last entry.
    if !matches!(error, CompileError::Semantic { .. }) {
        diagnostics.push(ExportedDiagnostic {
            severity: Severity::Error,
            message: error.message().to_string(),
            position: error.position(),
            length: error.length().max(1),
        });
    }
    json!({
        "ok": false,
        "kind": error.kind(),
        "message": error.message(),
        "pos": error.position(),
        "length": error.length().max(1),
        "symbolTable": snapshot.symbol_table,
        "diagnostics": diagnostics,
    })
    .to_string()
}

fn unknown_payload(message: &str) -> String {
    json!({
        "ok": false,
        "kind": "unknown",
        "message": message,
        "pos": -1,
        "length": 1,
        "symbolTable": [],
        "diagnostics": [
            {"severity": "error", "message": message, "position": -1, "length": 1}
        ],
    })
    .to_string()
}

fn fallback_payload() -> String {
    "{\"ok\":false,\"kind\":\"unknown\",\"symbolTable\":[],\"diagnostics\":[]}".to_string()
}

/// Compile a NUL-terminated UTF-8 buffer; returns a malloc'd JSON string
/// the caller releases with [`uniscript_free`].
///
/// # Safety
///
/// `source` must be null or a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn uniscript_compile(source: *const c_char) -> *mut c_char {
    let json = if source.is_null() {
        unknown_payload("null source")
    } else {
        match CStr::from_ptr(source).to_str() {
            Ok(text) => compile_to_json(text),
            Err(_) => unknown_payload("source is not valid UTF-8"),
        }
    };
    // Interior NULs cannot appear in serde_json output of valid UTF-8.
    match CString::new(json) {
        Ok(out) => out.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Release a string returned by [`uniscript_compile`].
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by
/// [`uniscript_compile`] that has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn uniscript_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
