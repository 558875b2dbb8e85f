//! Diagnostics sink and the structured fault that unwinds a compile.
//!
//! Warnings are appended and analysis continues; errors are appended **and**
//! returned as a [`CompileError`] so the parser driver unwinds immediately.
//! The sink outlives the unwind: after a failed compile the caller can still
//! collect everything that accumulated up to the fault.

use serde::Serialize;

/// Severity of a reported diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single reported diagnostic.
///
/// `position` is a zero-based byte offset into the source, `-1` when the
/// report has no anchor. Line and column are derived at display time.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub position: i32,
    pub length: i32,
}

/// Terminal fault of a compile: exactly one per failed run.
///
/// Lexical and syntactic faults originate in the lexer and the parser
/// driver; semantic faults originate in the analyzer after the matching
/// diagnostic has been appended to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Lexical {
        message: String,
        position: i32,
        length: i32,
    },
    Syntactic {
        message: String,
        position: i32,
        length: i32,
    },
    Semantic {
        message: String,
        position: i32,
        length: i32,
    },
}

impl CompileError {
    /// Category tag used by the FFI payload.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Lexical { .. } => "lexical",
            CompileError::Syntactic { .. } => "syntactic",
            CompileError::Semantic { .. } => "semantic",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Lexical { message, .. }
            | CompileError::Syntactic { message, .. }
            | CompileError::Semantic { message, .. } => message,
        }
    }

    pub fn position(&self) -> i32 {
        match self {
            CompileError::Lexical { position, .. }
            | CompileError::Syntactic { position, .. }
            | CompileError::Semantic { position, .. } => *position,
        }
    }

    pub fn length(&self) -> i32 {
        match self {
            CompileError::Lexical { length, .. }
            | CompileError::Syntactic { length, .. }
            | CompileError::Semantic { length, .. } => *length,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CompileError {}

/// Append-only log of diagnostics, ordered by emission.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink {
            entries: Vec::new(),
        }
    }

    /// Append an error diagnostic and build the fault that unwinds the
    /// driver. Callers return the fault with `Err(...)` immediately.
    #[must_use]
    pub fn error(&mut self, message: impl Into<String>, position: i32, length: i32) -> CompileError {
        let message = message.into();
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            message: message.clone(),
            position,
            length,
        });
        CompileError::Semantic {
            message,
            position,
            length,
        }
    }

    /// Append a warning; analysis continues.
    pub fn warning(&mut self, message: impl Into<String>, position: i32, length: i32) {
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            position,
            length,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
