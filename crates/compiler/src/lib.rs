//! UniScript Compiler Library
//!
//! Compiles UniScript source text into a structured diagnostics report, a
//! symbol-table snapshot, and (optionally) an assembly program for the BIP
//! accumulator machine.
//!
//! The pipeline is a straight-line call graph: the lexer feeds the parser
//! driver, the driver replays its semantic-action stream into the analyzer
//! (scopes, typing, diagnostics), and on a clean analysis the code
//! generator runs as a second pass over the same source plus the
//! statements the analyzer registered.
//!
//! ```rust
//! use uniscriptc::{compile_source_with, CompilerConfig};
//!
//! let outcome = compile_source_with("var x: int = 1; print(x);", &CompilerConfig::default());
//! assert!(outcome.result.is_ok());
//! assert!(outcome.assembly.unwrap().contains("STO $out_port"));
//! ```
//!
//! A compile holds mutable state for its duration only; `reset_state`
//! returns a [`Compiler`] to a clean slate, and concurrent compiles need
//! separate instances. Nothing suspends and nothing is asynchronous.

pub mod analyzer;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod expr;
pub mod ffi;
pub mod lexer;
pub mod snapshot;
pub mod symbols;
pub mod token;
pub mod types;

pub use analyzer::{Analyzer, EventKind, StatementEvent};
pub use codegen::BipGenerator;
pub use config::{ArrayInitStrategy, CompilerConfig};
pub use diagnostics::{CompileError, Diagnostic, DiagnosticSink, Severity};
pub use snapshot::{ExportedDiagnostic, ExportedSymbol, Snapshot};
pub use symbols::{SymbolRecord, SymbolTable};
pub use token::Token;
pub use types::{Compat, Operator, Type};

use std::path::Path;

/// One compile's mutable state: set the source, parse, read the snapshot.
#[derive(Default)]
pub struct Compiler {
    analyzer: Analyzer,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler::default()
    }

    /// Install source text, discarding any previous compile's state.
    pub fn set_source(&mut self, source: &str) {
        self.analyzer.reset_state();
        self.analyzer.set_source(source);
    }

    /// Run lexing, parsing and semantic analysis to completion. On `Err`
    /// the fault has already been recorded; partial state stays readable.
    pub fn parse(&mut self) -> Result<(), CompileError> {
        let source = self.analyzer.source().to_string();
        driver::run(&source, &mut self.analyzer)
    }

    /// Close any scopes a fault left open. Idempotent after a clean parse.
    pub fn finalize(&mut self) -> Result<(), CompileError> {
        self.analyzer.execute_action(99, None)
    }

    /// Current state as a flat snapshot; valid after success or fault.
    pub fn snapshot(&self, ok: bool) -> Snapshot {
        snapshot::snapshot(&self.analyzer, ok)
    }

    /// Statements registered for the code generator.
    pub fn events(&self) -> &[StatementEvent] {
        self.analyzer.events()
    }

    /// Aligned text rendering of the symbol table.
    pub fn render_table(&self) -> String {
        self.analyzer.symbols().render_table()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Return to a clean slate for the next compile.
    pub fn reset_state(&mut self) {
        self.analyzer.reset_state();
    }
}

/// Everything a host wants from one compile.
#[derive(Debug)]
pub struct Compilation {
    /// `Ok` on a clean analysis; the terminal fault otherwise
    pub result: Result<(), CompileError>,
    pub snapshot: Snapshot,
    /// Aligned text rendering of the symbol table
    pub symbol_table_text: String,
    /// Generated assembly, present on clean compiles when enabled
    pub assembly: Option<String>,
}

/// Compile source text, generating assembly per `config`.
pub fn compile_source_with(source: &str, config: &CompilerConfig) -> Compilation {
    let mut compiler = Compiler::new();
    compiler.set_source(source);
    let result = compiler.parse();
    let ok = result.is_ok();

    let assembly = (ok && config.emit_bip).then(|| {
        let mut generator = BipGenerator::new(config);
        generator.generate(source, compiler.events())
    });

    Compilation {
        snapshot: compiler.snapshot(ok),
        symbol_table_text: compiler.render_table(),
        assembly,
        result,
    }
}

/// Read and compile a file. `Err` is reserved for I/O and configuration
/// problems; compile faults land inside the returned [`Compilation`].
pub fn compile_file(input: &Path, config: &CompilerConfig) -> Result<Compilation, String> {
    let source = std::fs::read_to_string(input)
        .map_err(|e| format!("Erro ao abrir o arquivo: {}: {}", input.display(), e))?;
    Ok(compile_source_with(&source, config))
}
