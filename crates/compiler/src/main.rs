//! UniScript Compiler CLI
//!
//! Reads a source file (default `prompt.txt`), runs the analysis pipeline,
//! prints diagnostics to stderr and the symbol table plus a success line to
//! stdout, and writes the generated assembly on clean compiles.
//!
//! Exit codes: 0 on success, 1 on I/O or compilation failure.

use clap::Parser as ClapParser;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use uniscriptc::token::offset_to_line_col;
use uniscriptc::{compile_source_with, CompileError, CompilerConfig, Severity};

#[derive(ClapParser)]
#[command(name = "uniscriptc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "UniScript compiler - semantic analysis and BIP assembly", long_about = None)]
struct Cli {
    /// Input UniScript source file
    #[arg(default_value = "prompt.txt")]
    input: PathBuf,

    /// Output path for the generated assembly (overrides the config file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip assembly generation
    #[arg(long)]
    no_emit_bip: bool,

    /// TOML configuration file (default: uniscript.toml next to the input)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (input, source) = match read_input(&cli.input) {
        Ok(found) => found,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };
    info!(input = %input.display(), "compiling");

    let mut config = match CompilerConfig::load(cli.config.as_deref(), &input) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };
    if let Some(output) = cli.output {
        config.output = output;
    }
    if cli.no_emit_bip {
        config.emit_bip = false;
    }

    let compilation = compile_source_with(&source, &config);

    for diagnostic in &compilation.snapshot.diagnostics {
        let tag = match diagnostic.severity {
            Severity::Error => "[ERRO]",
            Severity::Warning => "[AVISO]",
        };
        eprintln!("{} {}", tag, diagnostic.message);
    }

    match compilation.result {
        Ok(()) => {
            print!("{}", compilation.symbol_table_text);
            if let Some(assembly) = &compilation.assembly {
                if let Err(e) = std::fs::write(&config.output, assembly) {
                    eprintln!(
                        "Erro ao escrever o arquivo: {}: {}",
                        config.output.display(),
                        e
                    );
                    process::exit(1);
                }
                println!("Código gerado em {}", config.output.display());
            }
            println!("Analise concluida com sucesso!");
        }
        Err(error) => {
            let (line, column) = offset_to_line_col(&source, error.position());
            eprintln!(
                "Problema {}: {} (linha {}, coluna {})",
                kind_name(&error),
                error.message(),
                line,
                column
            );
            process::exit(1);
        }
    }
}

fn kind_name(error: &CompileError) -> &'static str {
    match error {
        CompileError::Lexical { .. } => "lexico",
        CompileError::Syntactic { .. } => "sintatico",
        CompileError::Semantic { .. } => "semantico",
    }
}

/// Read the input file; the default `prompt.txt` also tries the parent
/// directory so running from a build subdirectory still finds it.
fn read_input(path: &Path) -> Result<(PathBuf, String), String> {
    match std::fs::read_to_string(path) {
        Ok(source) => Ok((path.to_path_buf(), source)),
        Err(first_error) => {
            if path == Path::new("prompt.txt") {
                let fallback = Path::new("..").join(path);
                if let Ok(source) = std::fs::read_to_string(&fallback) {
                    return Ok((fallback, source));
                }
            }
            Err(format!(
                "Erro ao abrir o arquivo: {}: {}",
                path.display(),
                first_error
            ))
        }
    }
}
