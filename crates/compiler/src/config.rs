//! Compiler configuration
//!
//! A small TOML surface controlling the code-generation back end: whether
//! assembly is emitted at all, where it lands, and how array initialisers
//! are materialised. Defaults apply field by field, so a partial
//! `uniscript.toml` only overrides what it names.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How array initialisers reach the generated program.
///
/// The `.data` section can carry the literal values directly, the `.text`
/// prelude can store them element by element, or both, so the declared state
/// then holds before `main` user code runs regardless of loader behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayInitStrategy {
    Data,
    Text,
    Both,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    /// Run the code generator after a clean analysis
    #[serde(default = "default_emit_bip")]
    pub emit_bip: bool,
    /// Output path for the generated assembly
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Array initialiser materialisation strategy
    #[serde(default = "default_array_init")]
    pub array_init: ArrayInitStrategy,
}

fn default_emit_bip() -> bool {
    true
}

fn default_output() -> PathBuf {
    PathBuf::from("output.bip")
}

fn default_array_init() -> ArrayInitStrategy {
    ArrayInitStrategy::Both
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            emit_bip: default_emit_bip(),
            output: default_output(),
            array_init: default_array_init(),
        }
    }
}

impl CompilerConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load the configuration for a compile: an explicit `--config` path
    /// wins, otherwise a `uniscript.toml` next to the input file is used,
    /// otherwise defaults.
    pub fn load(explicit: Option<&Path>, input: &Path) -> Result<Self, String> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let sibling = input
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join("uniscript.toml");
                sibling.exists().then_some(sibling)
            }
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read config '{}': {}", path.display(), e))?;
                Self::from_toml(&content)
            }
            None => Ok(CompilerConfig::default()),
        }
    }
}
