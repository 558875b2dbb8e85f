//! BIP assembly generation
//!
//! The back end runs as a second pass over the same source text the
//! analyzer walked, consuming the declaration/assignment events it
//! registered. There is no AST: statements are re-sliced out of the source
//! at the byte positions recorded during analysis, control flow is
//! rediscovered with brace/paren/quote/comment tracking, and every block of
//! instructions is keyed by its source position so a final stable sort
//! makes the emitted program mirror source order.
//!
//! This back end is integer-only: non-`int` declarations get no `.data`
//! label, and any statement touching them is skipped.
//!
//! # Module Structure
//!
//! - `alias.rs`: scope aliasing (`x_s0`, `x_s1`, …) for the flat target
//! - `scan.rs`: masked-source scanning primitives
//! - `expr.rs`: assignment/expression lowering, temp pool, fast paths
//! - `control_flow.rs`: if/while/do/for discovery and relational lowering

mod alias;
mod control_flow;
mod expr;
mod scan;

use crate::analyzer::{EventKind, StatementEvent};
use crate::config::{ArrayInitStrategy, CompilerConfig};
use crate::types::Type;
use alias::AliasTable;
use control_flow::LabelAllocator;
use expr::Target;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
struct DataEntry {
    alias: String,
    values: Vec<String>,
}

#[derive(Debug)]
struct Block {
    position: usize,
    seq: u32,
    instructions: Vec<String>,
}

/// Generator for the BIP accumulator machine.
pub struct BipGenerator {
    strategy: ArrayInitStrategy,
    output: PathBuf,
    aliases: AliasTable,
    labels: LabelAllocator,
    data: Vec<DataEntry>,
    blocks: Vec<Block>,
    seq: u32,
}

impl Default for BipGenerator {
    fn default() -> Self {
        Self::new(&CompilerConfig::default())
    }
}

impl BipGenerator {
    pub fn new(config: &CompilerConfig) -> Self {
        BipGenerator {
            strategy: config.array_init,
            output: config.output.clone(),
            aliases: AliasTable::new(),
            labels: LabelAllocator::default(),
            data: Vec::new(),
            blocks: Vec::new(),
            seq: 0,
        }
    }

    pub fn reset(&mut self) {
        self.aliases = AliasTable::new();
        self.labels = LabelAllocator::default();
        self.data.clear();
        self.blocks.clear();
        self.seq = 0;
    }

    /// Generate the assembly program for `source` and the statements the
    /// analyzer registered.
    pub fn generate(&mut self, source: &str, events: &[StatementEvent]) -> String {
        self.reset();
        let masked = scan::mask(source);

        // Aliases and .data labels first: every later pass resolves
        // references against them.
        for event in events {
            if event.kind == EventKind::Declaration && event.ty == Type::Int {
                self.register_declaration(event, &masked);
            }
        }

        let lowered = control_flow::lower(&self.aliases, source, &masked, &mut self.labels);
        let header_spans = lowered.header_spans;
        for (position, instructions) in lowered.blocks {
            self.push_block(position, instructions);
        }

        for event in events {
            let position = event.position.max(0) as usize;
            if in_spans(&header_spans, position) {
                continue;
            }
            match event.kind {
                EventKind::Declaration => {
                    if event.ty == Type::Int {
                        self.emit_declaration_init(event, source, &masked, position);
                    }
                }
                EventKind::Assignment => {
                    self.emit_statement(source, &masked, position);
                }
            }
        }

        self.scan_reads(source, &masked, &header_spans);
        self.scan_prints(source, &masked, &header_spans);

        self.render()
    }

    /// Write a rendered program to the configured output path.
    pub fn write_to_file(&self, code: &str) -> std::io::Result<()> {
        std::fs::write(&self.output, code)
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    fn register_declaration(&mut self, event: &StatementEvent, masked: &[u8]) {
        let position = event.position.max(0) as usize;
        let depth = scan::depth_at(masked, position);
        let scope_end = declaration_scope_end(masked, position);
        let alias = self
            .aliases
            .register(&event.name, depth, position, scope_end);

        let values = if event.is_array {
            let literals: Vec<String> = event
                .values
                .iter()
                .filter(|v| is_int_literal(v))
                .cloned()
                .collect();
            let count = if event.literal_is_array {
                if literals.is_empty() {
                    event.values.len().max(1)
                } else {
                    literals.len()
                }
            } else {
                1
            };
            if event.literal_is_array
                && !literals.is_empty()
                && self.strategy != ArrayInitStrategy::Text
            {
                literals
            } else {
                vec!["0".to_string(); count]
            }
        } else {
            match extract_scalar_literal(&event.values) {
                Some(literal) if self.strategy != ArrayInitStrategy::Text => vec![literal],
                _ => vec!["0".to_string()],
            }
        };

        debug!(name = %event.name, %alias, "data entry");
        self.data.push(DataEntry { alias, values });
    }

    /// Initialisation instructions for an integer declaration: literal
    /// stores on the spot, anything else re-sliced as an assignment.
    fn emit_declaration_init(
        &mut self,
        event: &StatementEvent,
        source: &str,
        masked: &[u8],
        position: usize,
    ) {
        if !event.initialized {
            return;
        }
        let depth = scan::depth_at(masked, position);
        let Some(alias) = self
            .aliases
            .resolve(&event.name, position, depth)
            .map(str::to_string)
        else {
            return;
        };

        if event.is_array && event.literal_is_array {
            if self.strategy == ArrayInitStrategy::Data {
                return;
            }
            let mut instructions = Vec::new();
            let mut index = 0;
            for value in event.values.iter().filter(|v| is_int_literal(v)) {
                instructions.push(format!("LDI {}", index));
                instructions.push("STO $indr".to_string());
                instructions.push(format!("LDI {}", value));
                instructions.push(format!("STOV {}", alias));
                index += 1;
            }
            self.push_block(position, instructions);
            return;
        }

        if let Some(literal) = extract_scalar_literal(&event.values) {
            if self.strategy == ArrayInitStrategy::Data {
                return;
            }
            self.push_block(
                position,
                vec![format!("LDI {}", literal), format!("STO {}", alias)],
            );
            return;
        }

        // Non-literal initialiser: lower the statement like an assignment.
        self.emit_statement(source, masked, position);
    }

    /// Re-slice a statement from its recorded position to the next
    /// semicolon and lower it. Slices without a store are skipped.
    fn emit_statement(&mut self, source: &str, masked: &[u8], position: usize) {
        let Some(end) = scan::next_semicolon(masked, position) else {
            return;
        };
        let instructions = match scan::split_assignment(masked, position, end) {
            Some((lhs, rhs)) => expr::lower_assignment(&self.aliases, source, masked, lhs, rhs),
            None => expr::lower_incdec(&self.aliases, source, masked, position, end),
        };
        if let Some(instructions) = instructions {
            self.push_block(position, instructions);
        }
    }

    /// `read(x)` / `read(a[i])` occurrences load from the input port.
    fn scan_reads(&mut self, source: &str, masked: &[u8], header_spans: &[(usize, usize)]) {
        for position in scan::keyword_occurrences(masked, "read") {
            if in_spans(header_spans, position) {
                continue;
            }
            let lp = scan::skip_ws(masked, position + 4);
            if masked.get(lp) != Some(&b'(') {
                continue;
            }
            let Some(rp) = scan::find_matching(masked, lp) else {
                continue;
            };
            // Empty parentheses are the expression form `x = read()`,
            // handled by the assignment that contains it.
            if scan::skip_ws(masked, lp + 1) >= rp {
                continue;
            }
            let Some(target) = expr::parse_target(source, masked, lp + 1, rp) else {
                continue;
            };

            let mut emitter = expr::Emitter::new(&self.aliases, masked);
            let instructions = match &target {
                Target::Var(name, pos) => {
                    let depth = scan::depth_at(masked, *pos);
                    if self.aliases.resolve(name, *pos, depth).is_none() {
                        continue;
                    }
                    let addr = emitter.resolve_addr(name, *pos);
                    vec!["LD $in_port".to_string(), format!("STO {}", addr)]
                }
                Target::Indexed(name, pos, index) => {
                    let depth = scan::depth_at(masked, *pos);
                    if self.aliases.resolve(name, *pos, depth).is_none() {
                        continue;
                    }
                    let addr = emitter.resolve_addr(name, *pos);
                    emitter.eval_to_acc(index);
                    let mut instructions = emitter.instructions;
                    instructions.push(format!("STO {}", expr::INDEX_SCRATCH));
                    instructions.push(format!("LD {}", expr::INDEX_SCRATCH));
                    instructions.push("STO $indr".to_string());
                    instructions.push("LD $in_port".to_string());
                    instructions.push(format!("STOV {}", addr));
                    instructions
                }
            };
            self.push_block(position, instructions);
        }
    }

    /// `print(e1, e2, …)` occurrences evaluate each lowerable argument and
    /// store it to the output port.
    fn scan_prints(&mut self, source: &str, masked: &[u8], header_spans: &[(usize, usize)]) {
        for position in scan::keyword_occurrences(masked, "print") {
            if in_spans(header_spans, position) {
                continue;
            }
            let lp = scan::skip_ws(masked, position + 5);
            if masked.get(lp) != Some(&b'(') {
                continue;
            }
            let Some(rp) = scan::find_matching(masked, lp) else {
                continue;
            };

            let mut emitter = expr::Emitter::new(&self.aliases, masked);
            let mut emitted = false;
            for (start, end) in scan::split_commas(masked, lp + 1, rp) {
                let Some(argument) = expr::parse_expr(source, masked, start, end) else {
                    continue;
                };
                if !expr::resolvable(&argument, &self.aliases, masked) {
                    continue;
                }
                emitter.eval_to_acc(&argument);
                emitter.instructions.push("STO $out_port".to_string());
                emitted = true;
            }
            if emitted {
                let instructions = emitter.instructions;
                self.push_block(position, instructions);
            }
        }
    }

    /// Register an instruction block at a source position. Blocks that are
    /// textually identical to one already registered at the same position
    /// are dropped (duplicate `print` registrations collapse).
    fn push_block(&mut self, position: usize, instructions: Vec<String>) {
        if instructions.is_empty() {
            return;
        }
        if self
            .blocks
            .iter()
            .any(|b| b.position == position && b.instructions == instructions)
        {
            return;
        }
        self.seq += 1;
        self.blocks.push(Block {
            position,
            seq: self.seq,
            instructions,
        });
    }

    /// Serialise: `.data`, then `.text` with the `JMP main` prelude, blocks
    /// in source order, and the final halt. Labels sit flush-left,
    /// instructions are indented four spaces.
    fn render(&mut self) -> String {
        self.blocks.sort_by_key(|b| (b.position, b.seq));

        let mut out = String::from(".data\n");
        for entry in &self.data {
            out.push_str(&entry.alias);
            out.push_str(": ");
            out.push_str(&entry.values.join(","));
            out.push('\n');
        }
        out.push_str(".text\n");
        out.push_str("    JMP main\n");
        out.push_str("main:\n");
        for block in &self.blocks {
            for instruction in &block.instructions {
                if instruction.ends_with(':') {
                    out.push_str(instruction);
                } else {
                    out.push_str("    ");
                    out.push_str(instruction);
                }
                out.push('\n');
            }
        }
        out.push_str("    HLT 0\n");
        out
    }
}

/// Scope span of a declaration at `position`. A binding declared inside
/// parentheses is a `for`-header initialiser, whose scope extends over the
/// loop body that follows.
fn declaration_scope_end(masked: &[u8], position: usize) -> usize {
    let end = scan::enclosing_block_end(masked, position);
    if masked.get(end) == Some(&b')') {
        let lb = scan::skip_ws(masked, end + 1);
        if masked.get(lb) == Some(&b'{') {
            if let Some(rb) = scan::find_matching(masked, lb) {
                return rb;
            }
        }
    }
    end
}

fn in_spans(spans: &[(usize, usize)], position: usize) -> bool {
    spans
        .iter()
        .any(|(start, end)| position >= *start && position <= *end)
}

fn is_int_literal(lexeme: &str) -> bool {
    let mut bytes = lexeme.as_bytes();
    if let [b'+' | b'-', rest @ ..] = bytes {
        bytes = rest;
    }
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
}

/// A single integer literal among the recorded value tokens, when the
/// statement's value is exactly that literal (separators tolerated).
fn extract_scalar_literal(values: &[String]) -> Option<String> {
    let mut literal = None;
    for token in values {
        if token.is_empty() {
            continue;
        }
        if is_int_literal(token) {
            if literal.is_some() {
                return None;
            }
            literal = Some(token.clone());
            continue;
        }
        if matches!(token.as_str(), "," | ";" | "=") {
            continue;
        }
        return None;
    }
    literal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::driver;

    fn generate(source: &str) -> String {
        generate_with(source, &CompilerConfig::default())
    }

    fn generate_with(source: &str, config: &CompilerConfig) -> String {
        let mut analyzer = Analyzer::new();
        analyzer.set_source(source);
        driver::run(source, &mut analyzer).unwrap();
        let mut generator = BipGenerator::new(config);
        generator.generate(source, analyzer.events())
    }

    fn text_lines(program: &str) -> Vec<&str> {
        program
            .lines()
            .skip_while(|l| *l != ".text")
            .skip(1)
            .map(str::trim)
            .collect()
    }

    #[test]
    fn test_prelude_and_halt() {
        let program = generate("print(\"Hello, World!\");");
        let lines = text_lines(&program);
        assert_eq!(lines[0], "JMP main");
        assert_eq!(lines[1], "main:");
        assert_eq!(*lines.last().unwrap(), "HLT 0");
        assert!(program.starts_with(".data\n"));
    }

    #[test]
    fn test_scalar_declaration_and_assignment() {
        let program = generate("var x: int = 1; x = 2;");
        assert!(program.contains("x_s0: 1\n"));
        let lines = text_lines(&program);
        let body: Vec<_> = lines[2..lines.len() - 1].to_vec();
        assert_eq!(body, ["LDI 1", "STO x_s0", "LDI 2", "STO x_s0"]);
    }

    #[test]
    fn test_array_initialiser_and_indexed_store() {
        let program = generate("var a: int[] = [1,2,3]; a[1] = 10;");
        assert!(program.contains("a_s0: 1,2,3\n"));
        let lines = text_lines(&program);
        let expected_init = [
            "LDI 0", "STO $indr", "LDI 1", "STOV a_s0", "LDI 1", "STO $indr", "LDI 2",
            "STOV a_s0", "LDI 2", "STO $indr", "LDI 3", "STOV a_s0",
        ];
        assert_eq!(&lines[2..14], &expected_init);
        let store = [
            "LDI 1", "STO 1002", "LDI 10", "STO 1000", "LD 1002", "STO $indr", "LD 1000",
            "STOV a_s0",
        ];
        assert_eq!(&lines[14..22], &store);
    }

    #[test]
    fn test_array_strategy_data_only() {
        let config = CompilerConfig {
            array_init: ArrayInitStrategy::Data,
            ..CompilerConfig::default()
        };
        let program = generate_with("var a: int[] = [4,5]; print(a[0]);", &config);
        assert!(program.contains("a_s0: 4,5\n"));
        assert!(!program.contains("STOV a_s0\n    LDI 5"));
        let lines = text_lines(&program);
        assert!(!lines.contains(&"STOV a_s0"));
    }

    #[test]
    fn test_array_strategy_text_zeroes_data() {
        let config = CompilerConfig {
            array_init: ArrayInitStrategy::Text,
            ..CompilerConfig::default()
        };
        let program = generate_with("var a: int[] = [4,5]; print(a[0]);", &config);
        assert!(program.contains("a_s0: 0,0\n"));
        assert!(program.contains("STOV a_s0"));
    }

    #[test]
    fn test_for_loop_shape() {
        let source = "for (var i: int = 0; i < 3; i++) { print(i); }";
        let program = generate(source);
        assert!(program.contains("i_s1: 0\n"));

        let lines = text_lines(&program);
        let start = lines.iter().position(|l| *l == "R0:").unwrap();
        let end = lines.iter().position(|l| *l == "R1:").unwrap();
        assert!(start < end);
        // Condition: subtract and skip on the negation.
        assert_eq!(lines[start + 1], "LD i_s1");
        assert_eq!(lines[start + 2], "SUBI 3");
        assert_eq!(lines[start + 3], "BGE R1");
        // Body print, update, back edge, all before the end label.
        let body: Vec<_> = lines[start + 4..end].to_vec();
        assert_eq!(
            body,
            [
                "LD i_s1",
                "STO $out_port",
                "LD i_s1",
                "ADDI 1",
                "STO i_s1",
                "JMP R0"
            ]
        );
        assert_eq!(lines[end + 1], "HLT 0");
        // The init store precedes the start label.
        let init = lines.iter().position(|l| *l == "LDI 0").unwrap();
        assert!(init < start);
    }

    #[test]
    fn test_while_loop_shape() {
        let source = "var n: int = 3; while (n > 0) { n = n - 1; }";
        let program = generate(source);
        let lines = text_lines(&program);
        let start = lines.iter().position(|l| *l == "R0:").unwrap();
        assert_eq!(lines[start + 1], "LD n_s0");
        assert_eq!(lines[start + 2], "SUBI 0");
        assert_eq!(lines[start + 3], "BLE R1");
        assert_eq!(lines[start + 4..start + 7], ["LD n_s0", "SUBI 1", "STO n_s0"]);
        assert_eq!(lines[start + 7], "JMP R0");
        assert_eq!(lines[start + 8], "R1:");
    }

    #[test]
    fn test_do_while_back_edge_uses_direct_comparison() {
        let source = "var n: int = 3; do { n = n - 1; } while (n > 0);";
        let program = generate(source);
        let lines = text_lines(&program);
        assert!(lines.contains(&"R0:"));
        assert!(lines.contains(&"BGT R0"));
        assert!(!lines.iter().any(|l| l.starts_with("JMP R0")));
    }

    #[test]
    fn test_read_statement_and_expression() {
        let program = generate("var x: int = 0; read(x); var y: int = read(); print(y);");
        let lines = text_lines(&program);
        let reads: Vec<_> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == "LD $in_port")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(reads.len(), 2);
        assert_eq!(lines[reads[0] + 1], "STO x_s0");
        assert_eq!(lines[reads[1] + 1], "STO y_s0");
    }

    #[test]
    fn test_print_writes_output_port() {
        let program = generate("var x: int = 7; print(x, x + 1);");
        let lines = text_lines(&program);
        let outs = lines.iter().filter(|l| **l == "STO $out_port").count();
        assert_eq!(outs, 2);
        assert!(lines.contains(&"ADDI 1"));
    }

    #[test]
    fn test_string_print_is_skipped() {
        let program = generate("print(\"Hello, World!\");");
        assert!(!program.contains("$out_port"));
    }

    #[test]
    fn test_shadowed_scopes_get_distinct_labels() {
        let source = "var x: int = 1; { var x: int = 2; print(x); } print(x);";
        let program = generate(source);
        assert!(program.contains("x_s0: 1\n"));
        assert!(program.contains("x_s1: 2\n"));
        let lines = text_lines(&program);
        let first_print = lines.iter().position(|l| *l == "LD x_s1").unwrap();
        let second_print = lines.iter().rposition(|l| *l == "LD x_s0").unwrap();
        assert!(first_print < second_print);
    }

    #[test]
    fn test_non_integer_declarations_are_skipped() {
        let program = generate("var s: string = \"oi\"; var x: int = 3; print(s, x);");
        assert!(!program.contains("s_s0"));
        assert!(program.contains("x_s0: 3\n"));
        let lines = text_lines(&program);
        assert_eq!(lines.iter().filter(|l| **l == "STO $out_port").count(), 1);
    }

    #[test]
    fn test_emission_mirrors_source_order() {
        let source = "var a: int = 1; var b: int = 2; a = b; b = a;";
        let program = generate(source);
        let lines = text_lines(&program);
        let body: Vec<_> = lines[2..lines.len() - 1].to_vec();
        assert_eq!(
            body,
            [
                "LDI 1", "STO a_s0", "LDI 2", "STO b_s0", "LD b_s0", "STO a_s0", "LD a_s0",
                "STO b_s0"
            ]
        );
    }

    #[test]
    fn test_output_is_printable_ascii() {
        let program = generate(
            "var a: int[] = [1,2]; for (var i: int = 0; i < 2; i++) { print(a[i]); }",
        );
        assert!(program.bytes().all(|b| b == b'\n' || b == b'\t' || (0x20..0x7f).contains(&b)));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CompilerConfig {
            output: dir.path().join("out.bip"),
            ..CompilerConfig::default()
        };
        let mut analyzer = Analyzer::new();
        let source = "var x: int = 1; print(x);";
        analyzer.set_source(source);
        driver::run(source, &mut analyzer).unwrap();
        let mut generator = BipGenerator::new(&config);
        let code = generator.generate(source, analyzer.events());
        generator.write_to_file(&code).unwrap();
        let written = std::fs::read_to_string(dir.path().join("out.bip")).unwrap();
        assert_eq!(written, code);
    }
}
