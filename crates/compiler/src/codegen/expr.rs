//! Assignment and expression lowering
//!
//! The emitter consumes source slices, not an AST from the front end: a
//! statement is re-sliced between its recorded position and the next
//! semicolon, split on the first store `=`, and the right side parsed into
//! a small integer-expression tree. This back end is integer-only: a
//! slice that mentions strings, floats or calls is silently skipped.
//!
//! Lowering tiers, cheapest first:
//! - fast paths (`x = k`, `x = y`, `x = a[i]`, `x = a op b`) use no
//!   temporaries;
//! - pure add/sub chains flatten into signed terms around a running
//!   accumulator at address 1000, staging array terms through 1001;
//! - everything else allocates fresh temporaries from the 900–999 pool.
//!
//! Array indices always stage through 1002 and the `$indr` register.

use super::alias::AliasTable;
use super::scan;

/// Scratch addresses reserved beside the 900–999 temp pool.
pub(crate) const ACC_SCRATCH: u32 = 1000;
pub(crate) const ALT_SCRATCH: u32 = 1001;
pub(crate) const INDEX_SCRATCH: u32 = 1002;

const TEMP_POOL_START: u32 = 900;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(i64),
    Var(String, usize),
    Index(String, usize, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Read,
}

/// Assignment target: plain variable or indexed element.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    Var(String, usize),
    Indexed(String, usize, Expr),
}

pub(crate) struct Emitter<'a> {
    aliases: &'a AliasTable,
    masked: &'a [u8],
    next_temp: u32,
    pub instructions: Vec<String>,
}

impl<'a> Emitter<'a> {
    pub fn new(aliases: &'a AliasTable, masked: &'a [u8]) -> Self {
        Emitter {
            aliases,
            masked,
            next_temp: TEMP_POOL_START,
            instructions: Vec::new(),
        }
    }

    fn alloc_temp(&mut self) -> u32 {
        let temp = self.next_temp;
        self.next_temp += 1;
        temp
    }

    fn push(&mut self, instruction: String) {
        self.instructions.push(instruction);
    }

    fn resolve(&self, name: &str, position: usize) -> String {
        let depth = scan::depth_at(self.masked, position);
        self.aliases
            .resolve(name, position, depth)
            .map_or_else(|| name.to_string(), str::to_string)
    }

    /// Resolved `.data` address for a reference (alias or the raw name).
    pub(crate) fn resolve_addr(&self, name: &str, position: usize) -> String {
        self.resolve(name, position)
    }

    /// Leave the expression's value in the accumulator.
    pub fn eval_to_acc(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(value) => self.push(format!("LDI {}", value)),
            Expr::Var(name, pos) => {
                let addr = self.resolve(name, *pos);
                self.push(format!("LD {}", addr));
            }
            Expr::Read => self.push("LD $in_port".to_string()),
            Expr::Index(name, pos, index) => {
                self.load_element(name, *pos, index);
            }
            Expr::Neg(inner) => {
                self.eval_to_acc(inner);
                let temp = self.alloc_temp();
                self.push(format!("STO {}", temp));
                self.push("LDI 0".to_string());
                self.push(format!("SUB {}", temp));
            }
            Expr::Binary(op, lhs, rhs) => match rhs.as_ref() {
                Expr::Literal(value) => {
                    self.eval_to_acc(lhs);
                    self.push(format!("{}I {}", op, value));
                }
                Expr::Var(name, pos) => {
                    let addr = self.resolve(name, *pos);
                    self.eval_to_acc(lhs);
                    self.push(format!("{} {}", op, addr));
                }
                _ => {
                    self.eval_to_acc(rhs);
                    let temp = self.alloc_temp();
                    self.push(format!("STO {}", temp));
                    self.eval_to_acc(lhs);
                    self.push(format!("{} {}", op, temp));
                }
            },
        }
    }

    /// `arr[index]` into the accumulator, index staged through 1002.
    fn load_element(&mut self, name: &str, position: usize, index: &Expr) {
        let addr = self.resolve(name, position);
        self.eval_to_acc(index);
        self.push(format!("STO {}", INDEX_SCRATCH));
        self.push(format!("LD {}", INDEX_SCRATCH));
        self.push("STO $indr".to_string());
        self.push(format!("LDV {}", addr));
    }

    /// Lower one assignment.
    pub fn assign(&mut self, target: &Target, value: &Expr) {
        match target {
            Target::Var(name, pos) => {
                let addr = self.resolve(name, *pos);
                if !self.try_addsub_chain(value) {
                    self.eval_to_acc(value);
                }
                self.push(format!("STO {}", addr));
            }
            Target::Indexed(name, pos, index) => {
                let addr = self.resolve(name, *pos);
                self.eval_to_acc(index);
                self.push(format!("STO {}", INDEX_SCRATCH));
                if !self.try_addsub_chain(value) {
                    self.eval_to_acc(value);
                }
                self.push(format!("STO {}", ACC_SCRATCH));
                self.push(format!("LD {}", INDEX_SCRATCH));
                self.push("STO $indr".to_string());
                self.push(format!("LD {}", ACC_SCRATCH));
                self.push(format!("STOV {}", addr));
            }
        }
    }

    /// Flattened add/sub chains avoid a temp per node. Returns false when
    /// the shape does not qualify (the caller falls back to the general
    /// recursive path).
    fn try_addsub_chain(&mut self, expr: &Expr) -> bool {
        let mut terms = Vec::new();
        if !flatten_chain(expr, 1, &mut terms) || terms.len() < 2 {
            return false;
        }
        // Two plain terms are already a single-instruction fast path.
        let has_index = terms.iter().any(|(_, t)| matches!(t, Expr::Index(..)));
        if terms.len() == 2 && !has_index && terms[0].0 > 0 {
            return false;
        }

        let first_positive = terms.iter().position(|(sign, _)| *sign > 0);
        match first_positive {
            Some(idx) => {
                let (_, term) = terms[idx];
                self.load_term(term);
            }
            None => self.push("LDI 0".to_string()),
        }

        for (idx, (sign, term)) in terms.iter().enumerate() {
            if Some(idx) == first_positive {
                continue;
            }
            let positive = *sign > 0;
            match term {
                Expr::Literal(value) => {
                    let op = if positive { "ADDI" } else { "SUBI" };
                    self.push(format!("{} {}", op, value));
                }
                Expr::Var(name, pos) => {
                    let addr = self.resolve(name, *pos);
                    let op = if positive { "ADD" } else { "SUB" };
                    self.push(format!("{} {}", op, addr));
                }
                Expr::Index(name, pos, index) => {
                    // Save the running value, fetch the element, combine.
                    self.push(format!("STO {}", ACC_SCRATCH));
                    self.load_element(name, *pos, index);
                    self.push(format!("STO {}", ALT_SCRATCH));
                    self.push(format!("LD {}", ACC_SCRATCH));
                    let op = if positive { "ADD" } else { "SUB" };
                    self.push(format!("{} {}", op, ALT_SCRATCH));
                }
                _ => {}
            }
        }
        true
    }

    fn load_term(&mut self, term: &Expr) {
        match term {
            Expr::Literal(value) => self.push(format!("LDI {}", value)),
            Expr::Var(name, pos) => {
                let addr = self.resolve(name, *pos);
                self.push(format!("LD {}", addr));
            }
            Expr::Index(name, pos, index) => self.load_element(name, *pos, index),
            _ => {}
        }
    }
}

fn flatten_chain<'e>(expr: &'e Expr, sign: i32, out: &mut Vec<(i32, &'e Expr)>) -> bool {
    match expr {
        Expr::Binary("ADD", lhs, rhs) => {
            flatten_chain(lhs, sign, out) && flatten_chain(rhs, sign, out)
        }
        Expr::Binary("SUB", lhs, rhs) => {
            flatten_chain(lhs, sign, out) && flatten_chain(rhs, -sign, out)
        }
        Expr::Neg(inner) => flatten_chain(inner, -sign, out),
        Expr::Literal(_) | Expr::Var(..) | Expr::Index(..) => {
            out.push((sign, expr));
            true
        }
        _ => false,
    }
}

// ---- integer-expression parsing over source slices ----------------------

struct ExprParser<'a> {
    source: &'a str,
    masked: &'a [u8],
    pos: usize,
    end: usize,
}

/// Parse `source[start..end]` as an integer expression. `None` means the
/// slice is not something this back end can lower.
pub(crate) fn parse_expr(source: &str, masked: &[u8], start: usize, end: usize) -> Option<Expr> {
    let mut parser = ExprParser {
        source,
        masked,
        pos: start,
        end: end.min(source.len()),
    };
    let expr = parser.parse_bitor()?;
    parser.skip_ws();
    if parser.pos < parser.end {
        return None;
    }
    Some(expr)
}

impl ExprParser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.end && self.masked[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        (self.pos < self.end).then(|| self.masked[self.pos])
    }

    fn eat(&mut self, text: &str) -> bool {
        self.skip_ws();
        let bytes = text.as_bytes();
        if self.pos + bytes.len() <= self.end
            && &self.masked[self.pos..self.pos + bytes.len()] == bytes
        {
            self.pos += bytes.len();
            return true;
        }
        false
    }

    fn peek2(&mut self) -> Option<(u8, Option<u8>)> {
        let first = self.peek()?;
        let second = (self.pos + 1 < self.end).then(|| self.masked[self.pos + 1]);
        Some((first, second))
    }

    fn parse_bitor(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_bitxor()?;
        loop {
            match self.peek2() {
                Some((b'|', Some(b'|'))) => return None,
                Some((b'|', _)) => {
                    self.pos += 1;
                    let rhs = self.parse_bitxor()?;
                    lhs = Expr::Binary("OR", Box::new(lhs), Box::new(rhs));
                }
                _ => return Some(lhs),
            }
        }
    }

    fn parse_bitxor(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_bitand()?;
        while self.peek() == Some(b'^') {
            self.pos += 1;
            let rhs = self.parse_bitand()?;
            lhs = Expr::Binary("XOR", Box::new(lhs), Box::new(rhs));
        }
        Some(lhs)
    }

    fn parse_bitand(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_shift()?;
        loop {
            match self.peek2() {
                Some((b'&', Some(b'&'))) => return None,
                Some((b'&', _)) => {
                    self.pos += 1;
                    let rhs = self.parse_shift()?;
                    lhs = Expr::Binary("AND", Box::new(lhs), Box::new(rhs));
                }
                _ => return Some(lhs),
            }
        }
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_addsub()?;
        loop {
            if self.eat("<<") {
                let rhs = self.parse_addsub()?;
                lhs = Expr::Binary("SLL", Box::new(lhs), Box::new(rhs));
            } else if self.eat(">>") {
                let rhs = self.parse_addsub()?;
                lhs = Expr::Binary("SRL", Box::new(lhs), Box::new(rhs));
            } else {
                return Some(lhs);
            }
        }
    }

    fn parse_addsub(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_muldiv()?;
        loop {
            match self.peek2() {
                Some((b'+', Some(b'+'))) => return None,
                Some((b'-', Some(b'-'))) => return None,
                Some((b'+', _)) => {
                    self.pos += 1;
                    let rhs = self.parse_muldiv()?;
                    lhs = Expr::Binary("ADD", Box::new(lhs), Box::new(rhs));
                }
                Some((b'-', _)) => {
                    self.pos += 1;
                    let rhs = self.parse_muldiv()?;
                    lhs = Expr::Binary("SUB", Box::new(lhs), Box::new(rhs));
                }
                _ => return Some(lhs),
            }
        }
    }

    fn parse_muldiv(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek2() {
                // Exponentiation has no machine op here.
                Some((b'*', Some(b'*'))) => return None,
                Some((b'*', _)) => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Binary("MUL", Box::new(lhs), Box::new(rhs));
                }
                Some((b'/', _)) => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Binary("DIV", Box::new(lhs), Box::new(rhs));
                }
                Some((b'%', _)) => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Binary("MOD", Box::new(lhs), Box::new(rhs));
                }
                _ => return Some(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        if self.peek() == Some(b'-') {
            self.pos += 1;
            let inner = self.parse_unary()?;
            if let Expr::Literal(value) = inner {
                return Some(Expr::Literal(-value));
            }
            return Some(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        match self.peek()? {
            b'(' => {
                self.pos += 1;
                let inner = self.parse_bitor()?;
                if self.peek()? != b')' {
                    return None;
                }
                self.pos += 1;
                Some(inner)
            }
            b'0'..=b'9' => {
                let start = self.pos;
                while self.pos < self.end && self.masked[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
                // A decimal point means a float literal: not lowerable.
                if self.pos < self.end && self.masked[self.pos] == b'.' {
                    return None;
                }
                self.source[start..self.pos].parse().ok().map(Expr::Literal)
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = self.pos;
                while self.pos < self.end && scan::is_ident_byte(self.masked[self.pos]) {
                    self.pos += 1;
                }
                let name = &self.source[start..self.pos];
                if name == "read" {
                    if self.eat("(") && self.eat(")") {
                        return Some(Expr::Read);
                    }
                    return None;
                }
                if matches!(name, "true" | "false" | "null") {
                    return None;
                }
                match self.peek() {
                    Some(b'[') => {
                        self.pos += 1;
                        let index = self.parse_bitor()?;
                        if self.peek()? != b']' {
                            return None;
                        }
                        self.pos += 1;
                        Some(Expr::Index(name.to_string(), start, Box::new(index)))
                    }
                    // Calls are not lowerable on this back end.
                    Some(b'(') => None,
                    _ => Some(Expr::Var(name.to_string(), start)),
                }
            }
            _ => None,
        }
    }
}

/// Parse an assignment's left side: `x` or `x[expr]`.
pub(crate) fn parse_target(
    source: &str,
    masked: &[u8],
    start: usize,
    end: usize,
) -> Option<Target> {
    // Skip declaration keywords so `var x: int = …` re-slices cleanly.
    let mut pos = scan::skip_ws(masked, start);
    for keyword in ["var", "const"] {
        let kw = keyword.as_bytes();
        if pos + kw.len() <= end
            && &masked[pos..pos + kw.len()] == kw
            && masked
                .get(pos + kw.len())
                .is_some_and(|b| !scan::is_ident_byte(*b))
        {
            pos = scan::skip_ws(masked, pos + kw.len());
        }
    }

    if pos >= end || !(masked[pos].is_ascii_alphabetic() || masked[pos] == b'_') {
        return None;
    }
    let name_start = pos;
    while pos < end && scan::is_ident_byte(masked[pos]) {
        pos += 1;
    }
    let name = source[name_start..pos].to_string();

    let after = scan::skip_ws(masked, pos);
    if after < end && masked[after] == b'[' {
        let close = scan::find_matching(masked, after)?;
        if close > end {
            return None;
        }
        // An empty pair is the `int[]` declaration suffix, not an index.
        let inner_start = scan::skip_ws(masked, after + 1);
        if inner_start >= close {
            return Some(Target::Var(name, name_start));
        }
        let index = parse_expr(source, masked, after + 1, close)?;
        return Some(Target::Indexed(name, name_start, index));
    }
    Some(Target::Var(name, name_start))
}

/// Whether every variable the expression touches has a registered alias.
/// Unregistered names belong to non-integer bindings this back end skips.
pub(crate) fn resolvable(expr: &Expr, aliases: &AliasTable, masked: &[u8]) -> bool {
    match expr {
        Expr::Literal(_) | Expr::Read => true,
        Expr::Var(name, pos) => {
            let depth = scan::depth_at(masked, *pos);
            aliases.resolve(name, *pos, depth).is_some()
        }
        Expr::Index(name, pos, index) => {
            let depth = scan::depth_at(masked, *pos);
            aliases.resolve(name, *pos, depth).is_some()
                && resolvable(index, aliases, masked)
        }
        Expr::Binary(_, lhs, rhs) => {
            resolvable(lhs, aliases, masked) && resolvable(rhs, aliases, masked)
        }
        Expr::Neg(inner) => resolvable(inner, aliases, masked),
    }
}

fn target_resolvable(target: &Target, aliases: &AliasTable, masked: &[u8]) -> bool {
    match target {
        Target::Var(name, pos) => {
            let depth = scan::depth_at(masked, *pos);
            aliases.resolve(name, *pos, depth).is_some()
        }
        Target::Indexed(name, pos, index) => {
            let depth = scan::depth_at(masked, *pos);
            aliases.resolve(name, *pos, depth).is_some()
                && resolvable(index, aliases, masked)
        }
    }
}

/// Lower one `lhs = rhs` statement slice into instructions.
pub(crate) fn lower_assignment(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    lhs: (usize, usize),
    rhs: (usize, usize),
) -> Option<Vec<String>> {
    let target = parse_target(source, masked, lhs.0, lhs.1)?;
    let value = parse_expr(source, masked, rhs.0, rhs.1)?;
    if !target_resolvable(&target, aliases, masked) || !resolvable(&value, aliases, masked) {
        return None;
    }
    let mut emitter = Emitter::new(aliases, masked);
    emitter.assign(&target, &value);
    Some(emitter.instructions)
}

/// Lower an increment/decrement statement (`x++`, `x--`).
pub(crate) fn lower_incdec(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    start: usize,
    end: usize,
) -> Option<Vec<String>> {
    let slice = &masked[start..end.min(masked.len())];
    let text: Vec<u8> = slice.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
    let increment = text.windows(2).any(|w| w == b"++");
    let decrement = text.windows(2).any(|w| w == b"--");
    if !increment && !decrement {
        return None;
    }

    let mut pos = scan::skip_ws(masked, start);
    while pos < end && matches!(masked[pos], b'+' | b'-') {
        pos = scan::skip_ws(masked, pos + 1);
    }
    if pos >= end || !(masked[pos].is_ascii_alphabetic() || masked[pos] == b'_') {
        return None;
    }
    let name_start = pos;
    while pos < end && scan::is_ident_byte(masked[pos]) {
        pos += 1;
    }
    let name = &source[name_start..pos];
    let depth = scan::depth_at(masked, name_start);
    aliases.resolve(name, name_start, depth)?;

    let mut emitter = Emitter::new(aliases, masked);
    let addr = emitter.resolve(name, name_start);
    emitter.push(format!("LD {}", addr));
    emitter.push(format!("{} 1", if increment { "ADDI" } else { "SUBI" }));
    emitter.push(format!("STO {}", addr));
    Some(emitter.instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(source: &str) -> (AliasTable, Vec<u8>) {
        let masked = scan::mask(source);
        let mut aliases = AliasTable::new();
        for name in ["x", "y", "a", "b", "c", "arr"] {
            aliases.register(name, 0, 0, usize::MAX);
        }
        (aliases, masked)
    }

    fn lower(source: &str) -> Vec<String> {
        let (aliases, masked) = setup(source);
        let ((ls, le), (rs, re)) =
            scan::split_assignment(&masked, 0, source.trim_end_matches(';').len()).unwrap();
        lower_assignment(&aliases, source, &masked, (ls, le), (rs, re)).unwrap()
    }

    #[test]
    fn test_literal_fast_path() {
        assert_eq!(lower("x = 7;"), ["LDI 7", "STO x_s0"]);
    }

    #[test]
    fn test_copy_fast_path() {
        assert_eq!(lower("x = y;"), ["LD y_s0", "STO x_s0"]);
    }

    #[test]
    fn test_binary_immediate_fast_path() {
        assert_eq!(lower("x = y + 3;"), ["LD y_s0", "ADDI 3", "STO x_s0"]);
        assert_eq!(lower("x = y % 4;"), ["LD y_s0", "MODI 4", "STO x_s0"]);
        assert_eq!(lower("x = y << 2;"), ["LD y_s0", "SLLI 2", "STO x_s0"]);
    }

    #[test]
    fn test_binary_memory_fast_path() {
        assert_eq!(lower("x = a & b;"), ["LD a_s0", "AND b_s0", "STO x_s0"]);
    }

    #[test]
    fn test_strength_reduced_increment() {
        assert_eq!(lower("x = x + 1;"), ["LD x_s0", "ADDI 1", "STO x_s0"]);
        assert_eq!(lower("x = x - 1;"), ["LD x_s0", "SUBI 1", "STO x_s0"]);
    }

    #[test]
    fn test_array_load_routes_through_index_scratch() {
        assert_eq!(
            lower("x = arr[2];"),
            ["LDI 2", "STO 1002", "LD 1002", "STO $indr", "LDV arr_s0", "STO x_s0"]
        );
    }

    #[test]
    fn test_array_store_sequence() {
        assert_eq!(
            lower("arr[1] = 10;"),
            [
                "LDI 1",
                "STO 1002",
                "LDI 10",
                "STO 1000",
                "LD 1002",
                "STO $indr",
                "LD 1000",
                "STOV arr_s0"
            ]
        );
    }

    #[test]
    fn test_addsub_chain_flattens() {
        assert_eq!(
            lower("x = a + b - c + 4;"),
            ["LD a_s0", "ADD b_s0", "SUB c_s0", "ADDI 4", "STO x_s0"]
        );
    }

    #[test]
    fn test_addsub_chain_leading_negative() {
        // First positive term is loaded first, the skipped negatives follow.
        assert_eq!(
            lower("x = -a + b;"),
            ["LD b_s0", "SUB a_s0", "STO x_s0"]
        );
    }

    #[test]
    fn test_addsub_chain_with_array_term() {
        assert_eq!(
            lower("x = a + arr[1];"),
            [
                "LD a_s0",
                "STO 1000",
                "LDI 1",
                "STO 1002",
                "LD 1002",
                "STO $indr",
                "LDV arr_s0",
                "STO 1001",
                "LD 1000",
                "ADD 1001",
                "STO x_s0"
            ]
        );
    }

    #[test]
    fn test_general_path_allocates_temps() {
        let instrs = lower("x = (a + b) * (c - 2);");
        assert!(instrs.iter().any(|i| i.starts_with("STO 900")));
        assert!(instrs.last().unwrap() == "STO x_s0");
        assert!(instrs.iter().any(|i| i.starts_with("MUL ")));
    }

    #[test]
    fn test_read_expression() {
        assert_eq!(lower("x = read();"), ["LD $in_port", "STO x_s0"]);
    }

    #[test]
    fn test_float_rhs_is_skipped() {
        let (aliases, masked) = setup("x = 1.5;");
        let split = scan::split_assignment(&masked, 0, 7).unwrap();
        assert!(lower_assignment(&aliases, "x = 1.5;", &masked, split.0, split.1).is_none());
    }

    #[test]
    fn test_call_rhs_is_skipped() {
        let src = "x = soma(1);";
        let (aliases, masked) = setup(src);
        let split = scan::split_assignment(&masked, 0, src.len() - 1).unwrap();
        assert!(lower_assignment(&aliases, src, &masked, split.0, split.1).is_none());
    }

    #[test]
    fn test_incdec_statement() {
        let src = "x++;";
        let (aliases, masked) = setup(src);
        assert_eq!(
            lower_incdec(&aliases, src, &masked, 0, 3).unwrap(),
            ["LD x_s0", "ADDI 1", "STO x_s0"]
        );
    }

    #[test]
    fn test_declaration_keyword_skipped_in_target() {
        let src = "var x: int = 5;";
        let (aliases, masked) = setup(src);
        let ((ls, le), (rs, re)) = scan::split_assignment(&masked, 0, src.len() - 1).unwrap();
        let instrs = lower_assignment(&aliases, src, &masked, (ls, le), (rs, re)).unwrap();
        assert_eq!(instrs, ["LDI 5", "STO x_s0"]);
    }
}
