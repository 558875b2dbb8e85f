//! Control-flow reconstruction
//!
//! A dedicated pass scans the masked source for `if`/`elif`/`else`,
//! `while`, `do … while` and `for`, allocates fresh `Rn` labels, and
//! registers instruction blocks at source positions that bracket each body:
//! the header block sits at the keyword, the footer at the closing brace,
//! so plain statements lowered at their own positions interleave correctly
//! once everything is key-sorted.
//!
//! Relational conditions lower to `SUB` plus a conditional branch: the
//! *negated* comparison jumps around a true-branch, the *direct* comparison
//! forms a do-while back edge.

use super::alias::AliasTable;
use super::expr::{self, Expr};
use super::scan;

#[derive(Debug, Default)]
pub(crate) struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn next(&mut self) -> String {
        let label = format!("R{}", self.next);
        self.next += 1;
        label
    }
}

/// Result of the control-flow pass: positioned instruction blocks plus the
/// `for`-header spans whose statements the main pass must not re-emit.
#[derive(Debug, Default)]
pub(crate) struct ControlFlow {
    pub blocks: Vec<(usize, Vec<String>)>,
    pub header_spans: Vec<(usize, usize)>,
}

pub(crate) fn lower(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    labels: &mut LabelAllocator,
) -> ControlFlow {
    let mut out = ControlFlow::default();
    let do_tails = lower_do_while(aliases, source, masked, labels, &mut out);
    lower_while(aliases, source, masked, labels, &mut out, &do_tails);
    lower_for(aliases, source, masked, labels, &mut out);
    lower_if_chains(aliases, source, masked, labels, &mut out);
    out
}

/// `do { body } while (cond);` lowering. Returns the positions of the tail `while`
/// keywords so the while pass skips them.
fn lower_do_while(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    labels: &mut LabelAllocator,
    out: &mut ControlFlow,
) -> Vec<usize> {
    let mut tails = Vec::new();
    for do_pos in scan::keyword_occurrences(masked, "do") {
        let lb = scan::skip_ws(masked, do_pos + 2);
        if masked.get(lb) != Some(&b'{') {
            continue;
        }
        let Some(rb) = scan::find_matching(masked, lb) else {
            continue;
        };
        let wk = scan::skip_ws(masked, rb + 1);
        if !matches_keyword(masked, wk, "while") {
            continue;
        }
        let lp = scan::skip_ws(masked, wk + 5);
        if masked.get(lp) != Some(&b'(') {
            continue;
        }
        let Some(rp) = scan::find_matching(masked, lp) else {
            continue;
        };
        tails.push(wk);

        let start = labels.next();
        out.blocks.push((do_pos, vec![format!("{}:", start)]));
        let footer = lower_condition(aliases, source, masked, lp + 1, rp, &start, true);
        out.blocks.push((rb, footer));
    }
    tails
}

fn lower_while(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    labels: &mut LabelAllocator,
    out: &mut ControlFlow,
    do_tails: &[usize],
) {
    for kw in scan::keyword_occurrences(masked, "while") {
        if do_tails.contains(&kw) {
            continue;
        }
        let lp = scan::skip_ws(masked, kw + 5);
        if masked.get(lp) != Some(&b'(') {
            continue;
        }
        let Some(rp) = scan::find_matching(masked, lp) else {
            continue;
        };
        let lb = scan::skip_ws(masked, rp + 1);
        if masked.get(lb) != Some(&b'{') {
            continue;
        }
        let Some(rb) = scan::find_matching(masked, lb) else {
            continue;
        };

        let start = labels.next();
        let end = labels.next();
        let mut header = vec![format!("{}:", start)];
        header.extend(lower_condition(
            aliases, source, masked, lp + 1, rp, &end, false,
        ));
        out.blocks.push((kw, header));
        out.blocks
            .push((rb, vec![format!("JMP {}", start), format!("{}:", end)]));
    }
}

fn lower_for(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    labels: &mut LabelAllocator,
    out: &mut ControlFlow,
) {
    for kw in scan::keyword_occurrences(masked, "for") {
        let lp = scan::skip_ws(masked, kw + 3);
        if masked.get(lp) != Some(&b'(') {
            continue;
        }
        let Some(rp) = scan::find_matching(masked, lp) else {
            continue;
        };
        let lb = scan::skip_ws(masked, rp + 1);
        if masked.get(lb) != Some(&b'{') {
            continue;
        }
        let Some(rb) = scan::find_matching(masked, lb) else {
            continue;
        };

        // Split the header on its two top-level semicolons.
        let mut semis = Vec::new();
        let mut depth = 0;
        for idx in lp + 1..rp {
            match masked[idx] {
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth -= 1,
                b';' if depth == 0 => semis.push(idx),
                _ => {}
            }
        }
        if semis.len() != 2 {
            continue;
        }
        let (init, cond, update) = (
            (lp + 1, semis[0]),
            (semis[0] + 1, semis[1]),
            (semis[1] + 1, rp),
        );
        out.header_spans.push((lp, rp));

        let start = labels.next();
        let end = labels.next();

        let mut header = Vec::new();
        header.extend(lower_statement_span(aliases, source, masked, init.0, init.1));
        header.push(format!("{}:", start));
        if !span_blank(masked, cond.0, cond.1) {
            header.extend(lower_condition(
                aliases, source, masked, cond.0, cond.1, &end, false,
            ));
        }
        out.blocks.push((kw, header));

        let mut footer = lower_statement_span(aliases, source, masked, update.0, update.1);
        footer.push(format!("JMP {}", start));
        footer.push(format!("{}:", end));
        out.blocks.push((rb, footer));
    }
}

fn lower_if_chains(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    labels: &mut LabelAllocator,
    out: &mut ControlFlow,
) {
    for if_pos in scan::keyword_occurrences(masked, "if") {
        struct Branch {
            kw: usize,
            cond: (usize, usize),
            body_end: usize,
        }

        let mut branches: Vec<Branch> = Vec::new();
        let mut cursor = if_pos;
        let mut kw_len = 2;
        let mut else_body_end = None;

        loop {
            let lp = scan::skip_ws(masked, cursor + kw_len);
            if masked.get(lp) != Some(&b'(') {
                break;
            }
            let Some(rp) = scan::find_matching(masked, lp) else {
                break;
            };
            let lb = scan::skip_ws(masked, rp + 1);
            if masked.get(lb) != Some(&b'{') {
                break;
            }
            let Some(rb) = scan::find_matching(masked, lb) else {
                break;
            };
            branches.push(Branch {
                kw: cursor,
                cond: (lp + 1, rp),
                body_end: rb,
            });

            let after = scan::skip_ws(masked, rb + 1);
            if matches_keyword(masked, after, "elif") {
                cursor = after;
                kw_len = 4;
                continue;
            }
            if matches_keyword(masked, after, "else") {
                let elb = scan::skip_ws(masked, after + 4);
                if masked.get(elb) == Some(&b'{') {
                    if let Some(erb) = scan::find_matching(masked, elb) {
                        else_body_end = Some(erb);
                    }
                }
            }
            break;
        }

        if branches.is_empty() {
            continue;
        }

        let end = labels.next();
        let branch_count = branches.len();
        for (idx, branch) in branches.iter().enumerate() {
            let has_follow = idx + 1 < branch_count || else_body_end.is_some();
            let skip_label = if has_follow { labels.next() } else { end.clone() };

            let header = lower_condition(
                aliases,
                source,
                masked,
                branch.cond.0,
                branch.cond.1,
                &skip_label,
                false,
            );
            out.blocks.push((branch.kw, header));

            let footer = if has_follow {
                vec![format!("JMP {}", end), format!("{}:", skip_label)]
            } else {
                vec![format!("{}:", end)]
            };
            out.blocks.push((branch.body_end, footer));
        }
        if let Some(erb) = else_body_end {
            out.blocks.push((erb, vec![format!("{}:", end)]));
        }
    }
}

/// Lower a for-header statement span: assignment, declaration initialiser,
/// or increment/decrement. Empty spans lower to nothing.
fn lower_statement_span(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    start: usize,
    end: usize,
) -> Vec<String> {
    if span_blank(masked, start, end) {
        return Vec::new();
    }
    if let Some((lhs, rhs)) = scan::split_assignment(masked, start, end) {
        return expr::lower_assignment(aliases, source, masked, lhs, rhs).unwrap_or_default();
    }
    expr::lower_incdec(aliases, source, masked, start, end).unwrap_or_default()
}

/// Relational lowering: `LD lhs; SUB rhs; B<op> label`. `when_true` picks
/// the direct comparison (back edges); otherwise the negation jumps around
/// the true branch. Conditions without a top-level comparison branch on the
/// truthiness of the whole expression. Unlowerable conditions emit nothing.
pub(crate) fn lower_condition(
    aliases: &AliasTable,
    source: &str,
    masked: &[u8],
    start: usize,
    end: usize,
    label: &str,
    when_true: bool,
) -> Vec<String> {
    let mut emitter = expr::Emitter::new(aliases, masked);

    if let Some((op, at)) = find_relational(masked, start, end) {
        let lhs = expr::parse_expr(source, masked, start, at);
        let rhs = expr::parse_expr(source, masked, at + op.len(), end);
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return Vec::new();
        };
        if !expr::resolvable(&lhs, aliases, masked) || !expr::resolvable(&rhs, aliases, masked) {
            return Vec::new();
        }
        emit_compare(&mut emitter, &lhs, &rhs);
        let opcode = branch_opcode(op, when_true);
        emitter.instructions.push(format!("{} {}", opcode, label));
        return emitter.instructions;
    }

    let Some(cond) = expr::parse_expr(source, masked, start, end) else {
        return Vec::new();
    };
    if !expr::resolvable(&cond, aliases, masked) {
        return Vec::new();
    }
    emitter.eval_to_acc(&cond);
    let opcode = if when_true { "BNE" } else { "BEQ" };
    emitter.instructions.push(format!("{} {}", opcode, label));
    emitter.instructions
}

fn emit_compare(emitter: &mut expr::Emitter<'_>, lhs: &Expr, rhs: &Expr) {
    match rhs {
        Expr::Literal(value) => {
            emitter.eval_to_acc(lhs);
            emitter.instructions.push(format!("SUBI {}", value));
        }
        Expr::Var(name, pos) => {
            emitter.eval_to_acc(lhs);
            let addr = emitter.resolve_addr(name, *pos);
            emitter.instructions.push(format!("SUB {}", addr));
        }
        _ => {
            emitter.eval_to_acc(rhs);
            emitter.instructions.push(format!("STO {}", expr::ALT_SCRATCH));
            emitter.eval_to_acc(lhs);
            emitter
                .instructions
                .push(format!("SUB {}", expr::ALT_SCRATCH));
        }
    }
}

/// First top-level relational operator in the span.
fn find_relational(masked: &[u8], start: usize, end: usize) -> Option<(&'static str, usize)> {
    let mut depth = 0;
    let mut idx = start;
    while idx < end.min(masked.len()) {
        let b = masked[idx];
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            _ if depth == 0 => {
                let next = if idx + 1 < end { masked[idx + 1] } else { 0 };
                match (b, next) {
                    (b'=', b'=') => return Some(("==", idx)),
                    (b'!', b'=') => return Some(("!=", idx)),
                    (b'<', b'=') => return Some(("<=", idx)),
                    (b'>', b'=') => return Some((">=", idx)),
                    (b'<', b'<') | (b'>', b'>') => {
                        idx += 2;
                        continue;
                    }
                    (b'<', _) => return Some(("<", idx)),
                    (b'>', _) => return Some((">", idx)),
                    _ => {}
                }
            }
            _ => {}
        }
        idx += 1;
    }
    None
}

fn branch_opcode(op: &str, when_true: bool) -> &'static str {
    if when_true {
        match op {
            "<" => "BLT",
            ">" => "BGT",
            "<=" => "BLE",
            ">=" => "BGE",
            "==" => "BEQ",
            _ => "BNE",
        }
    } else {
        match op {
            "<" => "BGE",
            ">" => "BLE",
            "<=" => "BGT",
            ">=" => "BLT",
            "==" => "BNE",
            _ => "BEQ",
        }
    }
}

fn matches_keyword(masked: &[u8], pos: usize, keyword: &str) -> bool {
    let kw = keyword.as_bytes();
    if pos + kw.len() > masked.len() || &masked[pos..pos + kw.len()] != kw {
        return false;
    }
    let before_ok = pos == 0 || !scan::is_ident_byte(masked[pos - 1]);
    let after_ok = masked
        .get(pos + kw.len())
        .is_none_or(|b| !scan::is_ident_byte(*b));
    before_ok && after_ok
}

fn span_blank(masked: &[u8], start: usize, end: usize) -> bool {
    masked[start.min(masked.len())..end.min(masked.len())]
        .iter()
        .all(|b| b.is_ascii_whitespace())
}
