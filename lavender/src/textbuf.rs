//! The global instruction buffer and function body definition.
//!
//! Every defined function occupies a contiguous slice of the buffer,
//! executed left to right by the evaluator. Bodies are compiled here:
//! local initializers run first (each stored with `PutParam`), then the
//! piecewise body pieces, wired with `Beqz`/`Return`.

use lavender_parser::SpannedToken;
use tracing::debug;

use crate::expr::declare::declare_function;
use crate::expr::parse::{parse_expr, ParseEnv};
use crate::expr::ExprResult;
use crate::ops::{FuncKind, OpId};
use crate::value::Instr;

/// The appendable postfix instruction buffer.
#[derive(Debug, Default)]
pub struct TextBuffer {
    text: Vec<Instr>,
    /// Start of the most recently staged one-shot expression.
    staged: Option<usize>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a compiled expression, returning its start offset.
    pub fn add_expr(&mut self, instrs: &[Instr]) -> usize {
        let offset = self.text.len();
        self.text.extend_from_slice(instrs);
        offset
    }

    /// Drop the most recently staged transient expression and anything
    /// appended after it (thunks lifted while parsing it included).
    pub fn clear_expr(&mut self) {
        if let Some(start) = self.staged.take() {
            self.text.truncate(start);
        }
    }

    /// The instructions in `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> &[Instr] {
        &self.text[start..end]
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Define the function beginning at `pos` in the given scope: declare
/// it, then compile its body. Returns the new operator and the position
/// of the first unprocessed token.
pub fn define_function(
    env: &mut ParseEnv<'_>,
    toks: &[SpannedToken<'_>],
    pos: usize,
    scope: OpId,
) -> ExprResult<(OpId, usize)> {
    let (decl, body) = declare_function(toks, pos, scope, env.table)?;
    let next = define_function_body(env, toks, body, decl)?;
    Ok((decl, next))
}

/// Given a forward declaration and the position of its first body
/// token, compile the body and install the text offset.
pub fn define_function_body(
    env: &mut ParseEnv<'_>,
    toks: &[SpannedToken<'_>],
    pos: usize,
    decl: OpId,
) -> ExprResult<usize> {
    let mut code: Vec<Instr> = Vec::new();

    // local initializers run before the body, storing into their slots
    let op = env.table.op(decl);
    let arity = op.arity;
    let locals: Vec<(usize, usize)> = op
        .params
        .iter()
        .enumerate()
        .skip(arity)
        .filter_map(|(i, p)| p.initializer.map(|init| (i, init)))
        .collect();
    for (slot, init) in locals {
        let (instrs, _) = parse_expr(toks, init, decl, env)?;
        code.extend(instrs);
        code.push(Instr::PutParam(slot));
    }

    // the body is a sequence of expressions split on `;`: alternating
    // condition/result pairs with a trailing default
    let mut pieces: Vec<Vec<Instr>> = Vec::new();
    let mut next = pos;
    loop {
        let (instrs, stop) = parse_expr(toks, next, decl, env)?;
        pieces.push(instrs);
        match toks.get(stop) {
            Some(t) if t.is_literal(';') => next = stop + 1,
            _ => {
                next = stop;
                break;
            }
        }
    }
    code.extend(compile_pieces(pieces));

    let text_offset = env.buf.add_expr(&code);
    let op = env.table.op_mut(decl);
    debug_assert!(matches!(op.kind, FuncKind::ForwardDecl));
    op.kind = FuncKind::Function { text_offset };
    debug!(name = %op.name, text_offset, len = code.len(), "defined function");
    Ok(next)
}

/// Wire the `;`-separated pieces: every condition/result pair branches
/// over its result when the condition is falsy, the final piece is the
/// default. A missing default yields the undefined value.
fn compile_pieces(pieces: Vec<Vec<Instr>>) -> Vec<Instr> {
    let mut code = Vec::new();
    let mut rest = pieces.into_iter().peekable();
    while let Some(piece) = rest.next() {
        if rest.peek().is_none() {
            // the default piece
            code.extend(piece);
            code.push(Instr::Return);
            return code;
        }
        match rest.next() {
            Some(result) => {
                code.extend(piece);
                // skip the result and its return when the condition fails
                code.push(Instr::Beqz(result.len() as isize + 1));
                code.extend(result);
                code.push(Instr::Return);
            }
            None => unreachable!("peeked above"),
        }
    }
    // an even number of pieces leaves no default
    code.push(Instr::Undefined);
    code.push(Instr::Return);
    code
}

/// Parse a one-shot expression (the REPL's input) and stage it in the
/// buffer. Returns the `[start, end)` slice bounds and the position of
/// the first unprocessed token. The next [`TextBuffer::clear_expr`]
/// call drops the staged data.
pub fn stage_expr(
    env: &mut ParseEnv<'_>,
    toks: &[SpannedToken<'_>],
    pos: usize,
    scope: OpId,
) -> ExprResult<((usize, usize), usize)> {
    let staged_from = env.buf.len();
    let (mut instrs, next) = parse_expr(toks, pos, scope, env)?;
    instrs.push(Instr::Return);
    let start = env.buf.add_expr(&instrs);
    let end = env.buf.len();
    env.buf.staged = Some(staged_from);
    Ok(((start, end), next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_clear() {
        let mut buf = TextBuffer::new();
        let off = buf.add_expr(&[Instr::Int(1), Instr::Return]);
        assert_eq!(off, 0);
        assert_eq!(buf.len(), 2);

        buf.staged = Some(buf.len());
        buf.add_expr(&[Instr::Int(2), Instr::Return]);
        assert_eq!(buf.len(), 4);
        buf.clear_expr();
        assert_eq!(buf.len(), 2);
        // clearing twice is a no-op
        buf.clear_expr();
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_compile_single_piece() {
        let code = compile_pieces(vec![vec![Instr::Int(1)]]);
        assert_eq!(code, vec![Instr::Int(1), Instr::Return]);
    }

    #[test]
    fn test_compile_cond_then_else() {
        let code = compile_pieces(vec![
            vec![Instr::Param(0)],
            vec![Instr::Int(1)],
            vec![Instr::Int(2)],
        ]);
        assert_eq!(
            code,
            vec![
                Instr::Param(0),
                Instr::Beqz(2),
                Instr::Int(1),
                Instr::Return,
                Instr::Int(2),
                Instr::Return,
            ]
        );
    }

    #[test]
    fn test_compile_missing_default() {
        let code = compile_pieces(vec![vec![Instr::Param(0)], vec![Instr::Int(1)]]);
        assert_eq!(
            code,
            vec![
                Instr::Param(0),
                Instr::Beqz(2),
                Instr::Int(1),
                Instr::Return,
                Instr::Undefined,
                Instr::Return,
            ]
        );
    }
}
