//! Expression parser.
//!
//! A modified shunting yard that turns an infix token stream into a
//! flat postfix instruction vector. The differences from the classic
//! algorithm:
//!
//!  1. Square-bracket transposition: `f[x, y]g` moves the bracketed
//!     argument list to the right of the following sub-expression
//!     before applying `f`, realized with a sentinel on the output
//!     stack and a second pass when the bracket group collapses.
//!  2. Vector literals `{…}` compile to `MakeVect`.
//!  3. Value calls: `expr(args)` and `expr()` compile to `FuncCall2`.
//!  4. By-name arguments are lifted into anonymous zero-argument
//!     thunks, with implicit capture injection.
//!  5. The number of arguments applied to each function is validated
//!     against its declared arity.

use lavender_parser::{SpannedToken, Token};
use tracing::trace;

use super::{ExprError, ExprResult};
use crate::command::Commands;
use crate::ops::{Fixing, FuncKind, Namespace, OpId, Operator, OperatorTable};
use crate::textbuf::{self, TextBuffer};
use crate::value::Instr;

/// Mutable pieces of the session an expression parse reads and writes:
/// the operator table (name resolution, anonymous thunk registration),
/// the instruction buffer (thunk bodies, nested definitions), and the
/// import/using registry.
pub struct ParseEnv<'a> {
    pub table: &'a mut OperatorTable,
    pub buf: &'a mut TextBuffer,
    pub cmds: &'a Commands,
}

impl std::fmt::Debug for ParseEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseEnv").finish_non_exhaustive()
    }
}

/// Expression context threaded through the parse.
struct ExprContext<'t, 's> {
    toks: &'t [SpannedToken<'s>],
    pos: usize,
    decl: OpId,
    /// Do we expect an operand or an operator next.
    expect_operand: bool,
    /// How nested in brackets we are.
    nesting: i32,
    /// The output stack.
    out: Vec<Instr>,
    /// The deferred operator stack.
    ops: Vec<Instr>,
    /// Token positions parallel to `ops`, for error reporting.
    tok: Vec<usize>,
    /// Per open-group argument counters; negative values mean the
    /// group is still awaiting its first argument.
    params: Vec<i32>,
}

impl<'t, 's> ExprContext<'t, 's> {
    fn err_pos(&self) -> usize {
        self.tok.last().copied().unwrap_or(self.pos)
    }
}

/// Parse one expression in the context of `decl`.
///
/// Returns the postfix instruction vector and the position of the first
/// token after the expression (a `;`, a `,`, an unmatched closing
/// bracket, a top-level `=>`, or the end of the stream).
pub fn parse_expr(
    toks: &[SpannedToken<'_>],
    pos: usize,
    decl: OpId,
    env: &mut ParseEnv<'_>,
) -> ExprResult<(Vec<Instr>, usize)> {
    let mut cx = ExprContext {
        toks,
        pos,
        decl,
        expect_operand: true,
        nesting: 0,
        out: Vec::new(),
        ops: Vec::new(),
        tok: Vec::new(),
        params: Vec::new(),
    };
    // loop over each token until we reach the end of the expression
    while let Some(tok) = cx.toks.get(cx.pos) {
        if tok.is_text("def") {
            // nested function definition; must be in operand position
            if !cx.expect_operand {
                return Err(ExprError::ExpectOperator { at: cx.pos });
            }
            let (op, next) = textbuf::define_function(env, cx.toks, cx.pos, cx.decl)?;
            cx.pos = next;
            cx.expect_operand = false;
            let pos = cx.pos;
            shunting_yard(&mut cx, env, Instr::FunctionVal(op), pos)?;
        } else if tok.is_text("=>") {
            if cx.nesting == 0 {
                // end of this piece of the body
                break;
            }
            if !cx.expect_operand || !matches!(cx.ops.last(), Some(Instr::Literal(_))) {
                return Err(ExprError::UnexpectedToken { at: cx.pos });
            }
            match cx.ops.last() {
                Some(Instr::Literal('(')) | Some(Instr::Literal('['))
                | Some(Instr::Literal('{')) => {
                    // by-name sub-expression
                    let arrow = cx.pos;
                    let (body, next) = parse_expr(cx.toks, cx.pos + 1, cx.decl, env)?;
                    cx.pos = next;
                    let obj = make_by_name(env, cx.decl, body);
                    shunting_yard(&mut cx, env, obj, arrow)?;
                    cx.expect_operand = false;
                }
                _ => return Err(ExprError::UnexpectedToken { at: cx.pos }),
            }
        } else {
            let tok_pos = cx.pos;
            let obj = parse_text_obj(&mut cx, env)?;
            // detect end of expr before we shunt
            let cur = &cx.toks[tok_pos];
            if cx.nesting < 0
                || cur.is_literal(';')
                || (cx.nesting == 0 && cur.is_literal(','))
            {
                break;
            }
            shunting_yard(&mut cx, env, obj, tok_pos)?;
            cx.pos += 1;
        }
    }
    // shunt the leftover ops over
    while !cx.ops.is_empty() {
        shunt_ops(&mut cx, env)?;
    }
    if cx.out.is_empty() {
        return Err(ExprError::MissingBody { at: cx.pos });
    }
    trace!(len = cx.out.len(), "parsed expression");
    Ok((cx.out, cx.pos))
}

/// Classify the current token into a stack object, updating operand
/// expectation and nesting along the way.
fn parse_text_obj(cx: &mut ExprContext<'_, '_>, env: &mut ParseEnv<'_>) -> ExprResult<Instr> {
    let tok = &cx.toks[cx.pos];
    match tok.token {
        Token::LParen
        | Token::RParen
        | Token::LBracket
        | Token::RBracket
        | Token::LBrace
        | Token::RBrace
        | Token::Comma
        | Token::Semicolon
        | Token::Other => parse_literal(cx),
        Token::Ident => parse_ident(cx, env),
        Token::Symbol => parse_symbol(cx, env),
        Token::QualIdent | Token::QualSymbol => parse_qual_name(cx, env),
        Token::Number => parse_number(cx),
        Token::Integer => parse_integer(cx),
        Token::Str => parse_string(cx),
        Token::FuncVal | Token::QualFuncVal => parse_func_value(cx, env),
        Token::EmptyArgs => parse_empty_args(cx),
        Token::FuncSymbol | Token::Ellipsis => {
            Err(ExprError::UnexpectedToken { at: cx.pos })
        }
    }
}

fn parse_literal(cx: &mut ExprContext<'_, '_>) -> ExprResult<Instr> {
    let c = cx.toks[cx.pos].text.chars().next().unwrap_or('\0');
    let mut obj = Instr::Literal(c);
    match c {
        '(' => {
            if !cx.expect_operand {
                // value call 2 operator
                obj = Instr::FuncCall2(0);
                cx.expect_operand = true;
            }
            // else parenthesized expression
            cx.nesting += 1;
        }
        '[' | '{' => {
            cx.nesting += 1;
            // open groupings are operands
            if !cx.expect_operand {
                return Err(ExprError::ExpectOperand { at: cx.pos });
            }
        }
        '}' => {
            // in an operand position, `}` may only directly follow `{`
            if cx.expect_operand && cx.params.last().map(|&p| p > 0).unwrap_or(false) {
                return Err(ExprError::ExpectOperand { at: cx.pos });
            }
            cx.nesting -= 1;
            cx.expect_operand = false;
        }
        ']' | ')' => {
            cx.nesting -= 1;
            if cx.nesting > 0 && cx.expect_operand {
                return Err(ExprError::ExpectOperator { at: cx.pos });
            }
        }
        ',' => {
            // close groupings are operators
            if cx.nesting > 0 && cx.expect_operand {
                return Err(ExprError::ExpectOperator { at: cx.pos });
            }
        }
        ';' => {
            // the piece separator only occurs at top level
            if cx.nesting != 0 {
                return Err(ExprError::UnexpectedToken { at: cx.pos });
            }
        }
        _ => return Err(ExprError::UnexpectedToken { at: cx.pos }),
    }
    if c == ']' || c == ',' {
        cx.expect_operand = true;
    }
    Ok(obj)
}

/// Resolve a simple name by walking the scope chain outward, innermost
/// scope winning, then the imported-name map, then the `using` scopes.
fn resolve_simple(
    cx: &ExprContext<'_, '_>,
    env: &ParseEnv<'_>,
    raw: &str,
    ns: Namespace,
) -> Option<OpId> {
    // change ':' to '#' in names; namespaces use ':' as a separator
    let name = raw.replace(':', "#");
    let decl_name = env.table.op(cx.decl).name.clone();
    let mut func = None;
    match decl_name.rfind(':') {
        // walk the scope prefixes outward; the innermost match wins
        Some(simple_start) => {
            let mut idx = 0;
            while idx <= simple_start {
                let Some(colon) = decl_name[idx..].find(':').map(|i| idx + i) else {
                    break;
                };
                let candidate = format!("{}{}", &decl_name[..colon + 1], name);
                if let Some(found) = env.table.get(&candidate, ns) {
                    func = Some(found);
                }
                idx = colon + 1;
            }
        }
        // a scope root is itself the only scope to search
        None => {
            func = env.table.get_scoped(&decl_name, &name, ns);
        }
    }
    if func.is_none() {
        // try imported function names, then the using scopes
        if let Some(qual) = env.cmds.qual_name_for(&name) {
            func = env.table.get(qual, ns);
        } else {
            for scope in env.cmds.using_scopes() {
                func = env.table.get_scoped(scope, &name, ns);
                if func.is_some() {
                    break;
                }
            }
        }
    }
    func
}

fn finish_name(cx: &mut ExprContext<'_, '_>, func: Option<OpId>, table: &OperatorTable) -> ExprResult<Instr> {
    let Some(func) = func else {
        return Err(ExprError::NameNotFound { at: cx.pos });
    };
    let arity = table.op(func).arity;
    // toggle if RHS is true
    cx.expect_operand ^= (!cx.expect_operand && arity != 1) || arity == 0;
    Ok(Instr::Function(func))
}

fn parse_symbol(cx: &mut ExprContext<'_, '_>, env: &mut ParseEnv<'_>) -> ExprResult<Instr> {
    let ns = if cx.expect_operand {
        Namespace::Prefix
    } else {
        Namespace::Infix
    };
    let func = resolve_simple(cx, env, cx.toks[cx.pos].text, ns);
    finish_name(cx, func, env.table)
}

fn parse_qual_name(cx: &mut ExprContext<'_, '_>, env: &mut ParseEnv<'_>) -> ExprResult<Instr> {
    let ns = if cx.expect_operand {
        Namespace::Prefix
    } else {
        Namespace::Infix
    };
    let func = lookup_qual(env.table, cx.toks[cx.pos].text, ns);
    finish_name(cx, func, env.table)
}

/// Exact lookup of a qualified name, with `:` after the namespace
/// separator rewritten to `#`.
fn lookup_qual(table: &OperatorTable, raw: &str, ns: Namespace) -> Option<OpId> {
    let sep = raw.find(':')?;
    let name = format!("{}:{}", &raw[..sep], raw[sep + 1..].replace(':', "#"));
    table.get(&name, ns)
}

fn parse_ident(cx: &mut ExprContext<'_, '_>, env: &mut ParseEnv<'_>) -> ExprResult<Instr> {
    if cx.expect_operand {
        // try parameter names first
        let decl = env.table.op(cx.decl);
        let num_params = decl.arity + decl.locals;
        let text = cx.toks[cx.pos].text;
        for (i, param) in decl.params.iter().enumerate().take(num_params) {
            if param.name == text {
                cx.expect_operand = false;
                return Ok(Instr::Param(i));
            }
        }
    }
    // not a parameter, try a function
    parse_symbol(cx, env)
}

fn parse_number(cx: &mut ExprContext<'_, '_>) -> ExprResult<Instr> {
    if !cx.expect_operand {
        return Err(ExprError::ExpectOperand { at: cx.pos });
    }
    let num: f64 = cx.toks[cx.pos]
        .text
        .parse()
        .map_err(|_| ExprError::UnexpectedToken { at: cx.pos })?;
    cx.expect_operand = false;
    Ok(Instr::Num(num))
}

fn parse_integer(cx: &mut ExprContext<'_, '_>) -> ExprResult<Instr> {
    if !cx.expect_operand {
        return Err(ExprError::ExpectOperand { at: cx.pos });
    }
    // two's complement wraparound on the literal's unsigned value
    let num = cx.toks[cx.pos].text.parse::<u64>().unwrap_or(u64::MAX) as i64;
    cx.expect_operand = false;
    Ok(Instr::Int(num))
}

fn parse_string(cx: &mut ExprContext<'_, '_>) -> ExprResult<Instr> {
    if !cx.expect_operand {
        return Err(ExprError::ExpectOperand { at: cx.pos });
    }
    let text = cx.toks[cx.pos].text;
    // strip the quotes and interpret escapes, validated by the lexer
    let inner = &text[1..text.len() - 1];
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => {}
            }
        } else {
            value.push(c);
        }
    }
    cx.expect_operand = false;
    Ok(Instr::Str(value.into()))
}

fn parse_func_value(cx: &mut ExprContext<'_, '_>, env: &mut ParseEnv<'_>) -> ExprResult<Instr> {
    if !cx.expect_operand {
        return Err(ExprError::ExpectOperand { at: cx.pos });
    }
    let text = cx.toks[cx.pos].text;
    // values ending in '\' name infix functions
    let (ns, name) = if text.len() > 1 && text.ends_with('\\') {
        (Namespace::Infix, &text[1..text.len() - 1])
    } else {
        (Namespace::Prefix, &text[1..])
    };
    let func = if cx.toks[cx.pos].token == Token::QualFuncVal {
        lookup_qual(env.table, name, ns)
    } else {
        resolve_simple(cx, env, name, ns)
    };
    let Some(func) = func else {
        return Err(ExprError::NameNotFound { at: cx.pos });
    };
    // aliases to functions with no uncaptured parameters are useless
    let op = env.table.op(func);
    if op.arity == op.capture_count {
        return Err(ExprError::ZeroArityAlias { at: cx.pos });
    }
    cx.expect_operand = false;
    Ok(Instr::FunctionVal(func))
}

fn parse_empty_args(cx: &mut ExprContext<'_, '_>) -> ExprResult<Instr> {
    if !cx.expect_operand {
        // zero-arity value call
        Ok(Instr::FuncCall2(0))
    } else {
        cx.expect_operand = false;
        Ok(Instr::EmptyArgs)
    }
}

/// Push to the output stack. An `EmptyArgs` placeholder on top is
/// overwritten; it never appears in the final text.
fn push_out(cx: &mut ExprContext<'_, '_>, obj: Instr) {
    if let Some(top) = cx.out.last_mut() {
        if matches!(top, Instr::EmptyArgs) {
            *top = obj;
            return;
        }
    }
    cx.out.push(obj);
}

/// Set the negative placeholder arity to positive on the first (prefix)
/// or second (infix) argument of the pending group.
fn fix_arity_first_arg(cx: &mut ExprContext<'_, '_>) {
    if let Some(top) = cx.params.last_mut() {
        if *top < 0 {
            *top = -*top;
        }
    }
}

/// The number of parameters of `scope` visible to a reference to
/// `func`: a recursive reference does not see the locals, an enclosing
/// function does not see locals declared after it, and a nested inner
/// function sees everything.
fn arity_for(table: &OperatorTable, func: OpId, scope: OpId) -> usize {
    let s = table.op(scope);
    if func == scope {
        return s.arity;
    }
    let mut skip = 0usize;
    let mut outer = s.enclosing;
    while let Some(o) = outer {
        if o == func {
            break;
        }
        skip += table.op(o).locals;
        outer = table.op(o).enclosing;
    }
    match outer {
        // not found among the enclosing functions: it is an inner one
        None => s.arity + s.locals,
        Some(o) => s.arity - skip - table.op(o).locals,
    }
}

/// Lift a parsed sub-expression into a by-name thunk. A single atom is
/// passed through unchanged; anything larger becomes an anonymous
/// operator capturing every parameter of the declaring function.
fn make_by_name(env: &mut ParseEnv<'_>, decl: OpId, mut expr: Vec<Instr>) -> Instr {
    if expr.len() == 1 {
        let mut res = expr.pop().unwrap_or(Instr::Undefined);
        if let Instr::Function(id) = res {
            res = Instr::FunctionVal(id);
        }
        return res;
    }
    let decl_op = env.table.op(decl);
    let capture_count = decl_op.arity + decl_op.locals;
    let name = format!("{}:", decl_op.name);
    expr.push(Instr::Return);
    let text_offset = env.buf.add_expr(&expr);
    let op = Operator {
        name,
        kind: FuncKind::Function { text_offset },
        arity: capture_count,
        capture_count,
        locals: 0,
        fixing: Fixing::Prefix,
        varargs: false,
        params: Vec::new(),
        enclosing: Some(decl),
    };
    let id = env
        .table
        .add(op, Namespace::Prefix)
        .expect("anonymous operators always register");
    Instr::FunctionVal(id)
}

/// Given the index of the last element of a complete sub-expression on
/// the output stack, returns the index of its first element.
fn expr_bounds(table: &OperatorTable, out: &[Instr], end: usize) -> usize {
    let mut bgn = end;
    match &out[end] {
        Instr::Undefined
        | Instr::Num(_)
        | Instr::Int(_)
        | Instr::Str(_)
        | Instr::Param(_)
        | Instr::FunctionVal(_)
        | Instr::EmptyArgs => {}
        Instr::Function(id) => {
            // a transposed call supplies all arguments through the
            // FuncCall directly below
            if end > 0 && matches!(out[end - 1], Instr::FuncCall(_)) {
                bgn = expr_bounds(table, out, end - 1);
            } else {
                let op = table.op(*id);
                for _ in 0..op.callable_arity() {
                    bgn = expr_bounds(table, out, bgn - 1);
                }
            }
        }
        Instr::FuncCap => {
            // capture list is (1 + captureCount)
            if let Instr::FunctionVal(id) = &out[end - 1] {
                for _ in 0..=table.op(*id).capture_count {
                    bgn = expr_bounds(table, out, bgn - 1);
                }
            }
        }
        Instr::MakeVect(n) | Instr::FuncCall(n) | Instr::FuncCall2(n) => {
            for _ in 0..*n {
                bgn = expr_bounds(table, out, bgn - 1);
            }
        }
        Instr::PutParam(_)
        | Instr::Return
        | Instr::Beqz(_)
        | Instr::Addr(_)
        | Instr::Literal(_) => {
            debug_assert!(false, "not an expression element: {:?}", out[end]);
        }
    }
    bgn
}

/// Rewrite the by-name argument slices of `func` on the output stack as
/// lifted thunks. Arguments are found by walking backward over their
/// consumed arities.
fn collect_by_name_args(
    cx: &mut ExprContext<'_, '_>,
    env: &mut ParseEnv<'_>,
    func: OpId,
    ar: i32,
) -> ExprResult<()> {
    if !env.table.op(func).has_by_name() {
        return Ok(());
    }
    if matches!(cx.out.last(), Some(Instr::FuncCall(_))) {
        // transposed calls supply arguments through FuncCall; there is
        // no argument slice to rewrite
        return Ok(());
    }
    let last_param = env.table.op(func).callable_arity() as i32 - 1;
    debug_assert!(last_param >= 0);
    // the temporary stack holds the rewritten arguments in reverse
    let mut tmp: Vec<Instr> = Vec::new();
    for i in (0..ar).rev() {
        let p = i.min(last_param);
        if cx.out.is_empty() {
            return Err(ExprError::BadArity { at: cx.err_pos() });
        }
        let bgn = expr_bounds(env.table, &cx.out, cx.out.len() - 1);
        if env.table.op(func).by_name(p as usize) {
            // wrap in a by-name expression
            let arg = cx.out.split_off(bgn);
            let val = make_by_name(env, cx.decl, arg);
            let needs_capture = match &val {
                Instr::FunctionVal(id) => {
                    let op = env.table.op(*id);
                    op.arity > 0 && op.arity == op.capture_count
                }
                _ => false,
            };
            if needs_capture {
                let decl = env.table.op(cx.decl);
                tmp.push(Instr::FuncCap);
                tmp.push(val);
                for j in (0..decl.arity + decl.locals).rev() {
                    tmp.push(Instr::Param(j));
                }
            } else {
                tmp.push(val);
            }
        } else {
            // keep the argument unmodified
            while cx.out.len() > bgn {
                tmp.push(cx.out.pop().unwrap_or(Instr::Undefined));
            }
        }
    }
    while let Some(obj) = tmp.pop() {
        push_out(cx, obj);
    }
    Ok(())
}

/// Shunt one operator (or collapse a bracket group), emitting implicit
/// captures and validating arity.
fn shunt_ops(cx: &mut ExprContext<'_, '_>, env: &mut ParseEnv<'_>) -> ExprResult<()> {
    if matches!(cx.ops.last(), Some(i) if i.is_literal(']')) {
        return handle_right_bracket(cx, env);
    }
    let tmp = cx.ops.last().cloned().unwrap_or(Instr::Undefined);
    match tmp {
        Instr::Function(id) if env.table.op(id).arity > 0 => {
            // ar holds the number of arguments applied in source
            let Some(mut ar) = cx.params.pop() else {
                return Err(ExprError::UnbalancedGroup { at: cx.err_pos() });
            };
            // a transposed call already packaged the arguments
            let fused = matches!(cx.out.last(), Some(Instr::FuncCall(_)));
            collect_by_name_args(cx, env, id, ar)?;
            let op = env.table.op(id);
            let callable = op.callable_arity() as i32;
            if op.varargs && !fused {
                // collapse the last argument and any extras into a vector
                let call_arity = ar - (callable - 1);
                if call_arity < 0 {
                    return Err(ExprError::BadArity { at: cx.err_pos() });
                }
                push_out(cx, Instr::MakeVect(call_arity as usize));
                ar = callable;
            }
            // push the implicit capture arguments
            let capture_count = env.table.op(id).capture_count;
            let end = arity_for(env.table, id, cx.decl);
            for i in (1..=capture_count).rev() {
                push_out(cx, Instr::Param(end - i));
            }
            fix_arity_first_arg(cx);
            if callable != ar {
                return Err(ExprError::BadArity { at: cx.err_pos() });
            }
            push_out(cx, Instr::Function(id));
        }
        Instr::FuncCall2(_) => {
            let Some(ar) = cx.params.pop() else {
                return Err(ExprError::UnbalancedGroup { at: cx.err_pos() });
            };
            if ar < 0 {
                return Err(ExprError::BadArity { at: cx.err_pos() });
            }
            push_out(cx, Instr::FuncCall2(ar as usize));
        }
        Instr::Literal(_) => {
            // an opener with no matching closer
            return Err(ExprError::UnbalancedGroup { at: cx.err_pos() });
        }
        other => {
            push_out(cx, other);
        }
    }
    cx.ops.pop();
    cx.tok.pop();
    Ok(())
}

/// Whether the element under the topmost `[` on the op stack is a
/// pending named function (transposition) rather than a grouping
/// construct or nothing (value call).
fn below_bracket_is_function(cx: &ExprContext<'_, '_>) -> bool {
    debug_assert!(matches!(cx.ops.last(), Some(i) if i.is_literal('[')));
    cx.ops.len() >= 2 && matches!(cx.ops[cx.ops.len() - 2], Instr::Function(_))
}

/// Square bracket transposition, second pass: when the bracket group
/// collapses, the elements saved at `]` re-emit after the following
/// sub-expression and a `FuncCall` records the combined arity.
fn handle_right_bracket(cx: &mut ExprContext<'_, '_>, env: &mut ParseEnv<'_>) -> ExprResult<()> {
    debug_assert!(matches!(cx.ops.last(), Some(i) if i.is_literal(']')));
    cx.ops.pop(); // pop ']'
    cx.tok.pop();
    if cx.ops.is_empty() {
        return Err(ExprError::UnbalancedGroup { at: cx.err_pos() });
    }
    // re-emit the transposed elements
    while !matches!(cx.ops.last(), Some(i) if i.is_literal('[')) {
        if matches!(cx.ops.last(), Some(i) if i.is_literal(']')) {
            handle_right_bracket(cx, env)?;
        } else {
            let obj = cx.ops.pop().unwrap_or(Instr::Undefined);
            push_out(cx, obj);
        }
        if cx.ops.is_empty() {
            return Err(ExprError::UnbalancedGroup { at: cx.err_pos() });
        }
    }
    // a pending named function owns the counter and validates it when
    // it shunts; a value call owns its own counter and completes here
    let named = below_bracket_is_function(cx);
    let arity = if named {
        match cx.params.last() {
            Some(&a) => a,
            None => return Err(ExprError::UnbalancedGroup { at: cx.err_pos() }),
        }
    } else {
        match cx.params.pop() {
            Some(a) => a,
            None => return Err(ExprError::UnbalancedGroup { at: cx.err_pos() }),
        }
    };
    if arity < 0 {
        // the transposed list never received its right operand
        return Err(ExprError::BadArity { at: cx.err_pos() });
    }
    if !named {
        // the completed value call is one operand of the enclosing group
        fix_arity_first_arg(cx);
    }
    push_out(cx, Instr::FuncCall(arity as usize));
    cx.ops.pop(); // pop '['
    cx.tok.pop();
    Ok(())
}

fn lexicographic_precedence(c: u8) -> i32 {
    match c {
        b'|' => 1,
        b'^' => 2,
        b'&' => 3,
        b'!' | b'=' => 4,
        b'>' | b'<' => 5,
        b'#' => 6, // ':' was changed to '#' earlier
        b'-' | b'+' => 7,
        b'%' | b'/' | b'*' => 8,
        b'~' | b'?' => 9,
        _ => 0,
    }
}

fn fixing_value(table: &OperatorTable, obj: &Instr) -> i32 {
    match obj {
        Instr::FuncCall2(_) => 1,
        Instr::Function(id) => {
            if table.op(*id).fixing == Fixing::Prefix {
                2
            } else {
                0
            }
        }
        _ => {
            debug_assert!(false, "compared a non-operator: {:?}", obj);
            2
        }
    }
}

/// Compares two pending operators by precedence.
fn compare(table: &OperatorTable, a: &Instr, b: &Instr) -> i32 {
    // close groupers have the highest precedence
    {
        let ac = a.is_literal(')') || a.is_literal(']') || a.is_literal('}');
        let bc = b.is_literal(')') || b.is_literal(']') || b.is_literal('}');
        if ac || bc {
            return ac as i32 - bc as i32;
        }
    }
    // openers the lowest
    if a.is_literal('(') || a.is_literal('[') || a.is_literal('{') {
        return -1;
    }
    if b.is_literal('(') || b.is_literal('[') || b.is_literal('{') {
        return 1;
    }
    // prefix > value call > infix
    {
        let afix = fixing_value(table, a);
        let bfix = fixing_value(table, b);
        if afix != bfix {
            return afix - bfix;
        }
        if afix != 0 {
            // prefix functions and value calls always tie
            return 0;
        }
    }
    // compare infix operators with modified Scala ordering;
    // '**' binds tighter than other names in its class
    let (Instr::Function(a), Instr::Function(b)) = (a, b) else {
        return 0;
    };
    let an = table.op(*a).simple_name();
    let bn = table.op(*b).simple_name();
    let ap = lexicographic_precedence(an.as_bytes().first().copied().unwrap_or(0));
    let bp = lexicographic_precedence(bn.as_bytes().first().copied().unwrap_or(0));
    if ap != bp {
        return ap - bp;
    }
    an.starts_with("**") as i32 - bn.starts_with("**") as i32
}

/// One cycle of the modified shunting yard.
fn shunting_yard(
    cx: &mut ExprContext<'_, '_>,
    env: &mut ParseEnv<'_>,
    obj: Instr,
    tok_pos: usize,
) -> ExprResult<()> {
    match &obj {
        Instr::EmptyArgs => {
            // set the argument count explicitly to 0 (or 1 for infix)
            match cx.params.last_mut() {
                Some(top) if *top < 0 => {
                    *top = -*top - 1;
                    // signals that a comma may not follow
                    push_out(cx, Instr::EmptyArgs);
                }
                _ => return Err(ExprError::UnexpectedToken { at: tok_pos }),
            }
        }
        Instr::Literal('(') => {
            cx.ops.push(obj);
            cx.tok.push(tok_pos);
        }
        Instr::Literal('[') => {
            // push to the op stack, leave a sentinel on out, and open
            // a counter for the bracketed argument list
            cx.ops.push(obj.clone());
            cx.tok.push(tok_pos);
            cx.out.push(obj);
            cx.params.push(-1);
        }
        Instr::Literal('{') => {
            fix_arity_first_arg(cx);
            cx.ops.push(obj);
            cx.tok.push(tok_pos);
            cx.params.push(-1);
        }
        Instr::Literal('}') => {
            // shunt ops onto out until '{', then emit the vector
            loop {
                match cx.ops.last() {
                    None => return Err(ExprError::UnbalancedGroup { at: tok_pos }),
                    Some(top) if top.is_literal('{') => break,
                    _ => shunt_ops(cx, env)?,
                }
            }
            cx.ops.pop();
            cx.tok.pop();
            let arity = match cx.params.pop() {
                Some(a) => a.max(0), // {} constructs the empty vector
                None => return Err(ExprError::UnbalancedGroup { at: tok_pos }),
            };
            push_out(cx, Instr::MakeVect(arity as usize));
        }
        Instr::Literal(']') => {
            // first pass of the transposition: shunt ops until '[',
            // then move the bracketed output onto the op stack
            loop {
                match cx.ops.last() {
                    None => return Err(ExprError::UnbalancedGroup { at: tok_pos }),
                    Some(top) if top.is_literal('[') => break,
                    _ => shunt_ops(cx, env)?,
                }
            }
            let named = below_bracket_is_function(cx);
            loop {
                match cx.out.last() {
                    None => return Err(ExprError::UnbalancedGroup { at: tok_pos }),
                    Some(top) if top.is_literal('[') => break,
                    _ => {
                        let obj = cx.out.pop().unwrap_or(Instr::Undefined);
                        cx.ops.push(obj);
                    }
                }
            }
            cx.out.pop(); // drop the sentinel
            let bracketed = match cx.params.pop() {
                Some(b) if b >= 0 => b,
                // `[]` supplies no arguments to transpose
                Some(_) => return Err(ExprError::BadArity { at: tok_pos }),
                None => return Err(ExprError::UnbalancedGroup { at: tok_pos }),
            };
            // When the brackets attach to a pending named function, its
            // arguments are the bracketed list plus the sub-expression
            // to the right; fold them into its counter, negative until
            // that right operand actually arrives. Anywhere else the
            // transposition is a value call with its own counter, where
            // the right operand is the callee.
            if named {
                match cx.params.last_mut() {
                    Some(top) => {
                        *top = if *top < 0 {
                            *top - bracketed
                        } else {
                            -(*top + 1 + bracketed)
                        };
                    }
                    None => return Err(ExprError::UnexpectedToken { at: tok_pos }),
                }
            } else {
                cx.params.push(-(bracketed + 1));
            }
            cx.ops.push(Instr::Literal(']'));
            cx.tok.push(tok_pos);
        }
        Instr::Literal(')') => {
            // shunt over all operators until the left paren;
            // underflow means unbalanced parens
            loop {
                match cx.ops.last() {
                    None => return Err(ExprError::UnbalancedGroup { at: tok_pos }),
                    Some(top) if top.is_literal('(') => break,
                    _ => shunt_ops(cx, env)?,
                }
            }
            cx.ops.pop();
            cx.tok.pop();
        }
        Instr::Literal(',') => {
            // shunt ops until an open group
            loop {
                match cx.ops.last() {
                    None => return Err(ExprError::UnbalancedGroup { at: tok_pos }),
                    Some(top)
                        if top.is_literal('(')
                            || top.is_literal('{')
                            || top.is_literal('[') =>
                    {
                        break
                    }
                    _ => shunt_ops(cx, env)?,
                }
            }
            // there cannot be more arguments after ()
            if matches!(cx.out.last(), Some(Instr::EmptyArgs)) {
                return Err(ExprError::ExpectOperator { at: tok_pos });
            }
            match cx.params.last_mut() {
                Some(top) => *top += 1,
                None => return Err(ExprError::UnbalancedGroup { at: tok_pos }),
            }
        }
        Instr::Literal(_) => return Err(ExprError::UnexpectedToken { at: tok_pos }),
        Instr::FunctionVal(id) if env.table.op(*id).capture_count > 0 => {
            // push capture params, then the value, then the capture op:
            // out: ... cap1 cap2 .. capn obj CAP ...
            let capture_count = env.table.op(*id).capture_count;
            let ar = arity_for(env.table, *id, cx.decl);
            for i in (1..=capture_count).rev() {
                push_out(cx, Instr::Param(ar - i));
            }
            push_out(cx, obj);
            fix_arity_first_arg(cx);
            push_out(cx, Instr::FuncCap);
        }
        Instr::FuncCall2(_) => {
            // the value call binds like a left-infix operator
            while !cx.ops.is_empty() {
                let top = cx.ops.last().cloned().unwrap_or(Instr::Undefined);
                if compare(env.table, &obj, &top) - 1 >= 0 {
                    break;
                }
                shunt_ops(cx, env)?;
            }
            if cx.expect_operand {
                // nonzero arity version: push a paren to pop at ')'
                cx.ops.push(obj);
                cx.ops.push(Instr::Literal('('));
                cx.tok.push(tok_pos);
                cx.tok.push(tok_pos);
                // the callee counts as the first argument
                cx.params.push(-2);
            } else {
                // zero arity version goes directly to out
                push_out(cx, Instr::FuncCall2(1));
            }
        }
        Instr::Function(id) if env.table.op(*id).arity > 0 => {
            // shunt over ops of greater precedence if right associative
            // and greater or equal precedence if left associative
            let sub = if env.table.op(*id).fixing == Fixing::LeftInfix {
                1
            } else {
                0
            };
            while !cx.ops.is_empty() {
                let top = cx.ops.last().cloned().unwrap_or(Instr::Undefined);
                if compare(env.table, &obj, &top) - sub >= 0 {
                    break;
                }
                shunt_ops(cx, env)?;
            }
            let fixing = env.table.op(*id).fixing;
            cx.ops.push(obj);
            cx.tok.push(tok_pos);
            // negative counts flag that the leading arguments have not
            // been seen yet; the first value to arrive flips the sign,
            // which is how a missing operand is detected
            if fixing == Fixing::Prefix {
                cx.params.push(-1);
            } else {
                cx.params.push(-2);
            }
        }
        _ => {
            // it is a value, shunt it over
            fix_arity_first_arg(cx);
            push_out(cx, obj);
        }
    }
    Ok(())
}
