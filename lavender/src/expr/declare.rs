//! Declaration parser.
//!
//! Walks a token stream beginning at `def` (optionally preceded by an
//! opening paren) and forward-declares the function: name, fixing,
//! arity, varargs flag, by-name parameter flags, captured parameters
//! inherited from the enclosing function, and `let`-locals. Local
//! initializers are not parsed here; their token positions are stored
//! for the body-definition pass.

use lavender_parser::{SpannedToken, Token};

use super::{is_reserved, ExprError, ExprResult};
use crate::ops::{Fixing, FuncKind, Namespace, OpId, Operator, OperatorTable, Param, MAX_PARAMS};

/// Context for the declaration helper functions.
struct DeclContext<'t, 's> {
    toks: &'t [SpannedToken<'s>],
    pos: usize,
    nspace: OpId,
    arity: usize,
    locals: usize,
    /// Position of the first token after `let`, when locals exist.
    local_start: usize,
    fixing: Fixing,
    varargs: bool,
}

impl<'t, 's> DeclContext<'t, 's> {
    fn peek(&self) -> Option<&SpannedToken<'s>> {
        self.toks.get(self.pos)
    }

    fn cur(&self) -> ExprResult<&SpannedToken<'s>> {
        self.toks
            .get(self.pos)
            .ok_or(ExprError::UntermExpr { at: self.pos })
    }

    /// Advance to the next token, which must exist.
    fn bump(&mut self) -> ExprResult<()> {
        if self.pos + 1 >= self.toks.len() {
            return Err(ExprError::UntermExpr { at: self.pos });
        }
        self.pos += 1;
        Ok(())
    }
}

/// Declare a function.
///
/// The tokens at `pos` must begin a function definition. Returns the
/// forward-declared operator registered in `table` and the position of
/// the first body token (past `=>`).
pub fn declare_function(
    toks: &[SpannedToken<'_>],
    pos: usize,
    nspace: OpId,
    table: &mut OperatorTable,
) -> ExprResult<(OpId, usize)> {
    let start = pos;
    let mut cx = DeclContext {
        toks,
        pos,
        nspace,
        arity: 0,
        locals: 0,
        local_start: 0,
        fixing: Fixing::Prefix,
        varargs: false,
    };
    // skip opening paren if one is present
    if cx.peek().map(|t| t.is_literal('(')).unwrap_or(false) {
        cx.pos += 1;
    }
    if !cx.peek().map(|t| t.is_text("def")).unwrap_or(false) {
        return Err(ExprError::NotAFunction { at: cx.pos });
    }
    cx.bump()?;
    // is this a named function? If so, get fixing as well
    let function_name = cx.pos;
    let simple_name = parse_name_and_fixing(&mut cx)?;

    match cx.cur()?.token {
        Token::EmptyArgs => {
            // `f()`: no formal parameters, but maybe still locals
            cx.arity = 0;
            cx.bump()?;
            parse_locals(&mut cx)?;
        }
        Token::LParen => {
            if cx.toks.get(cx.pos + 1).map(|t| t.is_literal(')')).unwrap_or(false) {
                // `f( )`: same as above
                cx.pos += 1;
                cx.arity = 0;
                cx.bump()?;
                parse_locals(&mut cx)?;
            } else {
                cx.bump()?;
                // collect args; resets the cursor to the argument list
                parse_arity(&mut cx)?;
            }
        }
        _ => {
            // we require a left paren before the arguments
            return Err(ExprError::ExpectedArgs { at: cx.pos });
        }
    }
    // only prefix functions may have arity 0, and infix functions
    // require at least two operands
    if (cx.arity == 0 && cx.fixing != Fixing::Prefix)
        || (cx.arity == 1 && cx.fixing != Fixing::Prefix)
    {
        return Err(ExprError::BadFixing { at: function_name });
    }
    // holds the parameters (formal, captured, and local) and their names
    let enclosing = table.op(nspace);
    let total_params = cx.arity + enclosing.arity + enclosing.locals + cx.locals;
    if total_params > MAX_PARAMS {
        return Err(ExprError::TooManyParams { at: function_name });
    }
    let params = setup_args_array(&mut cx, table)?;
    debug_assert_eq!(params.len(), total_params);

    if !cx.cur()?.is_text("=>") {
        // sorry, a function body is required
        return Err(ExprError::MissingBody { at: cx.pos });
    }
    // the body starts with the token after the =>; it must exist
    cx.bump()?;
    let body = cx.pos;

    // build the function name and check for a previous definition
    let enclosing = table.op(nspace);
    let fqn = format!("{}:{}", enclosing.name, simple_name);
    let ns = if cx.fixing == Fixing::Prefix {
        Namespace::Prefix
    } else {
        Namespace::Infix
    };
    if table.get(&fqn, ns).is_some() {
        return Err(ExprError::DupDecl { at: start });
    }
    let enclosing = table.op(nspace);
    let op = Operator {
        name: fqn,
        kind: FuncKind::ForwardDecl,
        arity: total_params - cx.locals,
        capture_count: enclosing.arity + enclosing.locals,
        locals: cx.locals,
        fixing: cx.fixing,
        varargs: cx.varargs,
        params,
        enclosing: Some(nspace),
    };
    let id = table
        .add(op, ns)
        .expect("duplicate declaration checked above");
    Ok((id, body))
}

/// Parse the function name and its fixing prefix. Returns the simple
/// name with `:` rewritten to `#`, so that `:` stays an unambiguous
/// namespace separator.
fn parse_name_and_fixing(cx: &mut DeclContext<'_, '_>) -> ExprResult<String> {
    let name = match cx.cur()?.token {
        Token::Ident | Token::FuncSymbol | Token::Symbol => {
            let text = cx.cur()?.text;
            let name = if specifies_fixing(cx.cur()?) {
                cx.fixing = match text.as_bytes()[0] {
                    b'i' => Fixing::LeftInfix,
                    b'r' => Fixing::RightInfix,
                    _ => Fixing::Prefix,
                };
                &text[2..]
            } else {
                cx.fixing = Fixing::Prefix;
                text
            };
            if is_reserved(name) {
                return Err(ExprError::ReservedId { at: cx.pos });
            }
            let name = name.to_string();
            cx.bump()?;
            name
        }
        _ => {
            // anonymous function
            cx.fixing = Fixing::Prefix;
            String::new()
        }
    };
    Ok(name.replace(':', "#"))
}

fn specifies_fixing(tok: &SpannedToken<'_>) -> bool {
    match tok.token {
        Token::FuncSymbol => true,
        Token::Ident => {
            let b = tok.text.as_bytes();
            matches!(b[0], b'i' | b'r' | b'u') && b.len() > 2 && b[1] == b'_'
        }
        _ => false,
    }
}

/// Gets the arity of the function and validates the argument list.
/// On success the cursor is reset to the beginning of the argument list
/// (for `setup_args_array`); locals have been counted.
fn parse_arity(cx: &mut DeclContext<'_, '_>) -> ExprResult<()> {
    let old_pos = cx.pos;
    let mut res = 0;
    let mut varargs = false;
    loop {
        if varargs {
            // varargs only allowed at the end
            return Err(ExprError::BadArgs { at: cx.pos });
        }
        if cx.cur()?.is_text("=>") {
            // by name marker
            cx.bump()?;
        }
        if cx.cur()?.token == Token::Ellipsis {
            // varargs modifier
            varargs = true;
            cx.bump()?;
        }
        if cx.cur()?.token == Token::Ident {
            if is_reserved(cx.cur()?.text) {
                return Err(ExprError::ReservedId { at: cx.pos });
            }
            res += 1;
            cx.bump()?;
            // must be a comma or a close paren
            if cx.cur()?.is_literal(')') {
                cx.bump()?;
                break;
            } else if cx.cur()?.is_literal(',') {
                cx.bump()?;
            } else {
                // must separate params with commas!
                return Err(ExprError::BadArgs { at: cx.pos });
            }
        } else {
            // malformed argument list
            return Err(ExprError::BadArgs { at: cx.pos });
        }
    }
    parse_locals(cx)?;
    cx.arity = res;
    cx.varargs = varargs;
    cx.pos = old_pos;
    Ok(())
}

/// Validates the function local list, counts the locals, and remembers
/// where the first local declaration starts. The locals' initializers
/// are parsed only when the function is defined; `setup_args_array`
/// repeats the walk (minus the validation) to collect names.
fn parse_locals(cx: &mut DeclContext<'_, '_>) -> ExprResult<()> {
    let old_pos = cx.pos;
    if cx.peek().map(|t| t.is_text("let")).unwrap_or(false) {
        // the locals are of the form <id>(<expr>) , ... and end at the
        // arrow token
        let mut locals = 0;
        cx.local_start = cx.pos + 1;
        loop {
            locals += 1;
            cx.bump()?;
            if cx.cur()?.token != Token::Ident {
                return Err(ExprError::BadLocals { at: cx.pos });
            }
            if is_reserved(cx.cur()?.text) {
                return Err(ExprError::ReservedId { at: cx.pos });
            }
            cx.bump()?;
            if !cx.cur()?.is_literal('(') {
                return Err(ExprError::UnexpectedToken { at: cx.pos });
            }
            cx.bump()?;
            // track nesting so we know where the initializer ends
            let mut nesting = 0i32;
            loop {
                // match on token kind because empty args exists
                match cx.cur()?.token {
                    Token::LParen => nesting += 1,
                    Token::RParen => nesting -= 1,
                    _ => {}
                }
                cx.bump()?;
                if nesting < 0 {
                    break;
                }
            }
            // the cursor points at a comma or the arrow
            if !cx.cur()?.is_literal(',') {
                break;
            }
        }
        cx.locals = locals;
    } else {
        cx.local_start = 0;
        cx.locals = 0;
    }
    cx.pos = old_pos;
    Ok(())
}

/// Collects name and passing convention for each function parameter.
/// Parameters include, in this order: formal parameters, all parameters
/// of the enclosing function, function locals. Leaves the cursor at the
/// arrow token.
fn setup_args_array(
    cx: &mut DeclContext<'_, '_>,
    table: &OperatorTable,
) -> ExprResult<Vec<Param>> {
    let mut params = Vec::new();
    // formal parameters
    for _ in 0..cx.arity {
        let by_name = cx.cur()?.is_text("=>");
        if by_name {
            cx.bump()?;
        }
        if cx.cur()?.token == Token::Ellipsis {
            cx.bump()?;
        }
        let tok = cx.cur()?;
        debug_assert_eq!(tok.token, Token::Ident);
        params.push(Param {
            name: tok.text.to_string(),
            by_name,
            initializer: None,
        });
        cx.bump()?; // to the comma or close paren
        cx.bump()?; // past it
    }
    // captured parameters inherit the enclosing function's entire list
    let enclosing = table.op(cx.nspace);
    params.extend(enclosing.params.iter().cloned());
    // function locals
    if cx.locals > 0 {
        let toks = cx.toks;
        let tok_at = |p: usize| toks.get(p).ok_or(ExprError::UntermExpr { at: p });
        let mut pos = cx.local_start;
        for _ in 0..cx.locals {
            // locals are never by name
            let name = tok_at(pos)?.text.to_string();
            pos += 1; // at the open paren
            pos += 1; // first token of the initializer
            let initializer = pos;
            let mut nesting = 0i32;
            loop {
                match tok_at(pos)?.token {
                    Token::LParen => nesting += 1,
                    Token::RParen => nesting -= 1,
                    _ => {}
                }
                pos += 1;
                if nesting < 0 {
                    break;
                }
            }
            params.push(Param {
                name,
                by_name: false,
                initializer: Some(initializer),
            });
            // consume the comma between locals
            if tok_at(pos).map(|t| t.is_literal(',')).unwrap_or(false) {
                pos += 1;
            }
            cx.pos = pos;
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavender_parser::tokenize;
    use pretty_assertions::assert_eq;

    fn declare(src: &str) -> ExprResult<(OperatorTable, OpId, usize)> {
        let toks = tokenize(src).expect("tokenize failed");
        let mut table = OperatorTable::new();
        let scope = table.add_scope_root("repl");
        let (id, body) = declare_function(&toks, 0, scope, &mut table)?;
        Ok((table, id, body))
    }

    #[test]
    fn test_simple_declaration() {
        let (table, id, body) = declare("def f(x) => x").unwrap();
        let op = table.op(id);
        assert_eq!(op.name, "repl:f");
        assert_eq!(op.arity, 1);
        assert_eq!(op.capture_count, 0);
        assert_eq!(op.locals, 0);
        assert_eq!(op.fixing, Fixing::Prefix);
        assert!(!op.varargs);
        assert_eq!(op.params[0].name, "x");
        // body points past the arrow
        assert_eq!(body, 6);
    }

    #[test]
    fn test_zero_arity() {
        let (table, id, _) = declare("def f() => 1").unwrap();
        assert_eq!(table.op(id).arity, 0);
        let (table, id, _) = declare("def g( ) => 1").unwrap();
        assert_eq!(table.op(id).arity, 0);
    }

    #[test]
    fn test_infix_fixing() {
        let (table, id, _) = declare("def i_plus(a, b) => a").unwrap();
        let op = table.op(id);
        assert_eq!(op.fixing, Fixing::LeftInfix);
        assert_eq!(op.simple_name(), "plus");
        assert_eq!(op.arity, 2);
        assert!(table.get("repl:plus", Namespace::Infix).is_some());
    }

    #[test]
    fn test_symbolic_name() {
        let (table, id, _) = declare("def i_**(a, b) => a").unwrap();
        assert_eq!(table.op(id).simple_name(), "**");
        assert_eq!(table.op(id).fixing, Fixing::LeftInfix);
    }

    #[test]
    fn test_colon_rewritten_in_symbolic_name() {
        let (table, id, _) = declare("def i_::(a, b) => a").unwrap();
        assert_eq!(table.op(id).name, "repl:##");
    }

    #[test]
    fn test_by_name_params() {
        let (table, id, _) = declare("def f(=>cond, t, e) => t").unwrap();
        let op = table.op(id);
        assert!(op.by_name(0));
        assert!(!op.by_name(1));
        assert!(!op.by_name(2));
        assert!(op.has_by_name());
    }

    #[test]
    fn test_varargs() {
        let (table, id, _) = declare("def f(x, ...rest) => rest").unwrap();
        let op = table.op(id);
        assert!(op.varargs);
        assert_eq!(op.arity, 2);
        assert_eq!(op.params[1].name, "rest");
    }

    #[test]
    fn test_varargs_not_last_rejected() {
        assert!(matches!(
            declare("def f(...rest, x) => rest"),
            Err(ExprError::BadArgs { .. })
        ));
    }

    #[test]
    fn test_locals() {
        let (table, id, _) = declare("def f(x) let y(x + 1), z(2) => y").unwrap();
        let op = table.op(id);
        assert_eq!(op.arity, 1);
        assert_eq!(op.locals, 2);
        assert_eq!(op.params.len(), 3);
        assert_eq!(op.params[1].name, "y");
        assert!(op.params[1].initializer.is_some());
        assert_eq!(op.params[2].name, "z");
    }

    #[test]
    fn test_bad_fixing() {
        assert!(matches!(
            declare("def i_neg(x) => x"),
            Err(ExprError::BadFixing { .. })
        ));
        assert!(matches!(
            declare("def r_f() => 1"),
            Err(ExprError::BadFixing { .. })
        ));
    }

    #[test]
    fn test_reserved_name() {
        assert!(matches!(
            declare("def do(x) => x"),
            Err(ExprError::ReservedId { .. })
        ));
        assert!(matches!(
            declare("def f(def) => 1"),
            Err(ExprError::ReservedId { .. })
        ));
    }

    #[test]
    fn test_not_a_function() {
        assert!(matches!(
            declare("x + 1"),
            Err(ExprError::NotAFunction { .. })
        ));
    }

    #[test]
    fn test_missing_body() {
        assert!(matches!(
            declare("def f(x) x"),
            Err(ExprError::MissingBody { .. })
        ));
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            declare("def f(x"),
            Err(ExprError::UntermExpr { .. })
        ));
    }

    #[test]
    fn test_duplicate_declaration() {
        let toks = tokenize("def f(x) => x").expect("tokenize failed");
        let mut table = OperatorTable::new();
        let scope = table.add_scope_root("repl");
        declare_function(&toks, 0, scope, &mut table).unwrap();
        assert!(matches!(
            declare_function(&toks, 0, scope, &mut table),
            Err(ExprError::DupDecl { .. })
        ));
    }

    #[test]
    fn test_nested_captures_enclosing_params() {
        // declare an outer function, then a nested one in its scope
        let toks = tokenize("def outer(a, b) => 0").expect("tokenize failed");
        let mut table = OperatorTable::new();
        let scope = table.add_scope_root("repl");
        let (outer, _) = declare_function(&toks, 0, scope, &mut table).unwrap();

        let toks = tokenize("def inner(x) => x").expect("tokenize failed");
        let (inner, _) = declare_function(&toks, 0, outer, &mut table).unwrap();
        let op = table.op(inner);
        assert_eq!(op.name, "repl:outer:inner");
        assert_eq!(op.arity, 3); // x + captured a, b
        assert_eq!(op.capture_count, 2);
        assert_eq!(op.callable_arity(), 1);
        assert_eq!(
            op.params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["x", "a", "b"]
        );
    }

    #[test]
    fn test_anonymous_declaration() {
        let (table, id, _) = declare("def (x) => x").unwrap();
        let op = table.op(id);
        assert!(op.is_anonymous());
        assert_eq!(op.name, "repl:");
        assert_eq!(table.anonymous().len(), 1);
    }

    #[test]
    fn test_leading_paren_is_skipped() {
        let (table, id, _) = declare("(def f(x) => x").unwrap();
        assert_eq!(table.op(id).name, "repl:f");
    }
}
