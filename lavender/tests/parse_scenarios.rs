//! End-to-end parses through the session API: definitions land in the
//! operator table, bodies land in the instruction buffer.

use lavender::ops::Namespace;
use lavender::session::Session;
use lavender::value::Instr;
use lavender_parser::tokenize;
use pretty_assertions::assert_eq;

fn define(session: &mut Session, src: &str) -> (lavender::OpId, Vec<Instr>) {
    let toks = tokenize(src).expect("tokenize failed");
    let before = session.buf.len();
    let (id, next) = session.define_function(&toks).expect("define failed");
    assert_eq!(next, toks.len(), "definition left tokens unconsumed");
    let code = session.buf.slice(before, session.buf.len()).to_vec();
    (id, code)
}

fn sys(session: &Session, name: &str, ns: Namespace) -> lavender::OpId {
    session
        .table
        .get(&format!("sys:{}", name), ns)
        .expect("missing sys operator")
}

#[test]
fn scenario_simple_infix_body() {
    let mut session = Session::new();
    let (_, code) = define(&mut session, "def f(x) => x + 1");
    let plus = sys(&session, "+", Namespace::Infix);
    assert_eq!(
        code,
        vec![
            Instr::Param(0),
            Instr::Int(1),
            Instr::Function(plus),
            Instr::Return,
        ]
    );
}

#[test]
fn scenario_precedence() {
    let mut session = Session::new();
    let (_, code) = define(&mut session, "def g(x, y) => x * y + x");
    let mul = sys(&session, "*", Namespace::Infix);
    let plus = sys(&session, "+", Namespace::Infix);
    assert_eq!(
        code,
        vec![
            Instr::Param(0),
            Instr::Param(1),
            Instr::Function(mul),
            Instr::Param(0),
            Instr::Function(plus),
            Instr::Return,
        ]
    );
}

#[test]
fn scenario_vector_literal() {
    let mut session = Session::new();
    let (_, code) = define(&mut session, "def h() => { 1, 2, 3 }");
    assert_eq!(
        code,
        vec![
            Instr::Int(1),
            Instr::Int(2),
            Instr::Int(3),
            Instr::MakeVect(3),
            Instr::Return,
        ]
    );
}

#[test]
fn scenario_square_bracket_transposition() {
    let mut session = Session::new();
    let (f, _) = define(&mut session, "def f(a, b) => a");
    let (_, code) = define(&mut session, "def k(x) => f[x](2)");
    assert_eq!(
        code,
        vec![
            Instr::Int(2),
            Instr::Param(0),
            Instr::FuncCall(2),
            Instr::Function(f),
            Instr::Return,
        ]
    );
}

#[test]
fn scenario_by_name_argument_is_lifted() {
    let mut session = Session::new();
    define(&mut session, "def p(=>cond, t, e) => t");
    let toks = tokenize("def q(x) => p(x + 1, 2, 3)").unwrap();
    let before = session.buf.len();
    let (_, _) = session.define_function(&toks).unwrap();
    let code = session.buf.slice(before, session.buf.len()).to_vec();

    // the thunk body is appended before the caller's code
    let plus = sys(&session, "+", Namespace::Infix);
    assert_eq!(
        &code[..4],
        &[
            Instr::Param(0),
            Instr::Int(1),
            Instr::Function(plus),
            Instr::Return,
        ]
    );
    // the call site binds the thunk's captures with FuncCap
    let Instr::FunctionVal(anon) = code[5].clone() else {
        panic!("expected lifted thunk, got {:?}", code);
    };
    assert!(session.table.op(anon).is_anonymous());
    let p = session
        .table
        .get("repl:p", Namespace::Prefix)
        .expect("p not registered");
    assert_eq!(
        &code[4..],
        &[
            Instr::Param(0),
            Instr::FunctionVal(anon),
            Instr::FuncCap,
            Instr::Int(2),
            Instr::Int(3),
            Instr::Function(p),
            Instr::Return,
        ]
    );
}

#[test]
fn scenario_piecewise_body() {
    let mut session = Session::new();
    let (_, code) = define(&mut session, "def mx(a, b) => a < b ; b ; a");
    let less = sys(&session, "<", Namespace::Infix);
    assert_eq!(
        code,
        vec![
            Instr::Param(0),
            Instr::Param(1),
            Instr::Function(less),
            Instr::Beqz(2),
            Instr::Param(1),
            Instr::Return,
            Instr::Param(0),
            Instr::Return,
        ]
    );
}

#[test]
fn locals_compile_with_put_param() {
    let mut session = Session::new();
    let (id, code) = define(&mut session, "def f(x) let y(x + 1) => y");
    let op = session.table.op(id);
    assert_eq!(op.arity, 1);
    assert_eq!(op.locals, 1);
    let plus = sys(&session, "+", Namespace::Infix);
    assert_eq!(
        code,
        vec![
            Instr::Param(0),
            Instr::Int(1),
            Instr::Function(plus),
            Instr::PutParam(1),
            Instr::Param(1),
            Instr::Return,
        ]
    );
}

#[test]
fn nested_definition_compiles_with_capture() {
    let mut session = Session::new();
    let (_, code) = define(&mut session, "def outer(a) => def inner(x) => x + a");
    let inner = session
        .table
        .get("repl:outer:inner", Namespace::Prefix)
        .expect("inner not registered");
    let op = session.table.op(inner);
    assert_eq!(op.arity, 2);
    assert_eq!(op.capture_count, 1);
    // outer's body binds inner's capture of `a`
    assert_eq!(
        code.last_chunk::<4>().expect("short code"),
        &[
            Instr::Param(0),
            Instr::FunctionVal(inner),
            Instr::FuncCap,
            Instr::Return,
        ]
    );
}

#[test]
fn staged_expression_round_trip() {
    let mut session = Session::new();
    define(&mut session, "def f(x) => x + 1");
    let f = session.table.get("repl:f", Namespace::Prefix).unwrap();

    let toks = tokenize("f(41)").unwrap();
    let before = session.buf.len();
    let ((start, end), next) = session.stage_expr(&toks).unwrap();
    assert_eq!(next, toks.len());
    assert_eq!(
        session.buf.slice(start, end),
        &[Instr::Int(41), Instr::Function(f), Instr::Return]
    );
    session.clear_expr();
    assert_eq!(session.buf.len(), before);
}

#[test]
fn duplicate_definition_is_rejected() {
    let mut session = Session::new();
    define(&mut session, "def f(x) => x");
    let toks = tokenize("def f(y) => y").unwrap();
    assert!(matches!(
        session.define_function(&toks),
        Err(lavender::ExprError::DupDecl { .. })
    ));
}

#[test]
fn error_carries_offending_token() {
    let mut session = Session::new();
    let toks = tokenize("def f(x) => nonesuch").unwrap();
    let err = session.define_function(&toks).unwrap_err();
    assert!(matches!(err, lavender::ExprError::NameNotFound { .. }));
    assert_eq!(err.lexeme(&toks), Some("nonesuch"));
}

#[test]
fn removed_operator_is_not_resolvable() {
    let mut session = Session::new();
    define(&mut session, "def f(x) => x");
    assert!(session.table.remove("repl:f", Namespace::Prefix));
    let toks = tokenize("f(1)").unwrap();
    assert!(matches!(
        session.stage_expr(&toks),
        Err(lavender::ExprError::NameNotFound { .. })
    ));
}
