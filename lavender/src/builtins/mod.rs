//! The builtin value algebra: equality, ordering, hashing, string
//! rendering, and arithmetic over the tagged value domain, plus the
//! `sys:` operator registrations.
//!
//! The algebra functions are total: a type mismatch yields the
//! undefined value (or false), never an error. Equality, ordering and
//! hashing additionally have a hook layer ([`Hooks`]) that consults a
//! user-installed function through the evaluator contract before
//! falling back to the built-in rules.

pub mod cap;
pub mod int;
pub mod map;
pub mod num;
pub mod string;
pub mod vect;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::eval::Evaluator;
use crate::ops::{Fixing, FuncKind, Namespace, Operator, OperatorTable, Param};
use crate::symbols::SymbolTable;
use crate::value::{Value, ValueKind};

/// Context handed to builtin operators.
pub struct BuiltinCx<'a> {
    pub table: &'a OperatorTable,
    pub symbols: &'a mut SymbolTable,
    pub eval: &'a mut dyn Evaluator,
}

impl std::fmt::Debug for BuiltinCx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinCx").finish_non_exhaustive()
    }
}

/// A native operator implementation. The evaluator calls it with
/// exactly the operator's declared arity of arguments.
pub type BuiltinFn = fn(&mut BuiltinCx<'_>, &[Value]) -> Value;

/// Evaluate a by-name argument: a function value or capture with no
/// uncaptured parameters is applied to nothing; anything else passes
/// through.
pub fn force(cx: &mut BuiltinCx<'_>, v: &Value) -> Value {
    let thunk = match v {
        Value::FunctionVal(id) => cx.table.op(*id).callable_arity() == 0,
        Value::Capture(c) => cx.table.op(c.capfunc).callable_arity() == 0,
        _ => false,
    };
    if thunk {
        cx.eval.call_function(v, &[])
    } else {
        v.clone()
    }
}

/// Structural, recursive equality. Different type tags compare unequal;
/// Number never equals Integer, and Integer never equals BigInt.
pub fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Vect(x), Value::Vect(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| equal(a, b))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(a, b)| equal(&a.key, &b.key) && equal(&a.value, &b.value))
        }
        (Value::FunctionVal(x), Value::FunctionVal(y)) => x == y,
        (Value::Capture(x), Value::Capture(y)) => {
            x.capfunc == y.capfunc
                && x.values
                    .iter()
                    .zip(y.values.iter())
                    .all(|(a, b)| equal(a, b))
        }
        _ => false,
    }
}

/// Total order. Between differing variants the type tag order decides,
/// with the Integer/BigInt pair compared numerically by sign.
pub fn lt(a: &Value, b: &Value) -> bool {
    if a.kind() != b.kind() {
        return match (a, b) {
            (Value::Integer(x), Value::BigInt(y)) => {
                let (xn, yn) = (*x < 0, y.sign() == num_bigint::Sign::Minus);
                // an out-of-range BigInt has the larger magnitude
                if xn == yn {
                    !yn
                } else {
                    xn
                }
            }
            (Value::BigInt(x), Value::Integer(_)) => x.sign() == num_bigint::Sign::Minus,
            _ => a.kind() < b.kind(),
        };
    }
    match (a, b) {
        (Value::Undefined, Value::Undefined) => false,
        (Value::Number(x), Value::Number(y)) => x < y,
        (Value::Integer(x), Value::Integer(y)) => x < y,
        (Value::BigInt(x), Value::BigInt(y)) => x < y,
        (Value::Symbol(x), Value::Symbol(y)) => x < y,
        (Value::Str(x), Value::Str(y)) => x.as_bytes() < y.as_bytes(),
        (Value::Vect(x), Value::Vect(y)) => {
            if x.len() != y.len() {
                return x.len() < y.len();
            }
            for (a, b) in x.iter().zip(y.iter()) {
                if lt(a, b) {
                    return true;
                }
                if lt(b, a) {
                    return false;
                }
            }
            false
        }
        (Value::Map(x), Value::Map(y)) => {
            if x.len() != y.len() {
                return x.len() < y.len();
            }
            for (a, b) in x.iter().zip(y.iter()) {
                for (u, v) in [(&a.key, &b.key), (&a.value, &b.value)] {
                    if lt(u, v) {
                        return true;
                    }
                    if lt(v, u) {
                        return false;
                    }
                }
            }
            false
        }
        (Value::FunctionVal(x), Value::FunctionVal(y)) => x < y,
        (Value::Capture(x), Value::Capture(y)) => {
            if x.capfunc != y.capfunc {
                return x.capfunc < y.capfunc;
            }
            for (a, b) in x.values.iter().zip(y.values.iter()) {
                if lt(a, b) {
                    return true;
                }
                if lt(b, a) {
                    return false;
                }
            }
            false
        }
        _ => false,
    }
}

/// djb2-style polynomial hash. Equal values hash equal.
pub fn hash(v: &Value) -> u64 {
    const SEED: u64 = 5381;
    fn djb2(seed: u64, bytes: impl IntoIterator<Item = u8>) -> u64 {
        bytes
            .into_iter()
            .fold(seed, |h, b| h.wrapping_mul(33).wrapping_add(b as u64))
    }
    match v {
        Value::Undefined => 0,
        Value::Number(n) => djb2(SEED, n.to_bits().to_le_bytes()),
        Value::Integer(i) => *i as u64,
        Value::Symbol(s) => *s as u64,
        Value::Str(s) => djb2(SEED, s.bytes()),
        Value::BigInt(b) => int::words(b)
            .into_iter()
            .fold(0u64, |h, w| h.wrapping_mul(31).wrapping_add(w)),
        Value::Vect(v) => v
            .iter()
            .fold(SEED, |h, e| h.wrapping_mul(33).wrapping_add(hash(e))),
        Value::Map(m) => m.iter().fold(SEED, |h, e| {
            h.wrapping_mul(33).wrapping_add(e.hash ^ hash(&e.value))
        }),
        Value::FunctionVal(id) => id.index() as u64,
        Value::Capture(c) => c
            .values
            .iter()
            .fold(c.capfunc.index() as u64, |h, e| {
                h.wrapping_mul(33).wrapping_add(hash(e))
            }),
    }
}

/// Truthiness: empty containers, zero, and the undefined value are
/// false; everything else is true.
pub fn to_bool(v: &Value) -> bool {
    match v {
        Value::Undefined => false,
        Value::Number(n) => *n != 0.0,
        Value::Integer(i) => *i != 0,
        Value::Str(s) => !s.is_empty(),
        Value::Vect(v) => !v.is_empty(),
        Value::Map(m) => !m.is_empty(),
        _ => true,
    }
}

/// String rendering of any value.
pub fn str_of(table: &OperatorTable, symbols: &SymbolTable, v: &Value) -> String {
    match v {
        Value::Undefined => "<undefined>".to_string(),
        Value::Number(n) => num::num_str(*n),
        Value::Integer(_) | Value::BigInt(_) => int::int_str(v).unwrap_or_default(),
        Value::Symbol(s) => symbols.name(*s).unwrap_or("<symb>").to_string(),
        Value::Str(s) => s.to_string(),
        Value::Vect(items) => {
            if items.is_empty() {
                return "{ }".to_string();
            }
            let parts: Vec<String> =
                items.iter().map(|e| str_of(table, symbols, e)).collect();
            format!("{{ {} }}", parts.join(", "))
        }
        Value::Map(entries) => {
            if entries.is_empty() {
                return "{ }".to_string();
            }
            let parts: Vec<String> = entries
                .iter()
                .map(|e| {
                    format!(
                        "{} => {}",
                        str_of(table, symbols, &e.key),
                        str_of(table, symbols, &e.value)
                    )
                })
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
        Value::FunctionVal(id) => table.op(*id).name.clone(),
        Value::Capture(c) => {
            let parts: Vec<String> = c
                .values
                .iter()
                .map(|e| str_of(table, symbols, e))
                .collect();
            format!("{}[{}]", table.op(c.capfunc).name, parts.join(", "))
        }
    }
}

/// The type name reported by `sys:typeof`.
pub fn type_name(v: &Value) -> &'static str {
    match v.kind() {
        ValueKind::Undefined => "undefined",
        ValueKind::Number => "number",
        ValueKind::Integer | ValueKind::BigInt => "int",
        ValueKind::Symbol => "symb",
        ValueKind::Str => "string",
        ValueKind::Vect => "vect",
        ValueKind::Map => "map",
        ValueKind::FunctionVal | ValueKind::Capture => "function",
    }
}

/// User-installable algebra hooks. A hook that returns an Integer
/// decides the answer; any other result falls back to the built-in
/// rules.
#[derive(Debug, Default)]
pub struct Hooks {
    pub equals: Option<Value>,
    pub hash: Option<Value>,
    pub lt: Option<Value>,
}

impl Hooks {
    pub fn equal(&self, eval: &mut dyn Evaluator, a: &Value, b: &Value) -> bool {
        if let Some(hook) = &self.equals {
            if let Value::Integer(i) = eval.call_function(hook, &[a.clone(), b.clone()]) {
                return i != 0;
            }
        }
        equal(a, b)
    }

    pub fn lt(&self, eval: &mut dyn Evaluator, a: &Value, b: &Value) -> bool {
        if let Some(hook) = &self.lt {
            if let Value::Integer(i) = eval.call_function(hook, &[a.clone(), b.clone()]) {
                return i != 0;
            }
        }
        lt(a, b)
    }

    pub fn hash(&self, eval: &mut dyn Evaluator, v: &Value) -> u64 {
        if let Some(hook) = &self.hash {
            if let Value::Integer(i) = eval.call_function(hook, &[v.clone()]) {
                return i as u64;
            }
        }
        hash(v)
    }
}

// Generic builtin operators, registered in the `sys` scope.

fn blt_defined(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    Value::Integer(!v.is_undefined() as i64)
}

fn blt_undefined(_cx: &mut BuiltinCx<'_>, _args: &[Value]) -> Value {
    Value::Undefined
}

fn blt_typeof(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    Value::string(type_name(&v))
}

fn blt_str(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    Value::string(str_of(cx.table, cx.symbols, &v))
}

fn blt_num(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    match &v {
        Value::Number(_) => v,
        Value::Integer(_) | Value::BigInt(_) => match int::widen(&v) {
            Some(n) => Value::Number(n),
            None => Value::Undefined,
        },
        Value::Str(s) => string::parse_num(s),
        _ => Value::Undefined,
    }
}

fn blt_int(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    match &v {
        Value::Integer(_) | Value::BigInt(_) => v,
        Value::Number(n) => num::num_to_int(n.trunc()),
        Value::Str(s) => string::parse_int(s),
        _ => Value::Undefined,
    }
}

fn blt_bool(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    Value::Integer(to_bool(&v) as i64)
}

fn blt_hash(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    Value::Integer(hash(&v) as i64)
}

fn blt_symb(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    match force(cx, &args[0]) {
        Value::Str(s) => Value::Symbol(cx.symbols.intern(&s)),
        _ => Value::Undefined,
    }
}

fn blt_len(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    match &v {
        Value::Str(s) => Value::Integer(s.len() as i64),
        Value::Vect(items) => Value::Integer(items.len() as i64),
        Value::Map(entries) => Value::Integer(entries.len() as i64),
        Value::FunctionVal(id) => Value::Integer(cx.table.op(*id).arity as i64),
        Value::Capture(c) => {
            Value::Integer(cx.table.op(c.capfunc).callable_arity() as i64)
        }
        _ => Value::Undefined,
    }
}

fn blt_at(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let idx = force(cx, &args[0]);
    let container = force(cx, &args[1]);
    match &container {
        Value::Str(_) => string::at(&idx, &container),
        Value::Vect(_) => vect::at(&idx, &container),
        Value::Map(_) => map::at(&idx, &container),
        _ => Value::Undefined,
    }
}

fn blt_cat(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let a = force(cx, &args[0]);
    let b = force(cx, &args[1]);
    match (&a, &b) {
        (Value::Str(_), _) => string::cat(&a, &b),
        (Value::Vect(_), _) => vect::cat(&a, &b),
        _ => Value::Undefined,
    }
}

fn blt_cval(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let c = force(cx, &args[0]);
    let i = force(cx, &args[1]);
    cap::cval(&c, &i)
}

fn blt_call(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let f = force(cx, &args[0]);
    match force(cx, &args[1]) {
        Value::Vect(items) => cx.eval.call_function(&f, &items),
        _ => Value::Undefined,
    }
}

fn blt_eq(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let a = force(cx, &args[0]);
    let b = force(cx, &args[1]);
    Value::Integer(equal(&a, &b) as i64)
}

fn blt_ne(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let a = force(cx, &args[0]);
    let b = force(cx, &args[1]);
    Value::Integer(!equal(&a, &b) as i64)
}

fn nan_pair(a: &Value, b: &Value) -> bool {
    matches!((a, b), (Value::Number(x), Value::Number(y)) if x.is_nan() || y.is_nan())
}

fn blt_lt(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let a = force(cx, &args[0]);
    let b = force(cx, &args[1]);
    if nan_pair(&a, &b) {
        return Value::Integer(0);
    }
    Value::Integer(lt(&a, &b) as i64)
}

fn blt_gt(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let a = force(cx, &args[0]);
    let b = force(cx, &args[1]);
    if nan_pair(&a, &b) {
        return Value::Integer(0);
    }
    Value::Integer(lt(&b, &a) as i64)
}

// NaN always compares false, so `>=` is not the negation of `<` there.
fn blt_ge(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let a = force(cx, &args[0]);
    let b = force(cx, &args[1]);
    if nan_pair(&a, &b) {
        return Value::Integer(0);
    }
    Value::Integer(!lt(&a, &b) as i64)
}

fn blt_le(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let a = force(cx, &args[0]);
    let b = force(cx, &args[1]);
    if nan_pair(&a, &b) {
        return Value::Integer(0);
    }
    Value::Integer(!lt(&b, &a) as i64)
}

macro_rules! blt_arith {
    ($name:ident, $op:path) => {
        fn $name(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
            let a = force(cx, &args[0]);
            let b = force(cx, &args[1]);
            $op(&a, &b)
        }
    };
}

blt_arith!(blt_add, int::add);
blt_arith!(blt_sub, int::sub);
blt_arith!(blt_mul, int::mul);
blt_arith!(blt_div, num::div);
blt_arith!(blt_rdiv, num::rdiv);
blt_arith!(blt_rem, num::rem);

fn blt_neg(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    int::neg(&v)
}

fn blt_pos(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    match force(cx, &args[0]) {
        v @ (Value::Number(_) | Value::Integer(_) | Value::BigInt(_)) => v,
        _ => Value::Undefined,
    }
}

// `a ? b` yields b when the lazily evaluated condition holds.
fn blt_cond(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let c = force(cx, &args[0]);
    if to_bool(&c) {
        force(cx, &args[1])
    } else {
        Value::Undefined
    }
}

/// One registration row: simple name, fixing, callable arity, by-name
/// parameter indices, implementation.
struct Registration {
    name: &'static str,
    fixing: Fixing,
    arity: usize,
    by_name: &'static [usize],
    func: BuiltinFn,
}

const fn reg(
    name: &'static str,
    fixing: Fixing,
    arity: usize,
    by_name: &'static [usize],
    func: BuiltinFn,
) -> Registration {
    Registration {
        name,
        fixing,
        arity,
        by_name,
        func,
    }
}

static SYS_BUILTINS: &[Registration] = &[
    reg("defined", Fixing::Prefix, 1, &[], blt_defined),
    reg("undefined", Fixing::Prefix, 0, &[], blt_undefined),
    reg("typeof", Fixing::Prefix, 1, &[], blt_typeof),
    reg("str", Fixing::Prefix, 1, &[], blt_str),
    reg("num", Fixing::Prefix, 1, &[], blt_num),
    reg("int", Fixing::Prefix, 1, &[], blt_int),
    reg("bool", Fixing::Prefix, 1, &[], blt_bool),
    reg("hash", Fixing::Prefix, 1, &[], blt_hash),
    reg("symb", Fixing::Prefix, 1, &[], blt_symb),
    reg("len", Fixing::Prefix, 1, &[], blt_len),
    reg("at", Fixing::Prefix, 2, &[], blt_at),
    reg("cat", Fixing::Prefix, 2, &[], blt_cat),
    reg("cval", Fixing::Prefix, 2, &[], blt_cval),
    reg("call", Fixing::Prefix, 2, &[], blt_call),
    reg("neg", Fixing::Prefix, 1, &[], blt_neg),
    reg("pos", Fixing::Prefix, 1, &[], blt_pos),
    reg("map", Fixing::Prefix, 2, &[], vect::map_fn),
    reg("filter", Fixing::Prefix, 2, &[], vect::filter),
    reg("fold", Fixing::Prefix, 3, &[], vect::fold),
    reg("take", Fixing::Prefix, 2, &[], vect::take),
    reg("skip", Fixing::Prefix, 2, &[], vect::skip),
    reg("slice", Fixing::Prefix, 3, &[], vect::slice),
    reg("+", Fixing::LeftInfix, 2, &[], blt_add),
    reg("-", Fixing::LeftInfix, 2, &[], blt_sub),
    reg("*", Fixing::LeftInfix, 2, &[], blt_mul),
    reg("/", Fixing::LeftInfix, 2, &[], blt_div),
    reg("//", Fixing::LeftInfix, 2, &[], blt_rdiv),
    reg("%", Fixing::LeftInfix, 2, &[], blt_rem),
    reg("++", Fixing::RightInfix, 2, &[], blt_cat),
    reg("=", Fixing::LeftInfix, 2, &[], blt_eq),
    reg("!=", Fixing::LeftInfix, 2, &[], blt_ne),
    reg("<", Fixing::LeftInfix, 2, &[], blt_lt),
    reg(">", Fixing::LeftInfix, 2, &[], blt_gt),
    reg("<=", Fixing::LeftInfix, 2, &[], blt_le),
    reg(">=", Fixing::LeftInfix, 2, &[], blt_ge),
    reg("?", Fixing::LeftInfix, 2, &[0], blt_cond),
];

/// Native implementations by simple name, for lookups from the REPL
/// and the tests.
static INTRINSICS: Lazy<HashMap<&'static str, BuiltinFn>> = Lazy::new(|| {
    SYS_BUILTINS.iter().map(|r| (r.name, r.func)).collect()
});

pub fn get_intrinsic(name: &str) -> Option<BuiltinFn> {
    INTRINSICS.get(name).copied()
}

/// Register the builtin operators in the `sys` scope.
pub fn register_sys(table: &mut OperatorTable) {
    for r in SYS_BUILTINS {
        let ns = if r.fixing == Fixing::Prefix {
            Namespace::Prefix
        } else {
            Namespace::Infix
        };
        let params = (0..r.arity)
            .map(|i| Param {
                name: String::new(),
                by_name: r.by_name.contains(&i),
                initializer: None,
            })
            .collect();
        let op = Operator {
            name: format!("sys:{}", r.name),
            kind: FuncKind::Builtin(r.func),
            arity: r.arity,
            capture_count: 0,
            locals: 0,
            fixing: r.fixing,
            varargs: false,
            params,
            enclosing: None,
        };
        table.add(op, ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::NullEvaluator;
    use crate::value::{CaptureObj, MapEntry};
    use std::rc::Rc;

    #[test]
    fn test_equality_strict_tags() {
        assert!(!equal(&Value::Number(1.0), &Value::Integer(1)));
        assert!(equal(&Value::Integer(1), &Value::Integer(1)));
        assert!(equal(&Value::Undefined, &Value::Undefined));
    }

    #[test]
    fn test_equality_structural() {
        let a = Value::vect(vec![Value::Integer(1), Value::string("x")]);
        let b = Value::vect(vec![Value::Integer(1), Value::string("x")]);
        let c = Value::vect(vec![Value::Integer(2), Value::string("x")]);
        assert!(equal(&a, &b));
        assert!(!equal(&a, &c));
    }

    #[test]
    fn test_hash_consistency() {
        let a = Value::vect(vec![Value::Integer(1), Value::string("x")]);
        let b = Value::vect(vec![Value::Integer(1), Value::string("x")]);
        assert!(equal(&a, &b));
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn test_lt_numbers() {
        assert!(lt(&Value::Integer(-1), &Value::Integer(1)));
        assert!(lt(&Value::Number(1.5), &Value::Number(2.0)));
        // NaN never compares less
        assert!(!lt(&Value::Number(f64::NAN), &Value::Number(1.0)));
        assert!(!lt(&Value::Number(1.0), &Value::Number(f64::NAN)));
    }

    #[test]
    fn test_lt_mixed_int_bigint() {
        let big_pos = Value::BigInt(Rc::new(num_bigint::BigInt::from(i64::MAX) + 1));
        let big_neg = Value::BigInt(Rc::new(num_bigint::BigInt::from(i64::MIN) - 1));
        assert!(lt(&Value::Integer(5), &big_pos));
        assert!(!lt(&big_pos, &Value::Integer(5)));
        assert!(lt(&big_neg, &Value::Integer(-5)));
        assert!(!lt(&Value::Integer(-5), &big_neg));
        assert!(lt(&Value::Integer(-5), &big_pos));
        assert!(lt(&big_neg, &Value::Integer(5)));
    }

    #[test]
    fn test_lt_strings_and_vects() {
        assert!(lt(&Value::string("abc"), &Value::string("abd")));
        let short = Value::vect(vec![Value::Integer(9)]);
        let long = Value::vect(vec![Value::Integer(1), Value::Integer(2)]);
        assert!(lt(&short, &long));
    }

    #[test]
    fn test_lt_cross_type_uses_tag_order() {
        assert!(lt(&Value::Undefined, &Value::Number(0.0)));
        assert!(lt(&Value::string("z"), &Value::vect(vec![])));
    }

    #[test]
    fn test_to_bool() {
        assert!(!to_bool(&Value::Undefined));
        assert!(!to_bool(&Value::Integer(0)));
        assert!(!to_bool(&Value::string("")));
        assert!(to_bool(&Value::Integer(2)));
        assert!(to_bool(&Value::vect(vec![Value::Integer(0)])));
    }

    #[test]
    fn test_map_hash_uses_stored_entry_hash() {
        let key = Value::string("k");
        let entry = MapEntry {
            hash: hash(&key),
            key,
            value: Value::Integer(1),
        };
        let m1 = Value::Map(Rc::new(vec![entry.clone()]));
        let m2 = Value::Map(Rc::new(vec![entry]));
        assert_eq!(hash(&m1), hash(&m2));
    }

    #[test]
    fn test_capture_equality() {
        use crate::ops::OperatorTable;
        let mut table = OperatorTable::new();
        let f = table.add_scope_root("f");
        let g = table.add_scope_root("g");
        let a = Value::Capture(Rc::new(CaptureObj {
            capfunc: f,
            values: vec![Value::Integer(1)],
        }));
        let b = Value::Capture(Rc::new(CaptureObj {
            capfunc: f,
            values: vec![Value::Integer(1)],
        }));
        let c = Value::Capture(Rc::new(CaptureObj {
            capfunc: g,
            values: vec![Value::Integer(1)],
        }));
        assert!(equal(&a, &b));
        assert!(!equal(&a, &c));
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn test_hooks_fall_back() {
        let hooks = Hooks::default();
        let mut eval = NullEvaluator;
        assert!(hooks.equal(&mut eval, &Value::Integer(1), &Value::Integer(1)));
        assert!(hooks.lt(&mut eval, &Value::Integer(1), &Value::Integer(2)));
        assert_eq!(hooks.hash(&mut eval, &Value::Integer(7)), 7);
    }

    #[test]
    fn test_installed_hook_wins() {
        // an evaluator whose hook calls answer Integer(1) for equality
        // and Integer(0) for ordering
        struct Fixed(i64);
        impl Evaluator for Fixed {
            fn call_function(&mut self, _f: &Value, _args: &[Value]) -> Value {
                Value::Integer(self.0)
            }
        }
        let hooks = Hooks {
            equals: Some(Value::Undefined),
            lt: Some(Value::Undefined),
            hash: None,
        };
        let mut always = Fixed(1);
        assert!(hooks.equal(&mut always, &Value::Integer(1), &Value::Integer(2)));
        assert!(hooks.lt(&mut always, &Value::Integer(2), &Value::Integer(1)));
        let mut never = Fixed(0);
        assert!(!hooks.equal(&mut never, &Value::Integer(1), &Value::Integer(1)));
    }

    #[test]
    fn test_hook_non_integer_result_falls_back() {
        struct Opaque;
        impl Evaluator for Opaque {
            fn call_function(&mut self, _f: &Value, _args: &[Value]) -> Value {
                Value::Undefined
            }
        }
        let hooks = Hooks {
            equals: Some(Value::Undefined),
            lt: None,
            hash: None,
        };
        let mut eval = Opaque;
        // the built-in rules decide when the hook answers nothing usable
        assert!(hooks.equal(&mut eval, &Value::Integer(3), &Value::Integer(3)));
        assert!(!hooks.equal(&mut eval, &Value::Integer(3), &Value::Integer(4)));
    }

    #[test]
    fn test_register_sys() {
        use crate::ops::{Namespace, OperatorTable};
        let mut table = OperatorTable::new();
        register_sys(&mut table);
        assert!(table.get("sys:+", Namespace::Infix).is_some());
        assert!(table.get("sys:map", Namespace::Prefix).is_some());
        assert!(table.get("sys:+", Namespace::Prefix).is_none());
        let cond = table.get("sys:?", Namespace::Infix).unwrap();
        assert!(table.op(cond).by_name(0));
    }

    #[test]
    fn test_get_intrinsic() {
        assert!(get_intrinsic("len").is_some());
        assert!(get_intrinsic("no_such").is_none());
    }
}
