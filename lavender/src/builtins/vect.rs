//! Vector intrinsics. The higher-order operations call back into user
//! code through the evaluator contract.

use std::rc::Rc;

use super::{force, to_bool, BuiltinCx};
use crate::value::Value;

/// Vector concatenation.
pub fn cat(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Vect(x), Value::Vect(y)) => {
            let mut items = Vec::with_capacity(x.len() + y.len());
            items.extend(x.iter().cloned());
            items.extend(y.iter().cloned());
            Value::vect(items)
        }
        _ => Value::Undefined,
    }
}

/// The element at an index.
pub fn at(idx: &Value, v: &Value) -> Value {
    match (idx, v) {
        (Value::Integer(i), Value::Vect(items)) => {
            if *i >= 0 && (*i as usize) < items.len() {
                items[*i as usize].clone()
            } else {
                Value::Undefined
            }
        }
        _ => Value::Undefined,
    }
}

/// The elements in `[start, end)`.
pub fn slice(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    let (start, end) = match (force(cx, &args[1]), force(cx, &args[2])) {
        (Value::Integer(s), Value::Integer(e)) => (s, e),
        _ => return Value::Undefined,
    };
    match &v {
        Value::Vect(items) => {
            if start >= 0 && start <= end && (end as usize) <= items.len() {
                Value::vect(items[start as usize..end as usize].to_vec())
            } else {
                Value::Undefined
            }
        }
        _ => Value::Undefined,
    }
}

/// Apply a function to every element.
pub fn map_fn(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    let f = force(cx, &args[1]);
    match &v {
        Value::Vect(items) => {
            let mapped: Vec<Value> = items
                .iter()
                .map(|e| cx.eval.call_function(&f, std::slice::from_ref(e)))
                .collect();
            Value::Vect(Rc::new(mapped))
        }
        _ => Value::Undefined,
    }
}

/// Keep the elements satisfying a predicate.
pub fn filter(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    let f = force(cx, &args[1]);
    match &v {
        Value::Vect(items) => {
            let mut kept = Vec::with_capacity(items.len());
            for e in items.iter() {
                let passed = cx.eval.call_function(&f, std::slice::from_ref(e));
                if to_bool(&passed) {
                    kept.push(e.clone());
                }
            }
            Value::Vect(Rc::new(kept))
        }
        _ => Value::Undefined,
    }
}

/// Left fold with an initial accumulator.
pub fn fold(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    let mut accum = force(cx, &args[1]);
    let f = force(cx, &args[2]);
    match &v {
        Value::Vect(items) => {
            for e in items.iter() {
                accum = cx.eval.call_function(&f, &[accum.clone(), e.clone()]);
            }
            accum
        }
        _ => Value::Undefined,
    }
}

/// The longest prefix satisfying a predicate.
pub fn take(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    let f = force(cx, &args[1]);
    match &v {
        Value::Vect(items) => {
            let mut kept = Vec::new();
            for e in items.iter() {
                let passed = cx.eval.call_function(&f, std::slice::from_ref(e));
                if !to_bool(&passed) {
                    break;
                }
                kept.push(e.clone());
            }
            Value::Vect(Rc::new(kept))
        }
        _ => Value::Undefined,
    }
}

/// Drop the longest prefix satisfying a predicate.
pub fn skip(cx: &mut BuiltinCx<'_>, args: &[Value]) -> Value {
    let v = force(cx, &args[0]);
    let f = force(cx, &args[1]);
    match &v {
        Value::Vect(items) => {
            let mut skipped = 0;
            for e in items.iter() {
                let passed = cx.eval.call_function(&f, std::slice::from_ref(e));
                if !to_bool(&passed) {
                    break;
                }
                skipped += 1;
            }
            Value::vect(items[skipped..].to_vec())
        }
        _ => Value::Undefined,
    }
}
