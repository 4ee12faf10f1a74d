//! Integer and big-integer intrinsics.
//!
//! Arithmetic follows the promotion ladder Integer → BigInt → Number.
//! A result representable in 64 bits never stays a BigInt: every
//! BigInt-producing operation demotes through [`demote`].

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

use crate::value::Value;

/// Normalize a big integer: one that fits in 64 bits becomes an
/// `Integer`, anything larger stays a `BigInt`.
pub fn demote(big: BigInt) -> Value {
    match big.to_i64() {
        Some(small) => Value::Integer(small),
        None => Value::BigInt(Rc::new(big)),
    }
}

/// Convert an integral value to a double, preserving sign.
pub fn widen(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => Some(*n),
        Value::Integer(i) => Some(*i as f64),
        Value::BigInt(b) => b.to_f64(),
        _ => None,
    }
}

/// Decimal rendering; big integers carry the `L` suffix.
pub fn int_str(v: &Value) -> Option<String> {
    match v {
        Value::Integer(i) => Some(i.to_string()),
        Value::BigInt(b) => Some(format!("{}L", b)),
        _ => None,
    }
}

/// Two's-complement word payload of an integral value, least
/// significant word first, for hashing.
pub fn words(big: &BigInt) -> Vec<u64> {
    let mut bytes = big.to_signed_bytes_le();
    let fill = if big.is_negative() { 0xff } else { 0x00 };
    while bytes.len() % 8 != 0 {
        bytes.push(fill);
    }
    bytes
        .chunks_exact(8)
        .map(|c| {
            let mut w = [0u8; 8];
            w.copy_from_slice(c);
            u64::from_le_bytes(w)
        })
        .collect()
}

/// Integral negation. Negating the 64-bit minimum promotes.
pub fn neg(v: &Value) -> Value {
    match v {
        Value::Integer(i) => match i.checked_neg() {
            Some(n) => Value::Integer(n),
            None => demote(-BigInt::from(*i)),
        },
        Value::BigInt(b) => demote(-(**b).clone()),
        Value::Number(n) => Value::Number(-n),
        _ => Value::Undefined,
    }
}

fn as_big(v: &Value) -> Option<BigInt> {
    match v {
        Value::Integer(i) => Some(BigInt::from(*i)),
        Value::BigInt(b) => Some((**b).clone()),
        _ => None,
    }
}

macro_rules! promoting_op {
    ($name:ident, $checked:ident, $op:tt) => {
        /// Binary arithmetic with overflow promotion and double widening.
        pub fn $name(a: &Value, b: &Value) -> Value {
            match (a, b) {
                (Value::Number(_), _) | (_, Value::Number(_)) => {
                    match (widen(a), widen(b)) {
                        (Some(x), Some(y)) => Value::Number(x $op y),
                        _ => Value::Undefined,
                    }
                }
                (Value::Integer(x), Value::Integer(y)) => match x.$checked(*y) {
                    Some(r) => Value::Integer(r),
                    None => demote(BigInt::from(*x) $op BigInt::from(*y)),
                },
                _ => match (as_big(a), as_big(b)) {
                    (Some(x), Some(y)) => demote(x $op y),
                    _ => Value::Undefined,
                },
            }
        }
    };
}

promoting_op!(add, checked_add, +);
promoting_op!(sub, checked_sub, -);
promoting_op!(mul, checked_mul, *);
