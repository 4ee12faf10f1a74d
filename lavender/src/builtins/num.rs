//! Floating-point intrinsics and the division family.

use num_bigint::BigInt;
use num_traits::FromPrimitive;

use super::int::{demote, widen};
use crate::value::Value;

/// Exact conversion of a double to an integral value. Values outside
/// the 64-bit range promote to BigInt; non-finite input is undefined.
pub fn num_to_int(d: f64) -> Value {
    match BigInt::from_f64(d) {
        Some(big) => demote(big),
        None => Value::Undefined,
    }
}

/// Truncating division: the nearest integer toward zero of `a / b`.
/// A zero divisor follows IEEE: ±∞ for a nonzero numerator, NaN for
/// `0 / 0`, both as Numbers.
pub fn div(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            if *y == 0 {
                return zero_division(*x as f64, 0.0);
            }
            match x.checked_div(*y) {
                Some(q) => Value::Integer(q),
                // i64::MIN / -1
                None => demote(BigInt::from(*x) / BigInt::from(*y)),
            }
        }
        (Value::BigInt(_), Value::Integer(0)) => {
            zero_division(widen(a).unwrap_or(f64::NAN), 0.0)
        }
        (Value::BigInt(x), Value::Integer(y)) => demote((**x).clone() / BigInt::from(*y)),
        (Value::Integer(x), Value::BigInt(y)) => demote(BigInt::from(*x) / (**y).clone()),
        (Value::BigInt(x), Value::BigInt(y)) => demote((**x).clone() / (**y).clone()),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            let (Some(x), Some(y)) = (widen(a), widen(b)) else {
                return Value::Undefined;
            };
            if !x.is_finite() || !y.is_finite() {
                return Value::Undefined;
            }
            if y == 0.0 {
                return zero_division(x, y);
            }
            num_to_int((x / y).trunc())
        }
        _ => Value::Undefined,
    }
}

/// Real division, always producing a Number.
pub fn rdiv(a: &Value, b: &Value) -> Value {
    match (widen(a), widen(b)) {
        (Some(x), Some(y)) => Value::Number(x / y),
        _ => Value::Undefined,
    }
}

/// Remainder; the sign follows the dividend.
pub fn rem(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Integer(_), Value::Integer(0)) => Value::Undefined,
        (Value::Integer(x), Value::Integer(y)) => match x.checked_rem(*y) {
            Some(r) => Value::Integer(r),
            None => Value::Integer(0),
        },
        (Value::BigInt(_), Value::Integer(0)) => Value::Undefined,
        (Value::BigInt(x), Value::Integer(y)) => demote((**x).clone() % BigInt::from(*y)),
        (Value::Integer(x), Value::BigInt(y)) => demote(BigInt::from(*x) % (**y).clone()),
        (Value::BigInt(x), Value::BigInt(y)) => demote((**x).clone() % (**y).clone()),
        (Value::Number(_), _) | (_, Value::Number(_)) => match (widen(a), widen(b)) {
            (Some(x), Some(y)) => Value::Number(x % y),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

fn zero_division(x: f64, y: f64) -> Value {
    Value::Number(x / y)
}

/// Render a double the way the REPL prints it.
pub fn num_str(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n < 0.0 { "-inf".to_string() } else { "inf".to_string() }
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_integral_division_truncates_toward_zero() {
        assert!(matches!(
            div(&Value::Integer(7), &Value::Integer(2)),
            Value::Integer(3)
        ));
        assert!(matches!(
            div(&Value::Integer(-7), &Value::Integer(2)),
            Value::Integer(-3)
        ));
        assert!(matches!(
            div(&Value::Integer(7), &Value::Integer(-2)),
            Value::Integer(-3)
        ));
    }

    #[test]
    fn test_int_min_division_promotes() {
        let r = div(&Value::Integer(i64::MIN), &Value::Integer(-1));
        match r {
            Value::BigInt(b) => assert_eq!(b.to_string(), "9223372036854775808"),
            other => panic!("expected BigInt, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_divisor() {
        assert!(matches!(
            div(&Value::Integer(1), &Value::Integer(0)),
            Value::Number(n) if n.is_infinite() && n > 0.0
        ));
        assert!(matches!(
            div(&Value::Integer(-1), &Value::Integer(0)),
            Value::Number(n) if n.is_infinite() && n < 0.0
        ));
        assert!(matches!(
            div(&Value::Integer(0), &Value::Integer(0)),
            Value::Number(n) if n.is_nan()
        ));
    }

    #[test]
    fn test_number_division_is_integral() {
        assert!(matches!(
            div(&Value::Number(7.5), &Value::Number(2.0)),
            Value::Integer(3)
        ));
    }

    #[test]
    fn test_rdiv_is_real() {
        assert!(matches!(
            rdiv(&Value::Integer(7), &Value::Integer(2)),
            Value::Number(n) if n == 3.5
        ));
        assert!(matches!(
            rdiv(&Value::Number(1.0), &Value::Number(0.0)),
            Value::Number(n) if n.is_infinite()
        ));
    }

    #[test]
    fn test_rem_follows_dividend() {
        assert!(matches!(
            rem(&Value::Integer(7), &Value::Integer(2)),
            Value::Integer(1)
        ));
        assert!(matches!(
            rem(&Value::Integer(-7), &Value::Integer(2)),
            Value::Integer(-1)
        ));
        assert!(rem(&Value::Integer(7), &Value::Integer(0)).is_undefined());
    }

    #[test]
    fn test_bigint_division_demotes() {
        let big = Value::BigInt(Rc::new(BigInt::from(i64::MAX) + 1));
        let r = div(&big, &Value::Integer(2));
        assert!(matches!(r, Value::Integer(_)));
    }

    #[test]
    fn test_num_to_int_exact() {
        assert!(matches!(num_to_int(3.9), Value::Integer(3)));
        assert!(matches!(num_to_int(-3.9), Value::Integer(-3)));
        assert!(matches!(num_to_int(1e300), Value::BigInt(_)));
        assert!(num_to_int(f64::INFINITY).is_undefined());
        assert!(num_to_int(f64::NAN).is_undefined());
    }
}
