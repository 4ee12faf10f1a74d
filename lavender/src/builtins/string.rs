//! String intrinsics.

use crate::value::Value;

/// Parse a string as a Number; partial parses are undefined.
pub fn parse_num(s: &str) -> Value {
    match s.trim().parse::<f64>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::Undefined,
    }
}

/// Parse a string as an Integer; partial parses are undefined.
pub fn parse_int(s: &str) -> Value {
    let t = s.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Value::Integer(i);
    }
    // two's-complement wraparound for large unsigned forms
    match t.parse::<u64>() {
        Ok(u) => Value::Integer(u as i64),
        Err(_) => Value::Undefined,
    }
}

/// String concatenation.
pub fn cat(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => {
            let mut s = String::with_capacity(x.len() + y.len());
            s.push_str(x);
            s.push_str(y);
            Value::string(s)
        }
        _ => Value::Undefined,
    }
}

/// The one-byte substring at an index.
pub fn at(idx: &Value, s: &Value) -> Value {
    match (idx, s) {
        (Value::Integer(i), Value::Str(s)) => {
            if *i >= 0 && (*i as usize) < s.len() {
                let i = *i as usize;
                match s.get(i..i + 1) {
                    Some(sub) => Value::string(sub),
                    None => Value::Undefined,
                }
            } else {
                Value::Undefined
            }
        }
        _ => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_num() {
        assert!(matches!(parse_num("1.5"), Value::Number(n) if n == 1.5));
        assert!(parse_num("1.5x").is_undefined());
    }

    #[test]
    fn test_parse_int() {
        assert!(matches!(parse_int("42"), Value::Integer(42)));
        assert!(matches!(parse_int("-42"), Value::Integer(-42)));
        // wraps like two's complement
        assert!(matches!(
            parse_int("18446744073709551615"),
            Value::Integer(-1)
        ));
        assert!(parse_int("4x").is_undefined());
    }

    #[test]
    fn test_cat() {
        let r = cat(&Value::string("foo"), &Value::string("bar"));
        assert!(matches!(r, Value::Str(s) if &*s == "foobar"));
        assert!(cat(&Value::string("foo"), &Value::Integer(1)).is_undefined());
    }

    #[test]
    fn test_at() {
        let s = Value::string("abc");
        assert!(matches!(at(&Value::Integer(1), &s), Value::Str(c) if &*c == "b"));
        assert!(at(&Value::Integer(3), &s).is_undefined());
        assert!(at(&Value::Integer(-1), &s).is_undefined());
    }
}
