//! Map intrinsics. Entries carry the key's hash, computed once at
//! construction and never re-derived.

use std::rc::Rc;

use super::{equal, hash};
use crate::value::{MapEntry, Value};

/// Build a map entry, canonicalizing the stored hash.
pub fn entry(key: Value, value: Value) -> MapEntry {
    MapEntry {
        hash: hash(&key),
        key,
        value,
    }
}

/// Build a map value from key/value pairs.
pub fn make(pairs: Vec<(Value, Value)>) -> Value {
    Value::Map(Rc::new(
        pairs.into_iter().map(|(k, v)| entry(k, v)).collect(),
    ))
}

/// Look up a key; the stored hash filters before the equality walk.
pub fn at(key: &Value, m: &Value) -> Value {
    match m {
        Value::Map(entries) => {
            let h = hash(key);
            for e in entries.iter() {
                if e.hash == h && equal(&e.key, key) {
                    return e.value.clone();
                }
            }
            Value::Undefined
        }
        _ => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let m = make(vec![
            (Value::string("a"), Value::Integer(1)),
            (Value::Integer(2), Value::string("two")),
        ]);
        assert!(matches!(at(&Value::string("a"), &m), Value::Integer(1)));
        assert!(matches!(at(&Value::Integer(2), &m), Value::Str(_)));
        assert!(at(&Value::string("b"), &m).is_undefined());
    }

    #[test]
    fn test_entry_hash_is_stored() {
        let e = entry(Value::string("k"), Value::Undefined);
        assert_eq!(e.hash, hash(&Value::string("k")));
    }
}
