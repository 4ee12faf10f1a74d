//! Capture intrinsics.

use std::rc::Rc;

use crate::ops::OpId;
use crate::value::{CaptureObj, Value};

/// Bind captured values to an operator, producing a capture value.
pub fn make(capfunc: OpId, values: Vec<Value>) -> Value {
    Value::Capture(Rc::new(CaptureObj { capfunc, values }))
}

/// The n'th captured value of a capture.
pub fn cval(c: &Value, idx: &Value) -> Value {
    match (c, idx) {
        (Value::Capture(c), Value::Integer(i)) => {
            if *i >= 0 && (*i as usize) < c.values.len() {
                c.values[*i as usize].clone()
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
    use crate::ops::OperatorTable;

    #[test]
    fn test_cval() {
        let mut table = OperatorTable::new();
        let f = table.add_scope_root("f");
        let c = make(f, vec![Value::Integer(10), Value::string("x")]);
        assert!(matches!(cval(&c, &Value::Integer(0)), Value::Integer(10)));
        assert!(matches!(cval(&c, &Value::Integer(1)), Value::Str(_)));
        assert!(cval(&c, &Value::Integer(2)).is_undefined());
        assert!(cval(&c, &Value::Integer(-1)).is_undefined());
        assert!(cval(&Value::Integer(1), &Value::Integer(0)).is_undefined());
    }
}
