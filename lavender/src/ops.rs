//! Operator descriptors and the global operator table.
//!
//! Operators live in an arena owned by [`OperatorTable`] and are
//! addressed by copyable [`OpId`] handles. Handles stay valid for the
//! life of the table (the REPL's selective removal only unmaps a name;
//! the descriptor itself is never reclaimed), so an `OpId` plays the
//! role the raw descriptor pointer played in older designs: non-owning,
//! stable, and totally ordered within a process.

use std::collections::HashMap;

use crate::builtins::BuiltinFn;

/// Hard cap on declared parameters (formal + captured + local).
pub const MAX_PARAMS: usize = 256;

/// A function's syntactic position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixing {
    Prefix,
    LeftInfix,
    RightInfix,
}

/// The two name resolution namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Prefix = 0,
    Infix = 1,
}

/// Stable handle to an operator descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(u32);

impl OpId {
    /// The handle's raw index, used where a stable per-process integer
    /// identity is needed (hashing, ordering of function values).
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One declared parameter: formal, captured, or local.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    /// Arguments for this parameter are passed by name (lazily).
    pub by_name: bool,
    /// Position of the first token of the local's parenthesized
    /// initializer. Set exactly for local parameters; only dereferenced
    /// while the declaring token vector is still alive.
    pub initializer: Option<usize>,
}

/// What an operator resolves to when applied.
#[derive(Clone)]
pub enum FuncKind {
    /// Declared but not yet defined; the body parse flips this to
    /// `Function` by installing the text offset.
    ForwardDecl,
    /// User-defined function starting at an instruction buffer offset.
    Function { text_offset: usize },
    /// Built-in operator backed by a native function.
    Builtin(BuiltinFn),
}

impl std::fmt::Debug for FuncKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuncKind::ForwardDecl => write!(f, "ForwardDecl"),
            FuncKind::Function { text_offset } => {
                write!(f, "Function {{ text_offset: {} }}", text_offset)
            }
            FuncKind::Builtin(_) => write!(f, "Builtin(..)"),
        }
    }
}

/// A named Lavender function.
#[derive(Debug, Clone)]
pub struct Operator {
    /// Fully-qualified, colon-separated name. Colons inside the simple
    /// name were rewritten to `#` at declaration time.
    pub name: String,
    pub kind: FuncKind,
    /// Declared parameter count, including captured parameters.
    pub arity: usize,
    /// Leading parameters captured from the enclosing function.
    pub capture_count: usize,
    /// Function-local bindings introduced by `let`.
    pub locals: usize,
    pub fixing: Fixing,
    /// The last formal parameter absorbs excess arguments as a vector.
    pub varargs: bool,
    /// Formal, captured, then local parameters, in declaration order.
    /// Length is `arity + locals`.
    pub params: Vec<Param>,
    /// Enclosing function, `None` for a root scope.
    pub enclosing: Option<OpId>,
}

impl Operator {
    /// The segment after the last `:`.
    pub fn simple_name(&self) -> &str {
        match self.name.rfind(':') {
            Some(i) => &self.name[i + 1..],
            None => &self.name,
        }
    }

    /// Arity seen by callers: declared arity minus captured parameters.
    pub fn callable_arity(&self) -> usize {
        self.arity - self.capture_count
    }

    /// Whether parameter `i` is passed by name.
    pub fn by_name(&self, i: usize) -> bool {
        self.params.get(i).map(|p| p.by_name).unwrap_or(false)
    }

    /// Whether any non-captured parameter is passed by name.
    pub fn has_by_name(&self) -> bool {
        self.params[..self.arity - self.capture_count]
            .iter()
            .any(|p| p.by_name)
    }

    /// Anonymous operators have names ending in `:` and live outside
    /// the namespaced table.
    pub fn is_anonymous(&self) -> bool {
        self.name.ends_with(':')
    }
}

/// The process-wide operator registry: one map per namespace plus a
/// side list for anonymous operators.
#[derive(Debug, Default)]
pub struct OperatorTable {
    ops: Vec<Operator>,
    namespaces: [HashMap<String, OpId>; 2],
    anonymous: Vec<OpId>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(&self, id: OpId) -> &Operator {
        &self.ops[id.index()]
    }

    pub fn op_mut(&mut self, id: OpId) -> &mut Operator {
        &mut self.ops[id.index()]
    }

    /// Exact lookup by fully-qualified name.
    pub fn get(&self, name: &str, ns: Namespace) -> Option<OpId> {
        self.namespaces[ns as usize].get(name).copied()
    }

    /// Lookup of `scope ":" name`.
    pub fn get_scoped(&self, scope: &str, name: &str, ns: Namespace) -> Option<OpId> {
        self.get(&format!("{}:{}", scope, name), ns)
    }

    /// Insert an operator. Anonymous operators go to the side list and
    /// always succeed; named duplicates return `None`.
    pub fn add(&mut self, op: Operator, ns: Namespace) -> Option<OpId> {
        let id = OpId(self.ops.len() as u32);
        if op.is_anonymous() {
            self.ops.push(op);
            self.anonymous.push(id);
            return Some(id);
        }
        if self.namespaces[ns as usize].contains_key(&op.name) {
            return None;
        }
        self.namespaces[ns as usize].insert(op.name.clone(), id);
        self.ops.push(op);
        Some(id)
    }

    /// Register a scope root (e.g. the REPL scope). The descriptor is
    /// addressable by handle only, never by name lookup.
    pub fn add_scope_root(&mut self, name: &str) -> OpId {
        let id = OpId(self.ops.len() as u32);
        self.ops.push(Operator {
            name: name.to_string(),
            kind: FuncKind::ForwardDecl,
            arity: 0,
            capture_count: 0,
            locals: 0,
            fixing: Fixing::Prefix,
            varargs: false,
            params: Vec::new(),
            enclosing: None,
        });
        id
    }

    /// Unmap an operator name. The descriptor stays in the arena so
    /// outstanding handles and emitted instructions remain valid.
    pub fn remove(&mut self, name: &str, ns: Namespace) -> bool {
        self.namespaces[ns as usize].remove(name).is_some()
    }

    /// All anonymous operators, in creation order.
    pub fn anonymous(&self) -> &[OpId] {
        &self.anonymous
    }

    /// Number of named operators in the given namespace.
    pub fn len(&self, ns: Namespace) -> usize {
        self.namespaces[ns as usize].len()
    }

    pub fn is_empty(&self, ns: Namespace) -> bool {
        self.namespaces[ns as usize].is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_op(name: &str, arity: usize, fixing: Fixing) -> Operator {
        Operator {
            name: name.to_string(),
            kind: FuncKind::ForwardDecl,
            arity,
            capture_count: 0,
            locals: 0,
            fixing,
            varargs: false,
            params: Vec::new(),
            enclosing: None,
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut table = OperatorTable::new();
        let id = table
            .add(plain_op("sys:map", 2, Fixing::Prefix), Namespace::Prefix)
            .unwrap();
        assert_eq!(table.get("sys:map", Namespace::Prefix), Some(id));
        assert_eq!(table.get("sys:map", Namespace::Infix), None);
        assert_eq!(
            table.get_scoped("sys", "map", Namespace::Prefix),
            Some(id)
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = OperatorTable::new();
        assert!(table
            .add(plain_op("sys:f", 1, Fixing::Prefix), Namespace::Prefix)
            .is_some());
        assert!(table
            .add(plain_op("sys:f", 2, Fixing::Prefix), Namespace::Prefix)
            .is_none());
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let mut table = OperatorTable::new();
        assert!(table
            .add(plain_op("sys:+", 2, Fixing::Prefix), Namespace::Prefix)
            .is_some());
        assert!(table
            .add(plain_op("sys:+", 2, Fixing::LeftInfix), Namespace::Infix)
            .is_some());
    }

    #[test]
    fn test_anonymous_side_list() {
        let mut table = OperatorTable::new();
        let id = table
            .add(plain_op("repl:f:", 1, Fixing::Prefix), Namespace::Prefix)
            .unwrap();
        assert_eq!(table.anonymous(), &[id]);
        // not reachable by name
        assert_eq!(table.get("repl:f:", Namespace::Prefix), None);
    }

    #[test]
    fn test_remove_keeps_descriptor() {
        let mut table = OperatorTable::new();
        let id = table
            .add(plain_op("sys:f", 1, Fixing::Prefix), Namespace::Prefix)
            .unwrap();
        assert!(table.remove("sys:f", Namespace::Prefix));
        assert!(!table.remove("sys:f", Namespace::Prefix));
        // the handle still resolves
        assert_eq!(table.op(id).name, "sys:f");
    }

    #[test]
    fn test_simple_name() {
        let op = plain_op("sys:nested:f", 0, Fixing::Prefix);
        assert_eq!(op.simple_name(), "f");
    }
}
