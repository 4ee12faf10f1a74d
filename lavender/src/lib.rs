//! lavender
//!
//! Front-end and value model for the Lavender expression language: a
//! declaration parser that forward-declares functions (fixing, arity,
//! by-name and variadic parameters, captures, locals), a modified
//! shunting-yard expression parser that compiles infix token streams
//! into flat postfix instruction vectors, and the builtin algebra over
//! the tagged dynamic value domain with Integer → BigInt → Number
//! promotion.
//!
//! The crate does not execute anything: an external evaluator applies
//! the compiled instruction vectors through the [`eval::Evaluator`]
//! contract.
//!
//! # Example
//!
//! ```
//! use lavender::session::Session;
//! use lavender_parser::tokenize;
//!
//! let mut session = Session::new();
//! let toks = tokenize("def double(x) => x * 2").unwrap();
//! let (op, _) = session.define_function(&toks).unwrap();
//! assert_eq!(session.table.op(op).name, "repl:double");
//! ```

pub mod builtins;
pub mod command;
pub mod eval;
pub mod expr;
pub mod ops;
#[cfg(feature = "repl")]
pub mod repl;
pub mod session;
pub mod symbols;
pub mod textbuf;
pub mod value;

// Re-exports
pub use eval::Evaluator;
pub use expr::{ExprError, ExprResult};
pub use ops::{Fixing, FuncKind, Namespace, OpId, Operator, OperatorTable};
pub use session::Session;
pub use value::{Instr, Value};

/// Get version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
