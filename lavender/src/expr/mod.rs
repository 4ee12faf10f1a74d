//! Declaration and expression parsing.
//!
//! `declare` turns a `def` header into a forward-declared operator;
//! `parse` turns a body token stream into a postfix instruction vector.

pub mod declare;
pub mod parse;

use lavender_parser::SpannedToken;
use thiserror::Error;

/// Parse error type. Every variant carries the position of the
/// offending token in the input token vector, for caller diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("expr does not define a function")]
    NotAFunction { at: usize },
    #[error("reached end of input while parsing")]
    UntermExpr { at: usize },
    #[error("expected an argument list")]
    ExpectedArgs { at: usize },
    #[error("malformed argument list")]
    BadArgs { at: usize },
    #[error("missing function body")]
    MissingBody { at: usize },
    #[error("duplicate function definition")]
    DupDecl { at: usize },
    #[error("function name not found")]
    NameNotFound { at: usize },
    #[error("expected operator")]
    ExpectOperator { at: usize },
    #[error("expected operand")]
    ExpectOperand { at: usize },
    #[error("encountered unexpected token")]
    UnexpectedToken { at: usize },
    #[error("unbalanced parens or brackets")]
    UnbalancedGroup { at: usize },
    #[error("wrong number of parameters to function")]
    BadArity { at: usize },
    #[error("function arity incompatible with fixing")]
    BadFixing { at: usize },
    #[error("malformed function local list")]
    BadLocals { at: usize },
    #[error("identifier is reserved")]
    ReservedId { at: usize },
    #[error("too many function parameters")]
    TooManyParams { at: usize },
    #[error("function value aliases a zero-arity function")]
    ZeroArityAlias { at: usize },
}

impl ExprError {
    /// Position of the offending token.
    pub fn at(&self) -> usize {
        match self {
            ExprError::NotAFunction { at }
            | ExprError::UntermExpr { at }
            | ExprError::ExpectedArgs { at }
            | ExprError::BadArgs { at }
            | ExprError::MissingBody { at }
            | ExprError::DupDecl { at }
            | ExprError::NameNotFound { at }
            | ExprError::ExpectOperator { at }
            | ExprError::ExpectOperand { at }
            | ExprError::UnexpectedToken { at }
            | ExprError::UnbalancedGroup { at }
            | ExprError::BadArity { at }
            | ExprError::BadFixing { at }
            | ExprError::BadLocals { at }
            | ExprError::ReservedId { at }
            | ExprError::TooManyParams { at }
            | ExprError::ZeroArityAlias { at } => *at,
        }
    }

    /// The offending lexeme, if the position still points into `toks`.
    pub fn lexeme<'s>(&self, toks: &[SpannedToken<'s>]) -> Option<&'s str> {
        toks.get(self.at()).map(|t| t.text)
    }
}

/// Result type for parsing operations
pub type ExprResult<T> = Result<T, ExprError>;

/// Identifiers that may not name functions or parameters.
pub fn is_reserved(id: &str) -> bool {
    matches!(id, "def" | "let" | "do" | "=>" | "<-" | "native" | "_" | ":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved() {
        assert!(is_reserved("def"));
        assert!(is_reserved("=>"));
        assert!(is_reserved("_"));
        assert!(is_reserved(":"));
        assert!(!is_reserved("defn"));
        assert!(!is_reserved("lets"));
    }

    #[test]
    fn test_error_position() {
        let err = ExprError::BadArity { at: 7 };
        assert_eq!(err.at(), 7);
        assert_eq!(
            err.to_string(),
            "wrong number of parameters to function"
        );
    }
}
