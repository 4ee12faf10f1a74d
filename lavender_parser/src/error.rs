//! Tokenizer error types

use crate::span::Span;
use thiserror::Error;

/// Tokenizer error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// A namespace separator with no name after it
    #[error("namespace without name at {span:?}")]
    BadQualName { span: Span },

    /// A number ending in a decimal point
    #[error("number ends in '.' at {span:?}")]
    BadNumber { span: Span },

    /// An exponent marker with no digits
    #[error("number has missing exponent at {span:?}")]
    BadExponent { span: Span },

    /// A backslash with no function name
    #[error("missing function value at {span:?}")]
    BadFuncVal { span: Span },

    /// A string literal with no closing quote
    #[error("unterminated string starting at {span:?}")]
    UnterminatedString { span: Span },

    /// An escape sequence outside of `\n \t \' \" \\`
    #[error("unknown string escape sequence at {span:?}")]
    BadStringEscape { span: Span },

    /// A byte sequence no token rule matches
    #[error("unrecognized token at {span:?}")]
    Unrecognized { span: Span },
}

impl TokenError {
    /// Get the span of the error
    pub fn span(&self) -> Span {
        match self {
            TokenError::BadQualName { span }
            | TokenError::BadNumber { span }
            | TokenError::BadExponent { span }
            | TokenError::BadFuncVal { span }
            | TokenError::UnterminatedString { span }
            | TokenError::BadStringEscape { span }
            | TokenError::Unrecognized { span } => *span,
        }
    }

    /// Format error with source context
    ///
    /// Returns a string showing the source line with an error marker.
    pub fn format_with_context(&self, source: &str) -> String {
        let span = self.span();
        let lines: Vec<&str> = source.lines().collect();
        let line_idx = span.line.saturating_sub(1);
        if line_idx >= lines.len() {
            return String::new();
        }
        let line = lines[line_idx];
        let col = span.column.saturating_sub(1);
        let len = span.len().max(1);

        let spaces = " ".repeat(col);
        let marker = "^".repeat(len.min(line.len().saturating_sub(col)).max(1));
        format!(
            "  {} | {}\n  {} | {}{}",
            span.line,
            line,
            " ".repeat(span.line.to_string().len()),
            spaces,
            marker
        )
    }
}

/// Result type for tokenizing operations
pub type TokenResult<T> = Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_span() {
        let span = Span::new(2, 4, 1, 3);
        let err = TokenError::BadNumber { span };
        assert_eq!(err.span(), span);
        assert!(err.to_string().contains("'.'"));
    }

    #[test]
    fn test_format_with_context() {
        let source = "def f(x) => 1.";
        let span = Span::new(12, 14, 1, 13);
        let err = TokenError::BadNumber { span };
        let context = err.format_with_context(source);
        assert!(context.contains("def f(x)"));
        assert!(context.contains("^"));
    }
}
