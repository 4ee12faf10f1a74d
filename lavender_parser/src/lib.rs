//! lavender_parser
//!
//! Tokenizer for the Lavender expression language. Produces the
//! forward-only classified token stream consumed by the declaration and
//! expression parsers in the `lavender` crate.
//!
//! # Example
//!
//! ```
//! use lavender_parser::{tokenize, Token};
//!
//! let tokens = tokenize("def f(x) => x + 1").unwrap();
//! assert_eq!(tokens[0].token, Token::Ident);
//! assert!(tokens[0].is_text("def"));
//! ```

pub mod error;
pub mod lexer;
pub mod span;
pub mod token;

// Re-exports
pub use error::{TokenError, TokenResult};
pub use lexer::{tokenize, Lexer, SpannedToken};
pub use span::{SourceMap, Span};
pub use token::Token;

/// Get version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
