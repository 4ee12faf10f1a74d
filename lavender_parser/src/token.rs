//! Token definitions for the Lavender lexer
//!
//! The raw logos-generated lexer is an implementation detail of
//! [`crate::lexer`]; downstream parsers only see [`Token`].

use logos::Logos;

/// Classified Lavender lexemes, as consumed by the declaration and
/// expression parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Simple alphanumeric name
    Ident,
    /// Qualified alphanumeric name (`scope:name`)
    QualIdent,
    /// Simple symbolic name
    Symbol,
    /// Qualified symbolic name (`scope:++`)
    QualSymbol,
    /// Symbolic name with an explicit fixing prefix (`i_+`)
    FuncSymbol,
    /// Function value (`\name` or `\name\`)
    FuncVal,
    /// Qualified function value (`\scope:name`)
    QualFuncVal,
    /// Floating-point literal
    Number,
    /// Integer literal (digits only)
    Integer,
    /// String literal, escapes validated but not interpreted
    Str,
    /// `...` varargs marker
    Ellipsis,
    /// `()` empty argument list
    EmptyArgs,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// Any other single character (`@` introduces REPL commands; the
    /// parsers reject the rest)
    Other,
}

impl Token {
    /// Whether this token is single-character punctuation.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Token::LParen
                | Token::RParen
                | Token::LBracket
                | Token::RBracket
                | Token::LBrace
                | Token::RBrace
                | Token::Comma
                | Token::Semicolon
                | Token::Other
        )
    }
}

/// Raw lexer tokens. Malformed lexemes get dedicated variants so the
/// wrapper can report a precise error with the full bad lexeme's span.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"'[^\n]*")]
pub(crate) enum RawToken {
    // `u_`, `i_`, `r_` followed by symbol characters carries an explicit
    // fixing. Wins ties against QualSymbol (`u_:+` is a func-symbol).
    #[regex(r"[uir]_[~!%^&*+=|<>/?:-]+", priority = 10)]
    FuncSymbol,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*:[A-Za-z_][A-Za-z0-9_]*")]
    QualIdent,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*:[~!%^&*+=|<>/?:-]+")]
    QualSymbol,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[~!%^&*+=|<>/?:-]+")]
    Symbol,

    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Number,

    #[regex(r"\\[~!%^&*+=|<>/?:-]+\\?")]
    #[regex(r"\\[A-Za-z_][A-Za-z0-9_]*\\?")]
    FuncVal,
    #[regex(r"\\[A-Za-z_][A-Za-z0-9_]*:([A-Za-z_][A-Za-z0-9_]*|[~!%^&*+=|<>/?:-]+)\\?")]
    QualFuncVal,

    #[token("...")]
    Ellipsis,
    #[token("()")]
    EmptyArgs,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    // String content is scanned by the lexer wrapper, which needs to
    // validate escapes and find the closing quote.
    #[token("\"")]
    DoubleQuote,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*:")]
    #[regex(r"\\[A-Za-z_][A-Za-z0-9_]*:")]
    BadQual,
    #[regex(r"[0-9]+\.")]
    #[token(".")]
    BadNumber,
    #[regex(r"[0-9]+(\.[0-9]+)?[eE][+-]?")]
    #[regex(r"\.[0-9]+[eE][+-]?")]
    BadExponent,
    #[token("\\")]
    BadFuncVal,

    // Catch-all for stray punctuation; the parsers decide what to do
    // with it (`@` starts a REPL command).
    #[regex(r".", priority = 1)]
    Other,
}
