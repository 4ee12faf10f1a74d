//! Lexer for Lavender source code
//!
//! Wraps the logos-generated lexer with string scanning, escape
//! validation, and error classification.

use logos::Logos;

use crate::error::{TokenError, TokenResult};
use crate::span::{SourceMap, Span};
use crate::token::{RawToken, Token};

/// A token with its span and source text
#[derive(Debug, Clone, Copy)]
pub struct SpannedToken<'a> {
    pub token: Token,
    pub span: Span,
    pub text: &'a str,
}

impl<'a> SpannedToken<'a> {
    pub fn new(token: Token, span: Span, text: &'a str) -> Self {
        Self { token, span, text }
    }

    /// Whether this token is the literal character `c`.
    pub fn is_literal(&self, c: char) -> bool {
        self.token.is_literal() && self.text.starts_with(c)
    }

    /// Whether this token's text equals `s` exactly.
    pub fn is_text(&self, s: &str) -> bool {
        self.text == s
    }
}

/// Lavender lexer
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, RawToken>,
    source_map: SourceMap,
    /// Offset from original source (used after restarting the inner lexer)
    offset: usize,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer").field("source", &self.source).finish()
    }
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str) -> Self {
        let source_map = SourceMap::new(source);
        Self {
            source,
            inner: RawToken::lexer(source),
            source_map,
            offset: 0,
        }
    }

    /// Get the source code
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Get the source map
    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    fn make_span(&self, start: usize, end: usize) -> Span {
        self.source_map.span(start, end)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Option<TokenResult<SpannedToken<'a>>> {
        let result = self.inner.next()?;
        let span = self.inner.span();
        let start = self.offset + span.start;
        let end = self.offset + span.end;

        let raw = match result {
            Ok(raw) => raw,
            Err(()) => {
                return Some(Err(TokenError::Unrecognized {
                    span: self.make_span(start, end),
                }));
            }
        };

        let token = match raw {
            RawToken::Ident => Token::Ident,
            RawToken::QualIdent => Token::QualIdent,
            RawToken::Symbol => Token::Symbol,
            RawToken::QualSymbol => Token::QualSymbol,
            RawToken::FuncSymbol => Token::FuncSymbol,
            RawToken::FuncVal => Token::FuncVal,
            RawToken::QualFuncVal => Token::QualFuncVal,
            RawToken::Number => Token::Number,
            RawToken::Integer => Token::Integer,
            RawToken::Ellipsis => Token::Ellipsis,
            RawToken::EmptyArgs => Token::EmptyArgs,
            RawToken::LParen => Token::LParen,
            RawToken::RParen => Token::RParen,
            RawToken::LBracket => Token::LBracket,
            RawToken::RBracket => Token::RBracket,
            RawToken::LBrace => Token::LBrace,
            RawToken::RBrace => Token::RBrace,
            RawToken::Comma => Token::Comma,
            RawToken::Semicolon => Token::Semicolon,
            RawToken::Other => Token::Other,

            RawToken::DoubleQuote => {
                // Scan string content to the closing quote, validating
                // escape sequences along the way.
                return Some(match self.scan_string_to_close(end) {
                    Ok(string_end) => {
                        self.restart_from(string_end);
                        let span = self.make_span(start, string_end);
                        let text = &self.source[start..string_end];
                        Ok(SpannedToken::new(Token::Str, span, text))
                    }
                    Err(e) => {
                        self.restart_from(self.source.len());
                        Err(e)
                    }
                });
            }

            RawToken::BadQual => {
                return Some(Err(TokenError::BadQualName {
                    span: self.make_span(start, end),
                }));
            }
            RawToken::BadNumber => {
                return Some(Err(TokenError::BadNumber {
                    span: self.make_span(start, end),
                }));
            }
            RawToken::BadExponent => {
                return Some(Err(TokenError::BadExponent {
                    span: self.make_span(start, end),
                }));
            }
            RawToken::BadFuncVal => {
                return Some(Err(TokenError::BadFuncVal {
                    span: self.make_span(start, end),
                }));
            }
        };

        let span = self.make_span(start, end);
        let text = &self.source[start..end];
        Some(Ok(SpannedToken::new(token, span, text)))
    }

    /// Scan string content to find the closing quote.
    /// Uses memchr to jump between escape and quote candidates.
    fn scan_string_to_close(&self, start: usize) -> TokenResult<usize> {
        let bytes = self.source.as_bytes();
        let mut pos = start;

        while pos < bytes.len() {
            match memchr::memchr2(b'\\', b'"', &bytes[pos..]) {
                None => break,
                Some(offset) => {
                    pos += offset;
                    if bytes[pos] == b'\\' {
                        if pos + 1 >= bytes.len() {
                            break;
                        }
                        match bytes[pos + 1] {
                            b'n' | b't' | b'\'' | b'"' | b'\\' => pos += 2,
                            _ => {
                                return Err(TokenError::BadStringEscape {
                                    span: self.make_span(pos, pos + 2),
                                });
                            }
                        }
                        continue;
                    }
                    return Ok(pos + 1);
                }
            }
        }

        Err(TokenError::UnterminatedString {
            span: self.make_span(start - 1, pos),
        })
    }

    /// Restart the lexer from a new position.
    /// Uses bump() to advance within the current logos lexer when possible.
    fn restart_from(&mut self, pos: usize) {
        let logos_abs_pos = self.offset + self.inner.span().end;
        if pos > logos_abs_pos && pos <= self.source.len() {
            self.inner.bump(pos - logos_abs_pos);
        } else if pos < self.source.len() {
            self.inner = RawToken::lexer(&self.source[pos..]);
            self.offset = pos;
        } else {
            self.inner = RawToken::lexer("");
            self.offset = pos;
        }
    }

    /// Collect all tokens, stopping at the first error
    pub fn collect_all(mut self) -> TokenResult<Vec<SpannedToken<'a>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token?);
        }
        Ok(tokens)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = TokenResult<SpannedToken<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize source code into a vector of spanned tokens.
/// Returns the first error encountered, with the input position inside it.
pub fn tokenize(source: &str) -> TokenResult<Vec<SpannedToken<'_>>> {
    Lexer::new(source).collect_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("def f(x) => x + 1"),
            vec![
                Token::Ident,
                Token::Ident,
                Token::LParen,
                Token::Ident,
                Token::RParen,
                Token::Symbol,
                Token::Ident,
                Token::Symbol,
                Token::Integer,
            ]
        );
    }

    #[test]
    fn test_fixing_prefixes() {
        assert_eq!(kinds("i_+"), vec![Token::FuncSymbol]);
        assert_eq!(kinds("r_**"), vec![Token::FuncSymbol]);
        assert_eq!(kinds("u_-"), vec![Token::FuncSymbol]);
        // no symbol after the underscore: plain identifier
        assert_eq!(kinds("i_foo"), vec![Token::Ident]);
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(kinds("sys:map"), vec![Token::QualIdent]);
        assert_eq!(kinds("sys:++"), vec![Token::QualSymbol]);
        assert!(matches!(
            tokenize("sys: map"),
            Err(TokenError::BadQualName { .. })
        ));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42"), vec![Token::Integer]);
        assert_eq!(kinds("4.25"), vec![Token::Number]);
        assert_eq!(kinds(".5"), vec![Token::Number]);
        assert_eq!(kinds("1e10 1.5e-3"), vec![Token::Number, Token::Number]);
        assert!(matches!(tokenize("1."), Err(TokenError::BadNumber { .. })));
        assert!(matches!(
            tokenize("1e+"),
            Err(TokenError::BadExponent { .. })
        ));
        assert!(matches!(tokenize("3e"), Err(TokenError::BadExponent { .. })));
    }

    #[test]
    fn test_func_vals() {
        assert_eq!(kinds(r"\map"), vec![Token::FuncVal]);
        assert_eq!(kinds(r"\+\"), vec![Token::FuncVal]);
        assert_eq!(kinds(r"\sys:map"), vec![Token::QualFuncVal]);
        assert_eq!(kinds(r"\sys:map\"), vec![Token::QualFuncVal]);
        assert!(matches!(
            tokenize(r"\ "),
            Err(TokenError::BadFuncVal { .. })
        ));
    }

    #[test]
    fn test_strings() {
        let toks = tokenize(r#""hello \n world""#).unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].token, Token::Str);
        assert_eq!(toks[0].text, r#""hello \n world""#);

        assert!(matches!(
            tokenize(r#""no end"#),
            Err(TokenError::UnterminatedString { .. })
        ));
        assert!(matches!(
            tokenize(r#""bad \q escape""#),
            Err(TokenError::BadStringEscape { .. })
        ));
    }

    #[test]
    fn test_empty_args_and_ellipsis() {
        assert_eq!(kinds("f()"), vec![Token::Ident, Token::EmptyArgs]);
        assert_eq!(
            kinds("f( )"),
            vec![Token::Ident, Token::LParen, Token::RParen]
        );
        assert_eq!(kinds("...rest"), vec![Token::Ellipsis, Token::Ident]);
    }

    #[test]
    fn test_arrow_is_a_symbol() {
        // `=>` and `<-` lex as plain symbols; the parsers compare text
        let toks = tokenize("=> <-").unwrap();
        assert_eq!(toks[0].token, Token::Symbol);
        assert!(toks[0].is_text("=>"));
        assert_eq!(toks[1].token, Token::Symbol);
        assert!(toks[1].is_text("<-"));
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("1 'this is a comment\n2"),
            vec![Token::Integer, Token::Integer]
        );
    }

    #[test]
    fn test_command_sigil() {
        let toks = tokenize("@quit").unwrap();
        assert_eq!(toks[0].token, Token::Other);
        assert!(toks[0].is_text("@"));
        assert_eq!(toks[1].token, Token::Ident);
    }

    #[test]
    fn test_spans() {
        let toks = tokenize("foo + bar").unwrap();
        assert_eq!(toks[0].span.start, 0);
        assert_eq!(toks[0].span.end, 3);
        assert_eq!(toks[1].span.start, 4);
        assert_eq!(toks[2].text, "bar");
        assert_eq!(toks[2].span.column, 7);
    }

    #[test]
    fn test_tokens_after_string() {
        let toks = tokenize(r#""s" + 1"#).unwrap();
        assert_eq!(
            toks.iter().map(|t| t.token).collect::<Vec<_>>(),
            vec![Token::Str, Token::Symbol, Token::Integer]
        );
    }
}
