//! REPL directives and the import/using registry.
//!
//! Commands are lines beginning with `@`. The registry they maintain
//! feeds simple-name resolution in the expression parser: imported
//! names map directly to fully-qualified names, and `using` scopes are
//! searched in order as a fallback.

use std::collections::HashMap;

use lavender_parser::{SpannedToken, Token};

/// Result of running a REPL directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Terminate the session.
    Quit,
    /// Print a message and continue.
    Message(String),
}

/// The import map and `using` scope list.
#[derive(Debug, Default)]
pub struct Commands {
    imports: HashMap<String, String>,
    using: Vec<String>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fully-qualified name registered for a simple name, if any.
    pub fn qual_name_for(&self, name: &str) -> Option<&str> {
        self.imports.get(name).map(|s| s.as_str())
    }

    /// Scopes named by `@using`, in registration order.
    pub fn using_scopes(&self) -> &[String] {
        &self.using
    }

    /// Register a fully-qualified name under its simple name.
    pub fn add_import(&mut self, qualified: &str) {
        let simple = qualified.rsplit(':').next().unwrap_or(qualified);
        self.imports
            .insert(simple.to_string(), qualified.to_string());
    }

    /// Append a scope to the `using` list.
    pub fn add_using(&mut self, scope: &str) {
        if !self.using.iter().any(|s| s == scope) {
            self.using.push(scope.to_string());
        }
    }

    /// Run the directive named by the tokens after the `@` sigil.
    pub fn run(&mut self, toks: &[SpannedToken<'_>]) -> CommandOutcome {
        let Some(head) = toks.first() else {
            return CommandOutcome::Message("Not a command".to_string());
        };
        if head.token != Token::Ident {
            return CommandOutcome::Message("Not a command".to_string());
        }
        match head.text {
            "quit" => CommandOutcome::Quit,
            "import" => match toks.get(1) {
                Some(t) if matches!(t.token, Token::QualIdent | Token::QualSymbol) => {
                    self.add_import(t.text);
                    CommandOutcome::Message(format!("Imported {}", t.text))
                }
                _ => CommandOutcome::Message(
                    "Usage: @import <scope>:<name>".to_string(),
                ),
            },
            "using" => match toks.get(1) {
                Some(t) if t.token == Token::Ident => {
                    self.add_using(t.text);
                    CommandOutcome::Message(format!("Using scope {}", t.text))
                }
                _ => CommandOutcome::Message("Usage: @using <scope>".to_string()),
            },
            "help" => CommandOutcome::Message(
                "Commands: @quit, @import <scope>:<name>, @using <scope>, @help"
                    .to_string(),
            ),
            _ => CommandOutcome::Message("No command found".to_string()),
        }
    }
}
