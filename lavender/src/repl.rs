//! Interactive read-parse-print loop.
//!
//! The front-end has no evaluator, so the REPL prints the compiled
//! postfix form of each input: function definitions echo their
//! fully-qualified name, expressions list their instructions and are
//! dropped from the buffer afterwards.

use lavender_parser::{tokenize, SpannedToken, TokenError};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::debug;

use crate::command::CommandOutcome;
use crate::expr::ExprError;
use crate::session::Session;

const PROMPT: &str = "> ";

/// REPL session state: the parse session plus the line editor.
pub struct ReplSession {
    session: Session,
    editor: Editor<(), DefaultHistory>,
}

impl std::fmt::Debug for ReplSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplSession").finish_non_exhaustive()
    }
}

impl ReplSession {
    pub fn new(session: Session) -> rustyline::Result<Self> {
        Ok(Self {
            session,
            editor: Editor::new()?,
        })
    }

    /// Run until `@quit` or end of input.
    pub fn run(&mut self) {
        println!("Lavender expression front-end");
        println!("Enter function definitions or expressions; @help lists commands");
        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(&line);
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("Input error: {}", e);
                    break;
                }
            }
        }
    }

    /// Process one line of input. Returns false when the session ends.
    pub fn handle_line(&mut self, line: &str) -> bool {
        let toks = match tokenize(line) {
            Ok(toks) => toks,
            Err(e) => {
                report_token_error(line, &e);
                return true;
            }
        };
        if toks.is_empty() {
            return true;
        }
        // command lines start with the @ sigil
        if toks[0].is_literal('@') {
            match self.session.commands.run(&toks[1..]) {
                CommandOutcome::Quit => return false,
                CommandOutcome::Message(msg) => {
                    println!("{}", msg);
                    return true;
                }
            }
        }
        if starts_definition(&toks) {
            match self.session.define_function(&toks) {
                Ok((id, _)) => println!("{}", self.session.table.op(id).name),
                Err(e) => report_expr_error(&toks, &e),
            }
        } else {
            match self.session.stage_expr(&toks) {
                Ok(((start, end), _)) => {
                    debug!(start, end, "staged expression");
                    for instr in self.session.buf.slice(start, end) {
                        println!("  {}", self.session.render_instr(instr));
                    }
                    self.session.clear_expr();
                }
                Err(e) => report_expr_error(&toks, &e),
            }
        }
        true
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

fn starts_definition(toks: &[SpannedToken<'_>]) -> bool {
    match toks.first() {
        Some(t) if t.is_text("def") => true,
        Some(t) if t.is_literal('(') => {
            matches!(toks.get(1), Some(t) if t.is_text("def"))
        }
        _ => false,
    }
}

fn report_token_error(line: &str, err: &TokenError) {
    eprintln!("Error parsing tokens: {}", err);
    let context = err.format_with_context(line);
    if !context.is_empty() {
        eprintln!("{}", context);
    }
}

fn report_expr_error(toks: &[SpannedToken<'_>], err: &ExprError) {
    match err.lexeme(toks) {
        Some(lexeme) => eprintln!("Error: {}: '{}'", err, lexeme),
        None => eprintln!("Error: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavender_parser::tokenize;

    #[test]
    fn test_starts_definition() {
        let toks = tokenize("def f(x) => x").unwrap();
        assert!(starts_definition(&toks));
        let toks = tokenize("(def f(x) => x").unwrap();
        assert!(starts_definition(&toks));
        let toks = tokenize("1 + 2").unwrap();
        assert!(!starts_definition(&toks));
    }
}
