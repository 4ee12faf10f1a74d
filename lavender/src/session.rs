//! A parsing session: the operator table, instruction buffer, symbol
//! table, and import registry, threaded through every parse.

use lavender_parser::SpannedToken;

use crate::builtins::{self, Hooks};
use crate::command::Commands;
use crate::expr::parse::ParseEnv;
use crate::expr::ExprResult;
use crate::ops::{OpId, OperatorTable};
use crate::symbols::SymbolTable;
use crate::textbuf::{self, TextBuffer};
use crate::value::Instr;

/// Owns the process-wide parser state. All mutation is serialized
/// through `&mut self`; concurrency is only possible at the granularity
/// of whole sessions.
#[derive(Debug)]
pub struct Session {
    pub table: OperatorTable,
    pub buf: TextBuffer,
    pub symbols: SymbolTable,
    pub commands: Commands,
    pub hooks: Hooks,
    scope: OpId,
}

impl Session {
    /// A session with the `sys` builtins registered.
    pub fn new() -> Self {
        let mut session = Self::bare();
        builtins::register_sys(&mut session.table);
        session.commands.add_using("sys");
        session
    }

    /// A session without any builtin registration (`--bare`).
    pub fn bare() -> Self {
        let mut table = OperatorTable::new();
        let scope = table.add_scope_root("repl");
        Self {
            table,
            buf: TextBuffer::new(),
            symbols: SymbolTable::new(),
            commands: Commands::new(),
            hooks: Hooks::default(),
            scope,
        }
    }

    /// The top-level scope operator.
    pub fn scope(&self) -> OpId {
        self.scope
    }

    /// Define the function in `toks` at the top level. Returns the new
    /// operator and the position of the first unprocessed token.
    pub fn define_function(
        &mut self,
        toks: &[SpannedToken<'_>],
    ) -> ExprResult<(OpId, usize)> {
        let mut env = ParseEnv {
            table: &mut self.table,
            buf: &mut self.buf,
            cmds: &self.commands,
        };
        textbuf::define_function(&mut env, toks, 0, self.scope)
    }

    /// Parse a one-shot expression, staging its instructions in the
    /// buffer until the next [`Session::clear_expr`].
    pub fn stage_expr(
        &mut self,
        toks: &[SpannedToken<'_>],
    ) -> ExprResult<((usize, usize), usize)> {
        let mut env = ParseEnv {
            table: &mut self.table,
            buf: &mut self.buf,
            cmds: &self.commands,
        };
        textbuf::stage_expr(&mut env, toks, 0, self.scope)
    }

    /// Drop the staged one-shot expression.
    pub fn clear_expr(&mut self) {
        self.buf.clear_expr();
    }

    /// Render one instruction for the compiled-form listing.
    pub fn render_instr(&self, instr: &Instr) -> String {
        match instr {
            Instr::Undefined => "undefined".to_string(),
            Instr::Num(n) => format!("num {}", n),
            Instr::Int(i) => format!("int {}", i),
            Instr::Str(s) => format!("str {:?}", s),
            Instr::Param(i) => format!("param {}", i),
            Instr::PutParam(i) => format!("put-param {}", i),
            Instr::Function(id) => format!("function {}", self.table.op(*id).name),
            Instr::FunctionVal(id) => {
                format!("function-val {}", self.table.op(*id).name)
            }
            Instr::FuncCap => "func-cap".to_string(),
            Instr::FuncCall(n) => format!("func-call {}", n),
            Instr::FuncCall2(n) => format!("func-call2 {}", n),
            Instr::MakeVect(n) => format!("make-vect {}", n),
            Instr::Return => "return".to_string(),
            Instr::Beqz(d) => format!("beqz {:+}", d),
            Instr::Addr(a) => format!("addr {}", a),
            Instr::Literal(c) => format!("literal {:?}", c),
            Instr::EmptyArgs => "empty-args".to_string(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Namespace;
    use lavender_parser::tokenize;

    #[test]
    fn test_new_session_registers_sys() {
        let session = Session::new();
        assert!(session.table.get("sys:+", Namespace::Infix).is_some());
        assert_eq!(session.commands.using_scopes(), &["sys".to_string()]);
    }

    #[test]
    fn test_bare_session_is_empty() {
        let session = Session::bare();
        assert!(session.table.get("sys:+", Namespace::Infix).is_none());
    }

    #[test]
    fn test_define_and_stage() {
        let mut session = Session::new();
        let toks = tokenize("def f(x) => x + 1").unwrap();
        let (id, next) = session.define_function(&toks).unwrap();
        assert_eq!(session.table.op(id).name, "repl:f");
        assert_eq!(next, toks.len());

        let toks = tokenize("f(2)").unwrap();
        let ((start, end), _) = session.stage_expr(&toks).unwrap();
        assert!(end > start);
        let before = start;
        session.clear_expr();
        assert_eq!(session.buf.len(), before);
    }
}
