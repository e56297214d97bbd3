//! Session driver: scan → parse → resolve → interpret.
//!
//! A [`Lox`] keeps the interpreter (and so the globals) alive between calls
//! to [`Lox::run`], which is what the interactive prompt needs. Each phase
//! runs only if the previous one succeeded; nothing executes for an input
//! that fails to resolve.

use std::io::{Stdout, Write};

use log::{debug, info};

use crate::ast::ExprIdGen;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner;

pub struct Lox<W: Write = Stdout> {
    interpreter: Interpreter<W>,
    ids: ExprIdGen,
}

impl Lox<Stdout> {
    pub fn new() -> Self {
        Lox {
            interpreter: Interpreter::new(),
            ids: ExprIdGen::default(),
        }
    }
}

impl Default for Lox<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Lox<W> {
    /// Session whose `print` output goes to `out`.
    pub fn with_output(out: W) -> Self {
        Lox {
            interpreter: Interpreter::with_output(out),
            ids: ExprIdGen::default(),
        }
    }

    pub fn output(&self) -> &W {
        self.interpreter.output()
    }

    /// Runs one source unit (a file, or one line of the prompt).
    pub fn run(&mut self, source: &str) -> Result<()> {
        info!("Running {} bytes of source", source.len());

        let tokens = scanner::scan(source)?;
        debug!("Scan phase produced {} tokens", tokens.len());

        let statements = Parser::new(&tokens, &mut self.ids).parse()?;
        debug!("Parse phase produced {} statements", statements.len());

        let locals = Resolver::new().resolve(&statements)?;

        self.interpreter.interpret(&statements, locals)
    }
}
