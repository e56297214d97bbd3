//! Owned syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Nodes never borrow from the token buffer: function bodies are shared via
//! `Rc` so closures created by one input can still run after that input's
//! tokens are gone (interactive sessions rely on this).
//!
//! Use sites that the resolver annotates (`Variable`, `Assign`, `This`,
//! `Super`) carry an [`ExprId`]. The scope-distance relation is keyed by that
//! id, never by structural content, so two textually identical references at
//! different positions resolve independently.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::token::Token;

/// Stable identity of a resolvable expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(u32);

impl ExprId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Monotonic allocator for [`ExprId`]s. One generator serves a whole session
/// so ids stay unique across separately parsed inputs.
#[derive(Debug, Default)]
pub struct ExprIdGen {
    next: u32,
}

impl ExprIdGen {
    pub fn fresh(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }
}

/// Scope-distance relation: use site → number of environment hops.
/// Absent ids are globals.
pub type Locals = HashMap<ExprId, usize>;

/// An identifier as it appeared in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Name {
    pub lexeme: String,
    pub line: usize,
}

impl From<&Token<'_>> for Name {
    fn from(token: &Token<'_>) -> Self {
        Name {
            lexeme: token.lexeme.to_string(),
            line: token.line,
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexeme)
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,
    False,
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Bang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Star,
    Slash,
    EqualEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Bang => "!",
        }
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Star => "*",
            BinaryOp::Slash => "/",
            BinaryOp::EqualEqual => "==",
            BinaryOp::BangEqual => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
        }
    }
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

/// Parameters and body shared by named functions, methods and lambdas.
#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    /// `None` for lambdas.
    pub name: Option<Name>,

    /// Parameter names (arity ≤ 255).
    pub params: Vec<Name>,

    pub body: Vec<Stmt>,

    /// Line of the `fun` keyword or method name.
    pub line: usize,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_ref().is_some_and(|n| n.lexeme == name)
    }
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// *Example:* `!isReady` or `-42`
    Unary {
        operator: UnaryOp,
        right: Box<Expr>,
        line: usize,
    },

    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        line: usize,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
    },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    Variable {
        id: ExprId,
        name: Name,
    },

    Assign {
        id: ExprId,
        name: Name,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// Line of the closing `)`, retained for error reporting.
        line: usize,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get {
        object: Box<Expr>,
        name: Name,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Name,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        line: usize,
    },

    /// `super.method`
    Super {
        id: ExprId,
        method: Name,
        line: usize,
    },

    /// `fun (params) { body }` in expression position.
    Lambda(Rc<FunctionDecl>),
}

/// **Abstract‑Syntax‑Tree node** for *statements*.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Name,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// Kept as its own node (not desugared to `while`) so `continue` can still
    /// run the increment clause.
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        line: usize,
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Break {
        line: usize,
    },

    Continue {
        line: usize,
    },

    Class {
        name: Name,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
