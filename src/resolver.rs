//! Static resolver pass for the **Rox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in initializer, misplaced
//!    `return`/`break`/`continue`/`this`/`super`, self‑inheritance).
//! 3. Record, for *each* resolvable use site, how many environments separate it
//!    from its declaration. Sites found in no scope are left out: they are globals.
//!
//! The pass is fail‑fast: the first error aborts it and no relation is returned.
//!
//! Function kind, class kind and the loop flag travel as a [`Context`] value
//! passed down the recursion, so leaving a construct restores them implicitly.

use crate::ast::{Expr, ExprId, FunctionDecl, Locals, Name, Stmt};
use crate::error::{LoxError, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// Where we are, lexically. Copied into every recursive call.
#[derive(Copy, Clone, Debug)]
struct Context {
    function: FunctionKind,
    class: ClassKind,
    in_loop: bool,
}

impl Context {
    const TOP_LEVEL: Context = Context {
        function: FunctionKind::None,
        class: ClassKind::None,
        in_loop: false,
    };

    fn in_function(self, function: FunctionKind) -> Context {
        Context {
            function,
            in_loop: false,
            ..self
        }
    }

    fn in_class(self, class: ClassKind) -> Context {
        Context { class, ..self }
    }

    fn in_loop(self) -> Context {
        Context {
            in_loop: true,
            ..self
        }
    }
}

/// Resolver: tracks scopes, enforces static rules, and builds the
/// scope‑distance relation consumed by the interpreter.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    locals: Locals,
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
        }
    }

    /// Walk all top‑level statements and hand back the finished relation.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<Locals> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements, Context::TOP_LEVEL)?;

        info!("Resolved {} local use site(s)", self.locals.len());

        Ok(self.locals)
    }

    fn resolve_stmts(&mut self, statements: &'a [Stmt], ctx: Context) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt, ctx)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt, ctx: Context) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements, ctx)?;
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr, ctx)?;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible inside its own body (recursion)
                if let Some(name) = &decl.name {
                    self.declare(name)?;
                    self.define(name);
                }
                self.resolve_function(decl, ctx.in_function(FunctionKind::Function))?;
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods, ctx)?,

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr, ctx)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition, ctx)?;
                self.resolve_stmt(then_branch, ctx)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb, ctx)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition, ctx)?;
                self.resolve_stmt(body, ctx.in_loop())?;
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // one scope for the loop variable; a block body opens its own
                self.begin_scope();
                if let Some(init) = initializer {
                    self.resolve_stmt(init, ctx)?;
                }
                if let Some(cond) = condition {
                    self.resolve_expr(cond, ctx)?;
                }
                if let Some(inc) = increment {
                    self.resolve_expr(inc, ctx)?;
                }
                self.resolve_stmt(body, ctx.in_loop())?;
                self.end_scope();
            }

            Stmt::Return { line, value } => {
                if ctx.function == FunctionKind::None {
                    return Err(LoxError::resolve(*line, "Can't return from top-level code."));
                }
                if let Some(expr) = value {
                    if ctx.function == FunctionKind::Initializer {
                        return Err(LoxError::resolve(
                            *line,
                            "Can't return a value from an initializer.",
                        ));
                    }
                    self.resolve_expr(expr, ctx)?;
                }
            }

            Stmt::Break { line } => {
                if !ctx.in_loop {
                    return Err(LoxError::resolve(*line, "Can't use 'break' outside of a loop."));
                }
            }

            Stmt::Continue { line } => {
                if !ctx.in_loop {
                    return Err(LoxError::resolve(
                        *line,
                        "Can't use 'continue' outside of a loop.",
                    ));
                }
            }
        }
        Ok(())
    }

    fn resolve_class(
        &mut self,
        name: &'a Name,
        superclass: Option<&'a Expr>,
        methods: &'a [Rc<FunctionDecl>],
        ctx: Context,
    ) -> Result<()> {
        debug!("Resolving class '{}'", name);

        if let Some(Expr::Variable { name: super_name, .. }) = superclass {
            if super_name.lexeme == name.lexeme {
                return Err(LoxError::resolve(
                    super_name.line,
                    "A class can't inherit from itself.",
                ));
            }
        }

        self.declare(name)?;
        self.define(name);

        let class_kind = match superclass {
            Some(expr) => {
                self.resolve_expr(expr, ctx)?;

                // outer scope binds `super`
                self.begin_scope();
                self.bind_implicit("super");
                ClassKind::Subclass
            }
            None => ClassKind::Class,
        };

        // inner scope binds `this`
        self.begin_scope();
        self.bind_implicit("this");

        let class_ctx = ctx.in_class(class_kind);
        for method in methods {
            let kind = if method.is_named("init") {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, class_ctx.in_function(kind))?;
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr, ctx: Context) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner, ctx)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right, ctx)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left, ctx)?;
                self.resolve_expr(right, ctx)?;
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition, ctx)?;
                self.resolve_expr(then_branch, ctx)?;
                self.resolve_expr(else_branch, ctx)?;
            }

            Expr::Variable { id, name } => {
                // Cannot read in own initializer (globals exempt: no scope)
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value, ctx)?;
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee, ctx)?;
                for arg in arguments {
                    self.resolve_expr(arg, ctx)?;
                }
            }

            // properties are looked up dynamically; only the object resolves
            Expr::Get { object, .. } => self.resolve_expr(object, ctx)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object, ctx)?;
                self.resolve_expr(value, ctx)?;
            }

            Expr::This { id, line } => {
                if ctx.class == ClassKind::None {
                    return Err(LoxError::resolve(*line, "Can't use 'this' outside of a class."));
                }
                self.resolve_local(*id, "this");
            }

            Expr::Super { id, line, .. } => match ctx.class {
                ClassKind::None => {
                    return Err(LoxError::resolve(*line, "Can't use 'super' outside of a class."));
                }
                ClassKind::Class => {
                    return Err(LoxError::resolve(
                        *line,
                        "Can't use 'super' in a class with no superclass.",
                    ));
                }
                ClassKind::Subclass => self.resolve_local(*id, "super"),
            },

            Expr::Lambda(decl) => {
                self.resolve_function(decl, ctx.in_function(FunctionKind::Function))?;
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// One fresh scope holds the parameters *and* the body's top‑level
    /// declarations, mirroring the single environment a call creates.
    fn resolve_function(&mut self, decl: &'a FunctionDecl, ctx: Context) -> Result<()> {
        self.begin_scope();
        for param in &decl.params {
            self.declare(param)?;
            self.define(param);
        }
        self.resolve_stmts(&decl.body, ctx)?;
        self.end_scope();

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Name) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme.as_str()) {
                return Err(LoxError::resolve(
                    name.line,
                    format!(
                        "Already a variable named '{}' in this scope.",
                        name.lexeme
                    ),
                ));
            }
            scope.insert(name.lexeme.as_str(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &'a Name) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.as_str(), true);
        }
    }

    /// `this` / `super` in the scope just opened.
    fn bind_implicit(&mut self, keyword: &'static str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(keyword, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record `id` at the distance of the innermost scope declaring `name`,
    /// or leave it out (global) when no scope does.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name);
    }
}
