//! Tree‑walking evaluator.
//!
//! Every statement yields a [`Flow`]: `return`, `break` and `continue` travel
//! upward as ordinary values until a loop or call boundary consumes them, so
//! they never masquerade as errors.
//!
//! Variable reads and writes consult the resolver's relation: a recorded
//! distance walks exactly that many environments up from the active one, an
//! absent entry goes straight to the globals.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{BinaryOp, Expr, ExprId, LiteralValue, Locals, LogicalOp, Stmt, UnaryOp};
use crate::environment::{Env, Environment};
use crate::error::{LoxError, Result};
use crate::value::{LoxClass, LoxFunction, LoxInstance, NativeFunction, Value};

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter<W: Write = Stdout> {
    globals: Env,
    environment: Env,
    locals: Locals,
    out: W,
}

impl Interpreter<Stdout> {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Creates an interpreter writing `print` output to `out` and defines
    /// native functions such as `clock`.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::Native(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args: &[Value]| {
                    let millis = Utc::now().timestamp_millis();
                    Ok(Value::Number(millis as f64 / 1000.0))
                },
            })),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Runs a program. The relation is merged into the one accumulated from
    /// earlier inputs, since closures defined then may still be called.
    pub fn interpret(&mut self, statements: &[Stmt], locals: Locals) -> Result<()> {
        debug!(
            "Interpreting {} statements with {} resolved locals",
            statements.len(),
            locals.len()
        );

        self.locals.extend(locals);

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                self.environment = Rc::clone(&self.globals);
                return Err(e);
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(env)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.with_environment(Rc::new(RefCell::new(env)), |this| {
                    if let Some(init) = initializer {
                        this.execute(init)?;
                    }

                    loop {
                        if let Some(cond) = condition {
                            if !this.evaluate(cond)?.is_truthy() {
                                break;
                            }
                        }

                        match this.execute(body)? {
                            Flow::Normal | Flow::Continue => {}
                            Flow::Break => break,
                            flow @ Flow::Return(_) => return Ok(flow),
                        }

                        if let Some(inc) = increment {
                            this.evaluate(inc)?;
                        }
                    }

                    Ok(Flow::Normal)
                })
            }

            Stmt::Function(decl) => {
                let name = decl.name.as_ref().map_or("", |n| n.lexeme.as_str());
                debug!("Defining function '{}'", name);

                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(name, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Continue { .. } => Ok(Flow::Continue),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Class(class) => Some(class),
                        _ => {
                            return Err(LoxError::runtime(
                                name.line,
                                "Superclass must be a class.",
                            ))
                        }
                    },
                    None => None,
                };

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                // methods close over an extra scope holding `super`
                let method_env = match &superclass {
                    Some(class) => {
                        let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
                        env.define("super", Value::Class(Rc::clone(class)));
                        Rc::new(RefCell::new(env))
                    }
                    None => Rc::clone(&self.environment),
                };

                let methods = methods
                    .iter()
                    .map(|decl| {
                        let method_name = decl.name.as_ref().map_or("", |n| n.lexeme.as_str());
                        let method = LoxFunction::new(
                            Rc::clone(decl),
                            Rc::clone(&method_env),
                            method_name == "init",
                        );
                        (method_name.to_string(), Rc::new(method))
                    })
                    .collect();

                let class = LoxClass {
                    name: name.lexeme.clone(),
                    superclass,
                    methods,
                };
                info!("Class '{}' defined", name);

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Class(Rc::new(class)));
                Ok(Flow::Normal)
            }
        }
    }

    /// Runs `statements` inside `env`, stopping at the first non‑normal flow.
    fn execute_block(&mut self, statements: &[Stmt], env: Env) -> Result<Flow> {
        self.with_environment(env, |this| {
            for stmt in statements {
                match this.execute(stmt)? {
                    Flow::Normal => {}
                    flow => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        })
    }

    /// Swaps in `env` for the duration of `body`; the previous environment is
    /// restored whether `body` succeeds or fails.
    fn with_environment<T>(
        &mut self,
        env: Env,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = body(self);
        self.environment = previous;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::from(s.as_str()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary {
                operator,
                right,
                line,
            } => {
                let right = self.evaluate(right)?;
                match operator {
                    UnaryOp::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(*line, "Operand must be a number.")),
                    },
                    UnaryOp::Bang => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
                line,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*operator, left, right, *line)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let decided = match operator {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };
                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, &name.lexeme, name.line),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name.line)?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                line,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee, args, *line)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    if let Some(value) = instance.field(&name.lexeme) {
                        return Ok(value);
                    }

                    match instance.class.find_method(&name.lexeme) {
                        Some(method) => Ok(Value::Function(Rc::new(method.bind(instance)))),
                        None => Err(LoxError::runtime(
                            name.line,
                            format!("Undefined property '{}'.", name),
                        )),
                    }
                }
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name.line, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.set_field(&name.lexeme, value.clone());
                Ok(value)
            }

            Expr::This { id, line } => self.look_up_variable(*id, "this", *line),

            Expr::Super { id, method, line } => {
                let distance = *self
                    .locals
                    .get(id)
                    .ok_or_else(|| LoxError::internal("unresolved 'super' expression"))?;

                let superclass = match Environment::get_at(&self.environment, distance, "super")? {
                    Value::Class(class) => class,
                    other => {
                        return Err(LoxError::internal(format!(
                            "'super' bound to a {}",
                            other.type_name()
                        )))
                    }
                };

                // `this` lives in the scope just inside the one holding `super`
                let this_distance = distance
                    .checked_sub(1)
                    .ok_or_else(|| LoxError::internal("'super' resolved with no 'this' scope"))?;
                let receiver = match Environment::get_at(&self.environment, this_distance, "this")? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(LoxError::internal(format!(
                            "'this' bound to a {}",
                            other.type_name()
                        )))
                    }
                };

                match superclass.find_method(&method.lexeme) {
                    Some(found) => Ok(Value::Function(Rc::new(found.bind(receiver)))),
                    None => Err(LoxError::runtime(
                        *line,
                        format!("Undefined property '{}'.", method),
                    )),
                }
            }

            Expr::Lambda(decl) => Ok(Value::Function(Rc::new(LoxFunction::new(
                Rc::clone(decl),
                Rc::clone(&self.environment),
                false,
            )))),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &str, line: usize) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name, line),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    fn call_value(&mut self, callee: Value, args: Vec<Value>, line: usize) -> Result<Value> {
        match callee {
            Value::Native(native) => {
                check_arity(native.arity, args.len(), line)?;
                debug!("Calling native function '{}'", native.name);

                (native.func)(&args).map_err(|message| LoxError::runtime(line, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), args.len(), line)?;
                debug!("Calling {}", function);

                self.call_function(&function, args)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), line)?;
                debug!("Instantiating class '{}'", class.name);

                let instance = Rc::new(LoxInstance::new(Rc::clone(&class)));
                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(Rc::clone(&instance)), args)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(LoxError::runtime(
                line,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Binds arguments in a fresh environment whose parent is the closure,
    /// never the caller's environment.
    fn call_function(&mut self, function: &LoxFunction, args: Vec<Value>) -> Result<Value> {
        let mut env = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, arg) in function.decl.params.iter().zip(args) {
            env.define(&param.lexeme, arg);
        }

        let flow = self.execute_block(&function.decl.body, Rc::new(RefCell::new(env)))?;

        if function.is_initializer {
            return Environment::get_at(&function.closure, 0, "this");
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break | Flow::Continue => Ok(Value::Nil),
        }
    }
}

fn check_arity(expected: usize, got: usize, line: usize) -> Result<()> {
    if expected != got {
        return Err(LoxError::runtime(
            line,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }
    Ok(())
}

/// Binary operator semantics. `+` concatenates when either side is a string,
/// rendering the other side with its printed form.
fn binary(operator: BinaryOp, left: Value, right: Value, line: usize) -> Result<Value> {
    use Value::{Bool, Number};

    match operator {
        BinaryOp::EqualEqual => return Ok(Bool(left == right)),
        BinaryOp::BangEqual => return Ok(Bool(left != right)),
        BinaryOp::Plus => {
            return match (&left, &right) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::from(format!("{}{}", left, right).as_str()))
                }
                _ => Err(LoxError::runtime(
                    line,
                    "Operands must be two numbers or at least one string.",
                )),
            }
        }
        _ => {}
    }

    let (Number(a), Number(b)) = (left, right) else {
        return Err(LoxError::runtime(line, "Operands must be numbers."));
    };

    match operator {
        BinaryOp::Minus => Ok(Number(a - b)),
        BinaryOp::Star => Ok(Number(a * b)),
        BinaryOp::Slash => {
            if b == 0.0 {
                Err(LoxError::runtime(line, "Division by zero."))
            } else {
                Ok(Number(a / b))
            }
        }
        BinaryOp::Greater => Ok(Bool(a > b)),
        BinaryOp::GreaterEqual => Ok(Bool(a >= b)),
        BinaryOp::Less => Ok(Bool(a < b)),
        BinaryOp::LessEqual => Ok(Bool(a <= b)),
        BinaryOp::Plus | BinaryOp::EqualEqual | BinaryOp::BangEqual => {
            unreachable!("handled above")
        }
    }
}
