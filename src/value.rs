//! Runtime values: primitives plus the callable/class/instance object model.
//!
//! Functions, classes and instances are reference types (`Rc`), so equality
//! on them is identity. Closures share their captured environment with every
//! other holder; see [`crate::environment`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::{Env, Environment};

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Native(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
}

impl Value {
    /// `nil` and `false` are falsey; everything else, including `0` and `""`, is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Native(_) | Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

/// Values of different types are never equal; reference types compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

/// Integral numbers print without a fractional part (`3`, not `3.0`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => f.write_str(&format_number(*n)),

            Value::String(s) => write!(f, "{}", s),

            Value::Native(native) => write!(f, "<native fn {}>", native.name),

            Value::Function(function) => write!(f, "{}", function),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callables
// ─────────────────────────────────────────────────────────────────────────────

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A user function, method or lambda together with its defining environment.
pub struct LoxFunction {
    pub decl: Rc<FunctionDecl>,
    pub closure: Env,
    /// Calls always yield the receiver bound as `this`.
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(decl: Rc<FunctionDecl>, closure: Env, is_initializer: bool) -> Self {
        LoxFunction {
            decl,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.decl.arity()
    }

    /// Copy of this method whose closure gains a scope binding `this`.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", Value::Instance(instance));

        LoxFunction {
            decl: Rc::clone(&self.decl),
            closure: Rc::new(RefCell::new(env)),
            is_initializer: self.is_initializer,
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.decl.name {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<fn>"),
        }
    }
}

// The closure may (indirectly) contain this very function.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    /// Unbound methods; binding happens on property access.
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    /// Own methods first, then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// Arity of `init`, or zero when no class in the chain defines one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    /// Fields shadow methods on access but never replace them in the class.
    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

// Fields may refer back to the instance itself.
impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
