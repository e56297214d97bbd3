//! Runtime scope storage.
//!
//! Environments are shared: a block's environment may be captured by any
//! number of closures and must stay alive for as long as one of them does, so
//! every link is an `Rc<RefCell<Environment>>`.
//!
//! Local lookups are distance-addressed using the resolver's output; a
//! missing slot at the computed frame is an internal fault, not a user error.
//! Name-only lookups read a single environment (the interpreter uses them on
//! the global one).

use crate::error::{LoxError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Env) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn enclosing(&self) -> Option<Env> {
        self.enclosing.clone()
    }

    /// Insert or overwrite `name` in this environment only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Read `name` from this environment only.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))
    }

    /// Overwrite an existing `name` in this environment only; never creates one.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            )),
        }
    }

    /// The environment exactly `distance` parent links above `env`.
    pub fn ancestor(env: &Env, distance: usize) -> Result<Env> {
        let mut current = Rc::clone(env);

        for hop in 0..distance {
            let parent = current.borrow().enclosing().ok_or_else(|| {
                LoxError::internal(format!(
                    "environment chain ends after {} of {} hops",
                    hop, distance
                ))
            })?;
            current = parent;
        }

        Ok(current)
    }

    pub fn get_at(env: &Env, distance: usize, name: &str) -> Result<Value> {
        let target = Self::ancestor(env, distance)?;
        let value = target.borrow().values.get(name).cloned();

        value.ok_or_else(|| {
            LoxError::internal(format!(
                "'{}' not found at resolved distance {}",
                name, distance
            ))
        })
    }

    pub fn assign_at(env: &Env, distance: usize, name: &str, value: Value) -> Result<()> {
        let target = Self::ancestor(env, distance)?;
        let mut target = target.borrow_mut();

        match target.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(LoxError::internal(format!(
                "'{}' not found at resolved distance {}",
                name, distance
            ))),
        }
    }
}
