//! Runtime scope frames.
//!
//! Frames form a singly linked chain through `enclosing`, rooted at the
//! global frame.  They are shared (`Rc<RefCell<_>>`) because every closure
//! created in a frame keeps it alive and must observe later mutations.

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wraps a fresh frame for sharing.
    pub fn shared(self) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<Rc<RefCell<Environment>>> {
        self.enclosing.clone()
    }

    /// Binding stored directly in this frame, without walking the chain.
    pub fn get_local(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Insert or overwrite `name` in this frame.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("define '{}'", name);
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup through the whole chain; used for globals and any
    /// reference the resolver left unbound.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.upgraded())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Walks exactly `distance` links up the chain.
    ///
    /// Distances come from the resolver, which only records scopes that
    /// exist at runtime, so running off the root is an internal bug.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut frame: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let parent = frame
                .borrow()
                .enclosing()
                .expect("resolved distance exceeds environment depth");
            frame = parent;
        }

        frame
    }

    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token) -> Result<Value> {
        let frame = Self::ancestor(env, distance);
        let frame = frame.borrow();

        frame
            .values
            .get(&name.lexeme)
            .map(Value::upgraded)
            .ok_or_else(|| undefined(name))
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<()> {
        let frame = Self::ancestor(env, distance);
        frame.borrow_mut().define(&name.lexeme, value);
        Ok(())
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}
