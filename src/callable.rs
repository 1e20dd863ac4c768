//! The callable capability and the class/instance object model.
//!
//! Four things can be called: user functions, bound methods (a user
//! function whose closure has been extended with `this`), classes acting
//! as constructors, and host-provided natives.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Anything invocable with a fixed arity.
pub trait Callable {
    fn arity(&self) -> usize;

    /// Invoke with already-evaluated arguments.  `call_site` is the closing
    /// parenthesis of the call, used to locate errors raised by the callee
    /// itself.  Arity has been checked by the caller.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        call_site: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// User functions and bound methods
// ─────────────────────────────────────────────────────────────────────────────

pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Produce a bound method: a copy whose closure has one extra frame
    /// holding `this`.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));
        frame.define("this", Value::Instance(instance));

        LoxFunction::new(
            Rc::clone(&self.declaration),
            frame.shared(),
            self.is_initializer,
        )
    }

    /// If this is a method strongly bound to `instance`, the same method
    /// holding its receiver weakly.  Only the copy stored in a field of the
    /// receiver itself takes this form, so the field does not form a cycle.
    fn weakly_bound_to(&self, instance: &Rc<RefCell<LoxInstance>>) -> Option<LoxFunction> {
        self.rebind_receiver(instance, true)
    }

    /// Inverse of [`LoxFunction::weakly_bound_to`]: every value read out of a
    /// field holds its receiver strongly again.
    fn strongly_bound_to(&self, instance: &Rc<RefCell<LoxInstance>>) -> Option<LoxFunction> {
        self.rebind_receiver(instance, false)
    }

    fn rebind_receiver(
        &self,
        instance: &Rc<RefCell<LoxInstance>>,
        weak: bool,
    ) -> Option<LoxFunction> {
        let frame = self.closure.borrow();

        let bound_here = match frame.get_local("this") {
            Some(Value::Instance(receiver)) => weak && Rc::ptr_eq(receiver, instance),
            Some(Value::WeakInstance(receiver)) => {
                !weak && receiver.as_ptr() == Rc::as_ptr(instance)
            }
            _ => false,
        };

        if !bound_here {
            return None;
        }

        let this = if weak {
            Value::WeakInstance(Rc::downgrade(instance))
        } else {
            Value::Instance(Rc::clone(instance))
        };

        let mut rebound = match frame.enclosing() {
            Some(parent) => Environment::with_enclosing(parent),
            None => Environment::new(),
        };
        rebound.define("this", this);

        Some(LoxFunction::new(
            Rc::clone(&self.declaration),
            rebound.shared(),
            self.is_initializer,
        ))
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        _call_site: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling '{}' with {} argument(s)", self.name(), arguments.len());

        // Parented at the closure, not the caller: lexical scoping.
        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            frame.define(&param.lexeme, argument);
        }

        let flow = interpreter.execute_block(&self.declaration.body, frame.shared())?;

        if self.is_initializer {
            let this = Token::identifier("this", self.declaration.name.line);
            return Environment::get_at(&self.closure, 0, &this);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────────

pub struct LoxClass {
    name: String,
    methods: HashMap<String, LoxFunction>,
}

impl LoxClass {
    pub fn new(name: String, methods: HashMap<String, LoxFunction>) -> Self {
        Self { name, methods }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_method(&self, name: &str) -> Option<&LoxFunction> {
        self.methods.get(name)
    }
}

impl Callable for Rc<LoxClass> {
    /// A class takes whatever its initializer takes.
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        call_site: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Constructing instance of '{}'", self.name);

        let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(self))));

        if let Some(initializer) = self.find_method("init") {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, call_site, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Property read: fields shadow methods; methods are bound on demand.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value> {
        let this = instance.borrow();

        if let Some(value) = this.fields.get(&name.lexeme) {
            let rebound = match value {
                Value::Function(function) => function.strongly_bound_to(instance),
                _ => None,
            };

            return Ok(rebound.map_or_else(|| value.clone(), |m| Value::Function(Rc::new(m))));
        }

        if let Some(method) = this.class.find_method(&name.lexeme) {
            let bound = method.bind(Rc::clone(instance));
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(LoxError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property write; fields need no prior declaration.
    pub fn set(instance: &Rc<RefCell<LoxInstance>>, name: &Token, value: Value) {
        let weak = match &value {
            Value::Function(function) => function.weakly_bound_to(instance),
            _ => None,
        };
        let stored = weak.map_or(value, |method| Value::Function(Rc::new(method)));

        instance
            .borrow_mut()
            .fields
            .insert(name.lexeme.clone(), stored);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host natives
// ─────────────────────────────────────────────────────────────────────────────

/// Host-side implementation of a native; `Err` carries a runtime error message.
pub type NativeFn = dyn Fn(&[Value]) -> std::result::Result<Value, String>;

pub struct NativeFunction {
    name: String,
    arity: usize,
    func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    {
        Self {
            name: name.to_string(),
            arity,
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        call_site: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|message| LoxError::runtime(call_site, message))
    }
}
