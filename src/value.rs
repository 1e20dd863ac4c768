use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::callable::{Callable, LoxClass, LoxFunction, LoxInstance, NativeFunction};

/// A runtime Lox value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),

    /// User function or bound method.
    Function(Rc<LoxFunction>),

    /// Host-provided callable.
    Native(Rc<NativeFunction>),

    Class(Rc<LoxClass>),

    Instance(Rc<RefCell<LoxInstance>>),

    /// Receiver of a bound method stored on that same receiver.  Only ever
    /// lives in the `this` frame of the copy kept in the field; property
    /// reads rebind it strongly.
    WeakInstance(Weak<RefCell<LoxInstance>>),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Turns a weak receiver back into a strong one (`nil` once dropped).
    pub fn upgraded(&self) -> Value {
        match self {
            Value::WeakInstance(weak) => weak.upgrade().map_or(Value::Nil, Value::Instance),
            other => other.clone(),
        }
    }

    /// The callable capability, if this value has one.
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Function(function) => Some(function.as_ref()),
            Value::Native(native) => Some(native.as_ref()),
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    fn instance_ptr(&self) -> Option<*const RefCell<LoxInstance>> {
        match self {
            Value::Instance(rc) => Some(Rc::as_ptr(rc)),
            Value::WeakInstance(weak) => Some(weak.as_ptr()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Lox equality: `nil` equals only `nil`, primitives compare by value,
    /// heap objects by identity, mismatched types are simply unequal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            _ => match (self.instance_ptr(), other.instance_ptr()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Native(native) => write!(f, "<native fn {}>", native.name()),

            Value::Class(class) => write!(f, "<cls {}>", class.name()),

            Value::Instance(instance) => {
                write!(f, "<instance {}>", instance.borrow().class().name())
            }

            Value::WeakInstance(_) => write!(f, "{}", self.upgraded()),
        }
    }
}

impl fmt::Debug for Value {
    /// Heap objects can be cyclic, so Debug reuses the display form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}
