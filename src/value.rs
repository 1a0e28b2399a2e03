//! Runtime values.
//!
//! [`Value`] is the single dynamic type flowing through the interpreter.
//! Primitive variants are copied by value; functions, classes, traits,
//! instances, and arrays are reference types shared via `Rc`, so equality on
//! them is identity and cloning a `Value` never deep-copies.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::class::{LoxArray, LoxClass, LoxInstance, LoxTrait};
use crate::environment::Environment;

/// A built-in function implemented in Rust.
///
/// The body is boxed so natives can capture state (the array accessors close
/// over their backing store).  Natives report failures as bare message
/// strings; the interpreter attaches the call-site line when it converts them
/// into runtime errors.
pub struct NativeFn {
    pub name: &'static str,
    pub arity: usize,
    pub func: Box<dyn Fn(&[Value]) -> Result<Value, String>>,
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A user-defined function or method: the shared declaration plus the
/// environment captured at its definition site.
#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Rc<Self> {
        Rc::new(Self {
            declaration,
            closure,
            is_initializer,
        })
    }

    /// Exact argument count required at call sites.
    pub fn arity(&self) -> usize {
        self.declaration.arity()
    }

    /// Declared without a parameter list, so property access invokes it.
    pub fn is_getter(&self) -> bool {
        self.declaration.params.is_none()
    }

    /// Produce a bound copy whose closure has `this` defined as `instance`.
    /// Used both for instance method access and for class-method access
    /// (where `this` is the class itself).
    pub fn bind(&self, instance: Value) -> Rc<LoxFunction> {
        let env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.borrow_mut().define("this", instance);

        LoxFunction::new(Rc::clone(&self.declaration), env, self.is_initializer)
    }
}

/// Every value the interpreter can produce or store.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Function(Rc<LoxFunction>),
    Native(Rc<NativeFn>),
    Class(Rc<LoxClass>),
    Trait(Rc<LoxTrait>),
    Instance(Rc<LoxInstance>),
    Array(Rc<LoxArray>),
}

impl Value {
    /// Truthiness: `nil` and `false` are falsey, everything else truthy
    /// (including `0` and `""`).
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Short noun for error messages ("Operands must be two numbers" style
    /// diagnostics stay generic; this is for logs).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
            Value::Class(_) => "class",
            Value::Trait(_) => "trait",
            Value::Instance(_) => "instance",
            Value::Array(_) => "array",
        }
    }
}

impl PartialEq for Value {
    /// Equality is joint over type and value: operands of different types are
    /// never equal (no coercion).  Reference types compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Trait(a), Value::Trait(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    // 3.0 prints as "3" (itoa writes into a stack buffer)
                    let mut buf: itoa::Buffer = itoa::Buffer::new();
                    write!(f, "{}", buf.format(*n as i64))
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => write!(f, "{s}"),
            Value::Function(func) => write!(f, "<fn {}>", func.declaration.name.lexeme),
            Value::Native(_) => write!(f, "<native fn>"),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Trait(t) => write!(f, "<trait {}>", t.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
            Value::Array(array) => {
                let elements = array.elements.borrow();
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn equality_never_coerces() {
        assert_ne!(Value::Number(1.0), Value::String("1".into()));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_eq!(Value::Number(2.0), Value::Number(2.0));
        assert_eq!(Value::String("a".into()), Value::String("a".into()));
    }

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }
}
