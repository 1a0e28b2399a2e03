//! Class machinery: classes, traits, instances, and the built-in array type.
//!
//! Method tables are **flattened at declaration time**: a class's table
//! starts from its superclass's table, then composed traits are layered in
//! left-to-right, then the class's own methods go on top.  Later sources win
//! on name collisions.  Method dispatch is therefore a single hash lookup on
//! the receiving class; the superclass link survives only for `super`
//! resolution, which starts the lookup one class up.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::{LoxFunction, Value};

/// A class: named, optionally derived, with flattened method tables.
///
/// `methods` holds regular instance methods, `getters` holds parameterless
/// property methods, and `class_methods` holds methods invoked on the class
/// object itself.  The three namespaces are disjoint.
#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
    pub getters: HashMap<String, Rc<LoxFunction>>,
    pub class_methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.methods.get(name).map(Rc::clone)
    }

    pub fn find_getter(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.getters.get(name).map(Rc::clone)
    }

    pub fn find_class_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.class_methods.get(name).map(Rc::clone)
    }

    /// Calling a class runs `init` if present; the class's arity is `init`'s.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

/// A trait: a reusable bundle of methods and getters.  Traits cannot be
/// instantiated or called; they only contribute their tables to classes (and
/// other traits) through `with` clauses.
#[derive(Debug)]
pub struct LoxTrait {
    pub name: String,
    pub methods: HashMap<String, Rc<LoxFunction>>,
    pub getters: HashMap<String, Rc<LoxFunction>>,
}

/// An instance: a class pointer plus mutable per-object fields.
///
/// Fields live behind a `RefCell` so every `Rc` alias of the instance sees
/// writes (aliasing is the observable object identity).
#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Rc<Self> {
        Rc::new(Self {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// Read a field, if set.  Fields shadow methods and getters.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    /// Create or overwrite a field.
    pub fn set_field(&self, name: impl Into<String>, value: Value) {
        self.fields.borrow_mut().insert(name.into(), value);
    }
}

/// Fixed-length mutable array created by the `Array(size)` native.
///
/// Length is set at construction and never changes; `get`/`set` are
/// bounds-checked by the interpreter's property dispatch.
#[derive(Debug)]
pub struct LoxArray {
    pub elements: RefCell<Vec<Value>>,
}

impl LoxArray {
    pub fn new(size: usize) -> Rc<Self> {
        Rc::new(Self {
            elements: RefCell::new(vec![Value::Nil; size]),
        })
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_fields_are_shared_across_aliases() {
        let class = Rc::new(LoxClass {
            name: "Point".into(),
            superclass: None,
            methods: HashMap::new(),
            getters: HashMap::new(),
            class_methods: HashMap::new(),
        });

        let a = LoxInstance::new(class);
        let b = Rc::clone(&a);

        a.set_field("x", Value::Number(4.0));
        assert_eq!(b.get_field("x"), Some(Value::Number(4.0)));
        assert_eq!(b.get_field("y"), None);
    }

    #[test]
    fn arrays_initialize_to_nil() {
        let arr = LoxArray::new(3);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.elements.borrow()[2], Value::Nil);
    }
}
