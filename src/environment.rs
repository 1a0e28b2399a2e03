//! Lexical environments: a chain of mutable scopes.
//!
//! Each `Environment` is one scope level holding `name -> Value` bindings and
//! an optional link to its enclosing scope.  Scopes are shared (`Rc`) and
//! interior-mutable (`RefCell`) because closures capture the environment that
//! was live at their definition site and keep it alive past the block that
//! created it.
//!
//! Lookups come in two flavours:
//! - dynamic ([`Environment::get`] / [`Environment::assign`]) walk the chain
//!   outwards, used only for globals;
//! - resolved ([`Environment::get_at`] / [`Environment::assign_at`]) hop an
//!   exact number of levels computed by the resolver, so local access never
//!   searches.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::value::Value;

/// One lexical scope.  `enclosing == None` marks the global scope.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// Create the global (outermost) scope.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Create a scope nested inside `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Bind `name` in *this* scope, shadowing any outer binding.
    /// Re-declaration in the same scope overwrites.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        debug!("define {name}");
        self.values.insert(name, value);
    }

    /// Dynamic lookup walking the scope chain outwards.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.values.get(name) {
            return Some(v.clone());
        }

        match &self.enclosing {
            Some(parent) => parent.borrow().get(name),
            None => None,
        }
    }

    /// Dynamic assignment walking the scope chain outwards.  Returns `false`
    /// when no scope binds `name`.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }

        match &self.enclosing {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => false,
        }
    }

    /// The scope exactly `distance` hops out from `env`.
    ///
    /// The resolver guarantees the distance is in range for every lookup it
    /// records, so the traversal cannot fall off the chain for resolved
    /// accesses.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .as_ref()
                .map(Rc::clone)
                .unwrap_or_else(|| Rc::clone(&current));
            current = next;
        }

        current
    }

    /// Resolved lookup: read `name` exactly `distance` scopes out.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        Self::ancestor(env, distance).borrow().values.get(name).cloned()
    }

    /// Resolved assignment: write `name` exactly `distance` scopes out.
    /// Returns `false` if the slot is missing (a resolver bug, not user error).
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        let scope = Self::ancestor(env, distance);
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
