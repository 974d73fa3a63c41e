//! Parent-linked variable environments.
//!
//! Environments are shared: the interpreter's current frame, every enclosing
//! frame, and every closure that captured one of them all hold `Rc` handles to
//! the same nodes.  A binding mutated through one handle is visible through
//! all of them.  The parent link is fixed at construction; only the bindings
//! themselves mutate.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Environment<'a> {
    values: HashMap<&'a str, Value<'a>>,
    pub enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind (or re-bind) `name` in *this* environment.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) {
        self.values.insert(name, value);
    }

    /// Look `name` up through the enclosing chain.
    pub fn get(&self, name: &str) -> Option<Value<'a>> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Re-bind an *existing* `name`, searching through the enclosing chain.
    /// Returns `false` if no environment on the chain defines it.
    pub fn assign(&mut self, name: &str, value: Value<'a>) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;

            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// The environment exactly `distance` parent hops up from `env`.
    /// The resolver guarantees the chain is at least that deep for every
    /// distance it records.
    fn ancestor(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment<'a>>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.as_ref().map(Rc::clone);

            current = next?;
        }

        Some(current)
    }

    /// Read `name` from the environment `distance` hops up — used for every
    /// reference the resolver annotated, bypassing the dynamic chain walk.
    pub fn get_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
    ) -> Option<Value<'a>> {
        Self::ancestor(env, distance)?.borrow().values.get(name).cloned()
    }

    /// Write `name` in the environment `distance` hops up.  Returns `false`
    /// if the chain is shorter than `distance` or the binding is absent.
    pub fn assign_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &'a str,
        value: Value<'a>,
    ) -> bool {
        match Self::ancestor(env, distance) {
            Some(target) => {
                target.borrow_mut().values.insert(name, value);

                true
            }

            None => false,
        }
    }
}

impl<'a> Default for Environment<'a> {
    fn default() -> Self {
        Self::new()
    }
}
