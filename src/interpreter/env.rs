use std::{cell::RefCell, rc::Rc};

use fnv::FnvHashMap;

use crate::errors::RuntimeError;

use super::{value::set_element, Value};

/// A frame in the scope chain; cloning shares the frame rather than copying it.
#[derive(Clone, Debug, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

#[derive(Debug, Default)]
pub struct Scope {
    values: FnvHashMap<String, Value>,
    parent: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(&self) -> Environment {
        let child = Scope {
            parent: Some(self.clone()),
            ..Default::default()
        };

        Environment(Rc::new(RefCell::new(child)))
    }

    /// Creates or overwrites a binding in this frame only.
    pub fn define<K: Into<String>>(&self, key: K, value: Value) {
        self.0.borrow_mut().values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.get_here(key) {
            return Ok(value);
        }

        match self.parent() {
            Some(parent) => parent.get(key),
            None => Err(RuntimeError::UndefinedVariable(key.to_string())),
        }
    }

    pub fn assign<K: Into<String>>(&self, key: K, value: Value) -> Result<(), RuntimeError> {
        let key = key.into();
        if let Some(slot) = self.0.borrow_mut().values.get_mut(&key) {
            *slot = value;
            return Ok(());
        }

        match self.parent() {
            Some(parent) => parent.assign(key, value),
            None => Err(RuntimeError::UndefinedVariable(key)),
        }
    }

    /// Reads a binding from the frame exactly `hops` links up the chain, without searching.
    pub fn get_at(&self, hops: usize, key: &str) -> Result<Value, RuntimeError> {
        self.ancestor(hops)
            .and_then(|env| env.get_here(key))
            .ok_or_else(|| RuntimeError::UndefinedVariable(key.to_string()))
    }

    pub fn assign_at<K: Into<String>>(&self, hops: usize, key: K, value: Value) -> Result<(), RuntimeError> {
        let key = key.into();
        let Some(env) = self.ancestor(hops) else {
            return Err(RuntimeError::UndefinedVariable(key));
        };

        let mut scope = env.0.borrow_mut();
        if let Some(slot) = scope.values.get_mut(&key) {
            *slot = value;
            return Ok(());
        }

        Err(RuntimeError::UndefinedVariable(key))
    }

    /// Replaces one element of the array bound to `key`, searching up the chain.
    pub fn assign_element(&self, key: &str, index: &Value, value: Value) -> Result<(), RuntimeError> {
        set_element(&self.get(key)?, index, value)
    }

    pub fn assign_element_at(&self, hops: usize, key: &str, index: &Value, value: Value) -> Result<(), RuntimeError> {
        set_element(&self.get_at(hops, key)?, index, value)
    }

    pub fn ancestor(&self, hops: usize) -> Option<Environment> {
        let mut env = self.clone();
        for _ in 0..hops {
            env = env.parent()?;
        }

        Some(env)
    }

    fn get_here(&self, key: &str) -> Option<Value> {
        self.0.borrow().values.get(key).cloned()
    }

    fn parent(&self) -> Option<Environment> {
        self.0.borrow().parent.clone()
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
