//! Lexically nested variable scope chain.
//!
//! Grounded on `original_source/src/interpreter/scope.c`: a hash-map of
//! bindings per scope, an `enclosing` pointer walked on lookup/undefined
//! references, and same-scope (not same-chain) redefinition checks for
//! `var`. The original's arena-backed scratch allocation for scope-local
//! strings has no counterpart here — ordinary heap allocation plus `Rc`
//! reference counting already gives every value the right lifetime.

use crate::errors::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct ScopeData {
    values: HashMap<String, Value>,
    enclosing: Option<Scope>,
}

#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
    pub fn new_global() -> Self {
        Scope(Rc::new(RefCell::new(ScopeData { values: HashMap::new(), enclosing: None })))
    }

    pub fn child(enclosing: &Scope) -> Self {
        Scope(Rc::new(RefCell::new(ScopeData {
            values: HashMap::new(),
            enclosing: Some(enclosing.clone()),
        })))
    }

    pub fn enclosing(&self) -> Option<Scope> {
        self.0.borrow().enclosing.clone()
    }

    /// Defines `name` in *this* scope. Redefining a name already present in
    /// this exact scope (shadowing an enclosing scope is fine) is a runtime
    /// error, matching `scope.c`'s `var_define`.
    pub fn define(&self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        let mut data = self.0.borrow_mut();
        if data.values.contains_key(name) {
            return Err(RuntimeError::new(format!("Redefinition of '{name}'"), line));
        }
        data.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Forcibly (re)defines `name`, used for the global scope's environment
    /// seeding where duplicate insertion is expected and not an error.
    pub fn force_define(&self, name: &str, value: Value) {
        self.0.borrow_mut().values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(v) = data.values.get(name) {
            return Some(v.clone());
        }
        data.enclosing.as_ref()?.get(name)
    }

    pub fn get_or_err(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        self.get(name).ok_or_else(|| RuntimeError::new(format!("Variable '{name}' is not defined"), line))
    }

    /// Assigns to the nearest enclosing scope (including this one) that
    /// already defines `name`; errors if it is undefined anywhere.
    pub fn assign(&self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        let mut data = self.0.borrow_mut();
        if data.values.contains_key(name) {
            data.values.insert(name.to_string(), value);
            return Ok(());
        }
        let enclosing = data.enclosing.clone();
        drop(data);
        match enclosing {
            Some(e) => e.assign(name, value, line),
            None => Err(RuntimeError::new(format!("Variable '{name}' is not defined"), line)),
        }
    }

    /// Every value directly stored in this scope (not walking `enclosing`),
    /// used by the GC to mark roots one scope at a time.
    pub fn own_values(&self) -> Vec<Value> {
        self.0.borrow().values.values().cloned().collect()
    }

    /// Every value reachable from this scope, walking the whole `enclosing`
    /// chain. Used by the GC to mark roots from the currently active scope.
    pub fn chain_values(&self) -> Vec<Value> {
        let mut out = self.own_values();
        if let Some(e) = self.enclosing() {
            out.extend(e.chain_values());
        }
        out
    }

    /// Name+value pairs across the whole chain, used by the `vars` builtin.
    /// Names already seen in a nearer scope shadow the same name further out.
    pub fn chain_named_values(&self) -> Vec<(String, Value)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(s) = cur {
            for (k, v) in s.0.borrow().values.iter() {
                if seen.insert(k.clone()) {
                    out.push((k.clone(), v.clone()));
                }
            }
            cur = s.enclosing();
        }
        out
    }
}
