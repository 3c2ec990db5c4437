//! Named request predicates guarding mappings and filters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::error::{Result, RouterError};
use crate::request::{Method, Request};

/// A predicate receiving the declared argument and the live request.
pub type Predicate = Arc<dyn Fn(&Value, &Request) -> bool + Send + Sync>;

impl From<Method> for Value {
    fn from(method: Method) -> Self {
        Self::String(method.as_str().to_string())
    }
}

/// The conditions declared on a mapping or filter, in declaration order.
///
/// # Example
///
/// ```
/// use oxide_dispatch::{Conditions, Method};
///
/// let conditions = Conditions::new()
///     .with("methods", vec![Method::Get, Method::Head])
///     .with("role", "admin");
/// assert_eq!(conditions.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    entries: Vec<(String, Value)>,
}

impl Conditions {
    /// Creates an empty condition set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition. Redeclaring a name replaces its argument in place.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, argument: impl Into<Value>) -> Self {
        self.set(name, argument);
        self
    }

    /// Adds or replaces a condition.
    pub fn set(&mut self, name: impl Into<String>, argument: impl Into<Value>) {
        let name = name.into();
        let argument = argument.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = argument,
            None => self.entries.push((name, argument)),
        }
    }

    /// Gets the argument declared for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, arg)| arg)
    }

    /// Iterates over the conditions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, arg)| (n.as_str(), arg))
    }

    /// Returns the number of declared conditions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no condition is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The predicates a controller can resolve condition names against.
///
/// A fresh registry knows `methods`, whose argument is a method name or a
/// list of them.
#[derive(Clone)]
pub struct ConditionRegistry {
    predicates: HashMap<String, Predicate>,
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("ConditionRegistry")
            .field("predicates", &names)
            .finish()
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("methods", methods);
        registry
    }
}

impl ConditionRegistry {
    /// Creates a registry with the built-in predicates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry without any predicate.
    pub fn empty() -> Self {
        Self {
            predicates: HashMap::new(),
        }
    }

    /// Adds or overrides a predicate.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Request) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    /// Copies every predicate of `other` into this registry, replacing
    /// predicates of the same name.
    pub fn merge(&mut self, other: &Self) {
        for (name, predicate) in &other.predicates {
            self.predicates.insert(name.clone(), Arc::clone(predicate));
        }
    }

    /// Returns `true` if a predicate is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Iterates over the registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    /// Evaluates `conditions` against `request`.
    ///
    /// Stops at the first predicate returning `false`. A name that is not
    /// registered fails with [`RouterError::UnknownCondition`], but only
    /// once evaluation reaches it.
    pub fn evaluate(&self, conditions: &Conditions, request: &Request) -> Result<bool> {
        for (name, argument) in conditions.iter() {
            let Some(predicate) = self.predicates.get(name) else {
                warn!(condition = name, path = %request.path, "unknown condition referenced");
                return Err(RouterError::UnknownCondition {
                    name: name.to_string(),
                });
            };
            if !predicate(argument, request) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// True iff the request method is the argument or one of its elements.
fn methods(argument: &Value, request: &Request) -> bool {
    let wanted = request.method.as_str();
    match argument {
        Value::String(method) => method.eq_ignore_ascii_case(wanted),
        Value::Array(list) => list
            .iter()
            .filter_map(Value::as_str)
            .any(|method| method.eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}
