//! Route records and the priority-ordered mapping table.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::condition::{ConditionRegistry, Conditions};
use crate::dispatcher::{Endpoint, handler};
use crate::error::{Result, RouterError};
use crate::pattern::{PatternMatch, PatternSource, RoutePattern};
use crate::request::Request;
use crate::response::Response;

/// The record a mapping is built from.
///
/// `url` and a target are mandatory; registering a route without either
/// fails with [`RouterError::Configuration`].
///
/// # Example
///
/// ```
/// use oxide_dispatch::{Controller, Response, Route};
///
/// let mut app = Controller::new("app");
/// app.map(
///     Route::new()
///         .url("/health$")
///         .priority(10)
///         .condition("methods", "GET")
///         .target(|_req| async { Response::text("ok") }),
/// )
/// .unwrap();
/// ```
#[derive(Clone, Default)]
pub struct Route {
    pub(crate) url: Option<PatternSource>,
    pub(crate) priority: i32,
    pub(crate) conditions: Conditions,
    pub(crate) target: Option<Arc<dyn Endpoint>>,
    pub(crate) name: Option<String>,
}

impl Route {
    /// Creates an empty route record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path specification or raw pattern.
    #[must_use]
    pub fn url(mut self, url: impl Into<PatternSource>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the priority. Higher priorities are tried first.
    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a condition.
    #[must_use]
    pub fn condition(mut self, name: impl Into<String>, argument: impl Into<Value>) -> Self {
        self.conditions.set(name, argument);
        self
    }

    /// Replaces all conditions.
    #[must_use]
    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Sets an async handler as the target.
    #[must_use]
    pub fn target<F, Fut>(self, target: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.endpoint(handler(target))
    }

    /// Sets any endpoint, such as a [`Handler`](crate::Handler) or a
    /// [`Controller`](crate::Controller), as the target.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Endpoint + 'static) -> Self {
        self.target = Some(Arc::new(endpoint));
        self
    }

    /// Names the route for reverse URL lookup.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A registered route: compiled pattern, priority, conditions and target.
#[derive(Clone)]
pub struct Mapping {
    pattern: RoutePattern,
    priority: i32,
    conditions: Conditions,
    target: Arc<dyn Endpoint>,
    name: Option<String>,
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("pattern", &self.pattern.source())
            .field("priority", &self.priority)
            .field("conditions", &self.conditions)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Mapping {
    /// Validates a route record and compiles its pattern.
    pub fn build(route: Route, lazy: bool) -> Result<Self> {
        let url = route.url.ok_or(RouterError::Configuration { field: "url" })?;
        let target = route
            .target
            .ok_or(RouterError::Configuration { field: "target" })?;

        Ok(Self {
            pattern: RoutePattern::compile(url, lazy)?,
            priority: route.priority,
            conditions: route.conditions,
            target,
            name: route.name,
        })
    }

    /// Returns the compiled pattern.
    pub const fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Returns the priority.
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the declared conditions.
    pub const fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// Returns the target.
    pub fn target(&self) -> &Arc<dyn Endpoint> {
        &self.target
    }

    /// Returns the route name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A controller's mappings, kept in dispatch order.
///
/// Iteration yields higher priorities first; equal priorities keep their
/// registration order.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    mappings: Vec<Mapping>,
}

impl MappingTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a mapping after every mapping of greater or equal priority.
    pub fn insert(&mut self, mapping: Mapping) {
        let at = self
            .mappings
            .partition_point(|m| m.priority >= mapping.priority);
        self.mappings.insert(at, mapping);
    }

    /// Finds the first mapping whose pattern matches `request.path_info`
    /// and whose conditions hold.
    ///
    /// A mapping whose pattern matches but whose conditions fail does not
    /// stop the search. Unknown condition names abort it with an error.
    pub fn select(
        &self,
        registry: &ConditionRegistry,
        request: &Request,
    ) -> Result<Option<(&Mapping, PatternMatch)>> {
        for mapping in &self.mappings {
            let Some(matched) = mapping.pattern.match_path(&request.path_info) else {
                continue;
            };
            if !registry.evaluate(&mapping.conditions, request)? {
                trace!(
                    pattern = mapping.pattern.source(),
                    priority = mapping.priority,
                    path = %request.path_info,
                    "conditions failed, falling through"
                );
                continue;
            }
            return Ok(Some((mapping, matched)));
        }
        Ok(None)
    }

    /// Finds a mapping by route name.
    pub fn find_named(&self, name: &str) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.name() == Some(name))
    }

    /// Iterates over the mappings in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter()
    }

    /// Returns the number of mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Removes every mapping.
    pub fn clear(&mut self) {
        self.mappings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(url: &str, priority: i32, name: &str) -> Route {
        Route::new()
            .url(url)
            .priority(priority)
            .name(name)
            .target(|_req| async { Response::ok() })
    }

    fn order(table: &MappingTable) -> Vec<&str> {
        table.iter().filter_map(Mapping::name).collect()
    }

    #[test]
    fn test_missing_url_is_configuration_error() {
        let route = Route::new().target(|_req| async { Response::ok() });
        let err = Mapping::build(route, false).unwrap_err();
        assert!(matches!(err, RouterError::Configuration { field: "url" }));
    }

    #[test]
    fn test_missing_target_is_configuration_error() {
        let err = Mapping::build(Route::new().url("/"), false).unwrap_err();
        assert!(matches!(err, RouterError::Configuration { field: "target" }));
    }

    #[test]
    fn test_priority_order_is_stable() {
        let mut table = MappingTable::new();
        table.insert(Mapping::build(route("/", 0, "a"), false).unwrap());
        table.insert(Mapping::build(route("/", 5, "b"), false).unwrap());
        table.insert(Mapping::build(route("/", 0, "c"), false).unwrap());
        table.insert(Mapping::build(route("/", 5, "d"), false).unwrap());
        table.insert(Mapping::build(route("/", -1, "e"), false).unwrap());
        assert_eq!(order(&table), ["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn test_select_falls_through_failed_conditions() {
        let mut table = MappingTable::new();
        let guarded = route("/about", 10, "guarded").condition("methods", "POST");
        table.insert(Mapping::build(guarded, false).unwrap());
        table.insert(Mapping::build(route("/about", 0, "open"), false).unwrap());

        let registry = ConditionRegistry::new();
        let (mapping, matched) = table
            .select(&registry, &Request::get("/about/us"))
            .unwrap()
            .unwrap();
        assert_eq!(mapping.name(), Some("open"));
        assert_eq!(matched.consumed, "/about".len());
    }

    #[test]
    fn test_select_without_match() {
        let mut table = MappingTable::new();
        table.insert(Mapping::build(route("/about$", 0, "about"), false).unwrap());
        let registry = ConditionRegistry::new();
        assert!(table
            .select(&registry, &Request::get("/about/us"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_select_unknown_condition_errors() {
        let mut table = MappingTable::new();
        let route = route("/", 0, "x").condition("missing", Value::Null);
        table.insert(Mapping::build(route, false).unwrap());
        let result = table.select(&ConditionRegistry::new(), &Request::get("/"));
        assert!(matches!(result, Err(RouterError::UnknownCondition { .. })));
    }

    #[test]
    fn test_clear_and_find_named() {
        let mut table = MappingTable::new();
        table.insert(Mapping::build(route("/a", 0, "a"), false).unwrap());
        assert!(table.find_named("a").is_some());
        assert!(table.find_named("b").is_none());
        table.clear();
        assert!(table.is_empty());
    }
}
