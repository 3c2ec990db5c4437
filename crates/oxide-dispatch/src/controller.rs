//! Controllers: composable units of routes, filters, conditions and config.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::condition::{ConditionRegistry, Conditions};
use crate::config::ControllerConfig;
use crate::dispatcher::{Handler, handler};
use crate::error::{Result, RouterError};
use crate::filter::{FilterChain, Flow};
use crate::mapping::{Mapping, MappingTable, Route};
use crate::pattern::PatternSource;
use crate::request::{Method, Request};
use crate::response::Response;

/// Template state new controllers start from.
///
/// Each controller receives its own clone, so changing a controller never
/// changes the template it came from.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    /// Initial configuration.
    pub config: ControllerConfig,
    /// Initial condition set.
    pub conditions: ConditionRegistry,
}

impl Defaults {
    /// Creates the built-in defaults: eager wildcards and the `methods`
    /// condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty controller seeded with copies of these defaults.
    pub fn controller(&self, name: impl Into<String>) -> Controller {
        Controller {
            name: name.into(),
            mappings: MappingTable::new(),
            filters: FilterChain::new(),
            conditions: self.conditions.clone(),
            config: self.config.clone(),
        }
    }
}

/// A unit owning one mapping table, one filter chain, one condition
/// registry and one configuration.
///
/// Controllers nest: a sub-controller is the target of a mapping in its
/// parent and receives the path left over by that mapping. Sub-controllers
/// copy the parent's conditions and configuration when created and never
/// look at the parent again.
///
/// # Example
///
/// ```
/// use oxide_dispatch::{Controller, Response, Route};
///
/// let mut app = Controller::new("app");
/// app.get("/$", |_req| async { Response::text("home") }).unwrap();
/// app.mount(Route::new().url("/admin"), |admin| {
///     admin.get("/users$", |_req| async { Response::text("users") })?;
///     Ok(())
/// })
/// .unwrap();
/// assert_eq!(app.mappings().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Controller {
    name: String,
    mappings: MappingTable,
    filters: FilterChain,
    conditions: ConditionRegistry,
    config: ControllerConfig,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new("controller")
    }
}

impl Controller {
    /// Creates a standalone controller from the built-in defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Defaults::new().controller(name)
    }

    /// Creates a standalone controller that starts as a copy of `base`.
    pub fn extending(name: impl Into<String>, base: &Self) -> Self {
        let mut controller = base.clone();
        controller.name = name.into();
        controller
    }

    /// Returns the controller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the configuration for modification.
    pub fn config_mut(&mut self) -> &mut ControllerConfig {
        &mut self.config
    }

    /// Returns the condition registry.
    pub const fn conditions(&self) -> &ConditionRegistry {
        &self.conditions
    }

    /// Returns the mapping table.
    pub const fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    /// Returns the filter chain.
    pub const fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Adds or overrides a named condition predicate.
    pub fn condition<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&Value, &Request) -> bool + Send + Sync + 'static,
    {
        self.conditions.register(name, predicate);
        self
    }

    /// Registers a mapping.
    ///
    /// Fails with [`RouterError::Configuration`] if the route lacks a `url`
    /// or a target. Conditions are not checked until dispatch.
    pub fn map(&mut self, route: Route) -> Result<&mut Self> {
        let mapping = Mapping::build(route, self.config.match_lazily)?;
        debug!(
            controller = %self.name,
            pattern = mapping.pattern().source(),
            priority = mapping.priority(),
            "mapping registered"
        );
        self.mappings.insert(mapping);
        Ok(self)
    }

    /// Registers `route` with `target` and returns the boxed target, so it
    /// can also be used outside this controller.
    pub fn action<F, Fut>(&mut self, route: Route, target: F) -> Result<Handler>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let target = handler(target);
        self.map(route.endpoint(Arc::clone(&target)))?;
        Ok(target)
    }

    /// Registers a handler restricted to one method.
    pub fn route<F, Fut>(
        &mut self,
        method: Method,
        url: impl Into<PatternSource>,
        target: F,
    ) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.map(
            Route::new()
                .url(url)
                .condition("methods", method)
                .target(target),
        )
    }

    /// Registers a GET handler.
    pub fn get<F, Fut>(&mut self, url: impl Into<PatternSource>, target: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::Get, url, target)
    }

    /// Registers a POST handler.
    pub fn post<F, Fut>(&mut self, url: impl Into<PatternSource>, target: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::Post, url, target)
    }

    /// Registers a PUT handler.
    pub fn put<F, Fut>(&mut self, url: impl Into<PatternSource>, target: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::Put, url, target)
    }

    /// Registers a PATCH handler.
    pub fn patch<F, Fut>(&mut self, url: impl Into<PatternSource>, target: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::Patch, url, target)
    }

    /// Registers a DELETE handler.
    pub fn delete<F, Fut>(&mut self, url: impl Into<PatternSource>, target: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::Delete, url, target)
    }

    /// Registers a HEAD handler.
    pub fn head<F, Fut>(&mut self, url: impl Into<PatternSource>, target: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::Head, url, target)
    }

    /// Registers an OPTIONS handler.
    pub fn options<F, Fut>(&mut self, url: impl Into<PatternSource>, target: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::Options, url, target)
    }

    /// Appends a before filter gated by `conditions`.
    ///
    /// See [`FilterChain::before`] for what the hook may return.
    pub fn before<F, Fut, O>(&mut self, conditions: Conditions, hook: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Into<Flow> + 'static,
    {
        self.filters.before(conditions, hook);
        self
    }

    /// Appends an after filter gated by `conditions`.
    pub fn after<F, Fut>(&mut self, conditions: Conditions, hook: F) -> &mut Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.filters.after(conditions, hook);
        self
    }

    /// Creates a sub-controller, lets `body` configure it and mounts it at
    /// `route`.
    ///
    /// The sub-controller starts empty, with copies of this controller's
    /// conditions and configuration. `route` needs a `url`; its target
    /// defaults to the new sub-controller.
    pub fn mount<B>(&mut self, route: Route, body: B) -> Result<&mut Self>
    where
        B: FnOnce(&mut Self) -> Result<()>,
    {
        let base = Defaults::new().controller(String::new());
        self.mount_extending(route, &base, body)
    }

    /// Like [`Controller::mount`], but the sub-controller starts as a copy
    /// of `base`, keeping its mappings and filters.
    ///
    /// Conditions registered on `base` are kept unless this controller has
    /// one of the same name, in which case this controller's wins.
    pub fn mount_extending<B>(
        &mut self,
        mut route: Route,
        base: &Self,
        body: B,
    ) -> Result<&mut Self>
    where
        B: FnOnce(&mut Self) -> Result<()>,
    {
        let Some(url) = route.url.as_ref() else {
            return Err(RouterError::Configuration { field: "url" });
        };

        let name = route.name.clone().unwrap_or_else(|| match url {
            PatternSource::Spec(spec) => format!("{}{spec}", self.name),
            PatternSource::Raw(regex) => format!("{}{}", self.name, regex.as_str()),
        });
        let mut child = Self::extending(name, base);
        child.conditions.merge(&self.conditions);
        child.config = self.config.clone();

        body(&mut child)?;

        if route.target.is_none() {
            route = route.endpoint(child);
        }
        self.map(route)
    }

    /// Builds the path of a named mapping of this controller from named
    /// capture values.
    ///
    /// The path is relative to this controller's mount point.
    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> Option<String> {
        self.mappings
            .find_named(name)
            .and_then(|m| m.pattern().reverse(params, &[]))
    }

    /// Restores the built-in state: no mappings, no filters, default
    /// conditions and configuration.
    pub fn reset(&mut self) {
        self.reset_to(&Defaults::new());
    }

    /// Restores the state of a fresh controller built from `defaults`.
    pub fn reset_to(&mut self, defaults: &Defaults) {
        let name = std::mem::take(&mut self.name);
        *self = defaults.controller(name);
    }

    /// Runs this controller for `request`.
    ///
    /// Before filters run first, then the first matching mapping's target,
    /// then the after filters. Filters run even if no mapping matches, in
    /// which case the response is an empty `404`. Errors return at once
    /// without running any further filter.
    ///
    /// After filters see the same `script_name` and `path_info` as the
    /// before filters, along with the captures of the selected mapping.
    pub fn dispatch(&self, mut request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(async move {
            let halted = self.filters.run_before(&self.conditions, &request).await?;

            let response = match halted {
                Some(response) => {
                    debug!(
                        controller = %self.name,
                        status = response.status,
                        "halted by before filter"
                    );
                    response
                }
                None => {
                    let script_name = request.script_name.clone();
                    let path_info = request.path_info.clone();
                    let response = self.run_mapping(&mut request).await?;
                    request.script_name = script_name;
                    request.path_info = path_info;
                    response
                }
            };

            self.filters
                .run_after(&self.conditions, &request, response)
                .await
        })
    }

    async fn run_mapping(&self, request: &mut Request) -> Result<Response> {
        let Some((mapping, matched)) = self.mappings.select(&self.conditions, request)? else {
            debug!(controller = %self.name, path = %request.path_info, "no mapping matched");
            return Ok(Response::not_found());
        };

        debug!(
            controller = %self.name,
            pattern = mapping.pattern().source(),
            priority = mapping.priority(),
            path = %request.path_info,
            "mapping selected"
        );

        request.captures = matched.captures;
        request.advance(matched.consumed);
        mapping.target().call(request.clone()).await
    }
}
