//! Before/after hooks wrapping a controller's dispatch.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::trace;

use crate::condition::{ConditionRegistry, Conditions};
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;

/// What a before hook wants to happen next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Keep going: run the next hook, then the mapping table.
    Continue,
    /// Stop and answer with this response.
    ///
    /// The controller's remaining before hooks and its mapping table are
    /// skipped; its after hooks still see the response.
    Halt(Response),
}

impl From<()> for Flow {
    fn from((): ()) -> Self {
        Self::Continue
    }
}

impl From<Response> for Flow {
    fn from(response: Response) -> Self {
        Self::Halt(response)
    }
}

impl From<Option<Response>> for Flow {
    fn from(response: Option<Response>) -> Self {
        response.map_or(Self::Continue, Self::Halt)
    }
}

/// A boxed before hook.
pub type BeforeHook = Arc<dyn Fn(Request) -> BoxFuture<'static, Flow> + Send + Sync>;

/// A boxed after hook. It receives the response produced so far and
/// returns the one to pass outwards.
pub type AfterHook = Arc<dyn Fn(Request, Response) -> BoxFuture<'static, Response> + Send + Sync>;

/// A hook together with the conditions gating it.
#[derive(Clone)]
pub struct FilterEntry<H> {
    /// Conditions that must hold for the hook to run.
    pub conditions: Conditions,
    /// The hook itself.
    pub hook: H,
}

impl<H> fmt::Debug for FilterEntry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEntry")
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

/// The ordered before and after hooks of one controller.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    before: Vec<FilterEntry<BeforeHook>>,
    after: Vec<FilterEntry<AfterHook>>,
}

impl FilterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a before hook.
    ///
    /// The hook may resolve to `()` to continue, or to a [`Response`] (or
    /// `Option<Response>`, or [`Flow`]) to halt.
    pub fn before<F, Fut, O>(&mut self, conditions: Conditions, hook: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Into<Flow> + 'static,
    {
        let hook: BeforeHook = Arc::new(move |req| hook(req).map(Into::<Flow>::into).boxed());
        self.before.push(FilterEntry { conditions, hook });
    }

    /// Appends an after hook.
    pub fn after<F, Fut>(&mut self, conditions: Conditions, hook: F)
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let hook: AfterHook = Arc::new(move |req, res| hook(req, res).boxed());
        self.after.push(FilterEntry { conditions, hook });
    }

    /// Runs the before hooks whose conditions hold, in order.
    ///
    /// Returns the response of the first hook that halts, if any.
    pub async fn run_before(
        &self,
        registry: &ConditionRegistry,
        request: &Request,
    ) -> Result<Option<Response>> {
        for (index, entry) in self.before.iter().enumerate() {
            if !registry.evaluate(&entry.conditions, request)? {
                trace!(index, path = %request.path, "before filter skipped");
                continue;
            }
            trace!(index, path = %request.path, "running before filter");
            if let Flow::Halt(response) = (entry.hook)(request.clone()).await {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Runs the after hooks whose conditions hold, in order, threading the
    /// response through them.
    pub async fn run_after(
        &self,
        registry: &ConditionRegistry,
        request: &Request,
        mut response: Response,
    ) -> Result<Response> {
        for (index, entry) in self.after.iter().enumerate() {
            if !registry.evaluate(&entry.conditions, request)? {
                trace!(index, path = %request.path, "after filter skipped");
                continue;
            }
            trace!(index, path = %request.path, "running after filter");
            response = (entry.hook)(request.clone(), response).await;
        }
        Ok(response)
    }

    /// Returns the before hooks.
    pub fn before_filters(&self) -> &[FilterEntry<BeforeHook>] {
        &self.before
    }

    /// Returns the after hooks.
    pub fn after_filters(&self) -> &[FilterEntry<AfterHook>] {
        &self.after
    }

    /// Returns `true` if the chain has no hook at all.
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Removes every hook.
    pub fn clear(&mut self) {
        self.before.clear();
        self.after.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::RouterError;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_before_runs_in_order() {
        let log = recorder();
        let mut chain = FilterChain::new();
        for name in ["first", "second"] {
            let log = Arc::clone(&log);
            chain.before(Conditions::new(), move |_req| {
                log.lock().unwrap().push(name.to_string());
                async {}
            });
        }

        let halted = chain
            .run_before(&ConditionRegistry::new(), &Request::get("/"))
            .await
            .unwrap();
        assert!(halted.is_none());
        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
    }

    #[tokio::test]
    async fn test_halt_stops_later_hooks() {
        let log = recorder();
        let mut chain = FilterChain::new();
        chain.before(Conditions::new(), |_req| async { Response::new(403) });
        let later = Arc::clone(&log);
        chain.before(Conditions::new(), move |_req| {
            later.lock().unwrap().push("later".to_string());
            async {}
        });

        let halted = chain
            .run_before(&ConditionRegistry::new(), &Request::get("/"))
            .await
            .unwrap();
        assert_eq!(halted.map(|r| r.status), Some(403));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conditions_gate_hooks() {
        let mut chain = FilterChain::new();
        chain.after(Conditions::new().with("methods", "POST"), |_req, res: Response| async move {
            res.header("X-Posted", "yes")
        });
        chain.after(Conditions::new(), |_req, res: Response| async move {
            res.header("X-Always", "yes")
        });

        let registry = ConditionRegistry::new();
        let res = chain
            .run_after(&registry, &Request::get("/"), Response::ok())
            .await
            .unwrap();
        assert!(!res.headers.contains_key("X-Posted"));
        assert!(res.headers.contains_key("X-Always"));
    }

    #[tokio::test]
    async fn test_unknown_condition_in_filter() {
        let mut chain = FilterChain::new();
        chain.before(Conditions::new().with("nope", true), |_req| async {});
        let err = chain
            .run_before(&ConditionRegistry::new(), &Request::get("/"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::UnknownCondition { .. }));
    }

    #[test]
    fn test_flow_conversions() {
        assert_eq!(Flow::from(()), Flow::Continue);
        assert_eq!(Flow::from(None::<Response>), Flow::Continue);
        assert_eq!(Flow::from(Response::new(401)), Flow::Halt(Response::new(401)));
    }
}
