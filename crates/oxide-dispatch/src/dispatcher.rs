//! Dispatch entry point and the endpoint abstraction.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::controller::Controller;
use crate::error::Result;
use crate::request::Request;
use crate::response::{Response, ResponseParts};

/// Anything a mapping can point at.
///
/// Handlers and controllers both implement it, so a mapping does not care
/// whether it ends in a leaf or in a nested controller.
pub trait Endpoint: Send + Sync {
    /// Handles a request whose `path_info` has already been advanced past
    /// the consumed prefix.
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response>>;
}

/// A boxed async handler function.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Boxes an async function into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req| f(req).boxed())
}

impl Endpoint for Handler {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        self(request).map(Ok).boxed()
    }
}

impl Endpoint for Controller {
    fn call(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        self.dispatch(request)
    }
}

/// Entry point used by the transport layer.
///
/// Wraps the fully wired root controller; cloning is cheap and clones share
/// the same controller tree.
///
/// # Example
///
/// ```
/// use oxide_dispatch::{Controller, Dispatcher, Request, Response};
///
/// # tokio_test::block_on(async {
/// let mut app = Controller::new("app");
/// app.get("/", |_req| async { Response::text("home") }).unwrap();
///
/// let dispatcher = Dispatcher::new(app);
/// let (status, _headers, body) = dispatcher.dispatch(Request::get("/")).await.unwrap();
/// assert_eq!(status, 200);
/// assert_eq!(body, vec![b"home".to_vec()]);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    root: Arc<Controller>,
}

impl Dispatcher {
    /// Freezes `root` for dispatching.
    pub fn new(root: Controller) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Returns the root controller.
    pub fn root(&self) -> &Controller {
        &self.root
    }

    /// Dispatches a request and returns the response.
    ///
    /// Errors are configuration problems found while evaluating conditions;
    /// a request that matches nothing yields a `404` response.
    pub async fn handle(&self, request: Request) -> Result<Response> {
        debug!(method = %request.method, path = %request.path, "dispatching request");
        let response = self.root.dispatch(request).await?;
        debug!(status = response.status, "request dispatched");
        Ok(response)
    }

    /// Dispatches a request and returns `(status, headers, body chunks)`.
    ///
    /// When nothing matches, this is `(404, {}, [])`.
    pub async fn dispatch(&self, request: Request) -> Result<ResponseParts> {
        Ok(self.handle(request).await?.into_parts())
    }
}
