//! # oxide-dispatch
//!
//! The routing and dispatch core of a small web framework.
//!
//! This crate provides:
//! - Path specifications with wildcards and named captures, or raw regexes
//! - Priority-ordered mappings with fallthrough on failed conditions
//! - Named, parameterized conditions guarding mappings and filters
//! - Before/after filters that nest across controllers
//! - Controllers that mount sub-controllers and copy their settings down
//!
//! Transport, body parsing and rendering are left to the caller: a
//! [`Request`] goes in, a [`Response`] (or its `(status, headers, body)`
//! parts) comes out.
//!
//! ## Quick Start
//!
//! ```
//! use oxide_dispatch::{Controller, Dispatcher, Request, Response};
//!
//! # tokio_test::block_on(async {
//! let mut app = Controller::new("app");
//! app.get("/hello/:name$", |req| async move {
//!     let name = req.param("name").unwrap_or("world").to_string();
//!     Response::text(format!("Hello, {name}!"))
//! })
//! .unwrap();
//!
//! let dispatcher = Dispatcher::new(app);
//! let res = dispatcher.handle(Request::get("/hello/jeff")).await.unwrap();
//! assert_eq!(res.body_string(), Some("Hello, jeff!".to_string()));
//!
//! let (status, _, body) = dispatcher.dispatch(Request::get("/nope")).await.unwrap();
//! assert_eq!(status, 404);
//! assert!(body.is_empty());
//! # });
//! ```
//!
//! ## Path Specifications
//!
//! | Token     | Matches                                     | Capture     |
//! |-----------|---------------------------------------------|-------------|
//! | `literal` | itself                                      | none        |
//! | `*`       | one segment (shortest with `match_lazily`)  | positional  |
//! | `**`      | one or more segments                        | positional  |
//! | `:name`   | one segment                                 | named       |
//! | `::name`  | the rest of the path                        | named       |
//! | `$`       | (trailing) the end of the path              | none        |
//!
//! Patterns match a prefix of the path unless they end in `$`. If a pattern
//! has any named capture, only named captures are exposed.
//!
//! ## Priorities and Conditions
//!
//! ```
//! use oxide_dispatch::{Controller, Response, Route};
//!
//! let mut app = Controller::new("app");
//! app.condition("ajax", |arg, req| {
//!     req.get_header("X-Requested-With").is_some() == arg.as_bool().unwrap_or(true)
//! });
//! app.map(
//!     Route::new()
//!         .url("/items$")
//!         .priority(10)
//!         .condition("ajax", true)
//!         .target(|_req| async { Response::json(&serde_json::json!([])) }),
//! )
//! .unwrap();
//! // Tried when the request is not an ajax request.
//! app.get("/items$", |_req| async { Response::html("<ul></ul>") })
//!     .unwrap();
//! ```
//!
//! ## Filters and Nesting
//!
//! ```
//! use oxide_dispatch::{Conditions, Controller, Response, Route};
//!
//! let mut app = Controller::new("app");
//! app.before(Conditions::new(), |req| async move {
//!     req.locals.insert("started", true).unwrap();
//! });
//! app.mount(Route::new().url("/admin"), |admin| {
//!     admin.before(Conditions::new(), |req| async move {
//!         if req.get_header("Authorization").is_none() {
//!             return Some(Response::new(401));
//!         }
//!         None
//!     });
//!     admin.get("/$", |_req| async { Response::text("dashboard") })?;
//!     Ok(())
//! })
//! .unwrap();
//! ```

mod condition;
mod config;
mod controller;
mod dispatcher;
mod error;
mod filter;
mod mapping;
mod pattern;
mod request;
mod response;

pub use condition::{ConditionRegistry, Conditions, Predicate};
pub use config::ControllerConfig;
pub use controller::{Controller, Defaults};
pub use dispatcher::{Dispatcher, Endpoint, Handler, handler};
pub use error::{Result, RouterError};
pub use filter::{AfterHook, BeforeHook, FilterChain, FilterEntry, Flow};
pub use mapping::{Mapping, MappingTable, Route};
pub use pattern::{Captures, PatternMatch, PatternSource, RoutePattern};
pub use request::{Locals, Method, Request};
pub use response::{Response, ResponseParts};
