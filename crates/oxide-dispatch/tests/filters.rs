//! Tests for before/after filter ordering, gating and shared request state.

mod common;
use common::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use oxide_dispatch::{Conditions, Controller, Dispatcher, Request, Response, Route, RouterError};

fn before_logger(controller: &mut Controller, log: &Log, entry: &'static str) {
    let log = Arc::clone(log);
    controller.before(Conditions::new(), move |_req| {
        push(&log, entry);
        async {}
    });
}

fn after_logger(controller: &mut Controller, log: &Log, entry: &'static str) {
    let log = Arc::clone(log);
    controller.after(Conditions::new(), move |_req, res| {
        push(&log, entry);
        async move { res }
    });
}

#[tokio::test]
async fn before_action_after_order() {
    let log = log();
    let mut app = Controller::new("app");
    before_logger(&mut app, &log, "before");
    after_logger(&mut app, &log, "after");
    app.get("/$", recording(&log, "action")).unwrap();
    let dispatcher = Dispatcher::new(app);

    assert_eq!(get(&dispatcher, "/").await.status, 200);
    assert_eq!(entries(&log), ["before", "action", "after"]);
}

#[tokio::test]
async fn filters_fire_on_404() {
    let before = Arc::new(AtomicUsize::new(0));
    let after = Arc::new(AtomicUsize::new(0));

    let mut app = Controller::new("app");
    let counter = Arc::clone(&before);
    app.before(Conditions::new(), move |_req| {
        counter.fetch_add(1, Ordering::SeqCst);
        async {}
    });
    let counter = Arc::clone(&after);
    app.after(Conditions::new(), move |_req, res| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { res }
    });
    let dispatcher = Dispatcher::new(app);

    let res = get(&dispatcher, "/missing").await;
    assert_eq!(res.status, 404);
    assert!(res.body.is_empty());
    assert_eq!(before.load(Ordering::SeqCst), 1);
    assert_eq!(after.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn nested_filters_wrap_like_an_onion() {
    let log = log();
    let mut app = Controller::new("app");
    before_logger(&mut app, &log, "outer before");
    after_logger(&mut app, &log, "outer after");
    app.mount(Route::new().url("/inner"), |inner| {
        before_logger(inner, &log, "inner before");
        after_logger(inner, &log, "inner after");
        inner.get("/$", recording(&log, "action"))?;
        Ok(())
    })
    .unwrap();
    let dispatcher = Dispatcher::new(app);

    assert_eq!(get(&dispatcher, "/inner/").await.status, 200);
    assert_eq!(
        entries(&log),
        ["outer before", "inner before", "action", "inner after", "outer after"]
    );
}

#[tokio::test]
async fn inner_filters_only_run_when_traversed() {
    let log = log();
    let mut app = Controller::new("app");
    before_logger(&mut app, &log, "outer before");
    app.mount(Route::new().url("/inner"), |inner| {
        before_logger(inner, &log, "inner before");
        Ok(())
    })
    .unwrap();
    let dispatcher = Dispatcher::new(app);

    assert_eq!(get(&dispatcher, "/elsewhere").await.status, 404);
    assert_eq!(entries(&log), ["outer before"]);
}

#[tokio::test]
async fn filter_conditions_gate_each_hook() {
    let log = log();
    let mut app = Controller::new("app");
    let posts = Arc::clone(&log);
    app.before(Conditions::new().with("methods", "POST"), move |_req| {
        push(&posts, "post only");
        async {}
    });
    before_logger(&mut app, &log, "always");
    app.get("/", reply("ok")).unwrap();
    let dispatcher = Dispatcher::new(app);

    get(&dispatcher, "/").await;
    assert_eq!(entries(&log), ["always"]);

    dispatcher.handle(Request::post("/")).await.unwrap();
    assert_eq!(entries(&log), ["always", "post only", "always"]);
}

#[tokio::test]
async fn before_filter_can_halt() {
    let log = log();
    let mut app = Controller::new("app");
    app.before(Conditions::new(), |req| async move {
        req.get_header("Authorization")
            .is_none()
            .then(|| Response::new(401))
    });
    app.after(Conditions::new(), |_req, res: Response| async move {
        res.header("X-Filtered", "1")
    });
    app.get("/", recording(&log, "action")).unwrap();
    let dispatcher = Dispatcher::new(app);

    let res = get(&dispatcher, "/").await;
    assert_eq!(res.status, 401);
    assert_eq!(res.headers.get("X-Filtered").map(String::as_str), Some("1"));
    assert!(entries(&log).is_empty());

    let authorized = Request::get("/").header("Authorization", "Bearer t");
    let res = dispatcher.handle(authorized).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(entries(&log), ["action"]);
}

#[tokio::test]
async fn state_set_before_is_visible_to_target_and_after() {
    let mut app = Controller::new("app");
    app.before(Conditions::new(), |req| async move {
        req.locals.insert("user", "jeff").unwrap();
    });
    app.get("/$", |req: Request| async move {
        let user: String = req.locals.get_as("user").unwrap_or_default();
        req.locals.insert("greeted", true).unwrap();
        Response::text(format!("hi {user}"))
    })
    .unwrap();
    app.after(Conditions::new(), |req, res: Response| async move {
        let greeted = req.locals.get_as::<bool>("greeted").unwrap_or(false);
        res.header("X-Greeted", greeted.to_string())
    });
    let dispatcher = Dispatcher::new(app);

    let res = get(&dispatcher, "/").await;
    assert_eq!(res.body_string().as_deref(), Some("hi jeff"));
    assert_eq!(res.headers.get("X-Greeted").map(String::as_str), Some("true"));
}

#[tokio::test]
async fn after_filter_sees_captures() {
    let mut app = Controller::new("app");
    app.after(Conditions::new(), |req, res: Response| async move {
        let id = req.param("id").unwrap_or("none").to_string();
        res.header("X-Id", id)
    });
    app.get("/items/:id$", reply("item")).unwrap();
    let dispatcher = Dispatcher::new(app);

    let res = get(&dispatcher, "/items/9").await;
    assert_eq!(res.headers.get("X-Id").map(String::as_str), Some("9"));
}

#[tokio::test]
async fn after_filter_can_replace_404() {
    let mut app = Controller::new("app");
    app.after(Conditions::new(), |_req, res: Response| async move {
        if res.status == 404 {
            Response::html("<h1>Not here</h1>").status(404)
        } else {
            res
        }
    });
    let dispatcher = Dispatcher::new(app);

    let res = get(&dispatcher, "/nowhere").await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body_string().as_deref(), Some("<h1>Not here</h1>"));
}

#[tokio::test]
async fn unknown_condition_in_filter_stops_dispatch() {
    let log = log();
    let mut app = Controller::new("app");
    after_logger(&mut app, &log, "outer after");
    app.mount(Route::new().url("/inner"), |inner| {
        inner.before(Conditions::new().with("beta_user", true), |_req| async {});
        inner.get("/", recording(&log, "action"))?;
        Ok(())
    })
    .unwrap();
    let dispatcher = Dispatcher::new(app);

    let err = dispatcher.handle(Request::get("/inner/")).await.unwrap_err();
    assert!(matches!(err, RouterError::UnknownCondition { name } if name == "beta_user"));
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn after_filter_sees_path_as_before_filter_did() {
    let log = log();
    let mut app = Controller::new("app");
    app.condition("under", |arg, req| {
        arg.as_str().is_some_and(|prefix| req.path_info.starts_with(prefix))
    });
    let seen = Arc::clone(&log);
    app.after(Conditions::new(), move |req, res| {
        push(&seen, &format!("{} {}", req.script_name, req.path_info));
        async move { res }
    });
    app.after(Conditions::new().with("under", "/in"), |_req, res: Response| async move {
        res.header("X-Under", "in")
    });
    app.mount(Route::new().url("/in"), |inner| {
        inner.get("/x$", reply("x"))?;
        Ok(())
    })
    .unwrap();
    let dispatcher = Dispatcher::new(app);

    let res = get(&dispatcher, "/in/y").await;
    assert_eq!(res.status, 404);
    assert_eq!(res.headers.get("X-Under").map(String::as_str), Some("in"));
    assert_eq!(entries(&log), [" /in/y"]);
}
