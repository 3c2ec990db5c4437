#![allow(dead_code)]

use std::future::{Ready, ready};
use std::sync::{Arc, Mutex};

use oxide_dispatch::{Dispatcher, Request, Response};

/// An ordered record of hook and handler invocations.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn push(log: &Log, entry: &str) {
    log.lock().unwrap().push(entry.to_string());
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A handler answering with a fixed text body.
pub fn reply(body: &'static str) -> impl Fn(Request) -> Ready<Response> + Send + Sync + 'static {
    move |_req: Request| ready(Response::text(body))
}

/// A handler answering with the request's captures as JSON.
pub fn echo_captures() -> impl Fn(Request) -> Ready<Response> + Send + Sync + 'static {
    |req: Request| ready(Response::json(&req.captures))
}

/// A handler that records `entry` and answers 200.
pub fn recording(
    log: &Log,
    entry: &'static str,
) -> impl Fn(Request) -> Ready<Response> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |_req: Request| {
        push(&log, entry);
        ready(Response::ok())
    }
}

pub async fn get(dispatcher: &Dispatcher, path: &str) -> Response {
    dispatcher
        .handle(Request::get(path))
        .await
        .unwrap_or_else(|e| panic!("dispatch failed for GET {path}: {e}"))
}

pub async fn body(dispatcher: &Dispatcher, path: &str) -> String {
    get(dispatcher, path)
        .await
        .body_string()
        .unwrap_or_else(|| panic!("non-utf8 body for GET {path}"))
}

pub async fn captures(dispatcher: &Dispatcher, path: &str) -> serde_json::Value {
    let res = get(dispatcher, path).await;
    assert_eq!(res.status, 200, "expected a match for GET {path}");
    serde_json::from_slice(&res.body).unwrap()
}
