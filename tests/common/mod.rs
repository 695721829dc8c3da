#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use gantry::error::StoreError;
use gantry::{BackingStore, Launch, Launchpad};

pub fn launch(id: &str, name: &str, pad: Option<&str>) -> Launch {
    Launch {
        id: id.to_string(),
        name: name.to_string(),
        launchpad: pad.map(str::to_string),
    }
}

pub fn launchpad(id: &str, name: &str) -> Launchpad {
    Launchpad {
        id: id.to_string(),
        name: name.to_string(),
        latitude: 28.5618571,
        longitude: -80.577366,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    AllLaunches,
    OneLaunch(String),
    AllLaunchpads,
    QueryLaunchpads(Vec<String>),
}

/// In-memory `BackingStore` that records every call it receives.
pub struct MockStore {
    launches: Vec<Launch>,
    launchpads: Vec<Launchpad>,
    fail_query: bool,
    calls: Mutex<Vec<StoreCall>>,
}

impl MockStore {
    pub fn new(launches: Vec<Launch>, launchpads: Vec<Launchpad>) -> Self {
        MockStore {
            launches,
            launchpads,
            fail_query: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every batched query fail with a transport error.
    pub fn failing_queries(mut self) -> Self {
        self.fail_query = true;
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    pub fn query_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::QueryLaunchpads(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().expect("call log poisoned").push(call);
    }
}

#[async_trait]
impl BackingStore for MockStore {
    async fn fetch_all_launches(&self) -> Result<Vec<Launch>, StoreError> {
        self.record(StoreCall::AllLaunches);
        Ok(self.launches.clone())
    }

    async fn fetch_one_launch(&self, id: &str) -> Result<Option<Launch>, StoreError> {
        self.record(StoreCall::OneLaunch(id.to_string()));
        Ok(self.launches.iter().find(|l| l.id == id).cloned())
    }

    async fn fetch_all_launchpads(&self) -> Result<Vec<Launchpad>, StoreError> {
        self.record(StoreCall::AllLaunchpads);
        Ok(self.launchpads.clone())
    }

    async fn query_launchpads(&self, ids: &[String]) -> Result<Vec<Launchpad>, StoreError> {
        self.record(StoreCall::QueryLaunchpads(ids.to_vec()));
        if self.fail_query {
            return Err(StoreError::Unreachable("connection refused".to_string()));
        }
        Ok(self
            .launchpads
            .iter()
            .filter(|pad| ids.contains(&pad.id))
            .cloned()
            .collect())
    }
}

/// In-process HTTP stand-in for the REST backing store. Serves the same four
/// endpoints the real store does and records every request it sees.
pub struct StubStore {
    pub launches: Vec<Value>,
    pub launchpads: Vec<Value>,
    pub fail_queries: AtomicBool,
    requests: Mutex<Vec<StubRequest>>,
}

#[derive(Clone, Debug)]
pub struct StubRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

impl StubStore {
    pub fn new(launches: Vec<Value>, launchpads: Vec<Value>) -> Self {
        StubStore {
            launches,
            launchpads,
            fail_queries: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|req| req.method == method && req.path == path)
            .count()
    }

    pub fn query_bodies(&self) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|req| req.method == "POST" && req.path == "/launchpads/query")
            .filter_map(|req| req.body)
            .collect()
    }

    fn log(&self, method: &str, path: &str, body: Option<Value>) {
        self.requests.lock().expect("request log poisoned").push(StubRequest {
            method: method.to_string(),
            path: path.to_string(),
            body,
        });
    }
}

/// Bind the stub on an ephemeral port and serve it for the rest of the test.
pub async fn spawn_stub_store(state: Arc<StubStore>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub store");
    let addr = listener.local_addr().expect("stub store addr");

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let io = TokioIo::new(stream);
            let state = Arc::clone(&state);

            tokio::spawn(async move {
                let service = service_fn(move |req| handle_stub(req, Arc::clone(&state)));
                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });
    addr
}

async fn handle_stub(
    req: Request<Incoming>,
    state: Arc<StubStore>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, std::convert::Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body_bytes = req
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();
    let body_json = serde_json::from_slice::<Value>(&body_bytes).ok();
    state.log(method.as_str(), &path, body_json.clone());

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/launches") => json_response(json!(state.launches)),
        (&Method::GET, "/launchpads") => json_response(json!(state.launchpads)),
        (&Method::POST, "/launchpads/query") => {
            if state.fail_queries.load(Ordering::SeqCst) {
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            } else {
                let wanted: Vec<String> = body_json
                    .as_ref()
                    .and_then(|body| body.pointer("/query/_id/$in"))
                    .and_then(Value::as_array)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                let docs: Vec<&Value> = state
                    .launchpads
                    .iter()
                    .filter(|pad| {
                        pad.get("id")
                            .and_then(Value::as_str)
                            .map(|id| wanted.iter().any(|w| w == id))
                            .unwrap_or(false)
                    })
                    .collect();
                json_response(json!({ "docs": docs }))
            }
        }
        (&Method::GET, _) if path.starts_with("/launches/") => {
            let id = path.trim_start_matches("/launches/");
            match state
                .launches
                .iter()
                .find(|l| l.get("id").and_then(Value::as_str) == Some(id))
            {
                Some(launch) => json_response(launch.clone()),
                None => status_response(StatusCode::NOT_FOUND),
            }
        }
        _ => status_response(StatusCode::NOT_FOUND),
    };
    Ok(response)
}

fn full<T: Into<Bytes>>(value: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(value.into())
        .map_err(|never| match never {})
        .boxed()
}

fn json_response(value: Value) -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .header("Content-Type", "application/json")
        .body(full(value.to_string()))
        .expect("build stub response")
}

fn status_response(status: StatusCode) -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .status(status)
        .body(full(""))
        .expect("build stub response")
}
