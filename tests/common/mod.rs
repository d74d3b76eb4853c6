#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use unity_cup_terminal::auth::Clock;
use unity_cup_terminal::error::ApiError;
use unity_cup_terminal::transport::{HttpRequest, HttpResponse, Method, Transport};

pub const BASE: &str = "http://league.test/api";
pub const NOW: i64 = 1_750_000_000;

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Unsigned JWT whose payload carries only `exp`.
pub fn jwt(exp: i64) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig")
}

pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn at(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
enum Reply {
    Http(HttpResponse),
    Down,
}

struct Route {
    method: Method,
    fragment: String,
    replies: Vec<Reply>,
    delay: Option<Duration>,
}

/// In-memory transport. Each route answers with its queued replies in
/// order and keeps repeating the last one. Unrouted requests get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: Method, fragment: &str, status: u16, body: &str) -> Self {
        self.push(
            method,
            fragment,
            Reply::Http(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn down(self, method: Method, fragment: &str) -> Self {
        self.push(method, fragment, Reply::Down);
        self
    }

    pub fn delay(self, method: Method, fragment: &str, delay: Duration) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            if let Some(route) = routes
                .iter_mut()
                .find(|r| r.method == method && r.fragment == fragment)
            {
                route.delay = Some(delay);
            }
        }
        self
    }

    fn push(&self, method: Method, fragment: &str, reply: Reply) {
        let mut routes = self.routes.lock().expect("routes lock");
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.fragment == fragment)
        {
            Some(route) => route.replies.push(reply),
            None => routes.push(Route {
                method,
                fragment: fragment.to_string(),
                replies: vec![reply],
                delay: None,
            }),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().expect("log lock").clone()
    }

    pub fn count(&self, method: Method, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url.contains(fragment))
            .count()
    }

    pub fn last(&self, method: Method, fragment: &str) -> Option<HttpRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.url.contains(fragment))
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.log.lock().expect("log lock").push(request.clone());
        let (reply, delay) = {
            let mut routes = self.routes.lock().expect("routes lock");
            // Longest fragment wins so `/token/refresh/` beats `/token/`.
            let route = routes
                .iter_mut()
                .filter(|r| r.method == request.method && request.url.contains(&r.fragment))
                .max_by_key(|r| r.fragment.len());
            match route {
                Some(route) => {
                    let reply = if route.replies.len() > 1 {
                        route.replies.remove(0)
                    } else {
                        route.replies[0].clone()
                    };
                    (reply, route.delay)
                }
                None => (
                    Reply::Http(HttpResponse {
                        status: 404,
                        body: format!("no route for {}", request.url),
                    }),
                    None,
                ),
            }
        };
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        match reply {
            Reply::Http(resp) => Ok(resp),
            Reply::Down => Err(ApiError::Network("connection refused".to_string())),
        }
    }
}
