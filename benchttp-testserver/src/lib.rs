use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_HELLO: &str = "/hello";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_SLEEP: &str = "/sleep";
pub const PATH_STATUS: &str = "/status";
pub const PATH_REDIRECT: &str = "/redirect";
pub const PATH_HEADERS: &str = "/headers";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    head_requests_total: Arc<AtomicU64>,
    saw_test_header: Arc<AtomicU64>,
    saw_basic_auth: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    peak_in_flight: Arc<AtomicU64>,
}

impl TestServerStats {
    fn enter(&self) -> InFlightGuard {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            in_flight: self.in_flight.clone(),
        }
    }

    fn inc_head_requests_total(&self) {
        self.head_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_saw_test_header(&self) {
        self.saw_test_header.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_saw_basic_auth(&self) {
        self.saw_basic_auth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn head_requests_total(&self) -> u64 {
        self.head_requests_total.load(Ordering::Relaxed)
    }

    pub fn saw_test_header(&self) -> u64 {
        self.saw_test_header.load(Ordering::Relaxed)
    }

    pub fn saw_basic_auth(&self) -> u64 {
        self.saw_basic_auth.load(Ordering::Relaxed)
    }

    /// Highest number of requests that were being handled at the same time.
    pub fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

// Dropped with the handler future, so aborted requests are accounted for as well.
struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    pub hello: String,
    pub slow: String,
    pub redirect: String,
    pub headers: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            hello: format!("{base_url}{PATH_HELLO}"),
            slow: format!("{base_url}{PATH_SLOW}"),
            redirect: format!("{base_url}{PATH_REDIRECT}"),
            headers: format!("{base_url}{PATH_HEADERS}"),
            base_url,
        }
    }

    pub fn status(&self, code: u16) -> String {
        format!("{}{PATH_STATUS}/{code}", self.base_url)
    }

    pub fn sleep(&self, ms: u64) -> String {
        format!("{}{PATH_SLEEP}?ms={ms}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct SleepParams {
    ms: u64,
}

async fn track_in_flight(State(stats): State<TestServerStats>, req: Request, next: Next) -> Response {
    let _guard = stats.enter();
    next.run(req).await
}

async fn handle_hello(State(stats): State<TestServerStats>, method: Method) -> &'static str {
    if method == Method::HEAD {
        stats.inc_head_requests_total();
    }
    "Hello World!"
}

async fn handle_slow() -> &'static str {
    sleep(Duration::from_millis(50)).await;
    "slow"
}

async fn handle_sleep(Query(params): Query<SleepParams>) -> &'static str {
    sleep(Duration::from_millis(params.ms)).await;
    "slept"
}

async fn handle_status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn handle_redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, PATH_HELLO)])
}

async fn handle_headers(State(stats): State<TestServerStats>, headers: HeaderMap) -> StatusCode {
    if headers.get("x-test").and_then(|v| v.to_str().ok()) == Some("1") {
        stats.inc_saw_test_header();
    }
    if headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "))
    {
        stats.inc_saw_basic_auth();
    }
    StatusCode::OK
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_HELLO, get(handle_hello))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_SLEEP, get(handle_sleep))
        .route(&format!("{PATH_STATUS}/{{code}}"), get(handle_status))
        .route(PATH_REDIRECT, get(handle_redirect))
        .route(PATH_HEADERS, get(handle_headers))
        .layer(middleware::from_fn_with_state(stats.clone(), track_in_flight))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    urls: TestServerUrls,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();

        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let base_url = format!("http://{addr}");
        let urls = TestServerUrls::new(base_url.clone());

        Ok(Self {
            addr,
            base_url,
            urls,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

/// Returns a loopback address nothing is listening on.
pub async fn refused_addr() -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}
