//! In-process HTTP file server for download tests.

use crate::types::Target;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const FILE_PATH: &str = "/files/sample.bin";

/// Deterministic, non-repeating-looking test content.
pub(crate) fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 251) % 251) as u8).collect()
}

struct MockState {
    body: Vec<u8>,
    honor_ranges: bool,
    head_status: StatusCode,
    fail_starts: Vec<u64>,
    truncate_starts: Vec<u64>,
    stagger: Option<Duration>,
    total_requests: AtomicUsize,
    range_requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    ranges: Mutex<Vec<String>>,
}

pub(crate) struct MockServerBuilder {
    body: Vec<u8>,
    honor_ranges: bool,
    head_status: StatusCode,
    fail_starts: Vec<u64>,
    truncate_starts: Vec<u64>,
    stagger: Option<Duration>,
}

impl MockServerBuilder {
    pub(crate) fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// When false, ranged GETs get the whole body with status 200.
    pub(crate) fn honor_ranges(mut self, honor: bool) -> Self {
        self.honor_ranges = honor;
        self
    }

    pub(crate) fn head_status(mut self, status: StatusCode) -> Self {
        self.head_status = status;
        self
    }

    /// Answer ranges starting at `start` with HTTP 500.
    pub(crate) fn fail_chunk_at(mut self, start: u64) -> Self {
        self.fail_starts.push(start);
        self
    }

    /// Break the connection half-way through the body of ranges starting at `start`.
    pub(crate) fn truncate_chunk_at(mut self, start: u64) -> Self {
        self.truncate_starts.push(start);
        self
    }

    /// Delay ranged responses so that windows nearer the end of the file
    /// complete first. The first byte waits `10 * step`, the last almost nothing.
    pub(crate) fn later_chunks_first(mut self, step: Duration) -> Self {
        self.stagger = Some(step);
        self
    }

    pub(crate) async fn start(self) -> MockServer {
        let state = Arc::new(MockState {
            body: self.body,
            honor_ranges: self.honor_ranges,
            head_status: self.head_status,
            fail_starts: self.fail_starts,
            truncate_starts: self.truncate_starts,
            stagger: self.stagger,
            total_requests: AtomicUsize::new(0),
            range_requests: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(FILE_PATH, get(serve_file))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockServer {
            addr,
            state,
            handle,
        }
    }
}

pub(crate) struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub(crate) fn builder() -> MockServerBuilder {
        MockServerBuilder {
            body: Vec::new(),
            honor_ranges: true,
            head_status: StatusCode::OK,
            fail_starts: Vec::new(),
            truncate_starts: Vec::new(),
            stagger: None,
        }
    }

    pub(crate) fn target(&self) -> Target {
        Target::parse(&format!("http://{}{}", self.addr, FILE_PATH)).unwrap()
    }

    /// Requests of any kind, HEAD included.
    pub(crate) fn total_requests(&self) -> usize {
        self.state.total_requests.load(Ordering::SeqCst)
    }

    /// Requests that carried a `Range` header.
    pub(crate) fn range_requests(&self) -> usize {
        self.state.range_requests.load(Ordering::SeqCst)
    }

    /// `Range` header values in arrival order.
    pub(crate) fn ranges_served(&self) -> Vec<String> {
        self.state.ranges.lock().unwrap().clone()
    }

    /// Highest number of ranged requests being handled at once.
    pub(crate) fn max_concurrent_ranges(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown(self) {
        drop(self);
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct InFlight<'a>(&'a MockState);

impl<'a> InFlight<'a> {
    fn enter(state: &'a MockState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    (start <= end).then_some((start, end))
}

/// Sends the headers and half the window, then breaks the connection.
fn truncated_body(start: u64, end: u64, len: u64, mut slice: Vec<u8>) -> Response {
    let declared = slice.len();
    slice.truncate(declared / 2);
    let pieces: Vec<Result<Vec<u8>, io::Error>> = vec![
        Ok(slice),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "dropped")),
    ];
    (
        StatusCode::PARTIAL_CONTENT,
        [
            (CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, len)),
            (CONTENT_LENGTH, declared.to_string()),
        ],
        Body::from_stream(stream::iter(pieces)),
    )
        .into_response()
}

fn full_body(state: &MockState) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_LENGTH, state.body.len().to_string())],
        state.body.clone(),
    )
        .into_response()
}

async fn serve_file(
    State(state): State<Arc<MockState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    state.total_requests.fetch_add(1, Ordering::SeqCst);

    if method == Method::HEAD && state.head_status != StatusCode::OK {
        return state.head_status.into_response();
    }

    let Some(range) = headers.get(RANGE).and_then(|v| v.to_str().ok()) else {
        return full_body(&state);
    };
    state.range_requests.fetch_add(1, Ordering::SeqCst);
    state.ranges.lock().unwrap().push(range.to_string());

    if !state.honor_ranges {
        return full_body(&state);
    }
    let Some((start, end)) = parse_range(range) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let _in_flight = InFlight::enter(&state);
    let len = state.body.len() as u64;

    if let Some(step) = state.stagger {
        if end > start && len > 0 {
            let remaining = len.saturating_sub(start) as f64 / len as f64;
            tokio::time::sleep(step.mul_f64(remaining * 10.0)).await;
        }
    }

    // Injected failures leave the one-byte range check alone.
    if end > start && state.fail_starts.contains(&start) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    if start >= len {
        return (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(CONTENT_RANGE, format!("bytes */{}", len))],
        )
            .into_response();
    }

    let end = end.min(len - 1);
    let slice = state.body[start as usize..=end as usize].to_vec();

    if end > start && state.truncate_starts.contains(&start) {
        return truncated_body(start, end, len, slice);
    }
    (
        StatusCode::PARTIAL_CONTENT,
        [(CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, len))],
        slice,
    )
        .into_response()
}
