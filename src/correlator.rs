use crate::init;
use crate::record::{severity_for_status, LogRecord, RecordClass};
use crate::router::{Category, EmissionRouter};
use crate::timing::humanize_duration;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, Response, StatusCode};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use uuid::Uuid;

/// Inbound header that marks a call as part of an existing request chain.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Fallback client-address header when no peer address is available.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Reported when the connection went away before a response existed.
/// 499 is the nginx convention for client-abandoned requests.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Fresh identifier for one request lifecycle.
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Fresh identifier shared across service boundaries.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Middleware factory bound to the process-wide emission router.
///
/// The router is resolved when a request completes, so the layer may be
/// built before `configure_message_bus`/`configure_aggregator` run.
pub fn request_correlator() -> CorrelatorLayer {
    CorrelatorLayer::new()
}

/// Tower layer producing [`Correlator`] services.
#[derive(Clone, Default)]
pub struct CorrelatorLayer {
    router: Option<Arc<EmissionRouter>>,
}

impl CorrelatorLayer {
    pub fn new() -> Self {
        CorrelatorLayer { router: None }
    }

    /// Use an explicitly injected router instead of the process-wide one.
    pub fn with_router(router: Arc<EmissionRouter>) -> Self {
        CorrelatorLayer {
            router: Some(router),
        }
    }
}

impl<S> Layer<S> for CorrelatorLayer {
    type Service = Correlator<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Correlator {
            inner,
            router: self.router.clone(),
        }
    }
}

/// Service wrapper that observes one request lifecycle and emits the
/// request/response record pair on its single terminal event.
#[derive(Clone)]
pub struct Correlator<S> {
    inner: S,
    router: Option<Arc<EmissionRouter>>,
}

impl<S> Service<Request<Body>> for Correlator<S>
where
    S: Service<Request<Body>, Response = Response<Body>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let session = CorrelatorSession::begin(&req, self.router.clone());
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut session = session;
            // A downstream failure is re-raised untouched; the session
            // travels with this future, so dropping it still closes the
            // pair exactly once.
            let response = future.await?;
            session.note_status(response.status());
            Ok(response.map(|inner| Body::new(ObservedBody { inner, session })))
        })
    }
}

/// Per-request bookkeeping: identity captured at entry, the one-shot
/// completion flag, and everything needed to build the record pair.
///
/// The session is the armed terminal listener. Whoever reaches it first
/// (body end-of-stream, body error, or drop) completes it; every later
/// signal is a no-op.
struct CorrelatorSession {
    router: Option<Arc<EmissionRouter>>,
    method: String,
    url: String,
    path: String,
    host: Option<String>,
    client: Option<String>,
    correlation_header: Option<String>,
    request_time: DateTime<Utc>,
    started: Instant,
    status: Option<StatusCode>,
    completed: bool,
}

impl CorrelatorSession {
    fn begin(req: &Request<Body>, router: Option<Arc<EmissionRouter>>) -> Self {
        let headers = req.headers();
        let client = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string())
            .or_else(|| header_value(headers, FORWARDED_FOR_HEADER));

        CorrelatorSession {
            router,
            method: req.method().to_string(),
            url: req.uri().to_string(),
            path: req.uri().path().to_string(),
            host: headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            client,
            correlation_header: header_value(headers, CORRELATION_HEADER),
            request_time: Utc::now(),
            started: Instant::now(),
            status: None,
            completed: false,
        }
    }

    fn note_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Process the terminal event. Identifiers, classification and
    /// timestamps are computed here exactly once and threaded into both
    /// records; a second call is a no-op.
    fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;

        let Some(router) = self.router.take().or_else(init::current_router) else {
            return;
        };

        let response_time = Utc::now();
        let resolution_time = humanize_duration(self.started.elapsed());

        let class = if self.correlation_header.is_some() {
            RecordClass::ServiceRequest
        } else {
            RecordClass::ClientRequest
        };
        let correlation_id = self
            .correlation_header
            .take()
            .unwrap_or_else(new_correlation_id);
        let request_id = new_request_id();

        let (status, status_text) = match self.status {
            Some(s) => (s.as_u16(), s.canonical_reason().unwrap_or("")),
            None => (CLIENT_CLOSED_REQUEST, "Client Closed Request"),
        };

        let request = LogRecord {
            class,
            host: self.host.clone(),
            pid: None,
            severity: "INFO".to_string(),
            message: format!("{} {}", self.method, self.url),
            request_id: Some(request_id.clone()),
            correlation_id: Some(correlation_id.clone()),
            trace: None,
            client: self.client.clone(),
            path: Some(self.path.clone()),
            method: Some(self.method.clone()),
            status: None,
            request_time: Some(self.request_time),
            response_time: None,
            resolution_time: None,
            metadata: BTreeMap::new(),
        };

        let response = LogRecord {
            class,
            host: self.host.clone(),
            pid: None,
            severity: severity_for_status(status).to_string(),
            message: format!("{} {} {}", status, status_text, self.url),
            request_id: Some(request_id),
            correlation_id: Some(correlation_id),
            trace: None,
            client: self.client.clone(),
            path: Some(self.path.clone()),
            method: Some(self.method.clone()),
            status: Some(status),
            request_time: None,
            response_time: Some(response_time),
            resolution_time: Some(resolution_time),
            metadata: BTreeMap::new(),
        };

        router.route(Category::Request, request);
        router.route(Category::Response, response);
    }
}

impl Drop for CorrelatorSession {
    fn drop(&mut self) {
        // Abnormal close: the wrapper (or the whole response future)
        // went away before end-of-stream.
        self.complete();
    }
}

fn header_value(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Response body wrapper that reports the finish signal.
///
/// End-of-stream (or a body error) completes the session; dropping the
/// wrapper without reaching end-of-stream lets the session's own drop
/// report the close signal instead.
struct ObservedBody {
    inner: Body,
    session: CorrelatorSession,
}

impl http_body::Body for ObservedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Bytes>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(None) => {
                this.session.complete();
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.session.complete();
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> http_body::SizeHint {
        self.inner.size_hint()
    }
}
