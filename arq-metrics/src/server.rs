//! Prometheus exposition over HTTP.
//!
//! Serves the registry's current values in the Prometheus text format, which
//! can be scraped by Prometheus or compatible monitoring systems.
//!
//! ## Example
//!
//! ```rust,no_run
//! use arq_metrics::server::ExpositionServer;
//! use prometheus::Registry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), arq_metrics::Error> {
//!     let registry = Registry::new();
//!     let server = ExpositionServer::bind("0.0.0.0:8081".parse().unwrap(), registry).await?;
//!
//!     // Metrics available at http://localhost:8081/
//!     server.spawn().await.ok();
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::Error;

/// HTTP server exposing a registry.
///
/// The listener is bound eagerly by [`bind`](Self::bind) so an unusable
/// address is reported to the caller; [`spawn`](Self::spawn) then serves
/// requests on a background task.
#[derive(Debug)]
pub struct ExpositionServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Registry,
}

impl ExpositionServer {
    /// Bind the listener.
    pub async fn bind(addr: SocketAddr, registry: Registry) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| Error::Bind { addr, source })?;

        Ok(Self {
            listener,
            local_addr,
            registry,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests on a background task until it is aborted or the
    /// runtime shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        info!("Running at: http://{}/", self.local_addr);
        tokio::spawn(self.serve())
    }

    async fn serve(self) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    // Typically a transient resource limit (EMFILE); keep serving.
                    error!(error = %e, "Exposition server accept error");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let registry = self.registry.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let registry = registry.clone();
                    async move { Ok::<_, Infallible>(handle_request(&req, &registry)) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, error = %e, "Exposition connection error");
                }
            });
        }
    }
}

fn handle_request<B>(req: &Request<B>, registry: &Registry) -> Response<Full<Bytes>> {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return text_response(StatusCode::METHOD_NOT_ALLOWED, "text/plain", "Method Not Allowed");
    }

    match req.uri().path() {
        "/" | "/metrics" => match render(registry) {
            Ok(body) => text_response(StatusCode::OK, TextEncoder::new().format_type(), body),
            Err(_) => text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                "Internal Server Error",
            ),
        },
        "/health" | "/healthz" => text_response(StatusCode::OK, "text/plain", "OK"),
        _ => text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found"),
    }
}

fn text_response(
    status: StatusCode,
    content_type: &str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    if let Ok(value) = content_type.parse() {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

fn encode(registry: &Registry) -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Render the registry's current values in the Prometheus text format.
pub fn render(registry: &Registry) -> prometheus::Result<String> {
    encode(registry).inspect_err(|e| error!(error = %e, "Failed to encode metrics"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gauges::GaugeSet;
    use arq_metrics_types::Snapshot;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// Issue a bare HTTP/1.1 GET and return the raw response.
    pub(crate) async fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8(response).unwrap()
    }

    fn request(method: Method, path: &str) -> Request<()> {
        Request::builder().method(method).uri(path).body(()).unwrap()
    }

    fn registry_with(snapshot: Snapshot) -> Registry {
        let registry = Registry::new();
        let gauges = GaugeSet::register(&registry, "arq").unwrap();
        gauges.publish(&snapshot);
        registry
    }

    #[test]
    fn test_render_contains_gauge_lines() {
        let registry = registry_with(Snapshot::new(4, 8, 0, 235, 119));
        let output = render(&registry).unwrap();

        assert!(output.contains("arq_jobs_completed 4\n"));
        assert!(output.contains("arq_jobs_failed 8\n"));
        assert!(output.contains("arq_jobs_retried 0\n"));
        assert!(output.contains("arq_jobs_ongoing 235\n"));
        assert!(output.contains("arq_queued_inprogress 119\n"));
    }

    #[test]
    fn test_render_includes_help_and_type() {
        let registry = registry_with(Snapshot::default());
        let output = render(&registry).unwrap();

        assert!(output.contains("# HELP arq_jobs_completed The number of jobs completed."));
        assert!(output.contains("# TYPE arq_jobs_completed gauge"));
        assert!(output.contains("# TYPE arq_queued_inprogress gauge"));
    }

    #[test]
    fn test_render_empty_registry() {
        assert_eq!(render(&Registry::new()).unwrap(), "");
    }

    #[test]
    fn test_handle_request_routes() {
        let registry = registry_with(Snapshot::new(1, 0, 0, 0, 0));

        let metrics = handle_request(&request(Method::GET, "/"), &registry);
        assert_eq!(metrics.status(), StatusCode::OK);
        assert!(metrics.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let metrics_path = handle_request(&request(Method::GET, "/metrics"), &registry);
        assert_eq!(metrics_path.status(), StatusCode::OK);

        let health = handle_request(&request(Method::GET, "/healthz"), &registry);
        assert_eq!(health.status(), StatusCode::OK);

        let missing = handle_request(&request(Method::GET, "/nope"), &registry);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let post = handle_request(&request(Method::POST, "/"), &registry);
        assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_server_serves_metrics() {
        let registry = registry_with(Snapshot::new(4, 8, 0, 235, 119));
        let server = ExpositionServer::bind("127.0.0.1:0".parse().unwrap(), registry)
            .await
            .unwrap();
        let addr = server.local_addr();
        let handle = server.spawn();

        let response = http_get(addr, "/").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("arq_jobs_ongoing 235"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_server_reflects_later_updates() {
        let registry = Registry::new();
        let gauges = GaugeSet::register(&registry, "arq").unwrap();
        let server = ExpositionServer::bind("127.0.0.1:0".parse().unwrap(), registry)
            .await
            .unwrap();
        let addr = server.local_addr();
        let handle = server.spawn();

        gauges.publish(&Snapshot::new(0, 0, 0, 0, 1));
        assert!(http_get(addr, "/").await.contains("arq_queued_inprogress 1"));

        gauges.publish(&Snapshot::new(0, 0, 0, 0, 2));
        assert!(http_get(addr, "/").await.contains("arq_queued_inprogress 2"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let result = ExpositionServer::bind(addr, Registry::new()).await;
        assert!(matches!(result, Err(Error::Bind { addr: a, .. }) if a == addr));
    }
}
