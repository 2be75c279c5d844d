//! HTTP listener exposing /metrics and /healthz

use crate::metrics::ReconcileMetrics;
use anyhow::Result;
use http_body_util::Full;
use hyper::{
    body::Bytes,
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::tokio::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Accept connections on `addr` until the listener fails
pub async fn serve(addr: SocketAddr, metrics: Arc<ReconcileMetrics>) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {}", addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let metrics = metrics.clone();
                async move { Ok::<_, Infallible>(respond(req.method(), req.uri().path(), &metrics)) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving metrics connection from {}: {}", peer_addr, e);
            }
        });
    }
}

fn respond(method: &Method, path: &str, metrics: &ReconcileMetrics) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/metrics") => match metrics.gather() {
            Ok(text) => {
                let mut response = Response::new(Full::new(Bytes::from(text)));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            Err(e) => {
                warn!("Failed to gather metrics: {}", e);
                status_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to gather metrics\n")
            }
        },
        (_, "/healthz") => status_response(StatusCode::OK, "OK\n"),
        _ => status_response(StatusCode::NOT_FOUND, "Not Found\n"),
    }
}

fn status_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthz() {
        let metrics = ReconcileMetrics::new().unwrap();
        let response = respond(&Method::GET, "/healthz", &metrics);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_metrics_content_type() {
        let metrics = ReconcileMetrics::new().unwrap();
        let response = respond(&Method::GET, "/metrics", &metrics);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
    }

    #[test]
    fn test_unknown_path() {
        let metrics = ReconcileMetrics::new().unwrap();
        let response = respond(&Method::POST, "/metrics", &metrics);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
