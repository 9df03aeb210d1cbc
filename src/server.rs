//! HTTP surface for the protocol adapter.
//!
//! A single route accepts every method and hands the request to
//! [`ProtocolAdapter::handle`]. Declined methods get an empty 405.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::{ProtocolAdapter, ProtocolRequest};

/// Path the orchestrator calls
pub const SERVE_PATH: &str = "/api/inngest";

/// Build the router serving `adapter` at [`SERVE_PATH`]
pub fn router(adapter: Arc<ProtocolAdapter>) -> Router {
    Router::new()
        .route(SERVE_PATH, any(serve_protocol))
        .with_state(adapter)
        .layer(TraceLayer::new_for_http())
}

async fn serve_protocol(
    State(adapter): State<Arc<ProtocolAdapter>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let request = ProtocolRequest {
        method,
        query,
        request_url: request_url(&headers, &uri),
        body: body.to_vec(),
    };

    match adapter.handle(request).await {
        Some(response) => {
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            match response.body {
                Some(body) => (status, Json(body)).into_response(),
                None => status.into_response(),
            }
        }
        None => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

/// Reconstruct the public URL of a request from its Host header
fn request_url(headers: &HeaderMap, uri: &Uri) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    format!("{}://{}{}", scheme, host, uri.path())
}

/// Serve until Ctrl+C or SIGTERM
pub async fn serve(address: &str, adapter: Arc<ProtocolAdapter>) -> Result<()> {
    let addr: SocketAddr = address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", address))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(address = %addr, path = SERVE_PATH, "Server listening");

    axum::serve(listener, router(adapter))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "bot.example.com".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        let uri: Uri = "/api/inngest?deployId=d1".parse().unwrap();

        assert_eq!(request_url(&headers, &uri), "https://bot.example.com/api/inngest");
    }

    #[test]
    fn test_request_url_defaults() {
        let uri: Uri = "/api/inngest".parse().unwrap();
        assert_eq!(request_url(&HeaderMap::new(), &uri), "http://localhost/api/inngest");
    }
}
