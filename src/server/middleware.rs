use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::debug;

use crate::errors::AppError;
use crate::limiter::{LimiterRegistry, RequestGate};

/// Key used for requests whose peer address is unknown.
const UNKNOWN_CLIENT: &str = "unknown";

/// Admit or reject the request by peer IP before routing.
pub async fn rate_limit(
    State(gate): State<RequestGate<LimiterRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    let client_key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let client_key = match client_key {
        Some(key) => key,
        None => {
            debug!("No peer address on request, using shared bucket");
            UNKNOWN_CLIENT.to_string()
        }
    };

    match gate.admit(&client_key).into_result() {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

pub async fn track_metrics(request: Request, next: Next) -> Response {
    crate::metrics::record_request_received();
    let started = Instant::now();

    let response = next.run(request).await;

    crate::metrics::record_response(response.status().as_u16(), started.elapsed().as_secs_f64());
    response
}

/// Turn a handler panic into the opaque 500 and close the connection.
pub fn recover_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let mut response = AppError::InternalError(format!("handler panicked: {}", detail)).into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
