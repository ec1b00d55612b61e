use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info};

/// Logs every request with its outcome and latency. Runs outside the auth
/// layers so rejected requests are recorded too.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = start.elapsed();

    if status.is_server_error() {
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Failed to process request"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request"
        );
    }

    response
}
