use axum::{
    extract::Path,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio_util::io::ReaderStream;

use crate::config;

pub fn uploads_router() -> Router {
    Router::new().route("/static/uploads/*path", get(serve_upload))
}

/// Streams a stored upload back to the client. Only paths under the upload
/// root are reachable; traversal segments are refused outright.
async fn serve_upload(Path(path): Path<String>) -> impl IntoResponse {
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid path"
            })),
        ));
    }

    let disk_path = format!("{}/{}", config::upload_root(), path);

    let file = match tokio::fs::File::open(&disk_path).await {
        Ok(file) => file,
        Err(_) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Not found"
                })),
            ));
        }
    };

    let content_type = mime_guess::from_path(&disk_path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let stream = ReaderStream::new(file);
    let body = axum::body::Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("inline"),
    );

    Ok((headers, body))
}
