//! File storage for uploaded product images. Files land under
//! `<UPLOAD_FOLDER>/products` with sanitized, timestamp-prefixed names;
//! the stored URLs are web-rooted paths.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ServiceError;
use crate::config;

const UPLOAD_SUBFOLDER: &str = "products";

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("invalid sanitize regex"));

pub fn allowed_file(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Flattens any path components and strips everything outside
/// `[A-Za-z0-9._-]`, mirroring what the old `secure_filename` gave us.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    UNSAFE_CHARS.replace_all(base, "_").trim_matches('.').to_string()
}

/// Writes the bytes to disk and returns the web-rooted URL of the new file.
/// The timestamp prefix keeps repeated uploads of the same name unique.
pub async fn save_upload(file_name: &str, data: &[u8]) -> Result<String, ServiceError> {
    if !allowed_file(file_name) {
        return Err(ServiceError::Validation(format!(
            "File type is not allowed: {}",
            file_name
        )));
    }

    let sanitized = sanitize_file_name(file_name);
    if sanitized.is_empty() {
        return Err(ServiceError::Validation("Invalid file name".to_string()));
    }

    let stamped = format!(
        "{}{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S_"),
        sanitized
    );

    let dir = format!("{}/{}", config::upload_root(), UPLOAD_SUBFOLDER);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|err| ServiceError::Validation(format!("Failed to create upload dir: {err}")))?;

    let disk_path = format!("{}/{}", dir, stamped);
    tokio::fs::write(&disk_path, data)
        .await
        .map_err(|err| ServiceError::Validation(format!("Failed to store file: {err}")))?;

    Ok(format!("/{}", disk_path))
}

/// Best-effort removal of a previously stored file. Only paths under the
/// upload root are touched; anything else (external URLs, legacy values) is
/// left alone. Failures are logged, never propagated.
pub async fn delete_upload(web_path: &str) -> bool {
    let root_prefix = format!("/{}", config::upload_root());
    if !web_path.starts_with(&root_prefix) {
        return false;
    }

    let disk_path = web_path.trim_start_matches('/');
    match tokio::fs::remove_file(disk_path).await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(path = %disk_path, error = %err, "Failed to remove uploaded file");
            false
        }
    }
}
