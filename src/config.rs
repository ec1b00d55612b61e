//! Env-backed configuration. `.env` is loaded once at startup by `main`,
//! so these helpers only read process environment with sane defaults.

pub fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}

pub fn bind_addr() -> String {
    std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

pub fn secret_key() -> String {
    std::env::var("SECRET").expect("SECRET not found in environment")
}

/// Web-rooted directory the uploaded files live under, without a leading slash.
pub fn upload_root() -> String {
    std::env::var("UPLOAD_FOLDER").unwrap_or_else(|_| "static/uploads".to_string())
}

pub fn max_upload_bytes() -> usize {
    std::env::var("MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(16 * 1024 * 1024)
}

// Telegram fallbacks, used when the settings table has no values.

pub fn telegram_bot_token() -> String {
    std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default()
}

pub fn telegram_chat_id() -> String {
    std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default()
}

pub fn telegram_enabled() -> bool {
    std::env::var("TELEGRAM_ENABLED")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}
