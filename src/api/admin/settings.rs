use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{commit_failed, internal_error, service_error};
use crate::services::settings;

pub fn admin_settings_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/settings/telegram", get(get_telegram).put(put_telegram))
        .layer(Extension(db))
}

async fn get_telegram(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let enabled = settings::get_setting(&*db, settings::TELEGRAM_ENABLED, "false").await;
    let bot_token = settings::get_setting(&*db, settings::TELEGRAM_BOT_TOKEN, "").await;
    let chat_id = settings::get_setting(&*db, settings::TELEGRAM_CHAT_ID, "").await;

    match (enabled, bot_token, chat_id) {
        (Ok(enabled), Ok(bot_token), Ok(chat_id)) => (
            StatusCode::OK,
            Json(json!({
                "enabled": enabled.to_lowercase() == "true",
                "bot_token": bot_token,
                "chat_id": chat_id,
            })),
        )
            .into_response(),
        _ => internal_error(),
    }
}

/// Stores the gateway settings; they take effect on the next notification,
/// no restart involved.
async fn put_telegram(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<TelegramSettings>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let enabled = if payload.enabled { "true" } else { "false" };
    let written = async {
        settings::set_setting(&txn, settings::TELEGRAM_ENABLED, enabled).await?;
        settings::set_setting(&txn, settings::TELEGRAM_BOT_TOKEN, &payload.bot_token).await?;
        settings::set_setting(&txn, settings::TELEGRAM_CHAT_ID, &payload.chat_id).await?;
        Ok::<(), crate::services::ServiceError>(())
    }
    .await;

    match written {
        Ok(()) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Settings saved successfully"
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            service_error(err)
        }
    }
}

//Structs
#[derive(Deserialize)]
struct TelegramSettings {
    enabled: bool,
    bot_token: String,
    chat_id: String,
}
