//! Best-effort order notifications to a Telegram group.
//!
//! Runs strictly after the checkout transaction has committed; every failure
//! here is logged and swallowed so the user-facing flow never notices.

use std::time::Duration;

use sea_orm::{DatabaseConnection, EntityTrait};

use super::{cart, category_tree, settings};
use crate::config;
use crate::entities::{order, product, user};

/// Resolves the gateway credentials: settings table first, env as fallback.
async fn gateway_config(db: &DatabaseConnection) -> Option<(String, String)> {
    let enabled = settings::get_setting(db, settings::TELEGRAM_ENABLED, "")
        .await
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or_else(config::telegram_enabled);

    let mut bot_token = settings::get_setting(db, settings::TELEGRAM_BOT_TOKEN, "")
        .await
        .unwrap_or_default();
    if bot_token.is_empty() {
        bot_token = config::telegram_bot_token();
    }

    let mut chat_id = settings::get_setting(db, settings::TELEGRAM_CHAT_ID, "")
        .await
        .unwrap_or_default();
    if chat_id.is_empty() {
        chat_id = config::telegram_chat_id();
    }

    if !enabled || bot_token.is_empty() || chat_id.is_empty() {
        return None;
    }

    Some((bot_token, chat_id))
}

pub async fn send_telegram_message(db: &DatabaseConnection, text: &str) -> bool {
    let (bot_token, chat_id) = match gateway_config(db).await {
        Some(pair) => pair,
        None => return false,
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to build notification client");
            return false;
        }
    };

    let url = format!("https://api.telegram.org/bot{}/sendMessage", bot_token);
    let payload = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "HTML",
    });

    match client.post(&url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            tracing::warn!(status = %response.status(), "Telegram rejected the notification");
            false
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to deliver Telegram notification");
            false
        }
    }
}

/// Builds and sends the "new order" message. Called from a spawned task.
pub async fn notify_new_order(db: &DatabaseConnection, order: &order::Model) {
    let buyer = match user::Entity::find_by_id(order.user_id).one(db).await {
        Ok(Some(buyer)) => buyer,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load buyer for notification");
            return;
        }
    };

    let items = match cart::order_items(db, order.id).await {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load order items for notification");
            return;
        }
    };

    let mut message = format!("🛒 <b>New order #{}</b>\n\n", order.id);
    message += &format!("👤 <b>User:</b> {}\n", buyer.username);
    message += &format!("📧 <b>Email:</b> {}\n", buyer.email);
    message += &format!(
        "🏙️ <b>City:</b> {}\n",
        order.city.as_deref().unwrap_or("Not specified")
    );
    message += &format!(
        "🏢 <b>Institution:</b> {}\n\n",
        order.institution.as_deref().unwrap_or("Not specified")
    );
    message += "📦 <b>Items:</b>\n";

    let mut total_items = 0;
    for item in &items {
        let (name, path) = match product::Entity::find_by_id(item.product_id).one(db).await {
            Ok(Some(prod)) => {
                let path = category_tree::category_path(db, prod.category_id)
                    .await
                    .ok()
                    .flatten();
                (prod.name, path)
            }
            _ => (format!("product #{}", item.product_id), None),
        };
        message += &format!(
            "  • {} ({}) - {} pcs\n",
            name,
            path.unwrap_or_else(|| "No category".to_string()),
            item.quantity
        );
        total_items += item.quantity;
    }

    message += &format!("\n📊 <b>Total items:</b> {} pcs\n", total_items);
    message += &format!(
        "📅 <b>Date:</b> {}\n",
        order.created_at.format("%d.%m.%Y %H:%M")
    );

    send_telegram_message(db, &message).await;
}
