//! Key/value settings with upsert semantics.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use super::ServiceError;
use crate::entities::setting::{self, Entity as SettingEntity};

// Keys used by the notification gateway.
pub const TELEGRAM_ENABLED: &str = "telegram_enabled";
pub const TELEGRAM_BOT_TOKEN: &str = "telegram_bot_token";
pub const TELEGRAM_CHAT_ID: &str = "telegram_chat_id";

/// Returns the stored value, or `default` when the key is unset or empty.
pub async fn get_setting<C: ConnectionTrait>(
    conn: &C,
    key: &str,
    default: &str,
) -> Result<String, ServiceError> {
    let row = SettingEntity::find()
        .filter(setting::Column::Key.eq(key))
        .one(conn)
        .await?;

    Ok(row
        .and_then(|row| row.value)
        .unwrap_or_else(|| default.to_string()))
}

pub async fn set_setting<C: ConnectionTrait>(
    conn: &C,
    key: &str,
    value: &str,
) -> Result<(), ServiceError> {
    let existing = SettingEntity::find()
        .filter(setting::Column::Key.eq(key))
        .one(conn)
        .await?;

    match existing {
        Some(row) => {
            let mut row: setting::ActiveModel = row.into();
            row.value = Set(Some(value.to_string()));
            row.updated_at = Set(chrono::Utc::now());
            row.update(conn).await?;
        }
        None => {
            let row = setting::ActiveModel {
                key: Set(key.to_string()),
                value: Set(Some(value.to_string())),
                updated_at: Set(chrono::Utc::now()),
                ..Default::default()
            };
            SettingEntity::insert(row).exec(conn).await?;
        }
    }

    Ok(())
}
