use serde_json::{Map, Value};
use tracing::info;

use crate::stream::error::ChatError;
use crate::stream::models::{Channel, User};

use super::backend::ChatBackend;

/// Id and role of the user that owns the shared channel.
pub const ADMIN_USER_ID: &str = "admin";
pub const ADMIN_ROLE: &str = "admin";

/// The shared channel every joining user is added to.
pub const GENERAL_CHANNEL_TYPE: &str = "team";
pub const GENERAL_CHANNEL_ID: &str = "general";
pub const GENERAL_CHANNEL_NAME: &str = "General";

/// Prepare the chat backend before serving: make sure the admin user and the
/// general channel exist. Safe to run on every start.
pub async fn bootstrap(backend: &dyn ChatBackend) -> Result<Channel, ChatError> {
    let admin = backend
        .upsert_user(&User::new(ADMIN_USER_ID).with_role(ADMIN_ROLE))
        .await?;
    info!(user_id = %admin.id, "admin user ready");

    let mut extra = Map::new();
    extra.insert(
        "name".to_string(),
        Value::String(GENERAL_CHANNEL_NAME.to_string()),
    );

    let channel = backend
        .get_or_create_channel(
            GENERAL_CHANNEL_TYPE,
            GENERAL_CHANNEL_ID,
            ADMIN_USER_ID,
            Some(&extra),
        )
        .await?;
    info!(cid = %channel.cid, "general channel ready");

    Ok(channel)
}
