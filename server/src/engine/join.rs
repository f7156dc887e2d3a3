use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::stream::error::ChatError;
use crate::stream::models::{Message, User};

use super::backend::ChatBackend;
use super::bootstrap::{ADMIN_USER_ID, GENERAL_CHANNEL_ID, GENERAL_CHANNEL_TYPE};

/// Lifetime of the token handed to a joining user.
pub const TOKEN_TTL_MINUTES: i64 = 60;

/// What a successful join returns to the client.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub user: User,
    pub token: String,
    /// Public API key the client needs to open its own backend connection.
    pub api_key: String,
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("invalid user: {0}")]
    InvalidUser(String),

    #[error(transparent)]
    Backend(#[from] ChatError),

    #[error("join did not complete within {0:?}")]
    Timeout(Duration),
}

/// Text of the announcement posted when `user_id` joins the general channel.
pub fn join_announcement(user_id: &str) -> String {
    format!("{} Joined the General channel", user_id)
}

/// Runs the join flow against a shared chat backend.
pub struct JoinService {
    backend: Arc<dyn ChatBackend>,
    api_key: String,
    deadline: Duration,
}

impl JoinService {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        api_key: impl Into<String>,
        deadline: Duration,
    ) -> Self {
        Self {
            backend,
            api_key: api_key.into(),
            deadline,
        }
    }

    /// Provision `user`, mint their token and add them to the general channel.
    ///
    /// Steps run strictly in order and the first failure ends the join.
    /// Earlier steps are not undone. The whole flow is bounded by the
    /// service deadline; when it elapses the in-flight call is dropped.
    pub async fn join(&self, user: User) -> Result<JoinResponse, JoinError> {
        match tokio::time::timeout(self.deadline, self.run(user)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline = ?self.deadline, "join timed out");
                Err(JoinError::Timeout(self.deadline))
            }
        }
    }

    async fn run(&self, user: User) -> Result<JoinResponse, JoinError> {
        if user.id.trim().is_empty() {
            return Err(JoinError::InvalidUser("user id cannot be empty".into()));
        }

        let user = self.backend.upsert_user(&user).await?;
        debug!(user_id = %user.id, "user upserted");

        let issued_at = Utc::now();
        let expires_at = issued_at + chrono::Duration::minutes(TOKEN_TTL_MINUTES);
        let token = self.backend.create_token(&user.id, expires_at, issued_at)?;
        debug!(user_id = %user.id, %expires_at, "token issued");

        let channel = self
            .backend
            .get_or_create_channel(
                GENERAL_CHANNEL_TYPE,
                GENERAL_CHANNEL_ID,
                ADMIN_USER_ID,
                None,
            )
            .await?;

        let message = Message::from_user(&user.id, join_announcement(&user.id));
        self.backend
            .add_members(&channel, std::slice::from_ref(&user.id), Some(&message))
            .await?;

        info!(user_id = %user.id, cid = %channel.cid, "user joined");

        Ok(JoinResponse {
            user,
            token,
            api_key: self.api_key.clone(),
        })
    }
}
