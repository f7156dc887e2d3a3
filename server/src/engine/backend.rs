use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::stream::error::ChatError;
use crate::stream::models::{Channel, Message, User};

/// Operations the join flow needs from the hosted chat backend.
///
/// `StreamClient` talks to the real REST API; tests plug in an in-memory
/// implementation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Create the user, or update it if the id already exists.
    async fn upsert_user(&self, user: &User) -> Result<User, ChatError>;

    /// Mint a token the client can use to connect as `user_id`.
    fn create_token(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, ChatError>;

    /// Return the channel `kind`/`id`, creating it on behalf of `created_by` if missing.
    async fn get_or_create_channel(
        &self,
        kind: &str,
        id: &str,
        created_by: &str,
        extra: Option<&Map<String, Value>>,
    ) -> Result<Channel, ChatError>;

    /// Add users to `channel`, optionally posting `message` alongside.
    async fn add_members(
        &self,
        channel: &Channel,
        user_ids: &[String],
        message: Option<&Message>,
    ) -> Result<(), ChatError>;
}
