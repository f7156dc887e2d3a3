use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::auth::token::{create_server_token, create_user_token};
use crate::config::StreamSection;
use crate::engine::backend::ChatBackend;

use super::error::ChatError;
use super::models::{Channel, Member, Message, User};

const CLIENT_ID: &str = concat!("chat-join-server-", env!("CARGO_PKG_VERSION"));

/// REST client for the hosted chat backend.
///
/// Built once at startup and shared by every request. The underlying
/// `reqwest::Client` pools connections, so cloning is never needed.
pub struct StreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    /// Pre-signed `{"server": true}` token sent with every call.
    server_token: String,
}

#[derive(Serialize)]
struct UpsertUsersRequest<'a> {
    users: BTreeMap<&'a str, &'a User>,
}

#[derive(Deserialize)]
struct UpsertUsersResponse {
    #[serde(default)]
    users: HashMap<String, User>,
}

#[derive(Serialize)]
struct QueryChannelRequest {
    data: Map<String, Value>,
    state: bool,
}

#[derive(Serialize)]
struct UpdateChannelRequest<'a> {
    add_members: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a Message>,
}

#[derive(Deserialize)]
struct ChannelResponse {
    channel: Channel,
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl StreamClient {
    pub fn new(
        api_key: &str,
        api_secret: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(CLIENT_ID)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            server_token: create_server_token(api_secret)?,
        })
    }

    pub fn from_config(config: &StreamSection) -> Result<Self, ChatError> {
        Self::new(
            &config.api_key,
            &config.api_secret,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ChatError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);

        let resp = self
            .http
            .post(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .header("Authorization", self.server_token.as_str())
            .header("stream-auth-type", "jwt")
            .header("X-Stream-Client", CLIENT_ID)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body_text));
        }

        Ok(resp.json::<R>().await?)
    }
}

/// Build an `Api` error from a failed response, keeping the raw body when it
/// is not the backend's JSON error shape.
fn api_error(status: u16, body: &str) -> ChatError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) if !err.message.is_empty() => ChatError::Api {
            status,
            code: err.code,
            message: err.message,
        },
        _ => ChatError::Api {
            status,
            code: 0,
            message: body.to_string(),
        },
    }
}

fn channel_path(kind: &str, id: &str) -> String {
    format!(
        "channels/{}/{}",
        urlencoding::encode(kind),
        urlencoding::encode(id)
    )
}

#[async_trait]
impl ChatBackend for StreamClient {
    async fn upsert_user(&self, user: &User) -> Result<User, ChatError> {
        let request = UpsertUsersRequest {
            users: BTreeMap::from([(user.id.as_str(), user)]),
        };
        let mut resp: UpsertUsersResponse = self.post("users", &request).await?;

        resp.users.remove(&user.id).ok_or_else(|| {
            ChatError::UnexpectedResponse(format!("user {} missing from upsert response", user.id))
        })
    }

    fn create_token(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, ChatError> {
        Ok(create_user_token(
            user_id,
            &self.api_secret,
            expires_at,
            issued_at,
        )?)
    }

    async fn get_or_create_channel(
        &self,
        kind: &str,
        id: &str,
        created_by: &str,
        extra: Option<&Map<String, Value>>,
    ) -> Result<Channel, ChatError> {
        let mut data = extra.cloned().unwrap_or_default();
        data.insert("created_by".to_string(), json!({ "id": created_by }));

        let request = QueryChannelRequest { data, state: true };
        let path = format!("{}/query", channel_path(kind, id));
        let resp: ChannelResponse = self.post(&path, &request).await?;

        debug!(
            cid = %resp.channel.cid,
            members = resp.members.len(),
            "queried channel"
        );
        Ok(resp.channel)
    }

    async fn add_members(
        &self,
        channel: &Channel,
        user_ids: &[String],
        message: Option<&Message>,
    ) -> Result<(), ChatError> {
        let request = UpdateChannelRequest {
            add_members: user_ids,
            message,
        };
        let path = channel_path(&channel.kind, &channel.id);
        let resp: ChannelResponse = self.post(&path, &request).await?;

        debug!(
            cid = %resp.channel.cid,
            members = resp.members.len(),
            added = user_ids.len(),
            "added channel members"
        );
        Ok(())
    }
}
