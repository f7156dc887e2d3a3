//! In-memory chat backend used by unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::engine::backend::ChatBackend;
use crate::stream::error::ChatError;
use crate::stream::models::{Channel, Message, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    UpsertUser,
    CreateToken,
    GetOrCreateChannel,
    AddMembers,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

struct StoredChannel {
    channel: Channel,
    members: Vec<String>,
    messages: Vec<Message>,
}

#[derive(Default)]
struct FakeState {
    users: HashMap<String, User>,
    channels: HashMap<(String, String), StoredChannel>,
    tokens: Vec<IssuedToken>,
    calls: Vec<Step>,
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
    fail_at: Option<Step>,
    delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            fail_at: None,
            delay: None,
        }
    }

    pub fn failing_at(step: Step) -> Self {
        Self {
            fail_at: Some(step),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.state.lock().unwrap().users.get(id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn channel_count(&self) -> usize {
        self.state.lock().unwrap().channels.len()
    }

    pub fn members(&self, kind: &str, id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .channels
            .get(&(kind.to_string(), id.to_string()))
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, kind: &str, id: &str) -> Vec<Message> {
        let state = self.state.lock().unwrap();
        state
            .channels
            .get(&(kind.to_string(), id.to_string()))
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    pub fn tokens(&self) -> Vec<IssuedToken> {
        self.state.lock().unwrap().tokens.clone()
    }

    pub fn calls(&self) -> Vec<Step> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Record the call and fail it if this backend was built to fail here.
    async fn enter(&self, step: Step) -> Result<(), ChatError> {
        self.state.lock().unwrap().calls.push(step);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check(step)
    }

    fn check(&self, step: Step) -> Result<(), ChatError> {
        if self.fail_at == Some(step) {
            return Err(ChatError::Api {
                status: 500,
                code: -1,
                message: format!("injected failure at {step:?}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn upsert_user(&self, user: &User) -> Result<User, ChatError> {
        self.enter(Step::UpsertUser).await?;

        if user.id.chars().any(char::is_whitespace) {
            return Err(ChatError::Api {
                status: 400,
                code: 4,
                message: format!("\"{}\" is not a valid user id", user.id),
            });
        }

        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let created_at = state
            .users
            .get(&user.id)
            .and_then(|u| u.created_at)
            .unwrap_or(now);

        let mut stored = user.clone();
        if stored.role.is_none() {
            stored.role = Some("user".to_string());
        }
        stored.created_at = Some(created_at);
        stored.updated_at = Some(now);
        state.users.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn create_token(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, ChatError> {
        self.state.lock().unwrap().calls.push(Step::CreateToken);
        self.check(Step::CreateToken)?;

        self.state.lock().unwrap().tokens.push(IssuedToken {
            user_id: user_id.to_string(),
            expires_at,
            issued_at,
        });
        Ok(format!("token-{}-{}", user_id, expires_at.timestamp()))
    }

    async fn get_or_create_channel(
        &self,
        kind: &str,
        id: &str,
        created_by: &str,
        extra: Option<&Map<String, Value>>,
    ) -> Result<Channel, ChatError> {
        self.enter(Step::GetOrCreateChannel).await?;

        let mut state = self.state.lock().unwrap();
        let stored = state
            .channels
            .entry((kind.to_string(), id.to_string()))
            .or_insert_with(|| StoredChannel {
                channel: Channel {
                    id: id.to_string(),
                    kind: kind.to_string(),
                    cid: format!("{kind}:{id}"),
                    created_by: Some(User::new(created_by)),
                    member_count: 0,
                    created_at: Some(Utc::now()),
                    updated_at: None,
                    extra: extra.cloned().unwrap_or_default(),
                },
                members: Vec::new(),
                messages: Vec::new(),
            });
        Ok(stored.channel.clone())
    }

    async fn add_members(
        &self,
        channel: &Channel,
        user_ids: &[String],
        message: Option<&Message>,
    ) -> Result<(), ChatError> {
        self.enter(Step::AddMembers).await?;

        let mut state = self.state.lock().unwrap();
        let stored = state
            .channels
            .get_mut(&(channel.kind.clone(), channel.id.clone()))
            .ok_or_else(|| ChatError::Api {
                status: 404,
                code: 16,
                message: format!("channel {} does not exist", channel.cid),
            })?;

        for user_id in user_ids {
            if !stored.members.contains(user_id) {
                stored.members.push(user_id.clone());
            }
        }
        stored.channel.member_count = stored.members.len() as i64;
        if let Some(message) = message {
            stored.messages.push(message.clone());
        }
        Ok(())
    }
}
