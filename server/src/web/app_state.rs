use crate::engine::join::JoinService;

/// Shared state for every HTTP handler. Built once at startup and never mutated.
pub struct AppState {
    pub join: JoinService,
    /// Origin allowed by CORS; `None` allows any origin.
    pub public_url: Option<String>,
    pub max_body_bytes: usize,
}
