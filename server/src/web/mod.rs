pub mod app_state;
pub mod join_api;
pub mod router;
