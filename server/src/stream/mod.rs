//! Client for the hosted chat backend's REST API.

pub mod client;
pub mod error;
pub mod models;
