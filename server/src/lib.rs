pub mod auth;
pub mod config;
pub mod engine;
pub mod stream;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;
