//! Parley: a chat backend that keeps a durable conversation log in SQLite and
//! relays each user message to an OpenAI-compatible completion API.

pub mod api;
pub mod config;
pub mod db;
pub mod history;
pub mod logging;
pub mod provider;
pub mod relay;
