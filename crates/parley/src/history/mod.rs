//! Chat history: the single, global log of user and assistant messages.
//!
//! Messages are immutable once written. The only destructive operation is a
//! full clear.

mod models;
mod store;

pub use models::{Message, MessageRole};
pub use store::{HistoryStore, SqliteHistoryStore};
