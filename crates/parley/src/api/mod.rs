//! HTTP API module.
//!
//! REST endpoints over the chat history plus the embedded web UI.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
