//! HTTP API module.
//!
//! Serves signed upload URLs to the browser, proxies agent chat and video
//! moderation, and streams activity over SSE.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::{ActivityLog, LogEntry, LogLevel};
pub use server::{router, serve, start_server, AppState};
pub use types::*;
