//! REST API for the feedback portal
//!
//! Provides:
//! - Login and bearer-token sessions
//! - Feedback submission, replies and CSV export
//! - Windowed statistics for the admin dashboard
//! - Per-faculty statistics and filters for the faculty dashboard

pub mod error;
pub mod handlers;
pub mod server;
pub mod session;
pub mod state;

pub use error::ApiResult;
pub use server::{build_router, ApiServer, ApiServerConfig};
pub use session::Session;
pub use state::AppState;
