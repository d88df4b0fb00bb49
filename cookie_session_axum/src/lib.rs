//! Axum integration for `cookie_session`.
//!
//! Mount [`session_router`] for the login, logout and refresh endpoints,
//! protect application routes with [`session_guard`], and read the caller
//! with the [`AuthSession`] extractor.

mod config;
mod error;
mod handlers;
mod middleware;
mod router;
mod session;

pub use config::AUTH_FORM_BODY_LIMIT;
pub use error::IntoResponseError;
pub use middleware::{SessionGuard, session_guard};
pub use router::{session_router, session_router_no_trace};
pub use session::{AuthSession, MissingSession};

pub use cookie_session;
