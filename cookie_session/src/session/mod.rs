mod config;
mod csrf;
mod errors;
mod gc;
mod guard;
mod login;
mod refresh;
mod resume;
mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{AuthConfig, CookieConfig};
pub use csrf::{CSRF_HEADER_NAME, is_state_changing};
pub use errors::SessionError;
pub use gc::{GcReport, spawn_gc_task};
pub use resume::ResumeTickets;
pub use types::{
    AuthProvider, CsrfSubmission, FlowRedirect, GuardOptions, GuardOutcome, LoginRequest,
    ProviderError, RequestInfo, Session,
};
