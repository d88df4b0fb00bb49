//! cookie_session - two-tier cookie session management
//!
//! A short-lived access session is checked on every request and silently
//! reissued near expiry; a long-lived, narrowly scoped refresh session mints
//! new access sessions. Each session carries a CSRF token required on
//! mutating requests. Sessions live behind the [`SessionStore`] trait, with an
//! in-memory and a SQLite/PostgreSQL implementation.
//!
//! The crate is framework-agnostic: [`AuthConfig::resolve_request`] and the
//! flow methods take plain `http` types and return outcomes and headers for
//! the web layer to turn into responses.

mod config;
mod session;
mod storage;
mod utils;

pub use config::{
    AUTH_ACCESS_COOKIE_MAX_AGE, AUTH_ACCESS_COOKIE_NAME, AUTH_ACCESS_REFRESH_MARGIN,
    AUTH_ACCESS_TOKEN_LENGTH, AUTH_CSRF_FIELD_NAME, AUTH_DEFAULT_LOGIN_SUCCESS_REDIRECT,
    AUTH_DEFAULT_LOGOUT_REDIRECT, AUTH_GC_INTERVAL, AUTH_LOGIN_FAILED_REDIRECT,
    AUTH_REDIRECT_PARAM, AUTH_REFRESH_COOKIE_MAX_AGE, AUTH_REFRESH_COOKIE_NAME,
    AUTH_REFRESH_REFRESH_MARGIN, AUTH_REFRESH_TOKEN_LENGTH, AUTH_REMEMBER_ME_FIELD,
    AUTH_RESUME_TICKET_PARAM, AUTH_RESUME_TICKET_TTL, AUTH_SESSIONS_PATH,
    AUTH_UNAUTHORIZED_REDIRECT,
};

pub use session::{
    AuthConfig, AuthProvider, CSRF_HEADER_NAME, CookieConfig, CsrfSubmission, FlowRedirect,
    GcReport, GuardOptions, GuardOutcome, LoginRequest, ProviderError, RequestInfo,
    ResumeTickets, Session, SessionError, is_state_changing, spawn_gc_task,
};

pub use storage::{
    DB_TABLE_ACCESS_SESSIONS, DB_TABLE_PREFIX, DB_TABLE_REFRESH_SESSIONS, DataStore,
    DbSessionStore, InMemorySessionStore, PostgresDataStore, SessionStore, SqliteDataStore,
    StorageError, connect_data_store,
};

pub use utils::{UtilError, gen_random_string, get_param};
