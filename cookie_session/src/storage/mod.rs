mod config;
mod data_store;
mod errors;
mod schema_validation;
mod session_store;

pub use config::{DB_TABLE_ACCESS_SESSIONS, DB_TABLE_PREFIX, DB_TABLE_REFRESH_SESSIONS};
pub use data_store::{DataStore, PostgresDataStore, SqliteDataStore, connect_data_store};
pub use errors::StorageError;
pub use session_store::{DbSessionStore, InMemorySessionStore, SessionStore};
