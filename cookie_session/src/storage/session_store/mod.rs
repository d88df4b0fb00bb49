mod db;
mod memory;
mod postgres;
mod sqlite;
mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use types::{DbSessionStore, InMemorySessionStore, SessionStore};
