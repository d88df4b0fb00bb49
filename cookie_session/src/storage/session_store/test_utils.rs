use super::DbSessionStore;

/// A `DbSessionStore` over a private in-memory SQLite database, table created.
pub(crate) async fn memory_sqlite_store(table: &str) -> DbSessionStore {
    let store = DbSessionStore::connect("sqlite", "sqlite::memory:", table)
        .expect("Failed to create in-memory SQLite pool");
    store
        .init()
        .await
        .expect("Failed to initialise session table");
    store
}
