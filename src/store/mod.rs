// src/store/mod.rs — Session store (SQLite)

pub mod schema;
#[allow(clippy::module_inception)]
pub mod store;
pub mod store_server;

pub use store_server::{spawn_store_server, StoreHandle};

use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the database at the given path and apply migrations.
pub fn open(path: &Path) -> anyhow::Result<store::Store> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    // WAL lets the webhook server and CLI commands read while a write is in flight
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA busy_timeout=5000;")?;
    schema::run_migrations(&conn)?;
    Ok(store::Store::new(conn))
}

/// Create an in-memory database (for testing).
pub fn open_in_memory() -> anyhow::Result<store::Store> {
    let conn = Connection::open_in_memory()?;
    schema::run_migrations(&conn)?;
    Ok(store::Store::new(conn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_dirs_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rehearsal.db");

        let store = open(&path).unwrap();
        store
            .insert_session(&store::NewSession {
                id: "s-1".into(),
                conversation_id: "c-1".into(),
                category: "sales".into(),
                name: "Mock".into(),
                expected_duration_minutes: 10,
            })
            .unwrap();
        drop(store);

        let reopened = open(&path).unwrap();
        assert!(reopened.get_session("s-1").unwrap().is_some());
    }
}
