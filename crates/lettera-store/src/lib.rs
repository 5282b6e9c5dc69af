pub mod cache;
pub mod database;
pub mod error;
pub mod kv;
pub mod persistence;
pub mod schema;

pub use cache::TtlCache;
pub use database::Database;
pub use error::StoreError;
pub use kv::{KeyValueStore, MemoryKvStore, SqliteKvStore};
pub use persistence::{keys, LiveView, PersistenceLayer, RestoreOutcome};
