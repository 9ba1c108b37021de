//! Store implementations behind the `RecordStore` / `ProfileStore` traits.
//!
//! Two backends: in-memory (tests, stub deployments) and SQLite via sqlx.
//! Per-key atomicity comes from the single upsert statement; serializing
//! read-modify-write sequences is the triage engine's job.

mod memory;
mod sqlite;

pub use memory::{MemoryProfileStore, MemoryRecordStore};
pub use sqlite::{SqliteProfileStore, SqliteRecordStore};
