//! Persistence backends

mod database;

pub use database::{blob_to_vec, vec_to_blob, SqliteStore};
