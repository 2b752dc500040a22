//! Query layer - read-only access to the dataset metadata

pub mod database;

pub use database::{Database, ObjectQuery, CLIENT_IDS};
