//! # maskattack - 3D Mask Attack dataset metadata
//!
//! Metadata access layer for the 3D mask attack spoofing dataset.
//!
//! maskattack provides:
//! - A SQLite schema for clients, files, protocols and protocol purposes
//! - A population routine that builds the store from a directory of clips
//! - A read-only query object resolving protocol/purpose/set/class filters
//! - Listing and existence checks of the resolved files on disk

pub mod model;
pub mod filter;
pub mod storage;
pub mod query;
pub mod create;
pub mod listing;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{AccessClass, Client, File, Partition, Protocol, ProtocolPurpose, Purpose};
pub use filter::Filter;
pub use query::{Database, ObjectQuery};
pub use storage::MaskStore;

/// Result type alias for maskattack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for maskattack operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid {field} \"{value}\". Valid values are {allowed}, or lists of those")]
    InvalidParameter {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error(
        "Database cannot be found at expected location '{}'. Create it and then try re-connecting",
        .path.display()
    )]
    NotConnected { path: std::path::PathBuf },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
