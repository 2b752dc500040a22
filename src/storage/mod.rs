//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - client(id, set)
//! - file(id, client_id, path, session, shot)
//! - protocol(id, name)
//! - protocolPurpose(id, protocol_id, set, purpose, session_list)
//! - protocolPurpose_file_association(protocolPurpose_id, file_id)

pub mod schema;
pub mod sqlite;

pub use sqlite::{ClientRestriction, DbStats, MaskStore, PurposeCount};
