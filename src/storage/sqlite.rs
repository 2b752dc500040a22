//! SQLite storage implementation

use std::path::Path;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};
use crate::{Result, Error};
use crate::model::{Client, File, Partition, Protocol, ProtocolPurpose, Purpose};
use super::schema;

const FILE_COLUMNS: &str = "file.id, file.client_id, file.path, file.session, file.shot";

/// Client-id restriction applied to object queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRestriction<'a> {
    /// Keep files whose client id is listed
    Include(&'a [i64]),
    /// Keep files whose client id is not listed
    Exclude(&'a [i64]),
}

/// SQLite-backed storage for the dataset metadata
pub struct MaskStore {
    conn: Connection,
}

impl MaskStore {
    /// Open a database file for writing (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        tracing::info!(path = %path.display(), "Database opened for writing");
        Ok(store)
    }

    /// Open an existing database file read-only.
    ///
    /// Fails with `NotConnected` when the file is missing. No exclusive lock
    /// is taken.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotConnected { path: path.to_path_buf() });
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::debug!(path = %path.display(), "Database opened read-only");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Inserts ==========

    pub fn insert_client(&self, client: &Client) -> Result<()> {
        self.conn.execute(
            r#"INSERT INTO client (id, "set") VALUES (?1, ?2)"#,
            params![client.id, client.set.as_str()],
        )?;
        Ok(())
    }

    /// Insert a file and return its assigned id
    pub fn insert_file(&self, file: &File) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO file (client_id, path, session, shot) VALUES (?1, ?2, ?3, ?4)",
            params![file.client_id, file.path, file.session, file.shot],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a protocol and return its assigned id
    pub fn insert_protocol(&self, name: &str) -> Result<i64> {
        self.conn.execute("INSERT INTO protocol (name) VALUES (?1)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a protocol purpose and return its assigned id
    pub fn insert_protocol_purpose(&self, purpose: &ProtocolPurpose) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO "protocolPurpose" (protocol_id, "set", purpose, session_list)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                purpose.protocol_id,
                purpose.set.as_str(),
                purpose.purpose.as_str(),
                purpose.session_list,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Attach a file to a protocol purpose
    pub fn link_file(&self, protocol_purpose_id: i64, file_id: i64) -> Result<()> {
        self.conn.execute(
            r#"INSERT INTO "protocolPurpose_file_association" ("protocolPurpose_id", file_id) VALUES (?1, ?2)"#,
            params![protocol_purpose_id, file_id],
        )?;
        Ok(())
    }

    // ========== Client Operations ==========

    /// Clients belonging to any of `sets`, ordered by id
    pub fn list_clients(&self, sets: &[Partition]) -> Result<Vec<Client>> {
        let sql = format!(
            r#"SELECT id, "set" FROM client WHERE "set" IN ({}) ORDER BY id"#,
            placeholders(sets.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let clients = stmt
            .query_map(params_from_iter(sets.iter().map(|s| s.as_str())), |row| {
                let set: String = row.get(1)?;
                Ok(Client {
                    id: row.get(0)?,
                    set: parse_column(&set, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(clients)
    }

    pub fn has_client(&self, id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM client WHERE id = ?1", [id], |row| row.get(0))?;
        Ok(count != 0)
    }

    // ========== Protocol Operations ==========

    pub fn list_protocols(&self) -> Result<Vec<Protocol>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM protocol ORDER BY id")?;
        let protocols = stmt
            .query_map([], |row| Ok(Protocol { id: row.get(0)?, name: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(protocols)
    }

    pub fn find_protocol(&self, name: &str) -> Result<Option<Protocol>> {
        self.conn
            .query_row(
                "SELECT id, name FROM protocol WHERE name = ?1",
                [name],
                |row| Ok(Protocol { id: row.get(0)?, name: row.get(1)? }),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_protocol_purposes(&self) -> Result<Vec<ProtocolPurpose>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT id, protocol_id, "set", purpose, session_list FROM "protocolPurpose" ORDER BY id"#
        )?;
        let purposes = stmt
            .query_map([], |row| self.row_to_protocol_purpose(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(purposes)
    }

    fn row_to_protocol_purpose(&self, row: &rusqlite::Row) -> rusqlite::Result<ProtocolPurpose> {
        let set: String = row.get(2)?;
        let purpose: String = row.get(3)?;
        Ok(ProtocolPurpose {
            id: row.get(0)?,
            protocol_id: row.get(1)?,
            set: parse_column(&set, 2)?,
            purpose: parse_column(&purpose, 3)?,
            session_list: row.get(4)?,
        })
    }

    // ========== File Operations ==========

    pub fn get_file(&self, id: i64) -> Result<Option<File>> {
        self.conn
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM file WHERE file.id = ?1"),
                [id],
                |row| self.row_to_file(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Files of clients in `set` recorded during `session`, ordered by id
    pub fn files_in_session(&self, set: Partition, session: u32) -> Result<Vec<File>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {FILE_COLUMNS} FROM file
            JOIN client ON client.id = file.client_id
            WHERE client."set" = ?1 AND file.session = ?2
            ORDER BY file.id
            "#
        ))?;
        let files = stmt
            .query_map(params![set.as_str(), session], |row| self.row_to_file(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Files attached to any protocol purpose matching the given names, sets
    /// and purposes, ordered by (client, session, shot).
    ///
    /// A file is returned once per matching association row.
    pub fn find_files(
        &self,
        protocols: &[String],
        sets: &[Partition],
        purposes: &[Purpose],
        restriction: Option<ClientRestriction<'_>>,
    ) -> Result<Vec<File>> {
        let mut values: Vec<Value> = Vec::new();
        values.extend(protocols.iter().cloned().map(Value::Text));
        values.extend(sets.iter().map(|s| Value::Text(s.as_str().to_string())));
        values.extend(purposes.iter().map(|p| Value::Text(p.as_str().to_string())));

        let mut sql = format!(
            r#"
            SELECT {FILE_COLUMNS} FROM file
            JOIN client ON client.id = file.client_id
            JOIN "protocolPurpose_file_association" AS assoc ON assoc.file_id = file.id
            JOIN "protocolPurpose" AS pp ON pp.id = assoc."protocolPurpose_id"
            JOIN protocol ON protocol.id = pp.protocol_id
            WHERE protocol.name IN ({}) AND pp."set" IN ({}) AND pp.purpose IN ({})
            "#,
            placeholders(protocols.len()),
            placeholders(sets.len()),
            placeholders(purposes.len()),
        );

        match restriction {
            Some(ClientRestriction::Include(ids)) => {
                sql.push_str(&format!(" AND client.id IN ({})", placeholders(ids.len())));
                values.extend(ids.iter().copied().map(Value::Integer));
            }
            Some(ClientRestriction::Exclude(ids)) => {
                sql.push_str(&format!(" AND file.client_id NOT IN ({})", placeholders(ids.len())));
                values.extend(ids.iter().copied().map(Value::Integer));
            }
            None => {}
        }
        sql.push_str(" ORDER BY file.client_id, file.session, file.shot, file.id");
        tracing::trace!(sql = %sql, params = values.len(), "object query");

        let mut stmt = self.conn.prepare(&sql)?;
        let files = stmt
            .query_map(params_from_iter(values.iter()), |row| self.row_to_file(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Helper to convert a row to a File
    fn row_to_file(&self, row: &rusqlite::Row) -> rusqlite::Result<File> {
        Ok(File {
            id: row.get(0)?,
            client_id: row.get(1)?,
            path: row.get(2)?,
            session: row.get(3)?,
            shot: row.get(4)?,
        })
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            clients: self.count("client")?,
            files: self.count("file")?,
            protocols: self.count("protocol")?,
            protocol_purposes: self.count(r#""protocolPurpose""#)?,
            associations: self.count(r#""protocolPurpose_file_association""#)?,
        })
    }

    /// Number of files attached to each protocol purpose
    pub fn purpose_counts(&self) -> Result<Vec<PurposeCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT protocol.name, pp."set", pp.purpose, pp.session_list, COUNT(assoc.file_id)
            FROM "protocolPurpose" AS pp
            JOIN protocol ON protocol.id = pp.protocol_id
            LEFT JOIN "protocolPurpose_file_association" AS assoc ON assoc."protocolPurpose_id" = pp.id
            GROUP BY pp.id
            ORDER BY pp.id
            "#,
        )?;
        let counts = stmt
            .query_map([], |row| {
                let set: String = row.get(1)?;
                let purpose: String = row.get(2)?;
                let files: i64 = row.get(4)?;
                Ok(PurposeCount {
                    protocol: row.get(0)?,
                    set: parse_column(&set, 1)?,
                    purpose: parse_column(&purpose, 2)?,
                    session_list: row.get(3)?,
                    files: files as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }
}

/// `?, ?, ?` for an IN list of `n` values
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Parse an enumeration column, reporting failures as conversion errors
fn parse_column<T>(value: &str, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    value.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStats {
    pub clients: usize,
    pub files: usize,
    pub protocols: usize,
    pub protocol_purposes: usize,
    pub associations: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Clients: {}", self.clients)?;
        writeln!(f, "  Files: {}", self.files)?;
        writeln!(f, "  Protocols: {}", self.protocols)?;
        writeln!(f, "  Protocol purposes: {}", self.protocol_purposes)?;
        writeln!(f, "  Associations: {}", self.associations)
    }
}

/// File count of one protocol purpose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurposeCount {
    pub protocol: String,
    pub set: Partition,
    pub purpose: Purpose,
    pub session_list: String,
    pub files: usize,
}
