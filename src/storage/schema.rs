//! Database schema definitions
//!
//! Table and column names are shared with other readers of the store file
//! and must not change. `set` is quoted because it is an SQL keyword.

/// SQL to create the client table
pub const CREATE_CLIENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS client (
    id INTEGER NOT NULL PRIMARY KEY,
    "set" VARCHAR(5) CHECK ("set" IN ('world', 'dev', 'test'))
)
"#;

/// SQL to create the file table
pub const CREATE_FILE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS file (
    id INTEGER NOT NULL PRIMARY KEY,
    client_id INTEGER REFERENCES client (id),
    path VARCHAR(100) UNIQUE,
    session INTEGER,
    shot INTEGER
)
"#;

/// SQL to create the protocol table
pub const CREATE_PROTOCOL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS protocol (
    id INTEGER NOT NULL PRIMARY KEY,
    name VARCHAR(20) UNIQUE
)
"#;

/// SQL to create the protocolPurpose table
pub const CREATE_PROTOCOL_PURPOSE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "protocolPurpose" (
    id INTEGER NOT NULL PRIMARY KEY,
    protocol_id INTEGER REFERENCES protocol (id),
    "set" VARCHAR(5) CHECK ("set" IN ('world', 'dev', 'test')),
    purpose VARCHAR(12) CHECK (purpose IN (
        'trainReal', 'trainMask', 'enrol', 'probeReal', 'probeMask', 'classifyReal', 'classifyMask'
    )),
    session_list VARCHAR(10)
)
"#;

/// SQL to create the many-to-many join between protocol purposes and files
pub const CREATE_ASSOCIATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "protocolPurpose_file_association" (
    "protocolPurpose_id" INTEGER REFERENCES "protocolPurpose" (id),
    file_id INTEGER REFERENCES file (id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_file_client ON file(client_id)",
    "CREATE INDEX IF NOT EXISTS idx_file_order ON file(client_id, session, shot)",
    r#"CREATE INDEX IF NOT EXISTS idx_purpose_protocol ON "protocolPurpose"(protocol_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_association_purpose ON "protocolPurpose_file_association"("protocolPurpose_id")"#,
    r#"CREATE INDEX IF NOT EXISTS idx_association_file ON "protocolPurpose_file_association"(file_id)"#,
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_CLIENT_TABLE,
        CREATE_FILE_TABLE,
        CREATE_PROTOCOL_TABLE,
        CREATE_PROTOCOL_PURPOSE_TABLE,
        CREATE_ASSOCIATION_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
