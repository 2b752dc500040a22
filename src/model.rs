//! Record types - the five entities of the mask attack store
//!
//! Enumeration columns are closed Rust enums:
//! - `Partition`: world, dev, test (the `set` columns)
//! - `Purpose`: role of a file inside a protocol
//! - `AccessClass`: client or impostor access for verification probes

use crate::filter::{describe, Choice};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Coarse grouping of clients for training, development and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    World,
    Dev,
    Test,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::World => "world",
            Partition::Dev => "dev",
            Partition::Test => "test",
        }
    }

    /// Get all partitions, in store order
    pub fn all() -> &'static [Partition] {
        &[Partition::World, Partition::Dev, Partition::Test]
    }
}

impl Choice for Partition {
    const FIELD: &'static str = "set";

    fn choices() -> &'static [Self] {
        Self::all()
    }
}

impl FromStr for Partition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "world" => Ok(Partition::World),
            "dev" => Ok(Partition::Dev),
            "test" => Ok(Partition::Test),
            _ => Err(Error::InvalidParameter {
                field: Self::FIELD,
                value: s.to_string(),
                allowed: describe(Self::all()),
            }),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fine-grained role of a file within a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Purpose {
    TrainReal,
    TrainMask,
    Enrol,
    ProbeReal,
    ProbeMask,
    ClassifyReal,
    ClassifyMask,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::TrainReal => "trainReal",
            Purpose::TrainMask => "trainMask",
            Purpose::Enrol => "enrol",
            Purpose::ProbeReal => "probeReal",
            Purpose::ProbeMask => "probeMask",
            Purpose::ClassifyReal => "classifyReal",
            Purpose::ClassifyMask => "classifyMask",
        }
    }

    /// Get all purposes, in store order
    pub fn all() -> &'static [Purpose] {
        &[
            Purpose::TrainReal,
            Purpose::TrainMask,
            Purpose::Enrol,
            Purpose::ProbeReal,
            Purpose::ProbeMask,
            Purpose::ClassifyReal,
            Purpose::ClassifyMask,
        ]
    }

    /// Probe purposes are the ones subject to the client/impostor split
    pub fn is_probe(&self) -> bool {
        matches!(self, Purpose::ProbeReal | Purpose::ProbeMask)
    }
}

impl Choice for Purpose {
    const FIELD: &'static str = "purpose";

    fn choices() -> &'static [Self] {
        Self::all()
    }
}

impl FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::InvalidParameter {
                field: Self::FIELD,
                value: s.to_string(),
                allowed: describe(Self::all()),
            })
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a probe's identity matches the claimed client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessClass {
    Client,
    Impostor,
}

impl AccessClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessClass::Client => "client",
            AccessClass::Impostor => "impostor",
        }
    }

    pub fn all() -> &'static [AccessClass] {
        &[AccessClass::Client, AccessClass::Impostor]
    }
}

impl Choice for AccessClass {
    const FIELD: &'static str = "class";

    fn choices() -> &'static [Self] {
        Self::all()
    }
}

impl FromStr for AccessClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "client" => Ok(AccessClass::Client),
            "impostor" => Ok(AccessClass::Impostor),
            _ => Err(Error::InvalidParameter {
                field: Self::FIELD,
                value: s.to_string(),
                allowed: describe(Self::all()),
            }),
        }
    }
}

impl std::fmt::Display for AccessClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dataset client (subject), bound to one partition for good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub set: Partition,
}

impl Client {
    pub fn new(id: i64, set: Partition) -> Self {
        Self { id, set }
    }
}

/// One captured clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct File {
    /// Key identifier (assigned by the store)
    pub id: i64,
    /// Client this clip was captured from
    pub client_id: i64,
    /// Unique path of the clip inside the dataset, without extension
    pub path: String,
    /// Recording session
    pub session: u32,
    /// Shot within the session
    pub shot: u32,
}

impl File {
    /// Create a file record for insertion (id is set by the store)
    pub fn new(client_id: i64, path: impl Into<String>, session: u32, shot: u32) -> Self {
        Self {
            id: 0,
            client_id,
            path: path.into(),
            session,
            shot,
        }
    }

    /// Wraps the stored path so that a complete path is formed.
    ///
    /// `directory` is prefixed and `extension` (normally including the
    /// leading `.`) is suffixed when given.
    pub fn make_path(&self, directory: Option<&Path>, extension: Option<&str>) -> PathBuf {
        let name = format!("{}{}", self.path, extension.unwrap_or(""));
        match directory {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
            _ => PathBuf::from(name),
        }
    }
}

impl std::fmt::Display for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "File('{}')", self.path)
    }
}

/// A named experimental protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: i64,
    pub name: String,
}

/// One (protocol, partition, purpose) rule and the sessions it draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolPurpose {
    pub id: i64,
    pub protocol_id: i64,
    pub set: Partition,
    pub purpose: Purpose,
    /// Serialized session list, e.g. `[1, 2]`
    pub session_list: String,
}

impl ProtocolPurpose {
    /// Serialize a session list the way it is stored
    pub fn format_sessions(sessions: &[u32]) -> String {
        let joined: Vec<String> = sessions.iter().map(u32::to_string).collect();
        format!("[{}]", joined.join(", "))
    }

    /// Parse the stored session list
    pub fn sessions(&self) -> Result<Vec<u32>> {
        serde_json::from_str(&self.session_list)
            .map_err(|e| Error::Parse(format!("session list '{}': {}", self.session_list, e)))
    }
}
