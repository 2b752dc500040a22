//! Store population
//!
//! Builds the whole store in a single pass from a directory of clips named
//! `<client>_<session>_<shot><extension>`:
//! 1. Clients 1-17 with their fixed partition
//! 2. One file row per clip found on disk
//! 3. The `verification` and `classification` protocols, their purposes,
//!    and the purpose/file links derived from each purpose's sessions

use std::path::Path;
use regex::Regex;
use crate::model::{Client, File, Partition, ProtocolPurpose, Purpose};
use crate::query::CLIENT_IDS;
use crate::storage::MaskStore;
use crate::{Error, Result};

/// Extension of the per-clip data files
pub const DEFAULT_EXTENSION: &str = ".hdf5";

const FILE_NAME_PATTERN: &str = r"^(\d+)_(\d+)_(\d+)$";

/// One purpose of a protocol: the partition it covers and the sessions it
/// draws its files from.
#[derive(Debug, Clone, Copy)]
pub struct PurposeRule {
    pub set: Partition,
    pub purpose: Purpose,
    pub sessions: &'static [u32],
}

const fn rule(set: Partition, purpose: Purpose, sessions: &'static [u32]) -> PurposeRule {
    PurposeRule { set, purpose, sessions }
}

/// Real accesses train, session 1 enrols, sessions 2 and 3 probe
pub const VERIFICATION: &[PurposeRule] = &[
    rule(Partition::World, Purpose::TrainReal, &[1, 2]),
    rule(Partition::Dev, Purpose::Enrol, &[1]),
    rule(Partition::Dev, Purpose::ProbeReal, &[2]),
    rule(Partition::Dev, Purpose::ProbeMask, &[3]),
    rule(Partition::Test, Purpose::Enrol, &[1]),
    rule(Partition::Test, Purpose::ProbeReal, &[2]),
    rule(Partition::Test, Purpose::ProbeMask, &[3]),
];

/// Sessions 1-2 are real accesses, session 3 is the mask attack
pub const CLASSIFICATION: &[PurposeRule] = &[
    rule(Partition::World, Purpose::TrainReal, &[1, 2]),
    rule(Partition::World, Purpose::TrainMask, &[3]),
    rule(Partition::Dev, Purpose::ClassifyReal, &[1, 2]),
    rule(Partition::Dev, Purpose::ClassifyMask, &[3]),
    rule(Partition::Test, Purpose::ClassifyReal, &[1, 2]),
    rule(Partition::Test, Purpose::ClassifyMask, &[3]),
];

/// All protocols created by [`populate`], in creation order
pub const PROTOCOLS: &[(&str, &[PurposeRule])] = &[
    ("verification", VERIFICATION),
    ("classification", CLASSIFICATION),
];

/// Partition a client id belongs to
pub fn partition_for_client(id: i64) -> Partition {
    match id {
        ..=7 => Partition::World,
        8..=12 => Partition::Dev,
        _ => Partition::Test,
    }
}

/// What a population run inserted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateStats {
    pub clients: usize,
    pub files: usize,
    pub skipped: usize,
    pub protocols: usize,
    pub purposes: usize,
    pub links: usize,
}

impl std::fmt::Display for PopulateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Population Statistics:")?;
        writeln!(f, "  Clients: {}", self.clients)?;
        writeln!(f, "  Files: {} (skipped: {})", self.files, self.skipped)?;
        writeln!(f, "  Protocols: {}", self.protocols)?;
        writeln!(f, "  Protocol purposes: {}", self.purposes)?;
        writeln!(f, "  Links: {}", self.links)
    }
}

/// Parse a clip name (without extension) into a file record
pub fn parse_file_name(pattern: &Regex, stem: &str) -> Option<File> {
    let caps = pattern.captures(stem)?;
    let client_id = caps[1].parse().ok()?;
    let session = caps[2].parse().ok()?;
    let shot = caps[3].parse().ok()?;
    Some(File::new(client_id, stem, session, shot))
}

/// Find the clips in `datadir`, sorted by path.
///
/// Returns the parsed files and the number of names that did not match.
pub fn scan_datadir(datadir: &Path, extension: &str) -> Result<(Vec<File>, usize)> {
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&datadir.to_string_lossy()),
        glob::Pattern::escape(extension)
    );
    let name_pattern = Regex::new(FILE_NAME_PATTERN).map_err(|e| Error::Parse(e.to_string()))?;

    let mut files = Vec::new();
    let mut skipped = 0;
    for entry in glob::glob(&pattern).map_err(|e| Error::Parse(format!("glob '{}': {}", pattern, e)))? {
        let path = entry.map_err(|e| Error::Io(e.into()))?;
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            skipped += 1;
            continue;
        };
        let stem = name.strip_suffix(extension).unwrap_or(name);
        match parse_file_name(&name_pattern, stem) {
            Some(file) => files.push(file),
            None => {
                tracing::warn!("Skipping '{}': not a <client>_<session>_<shot> name", path.display());
                skipped += 1;
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok((files, skipped))
}

/// Add the 17 clients with their partitions
pub fn add_clients(store: &MaskStore) -> Result<usize> {
    let mut added = 0;
    for id in CLIENT_IDS {
        let set = partition_for_client(id);
        tracing::debug!("Adding client {} on '{}' set", id, set);
        store.insert_client(&Client::new(id, set))?;
        added += 1;
    }
    Ok(added)
}

/// Add the file rows
pub fn add_files(store: &MaskStore, files: &[File]) -> Result<usize> {
    for file in files {
        tracing::debug!("Adding file '{}'", file.path);
        store.insert_file(file)?;
    }
    Ok(files.len())
}

/// Add both protocols with their purposes and file links
pub fn add_protocols(store: &MaskStore, stats: &mut PopulateStats) -> Result<()> {
    for (name, rules) in PROTOCOLS {
        tracing::info!("Adding protocol {}", name);
        let protocol_id = store.insert_protocol(name)?;
        stats.protocols += 1;

        for rule in rules.iter() {
            tracing::debug!(" Adding protocol purpose ('{}', '{}')", rule.set, rule.purpose);
            let purpose = ProtocolPurpose {
                id: 0,
                protocol_id,
                set: rule.set,
                purpose: rule.purpose,
                session_list: ProtocolPurpose::format_sessions(rule.sessions),
            };
            let purpose_id = store.insert_protocol_purpose(&purpose)?;
            stats.purposes += 1;

            for &session in rule.sessions {
                for file in store.files_in_session(rule.set, session)? {
                    tracing::trace!("  Adding protocol file '{}'", file.path);
                    store.link_file(purpose_id, file.id)?;
                    stats.links += 1;
                }
            }
        }
    }
    Ok(())
}

/// Populate an empty store from the clips in `datadir`.
///
/// Everything is inserted in one transaction; on failure nothing is kept.
pub fn populate(store: &mut MaskStore, datadir: &Path, extension: &str) -> Result<PopulateStats> {
    let (files, skipped) = scan_datadir(datadir, extension)?;
    tracing::info!(found = files.len(), skipped, "Scanned {}", datadir.display());

    store.begin_transaction()?;
    match insert_all(store, &files) {
        Ok(mut stats) => {
            store.commit()?;
            stats.skipped = skipped;
            Ok(stats)
        }
        Err(e) => {
            if let Err(rb) = store.rollback() {
                tracing::warn!("Rollback after failed population also failed: {}", rb);
            }
            Err(e)
        }
    }
}

fn insert_all(store: &MaskStore, files: &[File]) -> Result<PopulateStats> {
    let mut stats = PopulateStats {
        clients: add_clients(store)?,
        files: add_files(store, files)?,
        ..Default::default()
    };
    add_protocols(store, &mut stats)?;
    Ok(stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Write one empty clip per (client, session, shot) of the full dataset
    pub(crate) fn write_dataset(dir: &Path, extension: &str) {
        for client in CLIENT_IDS {
            for session in 1..=3 {
                for shot in 1..=5 {
                    let name = format!("{:02}_{:02}_{:02}{}", client, session, shot, extension);
                    std::fs::write(dir.join(name), b"").unwrap();
                }
            }
        }
    }

    /// An in-memory store populated with the full 255-clip dataset
    pub(crate) fn populated_store() -> MaskStore {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), DEFAULT_EXTENSION);
        let mut store = MaskStore::open_in_memory().unwrap();
        populate(&mut store, dir.path(), DEFAULT_EXTENSION).unwrap();
        store
    }

    #[test]
    fn test_partition_for_client() {
        assert_eq!(partition_for_client(1), Partition::World);
        assert_eq!(partition_for_client(7), Partition::World);
        assert_eq!(partition_for_client(8), Partition::Dev);
        assert_eq!(partition_for_client(12), Partition::Dev);
        assert_eq!(partition_for_client(13), Partition::Test);
        assert_eq!(partition_for_client(17), Partition::Test);
    }

    #[test]
    fn test_parse_file_name() {
        let pattern = Regex::new(FILE_NAME_PATTERN).unwrap();
        let file = parse_file_name(&pattern, "03_02_05").unwrap();
        assert_eq!((file.client_id, file.session, file.shot), (3, 2, 5));
        assert_eq!(file.path, "03_02_05");

        assert!(parse_file_name(&pattern, "readme").is_none());
        assert!(parse_file_name(&pattern, "03_02").is_none());
        assert!(parse_file_name(&pattern, "03_02_05_extra").is_none());
    }

    #[test]
    fn test_scan_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02_01_01.hdf5"), b"").unwrap();
        std::fs::write(dir.path().join("01_03_02.hdf5"), b"").unwrap();
        std::fs::write(dir.path().join("notes.hdf5"), b"").unwrap();
        std::fs::write(dir.path().join("01_01_01.avi"), b"").unwrap();

        let (files, skipped) = scan_datadir(dir.path(), DEFAULT_EXTENSION).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["01_03_02", "02_01_01"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_populate_full_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), DEFAULT_EXTENSION);
        let mut store = MaskStore::open_in_memory().unwrap();

        let stats = populate(&mut store, dir.path(), DEFAULT_EXTENSION).unwrap();
        assert_eq!(stats.clients, 17);
        assert_eq!(stats.files, 255);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.protocols, 2);
        assert_eq!(stats.purposes, 13);
        // verification 220 + classification 255
        assert_eq!(stats.links, 475);

        let db_stats = store.stats().unwrap();
        assert_eq!(db_stats.files, 255);
        assert_eq!(db_stats.associations, 475);
    }

    #[test]
    fn test_linked_sessions_match_purpose() {
        let store = populated_store();
        let protocols = store.list_protocols().unwrap();
        let purposes = store.list_protocol_purposes().unwrap();
        assert_eq!(purposes.len(), 13);

        let mut linked_total = 0;
        for purpose in purposes {
            let sessions = purpose.sessions().unwrap();
            let protocol = protocols.iter().find(|p| p.id == purpose.protocol_id).unwrap();
            let linked = store
                .find_files(&[protocol.name.clone()], &[purpose.set], &[purpose.purpose], None)
                .unwrap();

            for file in &linked {
                assert!(
                    sessions.contains(&file.session),
                    "{} linked to {:?} outside sessions {:?}",
                    file.path, purpose, sessions
                );
                assert_eq!(partition_for_client(file.client_id), purpose.set);
            }

            let mut expected: Vec<i64> = Vec::new();
            for &session in &sessions {
                expected.extend(store.files_in_session(purpose.set, session).unwrap().iter().map(|f| f.id));
            }
            let mut linked_ids: Vec<i64> = linked.iter().map(|f| f.id).collect();
            expected.sort_unstable();
            linked_ids.sort_unstable();
            assert_eq!(linked_ids, expected, "{:?}", purpose);
            linked_total += linked.len();
        }
        assert_eq!(linked_total, 475);
    }

    #[test]
    fn test_scan_rejects_suffixed_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("01_01_01.hdf5"), b"").unwrap();
        std::fs::write(dir.path().join("01_01_01_extra.hdf5"), b"").unwrap();

        let (files, skipped) = scan_datadir(dir.path(), DEFAULT_EXTENSION).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "01_01_01");
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_populate_rolls_back_on_unknown_client() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("01_01_01.hdf5"), b"").unwrap();
        std::fs::write(dir.path().join("18_01_01.hdf5"), b"").unwrap();
        let mut store = MaskStore::open_in_memory().unwrap();

        let err = populate(&mut store, dir.path(), DEFAULT_EXTENSION).unwrap_err();
        match err {
            Error::Storage(rusqlite::Error::SqliteFailure(e, _)) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation);
            }
            other => panic!("expected the foreign key violation, got: {other}"),
        }
        let stats = store.stats().unwrap();
        assert_eq!(stats.clients, 0);
        assert_eq!(stats.files, 0);
    }
}
