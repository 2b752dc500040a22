//! The dataset object
//!
//! Opens and keeps a connection to the store and answers the queries
//! experiments need:
//! - Clients per partition
//! - Protocols and their purposes
//! - File lists matching protocol/purpose/set/class filters

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use crate::filter::Filter;
use crate::model::{AccessClass, Client, File, Partition, Protocol, ProtocolPurpose, Purpose};
use crate::storage::{ClientRestriction, DbStats, MaskStore, PurposeCount};
use crate::{Error, Result};

/// Client identifiers present in the dataset
pub const CLIENT_IDS: RangeInclusive<i64> = 1..=17;

/// Filters for [`Database::objects`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectQuery {
    pub protocol: Filter<String>,
    pub purposes: Filter<Purpose>,
    /// Claimed client ids, only used to split probes into client/impostor
    pub client_ids: Filter<i64>,
    pub sets: Filter<Partition>,
    pub classes: Filter<AccessClass>,
}

impl ObjectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: impl Into<Filter<String>>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn purposes(mut self, purposes: impl Into<Filter<Purpose>>) -> Self {
        self.purposes = purposes.into();
        self
    }

    pub fn client_ids(mut self, client_ids: impl Into<Filter<i64>>) -> Self {
        self.client_ids = client_ids.into();
        self
    }

    pub fn sets(mut self, sets: impl Into<Filter<Partition>>) -> Self {
        self.sets = sets.into();
        self
    }

    pub fn classes(mut self, classes: impl Into<Filter<AccessClass>>) -> Self {
        self.classes = classes.into();
        self
    }
}

/// Read-only view over the mask attack store.
///
/// A missing store file is not an error at construction: the object is
/// created disconnected and every query fails with `NotConnected` until
/// [`Database::connect`] succeeds.
pub struct Database {
    path: PathBuf,
    store: Option<MaskStore>,
}

impl Database {
    /// Open the store file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut db = Self {
            path: path.as_ref().to_path_buf(),
            store: None,
        };
        db.connect()?;
        Ok(db)
    }

    /// Wrap an already opened store
    pub fn from_store(store: MaskStore) -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            store: Some(store),
        }
    }

    /// Try connecting or re-connecting to the store file
    pub fn connect(&mut self) -> Result<()> {
        self.store = match MaskStore::open_existing(&self.path) {
            Ok(store) => Some(store),
            Err(Error::NotConnected { .. }) => {
                tracing::debug!(path = %self.path.display(), "Database file not found");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(())
    }

    /// Whether a store is open for reading
    pub fn is_valid(&self) -> bool {
        self.store.is_some()
    }

    /// Location of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store(&self) -> Result<&MaskStore> {
        self.store
            .as_ref()
            .ok_or_else(|| Error::NotConnected { path: self.path.clone() })
    }

    /// All partitions (same for clients and protocol purposes)
    pub fn sets(&self) -> &'static [Partition] {
        Partition::all()
    }

    /// All purposes a protocol may assign
    pub fn purposes(&self) -> &'static [Purpose] {
        Purpose::all()
    }

    /// Clients belonging to the given partitions, ordered by id
    pub fn clients(&self, sets: impl Into<Filter<Partition>>) -> Result<Vec<Client>> {
        let store = self.store()?;
        let sets = sets.into().resolve_choice()?;
        store.list_clients(&sets)
    }

    pub fn has_client_id(&self, id: i64) -> Result<bool> {
        self.store()?.has_client(id)
    }

    pub fn protocols(&self) -> Result<Vec<Protocol>> {
        self.store()?.list_protocols()
    }

    pub fn protocol_names(&self) -> Result<Vec<String>> {
        Ok(self.protocols()?.into_iter().map(|p| p.name).collect())
    }

    pub fn has_protocol(&self, name: &str) -> Result<bool> {
        Ok(self.store()?.find_protocol(name)?.is_some())
    }

    /// The protocol called `name`; fails with `NotFound` if there is none
    pub fn protocol(&self, name: &str) -> Result<Protocol> {
        self.store()?
            .find_protocol(name)?
            .ok_or_else(|| Error::NotFound(format!("protocol '{}'", name)))
    }

    pub fn protocol_purposes(&self) -> Result<Vec<ProtocolPurpose>> {
        self.store()?.list_protocol_purposes()
    }

    /// The file with key `id`; fails with `NotFound` if there is none
    pub fn file(&self, id: i64) -> Result<File> {
        self.store()?
            .get_file(id)?
            .ok_or_else(|| Error::NotFound(format!("file id {}", id)))
    }

    /// Row counts per table
    pub fn stats(&self) -> Result<DbStats> {
        self.store()?.stats()
    }

    /// Number of files attached to each protocol purpose
    pub fn purpose_counts(&self) -> Result<Vec<PurposeCount>> {
        self.store()?.purpose_counts()
    }

    /// Files matching `query`, ordered by (client id, session, shot).
    ///
    /// A file linked to several matching protocol purposes is listed once.
    pub fn objects(&self, query: &ObjectQuery) -> Result<Vec<File>> {
        // fixed enumerations first: invalid input never reaches the store
        let purposes = query.purposes.resolve_choice()?;
        let sets = query.sets.resolve_choice()?;
        let classes = query.classes.resolve_choice()?;
        let client_ids = if query.client_ids.is_any() {
            None
        } else {
            let valid: Vec<i64> = CLIENT_IDS.collect();
            Some(query.client_ids.resolve("client_id", &valid, None)?)
        };

        let store = self.store()?;
        let names = self.protocol_names()?;
        let protocols = query.protocol.resolve("protocol", &names, None)?;

        let restriction = class_restriction(&purposes, &classes, client_ids.as_deref());
        tracing::debug!(
            ?protocols, ?purposes, ?sets, ?classes, ?restriction,
            "Resolving objects"
        );

        let rows = store.find_files(&protocols, &sets, &purposes, restriction)?;
        let files = remove_duplicates(rows);
        tracing::debug!(count = files.len(), "Objects resolved");
        Ok(files)
    }
}

/// Client/impostor split for probe purposes.
///
/// Only `client` keeps the claimed clients' own files, only `impostor`
/// keeps everybody else's. Both classes together cover every file.
fn class_restriction<'a>(
    purposes: &[Purpose],
    classes: &[AccessClass],
    client_ids: Option<&'a [i64]>,
) -> Option<ClientRestriction<'a>> {
    let ids = client_ids?;
    if !purposes.iter().any(Purpose::is_probe) {
        return None;
    }

    let client = classes.contains(&AccessClass::Client);
    let impostor = classes.contains(&AccessClass::Impostor);
    match (client, impostor) {
        (true, false) => Some(ClientRestriction::Include(ids)),
        (false, true) => Some(ClientRestriction::Exclude(ids)),
        _ => None,
    }
}

/// Drop repeated files, keeping the first occurrence
fn remove_duplicates(files: Vec<File>) -> Vec<File> {
    let mut seen = HashSet::new();
    files.into_iter().filter(|f| seen.insert(f.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create::tests::populated_store;

    fn database() -> Database {
        Database::from_store(populated_store())
    }

    fn count(db: &Database, query: ObjectQuery) -> usize {
        db.objects(&query).unwrap().len()
    }

    #[test]
    fn test_verification_protocol() {
        let db = database();
        let q = || ObjectQuery::new().protocol("verification");

        assert_eq!(count(&db, q()), 220);
        assert_eq!(count(&db, q().sets(Partition::World)), 70);
        assert_eq!(count(&db, q().sets(Partition::Dev)), 75);
        assert_eq!(count(&db, q().sets(Partition::Test)), 75);
        assert_eq!(count(&db, q().sets(Partition::World).purposes(Purpose::TrainReal)), 70);
        for set in [Partition::Dev, Partition::Test] {
            assert_eq!(count(&db, q().sets(set).purposes(Purpose::Enrol)), 25);
            assert_eq!(count(&db, q().sets(set).purposes(Purpose::ProbeReal)), 25);
            assert_eq!(count(&db, q().sets(set).purposes(Purpose::ProbeMask)), 25);
        }
    }

    #[test]
    fn test_classification_protocol() {
        let db = database();
        let q = || ObjectQuery::new().protocol("classification");

        assert_eq!(count(&db, q()), 255);
        assert_eq!(count(&db, q().sets(Partition::World)), 105);
        assert_eq!(count(&db, q().sets(Partition::Dev)), 75);
        assert_eq!(count(&db, q().sets(Partition::Test)), 75);
        assert_eq!(count(&db, q().sets(Partition::World).purposes(Purpose::TrainReal)), 70);
        assert_eq!(count(&db, q().sets(Partition::World).purposes(Purpose::TrainMask)), 35);
        for set in [Partition::Dev, Partition::Test] {
            assert_eq!(count(&db, q().sets(set).purposes(Purpose::ClassifyReal)), 50);
            assert_eq!(count(&db, q().sets(set).purposes(Purpose::ClassifyMask)), 25);
        }
    }

    #[test]
    fn test_clients() {
        let db = database();
        assert_eq!(db.clients(Filter::<Partition>::Any).unwrap().len(), 17);
        assert_eq!(db.clients(Partition::World).unwrap().len(), 7);
        assert_eq!(db.clients(vec![Partition::Dev, Partition::Test]).unwrap().len(), 10);

        for id in [1, 8, 9, 16] {
            assert!(db.has_client_id(id).unwrap(), "client {id} should exist");
        }
        for id in [0, 18, 20, 25] {
            assert!(!db.has_client_id(id).unwrap(), "client {id} should not exist");
        }
    }

    #[test]
    fn test_protocol_lookups() {
        let db = database();
        assert_eq!(db.protocol_names().unwrap(), vec!["verification", "classification"]);
        assert!(db.has_protocol("classification").unwrap());
        assert!(!db.has_protocol("highdef").unwrap());
        assert_eq!(db.protocol("verification").unwrap().name, "verification");
        assert!(matches!(db.protocol("highdef"), Err(Error::NotFound(_))));
        assert_eq!(db.protocol_purposes().unwrap().len(), 13);
    }

    #[test]
    fn test_file_lookup() {
        let db = database();
        let first = db.objects(&ObjectQuery::new()).unwrap().remove(0);
        assert_eq!(db.file(first.id).unwrap(), first);
        assert!(matches!(db.file(10_000), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_objects_are_deduplicated_across_protocols() {
        let db = database();
        // every world file in sessions 1-2 is trainReal in both protocols
        let files = db.objects(&ObjectQuery::new().purposes(Purpose::TrainReal)).unwrap();
        assert_eq!(files.len(), 70);

        let all = db.objects(&ObjectQuery::new()).unwrap();
        assert_eq!(all.len(), 255);
        let ids: HashSet<_> = all.iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), all.len());
    }

    #[test]
    fn test_objects_ordering_and_idempotence() {
        let db = database();
        let query = ObjectQuery::new().protocol("verification").sets(Partition::Dev);
        let first = db.objects(&query).unwrap();
        let second = db.objects(&query).unwrap();
        assert_eq!(first, second);

        let keys: Vec<_> = first.iter().map(|f| (f.client_id, f.session, f.shot)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_client_and_impostor_probes() {
        let db = database();
        let probes = || {
            ObjectQuery::new()
                .protocol("verification")
                .sets(Partition::Dev)
                .purposes(Purpose::ProbeReal)
                .client_ids(9i64)
        };

        let client = db.objects(&probes().classes(AccessClass::Client)).unwrap();
        assert_eq!(client.len(), 5);
        assert!(client.iter().all(|f| f.client_id == 9));

        let impostor = db.objects(&probes().classes(AccessClass::Impostor)).unwrap();
        assert_eq!(impostor.len(), 20);
        assert!(impostor.iter().all(|f| f.client_id != 9));

        let both = db
            .objects(&probes().classes(vec![AccessClass::Client, AccessClass::Impostor]))
            .unwrap();
        assert_eq!(both.len(), 25);

        // no class given: both classes, no split
        assert_eq!(db.objects(&probes()).unwrap().len(), 25);
    }

    #[test]
    fn test_client_ids_only_split_probes() {
        let db = database();
        let query = ObjectQuery::new()
            .protocol("verification")
            .sets(Partition::Dev)
            .purposes(Purpose::Enrol)
            .client_ids(9i64)
            .classes(AccessClass::Client);
        assert_eq!(db.objects(&query).unwrap().len(), 25);
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let db = database();
        let query = ObjectQuery::new()
            .protocol("verification")
            .sets(Partition::World)
            .purposes(Purpose::Enrol);
        assert!(db.objects(&query).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        let db = database();

        let err = db.objects(&ObjectQuery::new().protocol("highdef")).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { field: "protocol", .. }));

        let err = db.objects(&ObjectQuery::new().client_ids(18i64)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { field: "client_id", .. }));
    }

    #[test]
    fn test_disconnected_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("db.sql3")).unwrap();
        assert!(!db.is_valid());

        let err = db.objects(&ObjectQuery::new()).unwrap_err();
        assert!(matches!(err, Error::NotConnected { .. }));
        assert!(matches!(db.clients(Filter::<Partition>::Any), Err(Error::NotConnected { .. })));

        // validation happens before the store is needed
        let err = db.objects(&ObjectQuery::new().client_ids(0i64)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        let sets = Filter::<Partition>::parse(&["bogus"]);
        assert!(matches!(sets, Err(Error::InvalidParameter { field: "set", .. })));
    }
}
