use std::io::{self, Write};
use std::path::{Path, PathBuf};
use maskattack::listing::{self, PathLayout};
use maskattack::storage::MaskStore;
use maskattack::ui::{self, Icons};
use maskattack::{create, config, Database, ObjectQuery};

/// Listing output; `--self-test` discards it
fn listing_output(self_test: bool) -> Box<dyn Write> {
    if self_test {
        Box::new(io::sink())
    } else {
        Box::new(io::stdout().lock())
    }
}

pub fn run_create(database: &Path, datadir: Option<PathBuf>, extension: &str, recreate: bool) -> anyhow::Result<()> {
    let Some(datadir) = datadir else {
        anyhow::bail!("no data directory given (use --datadir or set `datadir` in maskattack.toml)");
    };
    if !datadir.is_dir() {
        anyhow::bail!("data directory {} does not exist", datadir.display());
    }

    if database.exists() {
        if !recreate {
            anyhow::bail!("database already exists at {} (use --recreate to overwrite)", database.display());
        }
        ui::info(Icons::TRASH, "Unlinking", &database.display().to_string());
        std::fs::remove_file(database)?;
    }
    config::ensure_db_dir(database)?;

    ui::header("Creating 3D mask attack database");
    ui::info(Icons::FOLDER, "Data directory", &datadir.display().to_string());
    ui::info(Icons::DATABASE, "Database", &database.display().to_string());

    let mut store = MaskStore::open(database)?;
    let stats = match create::populate(&mut store, &datadir, extension) {
        Ok(stats) => stats,
        Err(e) => {
            drop(store);
            // leave no half-built store behind
            if let Err(rm) = std::fs::remove_file(database) {
                tracing::warn!("Could not remove {}: {}", database.display(), rm);
            }
            return Err(e.into());
        }
    };

    ui::section("Population");
    ui::summary_row("Clients:", &stats.clients.to_string());
    ui::summary_row("Files:", &stats.files.to_string());
    if stats.skipped > 0 {
        ui::warn(&format!("{} entries did not look like data files and were skipped", stats.skipped));
    }
    ui::summary_row("Protocols:", &stats.protocols.to_string());
    ui::summary_row("Protocol purposes:", &stats.purposes.to_string());
    ui::summary_row("File links:", &stats.links.to_string());
    println!();
    ui::success(&format!("Database saved to {}", database.display()));
    Ok(())
}

pub fn run_dumplist(database: &Path, query: &ObjectQuery, layout: &PathLayout, self_test: bool) -> anyhow::Result<()> {
    let db = Database::open(database)?;
    let files = db.objects(query)?;

    let mut out = listing_output(self_test);
    listing::dump_list(&files, layout, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn run_checkfiles(database: &Path, query: &ObjectQuery, layout: &PathLayout, self_test: bool) -> anyhow::Result<()> {
    let db = Database::open(database)?;
    let files = db.objects(query)?;
    let check = listing::check_files(&files, layout);

    let mut out = listing_output(self_test);
    check.write_report(layout, &mut out)?;
    out.flush()?;

    if !self_test {
        ui::missing_summary(check.missing.len(), check.total);
    }
    Ok(())
}

pub fn run_stats(database: &Path) -> anyhow::Result<()> {
    let db = Database::open(database)?;
    let stats = db.stats()?;
    let counts = db.purpose_counts()?;

    ui::header(&format!("3D mask attack database {}", ui::dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    ui::info(Icons::DATABASE, "Database", &db.path().display().to_string());

    ui::section("Tables");
    println!("{}", ui::stats_table(&stats));

    ui::section("Protocol purposes");
    if counts.is_empty() {
        ui::warn("No protocols registered");
    } else {
        println!("{}", ui::purpose_table(&counts));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use maskattack::create::DEFAULT_EXTENSION;

    fn write_clips(dir: &Path) {
        for client in 1..=17 {
            for session in 1..=3 {
                for shot in 1..=5 {
                    let name = format!("{:02}_{:02}_{:02}{}", client, session, shot, DEFAULT_EXTENSION);
                    std::fs::write(dir.join(name), b"").unwrap();
                }
            }
        }
    }

    #[test]
    fn test_create_refuses_existing_store() {
        let data = tempfile::tempdir().unwrap();
        write_clips(data.path());
        let out = tempfile::tempdir().unwrap();
        let db = out.path().join("db.sql3");

        run_create(&db, Some(data.path().to_path_buf()), DEFAULT_EXTENSION, false).unwrap();
        let before = std::fs::read(&db).unwrap();

        let err = run_create(&db, Some(data.path().to_path_buf()), DEFAULT_EXTENSION, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read(&db).unwrap(), before);

        run_create(&db, Some(data.path().to_path_buf()), DEFAULT_EXTENSION, true).unwrap();
        let stats = Database::open(&db).unwrap().stats().unwrap();
        assert_eq!(stats.files, 255);
        assert_eq!(stats.associations, 475);
    }

    #[test]
    fn test_create_requires_datadir() {
        let out = tempfile::tempdir().unwrap();
        let db = out.path().join("db.sql3");

        assert!(run_create(&db, None, DEFAULT_EXTENSION, false).is_err());
        assert!(run_create(&db, Some(out.path().join("absent")), DEFAULT_EXTENSION, false).is_err());
        assert!(!db.exists());
    }

    #[test]
    fn test_failed_create_leaves_no_store() {
        let data = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("01_01_01.hdf5"), b"").unwrap();
        std::fs::write(data.path().join("18_01_01.hdf5"), b"").unwrap();
        let out = tempfile::tempdir().unwrap();
        let db = out.path().join("nested").join("db.sql3");

        assert!(run_create(&db, Some(data.path().to_path_buf()), DEFAULT_EXTENSION, false).is_err());
        assert!(!db.exists());
    }

    #[test]
    fn test_checkfiles_on_empty_directory_succeeds() {
        let data = tempfile::tempdir().unwrap();
        write_clips(data.path());
        let out = tempfile::tempdir().unwrap();
        let db = out.path().join("db.sql3");
        run_create(&db, Some(data.path().to_path_buf()), DEFAULT_EXTENSION, false).unwrap();

        let empty = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(Some(empty.path().to_path_buf()), Some(DEFAULT_EXTENSION.to_string()));
        let query = ObjectQuery::new().protocol("verification");
        run_checkfiles(&db, &query, &layout, true).unwrap();
        run_dumplist(&db, &query, &layout, true).unwrap();
    }

    #[test]
    fn test_queries_without_store_fail() {
        let out = tempfile::tempdir().unwrap();
        let db = out.path().join("missing.sql3");
        let err = run_checkfiles(&db, &ObjectQuery::new(), &PathLayout::default(), true).unwrap_err();
        assert!(err.to_string().contains("cannot be found"));
    }
}
