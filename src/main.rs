//! maskattack CLI - create, list and check the 3D mask attack dataset store

mod commands;

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use maskattack::config::{self, MaskAttackConfig};
use maskattack::listing::PathLayout;
use maskattack::{Filter, ObjectQuery};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "maskattack")]
#[command(version)]
#[command(about = "3D mask attack database - metadata store and file lists")]
#[command(long_about = r#"
maskattack manages the metadata store of the 3D mask attack dataset:
  • Build the store from a directory of <client>_<session>_<shot> clips
  • List the files of a protocol, purpose, set or class
  • Check which of those files are present on disk

Example usage:
  maskattack create --datadir "/data/3D Mask Attack/Data"
  maskattack dumplist -x verification -s dev -p probeMask -e .hdf5
  maskattack checkfiles -d "/data/3D Mask Attack/Data" -e .hdf5
"#)]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates or re-creates this database
    Create {
        /// If set, I'll first erase the current database
        #[arg(short = 'R', long)]
        recreate: bool,

        /// Directory containing the data files
        #[arg(short = 'D', long, value_name = "DIR")]
        datadir: Option<PathBuf>,

        /// Extension of the data files
        #[arg(long)]
        extension: Option<String>,
    },

    /// Dumps lists of files based on your criteria
    Dumplist(FilterArgs),

    /// Checks existence of files based on your criteria
    Checkfiles(FilterArgs),

    /// Show row counts and protocol purposes of the database
    Stats,
}

#[derive(Args)]
struct FilterArgs {
    /// If given, this path will be prepended to every entry
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,

    /// If given, this extension will be appended to every entry
    #[arg(short = 'e', long)]
    extension: Option<String>,

    /// Limit to the files of the given protocol(s)
    #[arg(short = 'x', long)]
    protocol: Vec<String>,

    /// Limit to the files of the given purpose(s)
    #[arg(short = 'p', long)]
    purposes: Vec<String>,

    /// Claimed client id(s) used to split probes into client and impostor accesses
    #[arg(short = 'i', long = "client-ids")]
    client_ids: Vec<i64>,

    /// Limit to the files of the given set(s) (world, dev, test)
    #[arg(short = 's', long)]
    sets: Vec<String>,

    /// Limit to the given class(es) of probe accesses (client, impostor)
    #[arg(short = 'c', long)]
    classes: Vec<String>,

    #[arg(long = "self-test", hide = true)]
    self_test: bool,
}

impl FilterArgs {
    fn query(&self) -> maskattack::Result<ObjectQuery> {
        Ok(ObjectQuery {
            protocol: Filter::many(self.protocol.iter().cloned()),
            purposes: Filter::parse(&self.purposes)?,
            client_ids: Filter::many(self.client_ids.iter().copied()),
            sets: Filter::parse(&self.sets)?,
            classes: Filter::parse(&self.classes)?,
        })
    }

    fn layout(&self, config: &MaskAttackConfig) -> PathLayout {
        PathLayout::new(
            config.directory_path(self.directory.clone()),
            config.extension_or(self.extension.clone()),
        )
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for listings
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = config.database_path(cli.database);

    match cli.command {
        Commands::Create { recreate, datadir, extension } => {
            let datadir = config.datadir_path(datadir);
            let extension = config
                .extension_or(extension)
                .unwrap_or_else(|| maskattack::create::DEFAULT_EXTENSION.to_string());
            commands::run_create(&database, datadir, &extension, recreate)?;
        }

        Commands::Dumplist(args) => {
            let query = args.query()?;
            commands::run_dumplist(&database, &query, &args.layout(&config), args.self_test)?;
        }

        Commands::Checkfiles(args) => {
            let query = args.query()?;
            commands::run_checkfiles(&database, &query, &args.layout(&config), args.self_test)?;
        }

        Commands::Stats => {
            commands::run_stats(&database)?;
        }
    }

    Ok(())
}
