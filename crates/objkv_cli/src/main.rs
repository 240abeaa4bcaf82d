//! objkv CLI
//!
//! Command-line tools over a snapshot-backed in-memory objkv engine.
//!
//! # Commands
//!
//! - `init` - Create a store and a pool/container pair
//! - `classes` - List the exported object classes
//! - `newkv` / `rootkv` - Allocate a KV object or locate the root object
//! - `put` / `get` / `del` - Single-key operations
//! - `keys` / `dump` / `len` - Walk an object's key space

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// objkv command-line store tools.
#[derive(Parser)]
#[command(name = "objkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the snapshot file
    #[arg(global = true, short, long, default_value = "objkv.json")]
    store: PathBuf,

    /// Pool UUID of the container to use
    #[arg(global = true, long)]
    pool: Option<Uuid>,

    /// Container UUID of the container to use
    #[arg(global = true, long)]
    cont: Option<Uuid>,

    /// Namespace path of the container to use
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store (if needed) and a new pool/container pair
    Init {
        /// Also bind the container to this namespace path
        #[arg(short, long)]
        register: Option<PathBuf>,
    },

    /// List the object classes the engine exports
    Classes {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Allocate a new KV object and print its identifier
    Newkv {
        /// Object class name
        #[arg(short, long)]
        class: Option<String>,
    },

    /// Print the root KV object identifier
    Rootkv {
        /// Object class name
        #[arg(short, long)]
        class: Option<String>,
    },

    /// Store a value (an empty value deletes the key)
    Put {
        /// Object identifier, or `root`
        object: String,
        /// Key
        key: String,
        /// Value
        value: String,
    },

    /// Print the value stored under a key
    Get {
        /// Object identifier, or `root`
        object: String,
        /// Key
        key: String,
    },

    /// Delete a key
    Del {
        /// Object identifier, or `root`
        object: String,
        /// Key
        key: String,
    },

    /// List every key of an object
    Keys {
        /// Object identifier, or `root`
        object: String,
    },

    /// Print every key and value of an object
    Dump {
        /// Object identifier, or `root`
        object: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the number of keys in an object
    Len {
        /// Object identifier, or `root`
        object: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let target = commands::Target {
        store: cli.store,
        pool: cli.pool,
        cont: cli.cont,
        path: cli.path,
    };

    match cli.command {
        Commands::Init { register } => commands::init::run(&target, register.as_deref())?,
        Commands::Classes { format } => commands::classes::run(&target, &format)?,
        Commands::Newkv { class } => commands::object::newkv(&target, class.as_deref())?,
        Commands::Rootkv { class } => commands::object::rootkv(&target, class.as_deref())?,
        Commands::Put { object, key, value } => {
            commands::entry::put(&target, &object, &key, &value)?;
        }
        Commands::Get { object, key } => commands::entry::get(&target, &object, &key)?,
        Commands::Del { object, key } => commands::entry::del(&target, &object, &key)?,
        Commands::Keys { object } => commands::listing::keys(&target, &object)?,
        Commands::Dump { object, format } => commands::listing::dump(&target, &object, &format)?,
        Commands::Len { object } => commands::listing::len(&target, &object)?,
    }

    Ok(())
}
