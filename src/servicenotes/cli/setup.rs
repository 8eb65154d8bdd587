use clap::{Parser, Subcommand};
use std::net::SocketAddr;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "servicenotes", bin_name = "servicenotes", version = get_version())]
#[command(about = "Service notes kept in a JSON file, mirrored to cloud storage", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log store and sync activity to stderr
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List records (default)
    #[command(alias = "ls", display_order = 1)]
    List,

    /// Show one record in full
    #[command(alias = "v", display_order = 2)]
    View {
        /// Record number as shown by `list`
        index: usize,
    },

    /// Add a record
    #[command(alias = "n", display_order = 3)]
    Add {
        /// DD/MM/YYYY, defaults to today
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        theme: String,

        /// Bible passage, e.g. "John 3:16"
        #[arg(long)]
        passage: String,

        #[arg(long)]
        notes: String,

        #[arg(long)]
        devotional: String,
    },

    /// Change fields of a record; fields not given keep their value
    #[command(alias = "e", display_order = 4)]
    Edit {
        index: usize,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        theme: Option<String>,

        #[arg(long)]
        passage: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        devotional: Option<String>,
    },

    /// Delete a record
    #[command(alias = "rm", display_order = 5)]
    Delete { index: usize },

    /// Themes, passages by book, and dates across all records
    #[command(display_order = 10)]
    Summary,

    /// Local file, remote, and sync state
    #[command(display_order = 11)]
    Status,

    /// Take a backup now
    #[command(display_order = 20)]
    Backup,

    /// List backups, newest first
    #[command(display_order = 21)]
    Backups,

    /// Replace all records with the contents of a backup
    #[command(display_order = 22)]
    Restore {
        /// Backup file name (from `backups`) or a path
        backup: String,
    },

    /// Print the effective configuration
    #[command(display_order = 30)]
    Config,

    /// Serve records as JSON over HTTP
    #[command(display_order = 31)]
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },
}
