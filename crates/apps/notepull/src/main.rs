//! # notepull
//!
//! Pull notes from the notes service into a folder of markdown documents.
//!
//! ## Example
//!
//! ```bash
//! notepull login <token>
//! notepull --vault ~/Vault sync
//! notepull auto on --interval 15
//! notepull --vault ~/Vault watch
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use std::path::PathBuf;

mod app;

use app::App;

/// Pull notes into a markdown vault
#[derive(Parser, Debug)]
#[command(name = "notepull")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Vault directory documents are written into
    #[arg(long, global = true, default_value = ".")]
    vault: PathBuf,

    /// Settings file (default: ~/.config/notepull/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync new notes now (Ctrl-C stops after the current note)
    Sync,

    /// Run scheduled syncs in the foreground while auto-sync is on
    Watch,

    /// Show settings and the last sync
    Status {
        /// Print settings as JSON (token redacted)
        #[arg(long)]
        json: bool,
    },

    /// Store the API token
    Login {
        /// Token issued by the notes service
        token: String,
    },

    /// Set the destination folder inside the vault
    Folder {
        /// Folder path, `/`-separated
        path: String,
    },

    /// Turn auto-sync on or off
    Auto {
        state: Toggle,

        /// Minutes between scheduled syncs (minimum 5)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Forget the resume point so the next sync walks the whole history
    ResetCursor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    let mut app = App::open(cli.vault, cli.settings)?;

    match cli.command {
        Command::Sync => app.sync().await,
        Command::Watch => app.watch().await,
        Command::Status { json } => app.status(json),
        Command::Login { token } => app.login(&token),
        Command::Folder { path } => app.set_folder(&path),
        Command::Auto { state, interval } => app.set_auto_sync(state == Toggle::On, interval),
        Command::ResetCursor => app.reset_cursor(),
    }
}
