use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "confess")]
#[command(about = "Post and like anonymous confessions from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Quick capture: confess "my confession here"
    #[arg(trailing_var_arg = true)]
    pub confession: Vec<String>,
}

/// Flags shared by every command that opens a session.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name holding the hosted store configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Use the local database even when a hosted store is configured
    #[arg(long, global = true)]
    pub local: bool,

    /// JSON file describing the host context to discover a platform identity from
    #[arg(long, global = true, value_name = "PATH")]
    pub host_context: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Post a new anonymous confession
    #[command(alias = "add")]
    Post {
        /// Confession text
        text: Vec<String>,
    },
    /// List the latest confessions
    List {
        /// Number of confessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Like a confession, or remove your like
    Like {
        /// Confession ID
        id: String,
    },
    /// Show the identity likes are recorded under
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Host context file used for identity discovery
        #[arg(long, value_name = "PATH")]
        host_context_path: Option<PathBuf>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}
