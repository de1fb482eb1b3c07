use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "acme-cert-rs")]
#[command(version = "1.0.0")]
#[command(about = "Issue ACME certificates and manage them in a trust store")]
#[command(long_about = None)]
pub struct Cli {
    /// Settings file path (default: ~/.config/acme-cert-rs/config.yaml)
    #[arg(long, env = "ACME_CERT_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Certificate authority base URI
    #[arg(long, env = "ACME_BASE_URI", value_hint = clap::ValueHint::Url)]
    pub base_uri: Option<String>,

    /// Enable verbose logging (repeat for more verbosity: -v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output raw tab-separated values (no formatting)
    #[arg(short, long)]
    pub raw: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Request a new certificate; the first host is the primary name
    Request {
        /// Host names to cover
        #[arg(required = true, value_hint = clap::ValueHint::Hostname)]
        hosts: Vec<String>,
        /// Install the issued certificate into the trust store
        #[arg(long)]
        install: bool,
        /// Personal store to install into (default from settings)
        #[arg(long)]
        store: Option<String>,
    },
    /// Request a replacement for the installed certificate and swap it in
    Renew {
        /// Host names to cover; the first one identifies the installed certificate
        #[arg(required = true, value_hint = clap::ValueHint::Hostname)]
        hosts: Vec<String>,
        /// Personal store (default from settings)
        #[arg(long)]
        store: Option<String>,
    },
    /// Install a certificate and its chain from a PKCS#12 archive
    Install {
        /// Archive path
        #[arg(value_hint = clap::ValueHint::FilePath)]
        archive: PathBuf,
        /// Personal store (default from settings)
        #[arg(long)]
        store: Option<String>,
        /// Friendly name for the installed certificate (default: archive file stem)
        #[arg(long)]
        friendly_name: Option<String>,
        /// Prompt for the archive password instead of using the configured one
        #[arg(long)]
        ask_password: bool,
    },
    /// Remove every certificate with the given thumbprint from a store
    Uninstall {
        /// SHA-1 thumbprint, any case, colons allowed
        thumbprint: String,
        /// Store to remove from (default: personal store from settings)
        #[arg(long)]
        store: Option<String>,
    },
    /// Show the installed certificate for a host
    Lookup {
        /// Primary host name
        #[arg(value_hint = clap::ValueHint::Hostname)]
        host: String,
        /// Store to search (default: personal store from settings)
        #[arg(long)]
        store: Option<String>,
    },
    /// Trust store inspection
    Store {
        #[command(subcommand)]
        command: StoreCommands,
    },
    /// Generate shell completion scripts
    Completion {
        #[command(subcommand)]
        command: CompletionCommands,
    },
    /// Internal completion helpers (hidden)
    #[command(hide = true)]
    CompletionHelper {
        #[command(subcommand)]
        command: CompletionHelperCommands,
    },
}

#[derive(Subcommand)]
pub enum StoreCommands {
    /// List certificates in a store
    List {
        /// Store name (default: personal store from settings)
        #[arg(long)]
        store: Option<String>,
        /// Columns to display (comma-separated): thumbprint,cn,issuer,not_before,not_after,sans,friendly_name,private_key,expired. Use +column to append to defaults.
        #[arg(long)]
        columns: Option<String>,
    },
    /// List store names
    Names,
}

#[derive(Subcommand)]
pub enum CompletionCommands {
    /// Generate bash completion script
    Bash,
    /// Generate zsh completion script
    Zsh,
    /// Generate fish completion script
    Fish,
    /// Generate PowerShell completion script
    PowerShell,
}

impl CompletionCommands {
    pub fn shell(&self) -> Shell {
        match self {
            CompletionCommands::Bash => Shell::Bash,
            CompletionCommands::Zsh => Shell::Zsh,
            CompletionCommands::Fish => Shell::Fish,
            CompletionCommands::PowerShell => Shell::PowerShell,
        }
    }
}

#[derive(Subcommand)]
pub enum CompletionHelperCommands {
    /// List store names for completion
    Stores,
    /// List column names for completion
    Columns,
}
