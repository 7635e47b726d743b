use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use scalar::ValueKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oidsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Typed object references and grant convergence for observability resources",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/config.toml)
    #[arg(long, global = true, env = "OIDSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Relationship store (overrides [store] path)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered resource types
    Types,

    /// Parse, validate and compare object references
    #[command(subcommand)]
    Oid(OidCommand),

    /// Decode and encode typed scalar values
    #[command(subcommand)]
    Value(ValueCommand),

    /// Converge declared grants with the relationship store
    #[command(subcommand)]
    Grants(GrantsCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// OID Commands
// ============================================================================

#[derive(Subcommand)]
pub enum OidCommand {
    /// Parse a reference and show its parts
    Parse {
        /// Reference, e.g. o:dataset:42:7
        reference: String,
    },

    /// Check that a reference names one of the allowed types
    Check {
        /// Reference to check
        reference: String,

        /// Allowed type tags (comma-separated); any type when omitted
        #[arg(short, long, value_delimiter = ',')]
        allow: Vec<String>,
    },

    /// Decide whether changing a field from OLD to NEW is a real change
    Diff {
        /// Value currently in state
        old: String,

        /// Newly declared value
        new: String,
    },

    /// Decide whether a derived object must be recomputed
    Stale {
        /// Version the derived object was computed at
        #[arg(long)]
        current: Option<String>,

        /// Input references the derived object reads
        inputs: Vec<String>,
    },
}

// ============================================================================
// Value Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ValueCommand {
    /// Decode a JSON value bag, e.g. '{"duration": "10m"}'
    Decode {
        /// JSON object with exactly one slot set
        json: String,
    },

    /// Encode text as a value bag of the given kind
    Encode {
        /// Value kind
        #[arg(short, long, value_enum)]
        kind: KindArg,

        /// Value text, e.g. 90s or 2024-05-01T12:00:00Z
        text: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Bool,
    Int64,
    Float64,
    String,
    Duration,
    Timestamp,
}

impl From<KindArg> for ValueKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Bool => ValueKind::Bool,
            KindArg::Int64 => ValueKind::Int64,
            KindArg::Float64 => ValueKind::Float64,
            KindArg::String => ValueKind::String,
            KindArg::Duration => ValueKind::Duration,
            KindArg::Timestamp => ValueKind::Timestamp,
        }
    }
}

// ============================================================================
// Grants Commands
// ============================================================================

#[derive(Subcommand)]
pub enum GrantsCommand {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Create and delete records until the store matches the grant file
    Apply(ApplyArgs),

    /// Show records held in the store
    Show {
        /// Only this scope, e.g. o:workspace:41
        scope: Option<String>,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Grant file (TOML)
    pub file: PathBuf,

    /// Only scopes matching "type" or "type.id"
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Grant file (TOML)
    pub file: PathBuf,

    /// Only scopes matching "type" or "type.id"
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Scopes converged in parallel (default from config)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Give up after this many seconds (default from config)
    #[arg(long)]
    pub timeout: Option<u64>,
}
