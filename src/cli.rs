use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::Overrides;

#[derive(Parser)]
#[command(name = "topoform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Plan, apply and inspect a parameterized Azure VM topology", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Inputs file (TOML or JSON); defaults to <config dir>/topology.toml
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides applied on top of the inputs file and environment
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Number of VMs to declare (1-10)
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub vm_count: Option<i64>,

    /// Whether to declare VMs at all
    #[arg(long, global = true, value_name = "BOOL")]
    pub deploy_vms: Option<bool>,

    /// Read the SSH public key from a file (enables key authentication)
    #[arg(long, global = true, value_name = "FILE")]
    pub ssh_public_key_file: Option<PathBuf>,
}

impl From<&InputArgs> for Overrides {
    fn from(args: &InputArgs) -> Self {
        Self {
            vm_count: args.vm_count,
            deploy_vms: args.deploy_vms,
            ssh_public_key_file: args.ssh_public_key_file.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Load and validate the inputs
    Validate,

    /// Print the topology descriptor (resources, attributes, edges)
    Render {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the dependency stages
    Graph,

    /// Show what apply would change
    Plan(PlanArgs),

    /// Converge recorded state to the descriptor
    Apply(ApplyArgs),

    /// Remove every recorded resource
    Destroy {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show outputs
    Output(OutputArgs),

    /// Ask Azure OpenAI to review the current plan
    Analyze {
        /// Where to save the report
        #[arg(short, long, default_value = "topology-analysis.txt")]
        out: PathBuf,
    },

    /// Manage the inputs file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Plan / Apply
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan matching resources (type, type.name, or network/security/nics/vms)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply matching resources (type, type.name, or network/security/nics/vms)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show what would change without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Number of resources applied in parallel within a stage
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

// ============================================================================
// Output
// ============================================================================

#[derive(Args)]
pub struct OutputArgs {
    /// Only show this output
    pub name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Reveal sensitive outputs
    #[arg(long)]
    pub show_sensitive: bool,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show file locations and the effective inputs
    Show,

    /// Write a starter inputs file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
