use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "ght")]
#[command(version)]
#[command(
    about = "ght is a CLI tool for creating a new repository based on the template",
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

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new repository based on the template
    #[command(visible_aliases = ["r", "repository"])]
    Repo(RepoArgs),

    /// Print the version number of ght
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Repo
// ============================================================================

#[derive(Args, Debug)]
pub struct RepoArgs {
    /// The name of the repository
    #[arg(short, long)]
    pub name: String,

    /// The name of the owner, can be an organization or an authenticated user
    #[arg(short, long)]
    pub owner: String,

    /// A short description of the repository
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Topics to add to the repository (comma-separated or repeated)
    #[arg(short = 'l', long, value_delimiter = ',')]
    pub topics: Vec<String>,

    /// The names of the branches to which the protection rules will be applied
    #[arg(short, long, value_delimiter = ',')]
    pub branches: Vec<String>,

    /// The JSON file containing the template, can be a local or remote (https://) file
    #[arg(short, long)]
    pub template: String,

    /// Enable debug mode
    #[arg(long)]
    pub debug: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub api_url: String,
}
