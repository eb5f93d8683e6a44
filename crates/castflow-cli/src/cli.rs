use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "castflow")]
#[command(version, about = "CastFlow - publish videos and posts through browser automation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/castflow/config.toml)
    #[arg(long, global = true, env = "CASTFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run the browser without a visible window
    #[arg(long, global = true, env = "CASTFLOW_HEADLESS")]
    pub headless: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an upload node
    Run(RunArgs),

    /// List upload nodes and their inputs
    Nodes(NodesArgs),

    /// Check that Node.js and Playwright are usable
    Probe,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Node id, see `castflow nodes`
    pub node: String,

    /// Node input as KEY=VALUE (repeatable)
    #[arg(short, long = "input", value_name = "KEY=VALUE")]
    pub inputs: Vec<String>,

    /// JSON object with node inputs; --input values take precedence
    #[arg(long, value_name = "FILE")]
    pub inputs_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct NodesArgs {
    /// Show the input fields of a single node
    pub node: Option<String>,
}
