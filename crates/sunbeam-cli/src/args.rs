use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "sunbeam", version, about = "Sunbeam pipeline driver")]
pub struct Cli {
    /// Directory holding sunbeam.toml and the files it references.
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the pipeline described by the configuration directory.
    Run {
        /// Pipeline title; becomes the origin of everything this run
        /// produces.
        #[arg(long, default_value = "pipeline")]
        title: String,

        /// Stage to run in its skip path (repeatable).
        #[arg(long = "skip-stage")]
        skip_stages: Vec<String>,

        /// Ingress target to skip (repeatable).
        #[arg(long = "skip-target")]
        skip_targets: Vec<String>,
    },

    /// Print the resolved stage execution order and exit.
    Graph,
}
