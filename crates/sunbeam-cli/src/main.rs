use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sunbeam_cli::{args, run};
use sunbeam_core::PipelineError;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = args::Cli::parse();
    let config_dir = Path::new(&cli.config_dir);

    let outcome = match cli.command {
        args::Command::Run {
            title,
            skip_stages,
            skip_targets,
        } => run::run_pipeline(config_dir, &title, skip_stages, skip_targets),
        args::Command::Graph => run::print_graph(config_dir),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error @ PipelineError::Config(_)) => {
            error!(%error, "configuration error");
            ExitCode::from(1)
        }
        Err(error) => {
            error!(%error, "pipeline run failed");
            ExitCode::from(2)
        }
    }
}
