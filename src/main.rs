//! Foldlens - Mobile fold UX audit service.
//!
//! Main entry point for the Foldlens CLI, server, and worker.

use clap::Parser;

mod cli;
mod cmd_audit;
mod cmd_worker;
mod server;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    server::init_tracing()?;

    let cli = Cli::parse();
    let config = server::load_config(&cli.config)?;

    match cli.command {
        None => server::run_serve(config, None, None).await?,
        Some(Commands::Serve { host, port }) => server::run_serve(config, host, port).await?,
        Some(Commands::Worker) => cmd_worker::run_worker(config).await?,
        Some(Commands::Audit {
            url,
            device,
            heatmap,
            relaxed,
        }) => cmd_audit::run_audit(config, url, device, heatmap, relaxed).await?,
    }

    Ok(())
}
