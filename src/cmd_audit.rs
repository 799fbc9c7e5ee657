//! The `audit` command: one-shot render printing the JSON report.

use anyhow::{Context, Result};
use foldlens_audit::RenderPipeline;
use foldlens_config::Config;
use foldlens_protocols::RenderOptions;
use tracing::info;
use uuid::Uuid;

use crate::server::build_engine;

/// Render one URL and print the audit report to stdout.
pub(crate) async fn run_audit(
    config: Config,
    raw_url: String,
    device: Option<String>,
    heatmap: bool,
    relaxed: bool,
) -> Result<()> {
    let engine = build_engine(&config);
    let pipeline = RenderPipeline::new(engine.clone(), &config.render);

    let (url, profile) = pipeline.validate(&raw_url, device.as_deref()).await?;
    info!("Auditing {} as {}", url, profile.label);

    let opts = RenderOptions {
        debug_heatmap: heatmap,
        relaxed,
        ..RenderOptions::default()
    };
    let result = pipeline.render(&url, profile, Uuid::new_v4(), opts).await;

    // The browser child must not outlive the CLI whatever the outcome.
    engine.shutdown().await;

    let report = result?;
    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    println!("{json}");
    Ok(())
}
