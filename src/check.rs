use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::config::Config;
use crate::format::format_efficiency;
use crate::image::analyze;

/// Runs a full analysis of `image` as a smoke test.
pub fn run_check(config: &Config, image: &str) -> Result<()> {
    info!(image, dir = %config.snapshot_dir.display(), "running self check");

    let analysis = analyze(&config.resolver(), image)
        .with_context(|| format!("Self check failed for image '{}'", image))?;

    println!(
        "{} {} analyzed: {} layers, efficiency {}",
        "✅".green(),
        image.bright_cyan(),
        analysis.layer_analysis_list.len(),
        format_efficiency(analysis.efficiency)
    );

    Ok(())
}
