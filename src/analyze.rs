use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::config::Config;
use crate::format::{print_image_table, print_layer_tree};
use crate::image::analyze;
use crate::models::ImageAnalysis;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn analyze_image(config: &Config, image: &str, format: OutputFormat) -> Result<ImageAnalysis> {
    let analysis = run(config, image)?;

    match format {
        OutputFormat::Table => {
            print_image_table(image, &analysis);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }

    Ok(analysis)
}

pub fn show_layer(config: &Config, image: &str, index: usize, format: OutputFormat) -> Result<()> {
    let analysis = run(config, image)?;
    let layer = analysis.layer(index).with_context(|| {
        format!(
            "Image '{}' has no layer {} ({} layers)",
            image,
            index,
            analysis.layer_analysis_list.len()
        )
    })?;

    match format {
        OutputFormat::Table => {
            print_layer_tree(layer);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&layer.file_analysis)?);
        }
    }

    Ok(())
}

fn run(config: &Config, image: &str) -> Result<ImageAnalysis> {
    analyze(&config.resolver(), image)
        .with_context(|| format!("Failed to analyze image '{}'", image))
}
