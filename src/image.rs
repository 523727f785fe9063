use tracing::{debug, info, info_span};

use crate::analyzer::{ImageAnalyzer, ImageResolver, Inefficiency, Layer};
use crate::error::{AnalysisError, Phase};
use crate::layers::{order_layers, with_upper};
use crate::models::{ImageAnalysis, InefficiencyAnalysis, LayerAnalysis};
use crate::tree::aggregate_layer;

/// Runs the analyzer on `reference` and aggregates its output.
///
/// Steps run in order and the first failure aborts the whole analysis.
pub fn analyze<R: ImageResolver>(resolver: &R, reference: &str) -> Result<ImageAnalysis, AnalysisError> {
    let span = info_span!("analyze", image = reference);
    let _enter = span.enter();

    let mut analyzer = resolver
        .resolve(reference)
        .map_err(|e| AnalysisError::phase(Phase::Resolve, reference, e))?;

    // Released when this function returns, whatever the outcome
    let mut handle = analyzer
        .fetch()
        .map_err(|e| AnalysisError::phase(Phase::Fetch, reference, e))?;
    analyzer
        .parse(&mut handle)
        .map_err(|e| AnalysisError::phase(Phase::Parse, reference, e))?;
    let result = analyzer
        .analyze()
        .map_err(|e| AnalysisError::phase(Phase::Analyze, reference, e))?;

    info!(
        layers = result.layers.len(),
        efficiency = result.efficiency,
        wasted_bytes = result.wasted_bytes,
        "analyzer finished"
    );

    let inefficiency_analysis_list = filter_inefficiencies(result.inefficiencies);

    let layers = order_layers(result.layers);
    let mut layer_analysis_list = Vec::with_capacity(layers.len());
    for (layer, upper) in with_upper(&layers) {
        let file_analysis = aggregate_layer(layer, upper)?;
        debug!(
            index = layer.index(),
            files = file_analysis.file_count(),
            "aggregated layer"
        );

        layer_analysis_list.push(LayerAnalysis {
            id: layer.id().to_string(),
            short_id: layer.short_id().to_string(),
            index: layer.index(),
            command: layer.command().to_string(),
            size: layer.size(),
            file_analysis,
        });
    }

    Ok(ImageAnalysis {
        efficiency: result.efficiency,
        size_bytes: result.size_bytes,
        user_size_bytes: result.user_size_bytes,
        wasted_bytes: result.wasted_bytes,
        layer_analysis_list,
        inefficiency_analysis_list,
    })
}

/// Drops entries that waste nothing, keeping the analyzer's order.
pub fn filter_inefficiencies(inefficiencies: Vec<Inefficiency>) -> Vec<InefficiencyAnalysis> {
    inefficiencies
        .into_iter()
        .filter(|item| item.cumulative_size > 0)
        .map(|item| InefficiencyAnalysis {
            path: item.path,
            cumulative_size: item.cumulative_size,
        })
        .collect()
}
