use crate::analyzer::Layer;

/// Puts layers in index order: topmost (index 0) first, base layer last.
///
/// Indices are trusted as reported. A non-contiguous or duplicated set is
/// still sorted, not rejected.
pub fn order_layers<L: Layer>(mut layers: Vec<L>) -> Vec<L> {
    layers.sort_by_key(|layer| layer.index());
    layers
}

/// Pairs every layer with the one stacked right above it. The base layer gets `None`.
pub fn with_upper<L>(layers: &[L]) -> impl Iterator<Item = (&L, Option<&L>)> {
    layers
        .iter()
        .enumerate()
        .map(move |(i, layer)| (layer, layers.get(i + 1)))
}
