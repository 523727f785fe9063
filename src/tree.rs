//! Rebuilds a layer's nested directory tree from the analyzer's flat file list.

use tracing::trace;

use crate::analyzer::{FileNode, FileTree, Layer};
use crate::error::AnalysisError;
use crate::models::FileAnalysis;

/// Builds the file tree of `layer`, diffed against `upper` when there is one.
///
/// Only leaves are copied. Directories are synthesized from leaf paths, so a
/// directory the analyzer never reported still shows up if it holds a file.
pub fn aggregate_layer<L: Layer>(layer: &L, upper: Option<&L>) -> Result<FileAnalysis, AnalysisError> {
    let index = layer.index();
    let mut tree = layer.tree();

    if let Some(upper) = upper {
        tree.compare(&upper.tree())
            .map_err(|e| AnalysisError::Compare {
                index,
                source: Box::new(e),
            })?;
    }

    let mut root = FileAnalysis::directory();
    tree.visit_depth_child_first(|node| {
        if node.is_dir || node.path.is_empty() {
            return Ok(());
        }
        insert_leaf(&mut root, node).map_err(|path| AnalysisError::PathConflict { index, path })
    })?;

    Ok(root)
}

/// Places `node` under `root`, creating missing parent directories.
///
/// On a file/directory clash the offending path is returned.
fn insert_leaf(root: &mut FileAnalysis, node: &FileNode) -> Result<(), String> {
    let segments: Vec<&str> = node.path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((name, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let child = current
            .children
            .entry((*segment).to_string())
            .or_insert_with(FileAnalysis::directory);
        if !child.is_dir {
            return Err(format!("/{}", parents[..=depth].join("/")));
        }
        current = child;
    }

    if current.child(name).is_some_and(|existing| existing.is_dir) {
        return Err(format!("/{}", segments.join("/")));
    }

    trace!(path = %node.path, diff = node.diff_type.as_str(), "leaf");
    current
        .children
        .insert((*name).to_string(), FileAnalysis::leaf(node));
    Ok(())
}
