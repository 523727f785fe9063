//! Interface to the image analyzer that fetches, parses and diffs image layers.
//!
//! The aggregation engine only consumes what these traits hand back. A
//! concrete implementation lives in [`snapshot`].

use std::error::Error as StdError;
use std::io::Read;

use crate::models::DiffType;

pub mod snapshot;

/// Turns an image reference into an analyzer bound to that image.
pub trait ImageResolver {
    type Analyzer: ImageAnalyzer;
    type Error: StdError + Send + Sync + 'static;

    fn resolve(&self, reference: &str) -> Result<Self::Analyzer, Self::Error>;
}

/// One image, analyzed in three steps: fetch, parse, analyze.
///
/// The handle returned by `fetch` is closed by dropping it.
pub trait ImageAnalyzer {
    type Handle: Read;
    type Layer: Layer;
    type Error: StdError + Send + Sync + 'static;

    fn fetch(&mut self) -> Result<Self::Handle, Self::Error>;
    fn parse(&mut self, handle: &mut Self::Handle) -> Result<(), Self::Error>;
    fn analyze(&mut self) -> Result<AnalysisResult<Self::Layer>, Self::Error>;
}

/// Raw analyzer output. Layers come in whatever order the analyzer keeps them.
#[derive(Debug, Clone)]
pub struct AnalysisResult<L> {
    pub efficiency: f64,
    pub size_bytes: u64,
    pub user_size_bytes: u64,
    pub wasted_bytes: u64,
    pub layers: Vec<L>,
    pub inefficiencies: Vec<Inefficiency>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inefficiency {
    pub path: String,
    pub cumulative_size: u64,
}

pub trait Layer {
    type Tree: FileTree;

    /// Position in the stack, 0 being the topmost layer.
    fn index(&self) -> usize;
    fn id(&self) -> &str;
    fn short_id(&self) -> &str;
    fn command(&self) -> &str;
    fn size(&self) -> u64;

    /// An owned copy of the layer's file tree. Comparing it never touches the layer.
    fn tree(&self) -> Self::Tree;
}

pub trait FileTree {
    type Error: StdError + Send + Sync + 'static;

    /// Annotates this tree's diff classifications against the layer above it.
    fn compare(&mut self, upper: &Self) -> Result<(), Self::Error>;

    /// Visits every node, children before their parents. Stops at the first error.
    fn visit_depth_child_first<F, E>(&self, visitor: F) -> Result<(), E>
    where
        F: FnMut(&FileNode) -> Result<(), E>;
}

/// A node as reported by the analyzer's file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub link_name: String,
    pub mode: u32,
    pub diff_type: DiffType,
}
