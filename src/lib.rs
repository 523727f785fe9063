//! Container image layer analysis: per-layer file trees with diff
//! classifications, wasted space and efficiency.

pub mod analyze;
pub mod analyzer;
pub mod check;
pub mod config;
pub mod error;
pub mod format;
pub mod image;
pub mod layers;
pub mod models;
pub mod tree;

pub use error::{AnalysisError, Phase};
