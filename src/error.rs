use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Analyzer step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Fetch,
    Parse,
    Analyze,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Resolve => "resolve",
            Phase::Fetch => "fetch",
            Phase::Parse => "parse",
            Phase::Analyze => "analyze",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The external analyzer failed in one of its steps
    #[error("{phase} failed for image '{image}': {source}")]
    Phase {
        phase: Phase,
        image: String,
        #[source]
        source: BoxError,
    },

    /// Diffing a layer against the layer above it failed
    #[error("comparing layer {index} against its upper layer failed: {source}")]
    Compare {
        index: usize,
        #[source]
        source: BoxError,
    },

    /// A path is used both as a file and as a directory
    #[error("path conflict in layer {index}: '{path}' is both a file and a directory")]
    PathConflict { index: usize, path: String },
}

impl AnalysisError {
    pub fn phase<E>(phase: Phase, image: &str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        AnalysisError::Phase {
            phase,
            image: image.to_string(),
            source: Box::new(source),
        }
    }

    /// The failed analyzer step, if the error came from one.
    pub fn failed_phase(&self) -> Option<Phase> {
        match self {
            AnalysisError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
