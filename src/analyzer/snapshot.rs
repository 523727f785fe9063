//! Analyzer backed by JSON dumps of an external image analyzer.
//!
//! A dump holds the image totals, the inefficiency report and a flat file
//! list per layer. Dumps live in one directory, one file per image reference.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{AnalysisResult, FileNode, FileTree, ImageAnalyzer, ImageResolver, Inefficiency, Layer};
use crate::models::DiffType;

const SHORT_ID_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("invalid image reference '{0}'")]
    InvalidReference(String),

    #[error("no snapshot for '{reference}' at {}", .path.display())]
    NotFound { reference: String, path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot has not been parsed")]
    NotParsed,

    #[error("'{path}' is a directory in one layer and a file in the other")]
    TypeMismatch { path: String },
}

#[derive(Debug, Clone)]
pub struct SnapshotResolver {
    dir: PathBuf,
}

impl SnapshotResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the snapshot for `reference` is expected.
    pub fn snapshot_path(&self, reference: &str) -> PathBuf {
        let direct = Path::new(reference);
        if direct.is_file() {
            return direct.to_path_buf();
        }
        self.dir.join(snapshot_file_name(reference))
    }
}

impl ImageResolver for SnapshotResolver {
    type Analyzer = SnapshotAnalyzer;
    type Error = SnapshotError;

    fn resolve(&self, reference: &str) -> Result<SnapshotAnalyzer, SnapshotError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(SnapshotError::InvalidReference(reference.to_string()));
        }

        Ok(SnapshotAnalyzer {
            reference: reference.to_string(),
            path: self.snapshot_path(reference),
            document: None,
        })
    }
}

/// `library/node:alpine` -> `library_node_alpine.json`
pub fn snapshot_file_name(reference: &str) -> String {
    let stem: String = reference
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.json", stem)
}

#[derive(Debug)]
pub struct SnapshotAnalyzer {
    reference: String,
    path: PathBuf,
    document: Option<SnapshotDocument>,
}

impl SnapshotAnalyzer {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageAnalyzer for SnapshotAnalyzer {
    type Handle = BufReader<File>;
    type Layer = SnapshotLayer;
    type Error = SnapshotError;

    fn fetch(&mut self) -> Result<Self::Handle, SnapshotError> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SnapshotError::NotFound {
                reference: self.reference.clone(),
                path: self.path.clone(),
            },
            _ => SnapshotError::Io(e),
        })?;
        debug!(path = %self.path.display(), "opened snapshot");
        Ok(BufReader::new(file))
    }

    fn parse(&mut self, handle: &mut Self::Handle) -> Result<(), SnapshotError> {
        let mut document: SnapshotDocument = serde_json::from_reader(handle)?;
        for layer in &mut document.layers {
            if layer.short_id.is_empty() {
                layer.short_id = short_id(&layer.id);
            }
        }
        debug!(layers = document.layers.len(), "parsed snapshot");
        self.document = Some(document);
        Ok(())
    }

    fn analyze(&mut self) -> Result<AnalysisResult<SnapshotLayer>, SnapshotError> {
        let document = self.document.clone().ok_or(SnapshotError::NotParsed)?;

        Ok(AnalysisResult {
            efficiency: document.efficiency,
            size_bytes: document.size_bytes,
            user_size_bytes: document.user_size_bytes,
            wasted_bytes: document.wasted_bytes,
            layers: document.layers,
            inefficiencies: document
                .inefficiencies
                .into_iter()
                .map(|i| Inefficiency {
                    path: i.path,
                    cumulative_size: i.cumulative_size,
                })
                .collect(),
        })
    }
}

/// Strips the digest algorithm and keeps the first 12 hex characters.
pub fn short_id(id: &str) -> String {
    let hex = id.split_once(':').map_or(id, |(_, hex)| hex);
    hex.chars().take(SHORT_ID_LEN).collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    #[serde(default)]
    pub efficiency: f64,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub user_size_bytes: u64,
    #[serde(default)]
    pub wasted_bytes: u64,
    #[serde(default)]
    pub layers: Vec<SnapshotLayer>,
    #[serde(default)]
    pub inefficiencies: Vec<SnapshotInefficiency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInefficiency {
    pub path: String,
    #[serde(default)]
    pub cumulative_size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLayer {
    pub index: usize,
    pub id: String,
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub files: Vec<SnapshotEntry>,
}

impl Layer for SnapshotLayer {
    type Tree = SnapshotTree;

    fn index(&self) -> usize {
        self.index
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn short_id(&self) -> &str {
        &self.short_id
    }

    fn command(&self) -> &str {
        &self.command
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn tree(&self) -> SnapshotTree {
        SnapshotTree {
            entries: self.files.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub link_name: String,
    #[serde(default)]
    pub mode: u32,
    /// Classification recorded by the analyzer, if any.
    #[serde(default)]
    pub diff_type: Option<DiffType>,
}

impl SnapshotEntry {
    fn same_content(&self, other: &SnapshotEntry) -> bool {
        self.size == other.size && self.mode == other.mode && self.link_name == other.link_name
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotTree {
    entries: Vec<SnapshotEntry>,
}

impl SnapshotTree {
    pub fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }
}

impl FileTree for SnapshotTree {
    type Error = SnapshotError;

    fn compare(&mut self, upper: &SnapshotTree) -> Result<(), SnapshotError> {
        let upper_entries: HashMap<String, &SnapshotEntry> = upper
            .entries
            .iter()
            .map(|e| (normalize(&e.path), e))
            .collect();

        for entry in &mut self.entries {
            let other = upper_entries.get(&normalize(&entry.path));

            if let Some(other) = other {
                if other.is_dir != entry.is_dir {
                    return Err(SnapshotError::TypeMismatch {
                        path: entry.path.clone(),
                    });
                }
            }

            if entry.diff_type.is_none() {
                entry.diff_type = Some(match other {
                    None => DiffType::Added,
                    Some(other) if other.same_content(entry) => DiffType::Unchanged,
                    Some(_) => DiffType::Modified,
                });
            }
        }

        Ok(())
    }

    fn visit_depth_child_first<F, E>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(&FileNode) -> Result<(), E>,
    {
        let mut order: Vec<&SnapshotEntry> = self.entries.iter().collect();
        order.sort_by(|a, b| post_order(&a.path, &b.path));

        for entry in order {
            visitor(&FileNode {
                path: entry.path.clone(),
                is_dir: entry.is_dir,
                size: entry.size,
                link_name: entry.link_name.clone(),
                mode: entry.mode,
                diff_type: entry.diff_type.unwrap_or_default(),
            })?;
        }

        Ok(())
    }
}

/// `etc//hosts` and `/etc/hosts` both become `etc/hosts`.
fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Orders paths segment by segment, putting descendants before their ancestors.
fn post_order(a: &str, b: &str) -> Ordering {
    let mut left = a.split('/').filter(|s| !s.is_empty());
    let mut right = b.split('/').filter(|s| !s.is_empty());

    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => match l.cmp(r) {
                Ordering::Equal => continue,
                other => return other,
            },
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, size: u64) -> SnapshotEntry {
        SnapshotEntry {
            path: path.to_string(),
            size,
            mode: 0o644,
            ..SnapshotEntry::default()
        }
    }

    fn dir(path: &str) -> SnapshotEntry {
        SnapshotEntry {
            path: path.to_string(),
            is_dir: true,
            ..SnapshotEntry::default()
        }
    }

    fn visited(tree: &SnapshotTree) -> Vec<FileNode> {
        let mut nodes = Vec::new();
        tree.visit_depth_child_first(|node| {
            nodes.push(node.clone());
            Ok::<(), SnapshotError>(())
        })
        .unwrap();
        nodes
    }

    #[test]
    fn file_name_replaces_separators() {
        assert_eq!(snapshot_file_name("node:alpine"), "node_alpine.json");
        assert_eq!(
            snapshot_file_name("ghcr.io/acme/api@sha256:ff"),
            "ghcr.io_acme_api_sha256_ff.json"
        );
    }

    #[test]
    fn short_id_strips_algorithm() {
        assert_eq!(short_id("sha256:0123456789abcdef0123"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn resolve_rejects_blank_reference() {
        let resolver = SnapshotResolver::new("/nonexistent");
        assert!(matches!(
            resolver.resolve("  "),
            Err(SnapshotError::InvalidReference(_))
        ));
    }

    #[test]
    fn fetch_reports_missing_snapshot() {
        let resolver = SnapshotResolver::new("/nonexistent-strata-dir");
        let mut analyzer = resolver.resolve("node:alpine").unwrap();
        assert_eq!(
            analyzer.path(),
            Path::new("/nonexistent-strata-dir/node_alpine.json")
        );
        assert!(matches!(
            analyzer.fetch(),
            Err(SnapshotError::NotFound { .. })
        ));
    }

    #[test]
    fn analyze_before_parse_fails() {
        let mut analyzer = SnapshotResolver::new("/tmp").resolve("x").unwrap();
        assert!(matches!(analyzer.analyze(), Err(SnapshotError::NotParsed)));
    }

    #[test]
    fn visits_children_before_parents() {
        let tree = SnapshotTree::new(vec![
            dir("/a"),
            entry("/b", 1),
            entry("/a/y", 1),
            dir("/a/sub"),
            entry("/a/sub/z", 1),
            entry("/a/x", 1),
        ]);

        let paths: Vec<String> = visited(&tree).into_iter().map(|n| n.path).collect();
        assert_eq!(
            paths,
            vec!["/a/sub/z", "/a/sub", "/a/x", "/a/y", "/a", "/b"]
        );
    }

    #[test]
    fn visit_stops_at_first_error() {
        let tree = SnapshotTree::new(vec![entry("/a", 1), entry("/b", 1), entry("/c", 1)]);
        let mut seen = 0;
        let result = tree.visit_depth_child_first(|node| {
            seen += 1;
            if node.path == "/b" {
                Err("stop")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(seen, 2);
    }

    #[test]
    fn compare_classifies_unrecorded_entries() {
        let mut lower = SnapshotTree::new(vec![
            entry("/same", 10),
            entry("/changed", 10),
            entry("/new", 10),
            SnapshotEntry {
                diff_type: Some(DiffType::Removed),
                ..entry("/recorded", 10)
            },
        ]);
        let upper = SnapshotTree::new(vec![
            entry("/same", 10),
            entry("/changed", 20),
            entry("/recorded", 10),
        ]);

        lower.compare(&upper).unwrap();

        let types: Vec<(String, DiffType)> = lower
            .entries()
            .iter()
            .map(|e| (e.path.clone(), e.diff_type.unwrap()))
            .collect();
        assert_eq!(
            types,
            vec![
                ("/same".to_string(), DiffType::Unchanged),
                ("/changed".to_string(), DiffType::Modified),
                ("/new".to_string(), DiffType::Added),
                ("/recorded".to_string(), DiffType::Removed),
            ]
        );
    }

    #[test]
    fn compare_matches_paths_by_segments() {
        let mut lower = SnapshotTree::new(vec![entry("/etc/hosts", 5), entry("/etc/motd", 5)]);
        let upper = SnapshotTree::new(vec![entry("etc//hosts", 5), entry("/etc/motd/", 9)]);

        lower.compare(&upper).unwrap();

        assert_eq!(lower.entries()[0].diff_type, Some(DiffType::Unchanged));
        assert_eq!(lower.entries()[1].diff_type, Some(DiffType::Modified));
    }

    #[test]
    fn compare_detects_mismatch_across_spellings() {
        let mut lower = SnapshotTree::new(vec![entry("/opt", 3)]);
        let upper = SnapshotTree::new(vec![dir("opt/")]);
        assert!(matches!(
            lower.compare(&upper),
            Err(SnapshotError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn compare_rejects_file_directory_mismatch() {
        let mut lower = SnapshotTree::new(vec![entry("/etc", 3)]);
        let upper = SnapshotTree::new(vec![dir("/etc")]);
        assert!(matches!(
            lower.compare(&upper),
            Err(SnapshotError::TypeMismatch { path }) if path == "/etc"
        ));
    }

    #[test]
    fn uncompared_entries_visit_as_unchanged() {
        let tree = SnapshotTree::new(vec![entry("/a", 1)]);
        assert_eq!(visited(&tree)[0].diff_type, DiffType::Unchanged);
    }
}
