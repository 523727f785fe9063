use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analyzer::FileNode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    // Space efficiency, 0.0 to 1.0
    pub efficiency: f64,

    // Totals
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub user_size_bytes: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub wasted_bytes: u64,

    // Ordered top to bottom
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layer_analysis_list: Vec<LayerAnalysis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inefficiency_analysis_list: Vec<InefficiencyAnalysis>,
}

impl ImageAnalysis {
    pub fn layer(&self, index: usize) -> Option<&LayerAnalysis> {
        self.layer_analysis_list.iter().find(|l| l.index == index)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerAnalysis {
    pub id: String,
    pub short_id: String,
    pub index: usize,
    pub command: String,
    pub size: u64,

    /// File tree of the layer. Served on its own, never inlined in the image document.
    #[serde(skip)]
    pub file_analysis: FileAnalysis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_name: String,
    #[serde(default, skip_serializing_if = "is_zero_mode")]
    pub mode: u32,
    #[serde(default, skip_serializing_if = "DiffType::is_unchanged")]
    pub diff_type: DiffType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, FileAnalysis>,
}

impl FileAnalysis {
    /// An empty directory node.
    pub fn directory() -> Self {
        Self {
            is_dir: true,
            size: 0,
            link_name: String::new(),
            mode: 0,
            diff_type: DiffType::Unchanged,
            children: BTreeMap::new(),
        }
    }

    pub fn leaf(node: &FileNode) -> Self {
        Self {
            is_dir: false,
            size: node.size,
            link_name: node.link_name.clone(),
            mode: node.mode,
            diff_type: node.diff_type,
            children: BTreeMap::new(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&FileAnalysis> {
        self.children.get(name)
    }

    /// Look up a node by slash separated path, relative to this node.
    pub fn get(&self, path: &str) -> Option<&FileAnalysis> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Number of leaves below this node.
    pub fn file_count(&self) -> usize {
        if !self.is_dir {
            return 1;
        }
        self.children.values().map(FileAnalysis::file_count).sum()
    }

    /// Total size of all leaves below this node.
    pub fn total_size(&self) -> u64 {
        if !self.is_dir {
            return self.size;
        }
        self.children.values().map(FileAnalysis::total_size).sum()
    }
}

impl Default for FileAnalysis {
    fn default() -> Self {
        Self::directory()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InefficiencyAnalysis {
    pub path: String,
    pub cumulative_size: u64,
}

/// How a file changed relative to the layer above it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffType {
    Added,
    Removed,
    Modified,
    #[default]
    Unchanged,
}

impl DiffType {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, DiffType::Unchanged)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiffType::Added => "added",
            DiffType::Removed => "removed",
            DiffType::Modified => "modified",
            DiffType::Unchanged => "unchanged",
        }
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn is_zero_mode(value: &u32) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(size: u64) -> FileAnalysis {
        FileAnalysis {
            is_dir: false,
            size,
            ..FileAnalysis::directory()
        }
    }

    #[test]
    fn get_walks_nested_children() {
        let mut bin = FileAnalysis::directory();
        bin.children.insert("sh".to_string(), leaf(10));
        let mut root = FileAnalysis::directory();
        root.children.insert("bin".to_string(), bin);

        assert_eq!(root.get("/bin/sh").map(|n| n.size), Some(10));
        assert!(root.get("bin").unwrap().is_dir);
        assert!(root.get("/bin/bash").is_none());
        assert_eq!(root.get("/"), Some(&root));
    }

    #[test]
    fn counts_and_sizes_only_leaves() {
        let mut etc = FileAnalysis::directory();
        etc.children.insert("hosts".to_string(), leaf(5));
        etc.children.insert("passwd".to_string(), leaf(7));
        let mut root = FileAnalysis::directory();
        root.children.insert("etc".to_string(), etc);
        root.children.insert("empty".to_string(), FileAnalysis::directory());

        assert_eq!(root.file_count(), 2);
        assert_eq!(root.total_size(), 12);
    }

    #[test]
    fn serializes_with_camel_case_and_omits_empty_fields() {
        let mut root = FileAnalysis::directory();
        root.children.insert(
            "run.sh".to_string(),
            FileAnalysis {
                mode: 0o755,
                diff_type: DiffType::Added,
                ..leaf(120)
            },
        );

        root.children.insert("hosts".to_string(), leaf(5));

        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["isDir"], true);
        assert!(json.get("diffType").is_none());
        assert!(json["children"]["hosts"].get("diffType").is_none());
        assert!(json.get("size").is_none());
        assert_eq!(json["children"]["run.sh"]["size"], 120);
        assert_eq!(json["children"]["run.sh"]["diffType"], "added");
        assert!(json["children"]["run.sh"].get("linkName").is_none());
    }

    #[test]
    fn image_document_leaves_out_file_trees() {
        let analysis = ImageAnalysis {
            efficiency: 0.5,
            layer_analysis_list: vec![LayerAnalysis {
                id: "sha256:abc".to_string(),
                short_id: "abc".to_string(),
                index: 0,
                command: "COPY . /app".to_string(),
                size: 42,
                file_analysis: FileAnalysis::directory(),
            }],
            ..ImageAnalysis::default()
        };

        let json = serde_json::to_value(&analysis).unwrap();
        let layer = &json["layerAnalysisList"][0];
        assert_eq!(layer["shortId"], "abc");
        assert!(layer.get("fileAnalysis").is_none());
        assert!(json.get("inefficiencyAnalysisList").is_none());
    }
}
