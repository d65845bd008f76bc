//! Path manifest document.
//!
//! A manifest maps relative file paths to content identifiers so a
//! multi-file app can be served from a single root identifier.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_INDEX, MANIFEST_FORMAT, MANIFEST_VERSION};
use crate::types::TxId;

/// Insertion-ordered mapping from path to upload record.
pub type PathMap = IndexMap<String, PathRecord>;

/// Manifest entry for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub id: TxId,
}

/// Default path served when none is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
}

/// The persisted artifact of a publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "manifest")]
    pub format: String,
    pub version: String,
    pub index: IndexEntry,
    #[serde(default)]
    pub paths: PathMap,
}

impl Manifest {
    /// Creates an empty manifest. The index defaults to `index.html`.
    pub fn new(index: Option<&str>) -> Self {
        let path = index
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_INDEX);
        Self {
            format: MANIFEST_FORMAT.to_string(),
            version: MANIFEST_VERSION.to_string(),
            index: IndexEntry {
                path: path.to_string(),
            },
            paths: PathMap::new(),
        }
    }

    pub fn index_path(&self) -> &str {
        &self.index.path
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_index() {
        let m = Manifest::new(None);
        assert_eq!(m.index_path(), "index.html");
        assert_eq!(m.format, "arweave/paths");
        assert_eq!(m.version, "0.1.0");
        assert!(m.is_empty());
    }

    #[test]
    fn blank_index_falls_back_to_default() {
        assert_eq!(Manifest::new(Some("  ")).index_path(), "index.html");
        assert_eq!(Manifest::new(Some("app.html")).index_path(), "app.html");
    }

    #[test]
    fn serializes_format_as_manifest_key() {
        let json = serde_json::to_value(Manifest::new(None)).unwrap();
        assert_eq!(json["manifest"], "arweave/paths");
        assert_eq!(json["index"]["path"], "index.html");
        assert!(json.get("format").is_none());
    }

    #[test]
    fn paths_keep_insertion_order() {
        let mut m = Manifest::new(None);
        for (key, id) in [
            ("z.js", "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"),
            ("a.js", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
        ] {
            m.paths.insert(
                key.into(),
                PathRecord {
                    id: TxId::parse(id).unwrap(),
                },
            );
        }
        let json = serde_json::to_string(&m).unwrap();
        let z = json.find("z.js").unwrap();
        let a = json.find("a.js").unwrap();
        assert!(z < a);
    }
}
