use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One published version and its forks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VersionNode>,
}

impl VersionNode {
    pub fn leaf(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(id: impl Into<String>, children: Vec<VersionNode>) -> Self {
        Self {
            id: id.into(),
            children,
        }
    }
}

/// Reputation score per identifier. Absent identifiers count as zero.
pub type VouchCounts = HashMap<String, u64>;
