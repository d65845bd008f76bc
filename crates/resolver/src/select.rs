//! Version flattening and selection.

use evoapp_protocol::{VersionNode, VouchCounts};

/// Flattens a version tree in pre-order: node first, then children in order.
pub fn flatten(root: &VersionNode) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node.id.clone());
        stack.extend(node.children.iter().rev());
    }
    out
}

/// Picks the id with the most vouches.
///
/// Ties go to the earliest id in `ids`. Ids missing from `counts` count as
/// zero. When no id has a vouch the first id is returned, whatever the
/// scoring. `None` only for an empty slice.
pub fn select<'a>(ids: &'a [String], counts: &VouchCounts) -> Option<&'a str> {
    let first = ids.first()?;
    let count = |id: &str| counts.get(id).copied().unwrap_or(0);

    let best_count = ids.iter().map(|id| count(id.as_str())).max().unwrap_or(0);
    if best_count == 0 {
        return Some(first.as_str());
    }

    // Earliest id reaching the maximum.
    ids.iter()
        .map(String::as_str)
        .find(|id| count(*id) == best_count)
}
