//! Manifest key rewriting and persistence.
//!
//! Uploads are recorded under directory-rooted keys (`<folder>/<path>`).
//! Once every file is uploaded the keys are rewritten in a single pass to
//! manifest-rooted form so the manifest is portable, then the manifest
//! is written next to the working directory for auditing.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use evoapp_protocol::{Manifest, PathMap};

use crate::error::PublishError;

/// Returns the label used as the directory-rooted key prefix for `folder`.
///
/// This is the folder as given, with `\` normalized to `/` and trailing
/// separators removed.
pub fn root_label(folder: &Path) -> String {
    let label = folder.to_string_lossy().replace('\\', "/");
    label.trim_end_matches('/').to_string()
}

/// Builds the directory-rooted key for a scanned file.
pub fn directory_rooted_key(root_label: &str, relative_path: &str) -> String {
    format!("{root_label}/{relative_path}")
}

/// Rewrites every `<root_label>/`-prefixed key to manifest-relative form.
///
/// Keys without the prefix are kept as they are, so rewriting an already
/// rewritten manifest is a no-op. Two source keys that collapse to the
/// same result are reported instead of overwritten. Order is preserved.
pub fn rewrite_keys(manifest: Manifest, root_label: &str) -> Result<Manifest, PublishError> {
    let prefix = format!("{root_label}/");
    let Manifest {
        format,
        version,
        index,
        paths,
    } = manifest;

    let mut rewritten = PathMap::with_capacity(paths.len());
    let mut origins: HashMap<String, String> = HashMap::with_capacity(paths.len());

    for (key, record) in paths {
        let new_key = key
            .strip_prefix(&prefix)
            .filter(|rest| !rest.is_empty())
            .unwrap_or(&key)
            .to_string();

        if let Some(first) = origins.get(&new_key) {
            return Err(PublishError::KeyCollision {
                key: new_key,
                first: first.clone(),
                second: key,
            });
        }

        origins.insert(new_key.clone(), key);
        rewritten.insert(new_key, record);
    }

    Ok(Manifest {
        format,
        version,
        index,
        paths: rewritten,
    })
}

/// Serializes the manifest as pretty-printed JSON, preserving path order.
pub fn serialize(manifest: &Manifest) -> Result<String, PublishError> {
    Ok(serde_json::to_string_pretty(manifest)?)
}

/// Returns the snapshot file name for a folder: `<folder-name>-manifest.json`.
pub fn snapshot_file_name(folder: &Path) -> String {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            folder
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "app".to_string());
    format!("{name}-manifest.json")
}

/// Writes the manifest snapshot into `out_dir` and returns its path.
///
/// The file is written to a temporary file first and renamed into place,
/// so a failed write never leaves a partial manifest behind.
pub fn write_snapshot(
    manifest: &Manifest,
    folder: &Path,
    out_dir: &Path,
) -> Result<PathBuf, PublishError> {
    let json = serialize(manifest)?;
    let target = out_dir.join(snapshot_file_name(folder));

    let mut tmp = tempfile::NamedTempFile::new_in(out_dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.persist(&target).map_err(|e| PublishError::Io(e.error))?;

    tracing::debug!(path = %target.display(), entries = manifest.len(), "manifest snapshot written");
    Ok(target)
}

/// Loads a previously written manifest.
pub fn load_snapshot(path: &Path) -> Result<Manifest, PublishError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evoapp_protocol::{PathRecord, TxId};
    use tempfile::TempDir;

    fn record(c: char) -> PathRecord {
        PathRecord {
            id: TxId::parse(&c.to_string().repeat(43)).unwrap(),
        }
    }

    fn uploaded(root: &str, keys: &[(&str, char)]) -> Manifest {
        let mut m = Manifest::new(None);
        for (rel, c) in keys {
            m.paths
                .insert(directory_rooted_key(root, rel), record(*c));
        }
        m
    }

    #[test]
    fn root_label_normalizes() {
        assert_eq!(root_label(Path::new("dist")), "dist");
        assert_eq!(root_label(Path::new("dist/")), "dist");
        assert_eq!(root_label(Path::new("build/web//")), "build/web");
        assert_eq!(root_label(Path::new("/")), "");
    }

    #[test]
    fn rewrite_strips_prefix() {
        let m = uploaded("dist", &[("index.html", 'a'), ("js/app.js", 'b')]);
        let out = rewrite_keys(m, "dist").unwrap();
        let keys: Vec<&str> = out.paths.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["index.html", "js/app.js"]);
        assert_eq!(out.paths["js/app.js"], record('b'));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let m = uploaded("dist", &[("index.html", 'a'), ("js/app.js", 'b')]);
        let once = rewrite_keys(m, "dist").unwrap();
        let twice = rewrite_keys(once.clone(), "dist").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rewrite_only_strips_whole_component() {
        let mut m = Manifest::new(None);
        m.paths.insert("distribution/a.js".into(), record('a'));
        let out = rewrite_keys(m, "dist").unwrap();
        assert!(out.paths.contains_key("distribution/a.js"));
    }

    #[test]
    fn rewrite_detects_collision() {
        let mut m = uploaded("dist", &[("a.js", 'a')]);
        m.paths.insert("a.js".into(), record('b'));

        let err = rewrite_keys(m, "dist").unwrap_err();
        match err {
            PublishError::KeyCollision { key, first, second } => {
                assert_eq!(key, "a.js");
                assert_eq!(first, "dist/a.js");
                assert_eq!(second, "a.js");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rewritten_keys_are_prefix_free_after_roundtrip() {
        let m = uploaded("my app", &[("index.html", 'a'), ("css/site.css", 'b')]);
        let out = rewrite_keys(m, "my app").unwrap();
        let json = serialize(&out).unwrap();
        let parsed: Manifest = serde_json::from_str(&json).unwrap();
        assert!(parsed.paths.keys().all(|k| !k.starts_with("my app/")));
        assert_eq!(parsed, out);
    }

    #[test]
    fn serialize_is_pretty_and_ordered() {
        let m = rewrite_keys(uploaded("d", &[("z.js", 'a'), ("a.js", 'b')]), "d").unwrap();
        let json = serialize(&m).unwrap();
        assert!(json.starts_with("{\n  \"manifest\": \"arweave/paths\""));
        assert!(json.find("\"z.js\"").unwrap() < json.find("\"a.js\"").unwrap());
    }

    #[test]
    fn snapshot_name_uses_last_component() {
        assert_eq!(snapshot_file_name(Path::new("dist")), "dist-manifest.json");
        assert_eq!(
            snapshot_file_name(Path::new("apps/todo/")),
            "todo-manifest.json"
        );
    }

    #[test]
    fn write_and_load_snapshot() {
        let out = TempDir::new().unwrap();
        let m = rewrite_keys(uploaded("web", &[("index.html", 'a')]), "web").unwrap();

        let path = write_snapshot(&m, Path::new("web"), out.path()).unwrap();
        assert_eq!(path, out.path().join("web-manifest.json"));

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn load_snapshot_missing_file() {
        let result = load_snapshot(Path::new("/nonexistent/web-manifest.json"));
        assert!(matches!(result, Err(PublishError::Io(_))));
    }
}
