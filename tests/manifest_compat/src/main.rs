fn main() {
    println!("Run `cargo test -p manifest-compat` to execute manifest compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use evoapp_protocol::{AssetInfo, Manifest, VersionNode};
    use evoapp_publish::wrapper::WrapperConfig;
    use evoapp_publish::{load_snapshot, rewrite_keys, serialize};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values.
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
    }

    /// Parses a manifest fixture and checks the serialized text is byte-identical,
    /// key order included.
    fn text_roundtrip(name: &str) -> Manifest {
        let text = read_fixture(name);
        let manifest: Manifest = serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let out = serialize(&manifest).unwrap();
        assert_eq!(out, text.trim_end(), "text mismatch for {name}");
        manifest
    }

    // --- Manifest ---

    #[test]
    fn fixture_manifest_app() {
        let manifest = text_roundtrip("manifest_app.json");
        assert_eq!(manifest.index_path(), "index.html");
        assert_eq!(manifest.len(), 3);
    }

    #[test]
    fn fixture_manifest_empty() {
        let manifest = text_roundtrip("manifest_empty.json");
        assert!(manifest.is_empty());
        assert_eq!(manifest.index_path(), "home.html");
    }

    #[test]
    fn fixture_manifest_keeps_insertion_order() {
        let manifest = text_roundtrip("manifest_unsorted.json");
        let keys: Vec<&str> = manifest.paths.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["z.js", "a.js", ".well-known/security.txt", "m/ñandú.svg"]
        );
    }

    #[test]
    fn fixture_manifest_is_already_rewritten() {
        let manifest: Manifest = serde_json::from_str(&read_fixture("manifest_app.json")).unwrap();
        let rewritten = rewrite_keys(manifest.clone(), "dist").unwrap();
        assert_eq!(rewritten, manifest);
    }

    #[test]
    fn fixture_manifest_loads_as_snapshot() {
        let manifest = load_snapshot(&fixtures_dir().join("manifest_app.json")).unwrap();
        assert_eq!(manifest.format, "arweave/paths");
        assert_eq!(manifest.version, "0.1.0");
    }

    // --- Other persisted documents ---

    #[test]
    fn fixture_asset_info() {
        roundtrip_test::<AssetInfo>("asset_info.json");
    }

    #[test]
    fn fixture_version_tree() {
        roundtrip_test::<VersionNode>("version_tree.json");
    }

    #[test]
    fn fixture_wrapper_config() {
        roundtrip_test::<WrapperConfig>("wrapper_config.json");
    }
}
