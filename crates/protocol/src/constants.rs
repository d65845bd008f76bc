use std::time::Duration;

/// Value of the manifest `"manifest"` field.
pub const MANIFEST_FORMAT: &str = "arweave/paths";

/// Value of the manifest `"version"` field.
pub const MANIFEST_VERSION: &str = "0.1.0";

/// Content type of a published path manifest.
pub const MANIFEST_CONTENT_TYPE: &str = "application/x.arweave-manifest+json";

/// Index path used when none is given.
pub const DEFAULT_INDEX: &str = "index.html";

/// Content type used when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// `Data-Protocol` tag value shared by every evolutionary app upload.
pub const DATA_PROTOCOL: &str = "Evoapps";

/// Gateway prefix used to view a published identifier.
pub const GATEWAY_BASE: &str = "https://g8way.io/";

/// Destination of the escape key when the wrapper's own id is unknown.
pub const ABORT_BASE: &str = "https://evolutionary.g8way.io/";

/// Bundlr nodes accepted as storage hosts.
pub const ALLOWED_HOSTS: [&str; 2] = [
    "https://node1.bundlr.network",
    "https://node2.bundlr.network",
];

/// Storage host used when none is configured.
pub const DEFAULT_HOST: &str = "https://node2.bundlr.network";

/// Delay between the wrapper's selection and its redirect.
pub const NAVIGATION_DELAY: Duration = Duration::from_millis(1000);

/// Length of a transaction identifier.
pub const TX_ID_LEN: usize = 43;

/// Title length bounds (inclusive).
pub const TITLE_LEN: (usize, usize) = (2, 80);

/// Description length bounds (inclusive).
pub const DESCRIPTION_LEN: (usize, usize) = (8, 300);

/// Group id length bounds (inclusive).
pub const GROUP_ID_LEN: (usize, usize) = (2, 80);

/// Well-known tag names.
pub mod tags {
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const DATA_PROTOCOL: &str = "Data-Protocol";
    pub const TYPE: &str = "Type";
    pub const TITLE: &str = "Title";
    pub const DESCRIPTION: &str = "Description";
    pub const GROUP_ID: &str = "Group-Id";
    pub const FORKS: &str = "Forks";
    pub const WRAPPER_FOR: &str = "Wrapper-For";
    pub const SOURCE_CODE: &str = "Source-Code";
    pub const LOGO: &str = "Logo";
    pub const PUBLISHED: &str = "Published";
    pub const TOPIC_PREFIX: &str = "Topic:";
}
