//! Version resolution and the wrapper start-up session.

use std::sync::Arc;
use std::time::Duration;

use evoapp_protocol::VouchCounts;
use tracing::{debug, info, warn};

use crate::error::ResolveError;
use crate::navigation::{DeferredNavigation, NavigationState, abort_url};
use crate::ports::{Navigator, Reputation, VersionGraph, WrapperIndex};
use crate::select::{flatten, select};

/// Outcome of resolving a fork tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Versions in pre-order.
    pub versions: Vec<String>,
    pub counts: VouchCounts,
    pub selected: String,
}

impl Resolution {
    /// Vouch count for `id`, zero when unknown.
    pub fn count(&self, id: &str) -> u64 {
        self.counts.get(id).copied().unwrap_or(0)
    }
}

/// Resolves the most-vouched version reachable from a root.
pub struct Resolver<'a> {
    graph: &'a dyn VersionGraph,
    reputation: &'a dyn Reputation,
}

impl<'a> Resolver<'a> {
    pub fn new(graph: &'a dyn VersionGraph, reputation: &'a dyn Reputation) -> Self {
        Self { graph, reputation }
    }

    pub async fn resolve(&self, root: &str) -> Result<Resolution, ResolveError> {
        let tree = self.graph.resolve(root).await?;
        let versions = flatten(&tree);
        let counts = self.reputation.counts(&versions).await?;

        let selected = select(&versions, &counts)
            .ok_or(ResolveError::Empty)?
            .to_string();
        debug!(root, versions = versions.len(), selected = %selected, "version resolved");

        Ok(Resolution {
            versions,
            counts,
            selected,
        })
    }
}

/// What a wrapper does when a visitor opens it: find its own id, resolve
/// the best version, and navigate there after a short delay unless the
/// visitor presses escape.
pub struct WrapperSession {
    base_id: String,
    wrapper_id: Option<String>,
    target: String,
    navigation: DeferredNavigation,
}

impl WrapperSession {
    pub async fn start(
        base_id: &str,
        resolver: &Resolver<'_>,
        index: &dyn WrapperIndex,
        navigator: Arc<dyn Navigator>,
        gateway: &str,
        delay: Duration,
    ) -> Self {
        let wrapper_id = match index.latest_wrapper(base_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!(base = base_id, error = %e, "wrapper lookup failed");
                None
            }
        };

        let target = match resolver.resolve(base_id).await {
            Ok(resolution) => resolution.selected,
            Err(e) => {
                warn!(base = base_id, error = %e, "resolution failed, falling back to base");
                base_id.to_string()
            }
        };

        let url = format!("{gateway}{target}");
        info!(url = %url, ?delay, "navigation scheduled");
        let navigation = DeferredNavigation::schedule(navigator, url, delay);

        Self {
            base_id: base_id.to_string(),
            wrapper_id,
            target,
            navigation,
        }
    }

    /// The version the session will navigate to.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn wrapper_id(&self) -> Option<&str> {
        self.wrapper_id.as_deref()
    }

    pub fn state(&self) -> NavigationState {
        self.navigation.state()
    }

    /// Escape key: leave for the app page instead, unless navigation
    /// already happened.
    pub fn abort(&self) -> bool {
        let url = abort_url(self.wrapper_id.as_deref(), &self.base_id);
        self.navigation.abort(&url)
    }
}
