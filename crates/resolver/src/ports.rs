//! Collaborator ports used by the resolver.

use std::future::Future;
use std::pin::Pin;

use evoapp_protocol::{VersionNode, VouchCounts};

use crate::error::ResolveError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Builds the fork tree rooted at a version.
pub trait VersionGraph: Send + Sync {
    fn resolve<'a>(&'a self, root: &'a str) -> BoxFuture<'a, Result<VersionNode, ResolveError>>;
}

/// Reports vouched stamp counts for a batch of versions.
pub trait Reputation: Send + Sync {
    fn counts<'a>(&'a self, ids: &'a [String])
    -> BoxFuture<'a, Result<VouchCounts, ResolveError>>;
}

/// Finds the most recent wrapper deployed for a base version.
pub trait WrapperIndex: Send + Sync {
    fn latest_wrapper<'a>(
        &'a self,
        base: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ResolveError>>;
}

/// Performs a navigation. Implemented by the browser host, or by a recorder in tests.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}
