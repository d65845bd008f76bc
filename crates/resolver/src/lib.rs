//! Most-vouched version resolution.
//!
//! An evolutionary app's fork tree is flattened in pre-order, every
//! version is scored by its vouched stamps in one batched lookup, and the
//! strict maximum wins (earliest on ties). The wrapper navigates to the
//! winner after a short, cancellable delay.

pub mod error;
pub mod navigation;
pub mod ports;
pub mod resolver;
pub mod select;

pub use error::ResolveError;
pub use navigation::{DeferredNavigation, NavigationState, abort_url};
pub use ports::{BoxFuture, Navigator, Reputation, VersionGraph, WrapperIndex};
pub use resolver::{Resolution, Resolver, WrapperSession};
pub use select::{flatten, select};
