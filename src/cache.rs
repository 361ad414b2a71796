use crate::CloseError;

/// The write side of a cache, as seen by its invalidator.
///
/// Implementations must be thread-safe and must never make readers wait for a
/// merge to finish.
pub trait Merge<U>: Send + Sync {
    /// Inserts `elements` into the cache. Every element is visible to queries
    /// started after this call returns.
    fn merge(&self, elements: Vec<U>);
}

/// A resource owned by a cache and released when the cache is terminated.
///
/// A cache closes its resources in the order they were registered. A resource
/// failing to close is reported and does not keep the others open.
pub trait Close: Send + Sync {
    fn close(&self) -> Result<(), CloseError>;
}
