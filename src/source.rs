//! Producers of the elements merged into a cache.

use crate::BoxError;

use std::sync::Arc;

/// A producer polled once per refresh cycle.
///
/// The invalidator of a cache is the only caller. It calls every source of the
/// cache concurrently, each on its own worker thread, and stops waiting for them
/// once the cycle deadline has passed. A source does not need to enforce any
/// timeout by itself.
///
/// Closures returning `Result<Vec<U>, E>` are sources:
///
/// ```rust
/// use lexicache::source::Source;
///
/// let source = || Ok::<_, std::io::Error>(vec!["alpha", "beta"]);
/// assert_eq!(source.produce().unwrap(), vec!["alpha", "beta"]);
/// ```
pub trait Source<U>: Send + Sync + 'static {
    fn produce(&self) -> Result<Vec<U>, BoxError>;
}

impl<U, F, E> Source<U> for F
where
    F: Fn() -> Result<Vec<U>, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn produce(&self) -> Result<Vec<U>, BoxError> {
        self().map_err(Into::into)
    }
}

pub(crate) type SharedSource<U> = Arc<dyn Source<U>>;

/// A source that always returns the same elements.
///
/// ```rust
/// use lexicache::source::{Fixed, Source};
///
/// let source = Fixed::new(vec!["a", "b"]);
/// assert_eq!(source.produce().unwrap(), vec!["a", "b"]);
/// ```
#[derive(Clone, Debug)]
pub struct Fixed<U> {
    elements: Vec<U>,
}

impl<U> Fixed<U> {
    pub fn new(elements: Vec<U>) -> Self {
        Self { elements }
    }
}

impl<U> Source<U> for Fixed<U>
where
    U: Clone + Send + Sync + 'static,
{
    fn produce(&self) -> Result<Vec<U>, BoxError> {
        Ok(self.elements.clone())
    }
}
