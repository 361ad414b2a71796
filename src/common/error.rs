use std::time::Duration;

/// A boxed error returned by a [`Source`][source] or a [`Close`][close]
/// implementation.
///
/// [source]: ./source/trait.Source.html
/// [close]: ./trait.Close.html
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for [`CacheBuilder::build`][build].
///
/// No cache is created when this error is returned.
///
/// [build]: ./sync/struct.CacheBuilder.html
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The builder was not given an invalidator.
    ///
    /// Set one with [`CacheBuilder::invalidator`][invalidator].
    ///
    /// [invalidator]: ./sync/struct.CacheBuilder.html#method.invalidator
    #[error("An invalidator must be set before building the cache")]
    MissingInvalidator,

    /// The builder was not given any source.
    #[error("At least one source must be set before building the cache")]
    NoSources,

    /// The invalidator refused to be scheduled on the new cache.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// The error type for the state transitions of an
/// [`Invalidator`][invalidator].
///
/// [invalidator]: ./invalidator/trait.Invalidator.html
#[derive(thiserror::Error, Debug)]
pub enum ScheduleError {
    /// `schedule_on` was called on an invalidator that is already running, or
    /// the sources were changed after it started. The running schedule is not
    /// affected.
    #[error("The cache invalidator cannot be scheduled twice")]
    AlreadyScheduled,

    /// The invalidator has been closed and cannot be scheduled any more.
    #[error("The cache invalidator has been closed")]
    Closed,

    /// `schedule_on` was called before any source was bound.
    #[error("No sources are bound to the cache invalidator")]
    NoSources,

    /// The operating system refused to spawn the scheduling thread or one of
    /// the worker threads.
    #[error("Failed to spawn a thread for the cache invalidator")]
    ThreadSpawn(#[source] std::io::Error),
}

/// Why a source contributed nothing to a refresh cycle.
///
/// These errors never reach the caller of a query. They are handed to the
/// [`Reporter`][reporter] of the invalidator and the cycle carries on with the
/// other sources.
///
/// [reporter]: ./report/trait.Reporter.html
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// The source returned an error.
    #[error("Source failed: {0}")]
    Failed(#[source] BoxError),

    /// The source panicked. The payload message is kept when it is a string.
    #[error("Source panicked: {0}")]
    Panicked(String),

    /// The source did not complete before the shared deadline of the cycle.
    /// Its result, if it ever arrives, is discarded.
    #[error("Source did not complete within {0:?}")]
    TimedOut(Duration),
}

/// The error type for [`Close::close`][close].
///
/// [close]: ./trait.Close.html#tymethod.close
#[derive(thiserror::Error, Debug)]
#[error("Failed to close a cache resource: {0}")]
pub struct CloseError(#[source] BoxError);

impl CloseError {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(error.into())
    }
}
