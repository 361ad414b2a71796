//! Periodic refresh of a cache from its sources.

mod default;
mod scheduler;

pub use default::DefaultInvalidator;

use crate::{source::Source, Close, Merge, ScheduleError};

use std::sync::{Arc, Weak};

/// Drives the refresh cycles of one cache.
///
/// An invalidator is created unbound. The sources are bound once, then the
/// invalidator is scheduled on exactly one cache and keeps refreshing it until
/// it is closed. Closing never waits for a cycle in progress.
///
/// [`CacheBuilder::build`][build] binds the sources, schedules the invalidator
/// and makes the cache own it. There is usually no need to call these methods
/// directly.
///
/// [build]: ../sync/struct.CacheBuilder.html
pub trait Invalidator<U>: Close {
    /// Binds the sources polled on every cycle, replacing any bound earlier.
    ///
    /// Fails once the invalidator has been scheduled or closed.
    fn set_sources(&self, sources: Vec<Arc<dyn Source<U>>>) -> Result<(), ScheduleError>;

    /// Starts refreshing `cache`. The first cycle starts right away.
    ///
    /// The invalidator only holds a weak reference to the cache and stops once
    /// the cache is gone.
    fn schedule_on(&self, cache: Weak<dyn Merge<U>>) -> Result<(), ScheduleError>;
}

/// The lifecycle state of a [`DefaultInvalidator`].
///
/// An invalidator only moves forward, from `Created` to `Scheduled` to `Closed`.
/// An invalidator closed before it was ever scheduled goes from `Created`
/// straight to `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidatorState {
    Created,
    Scheduled,
    Closed,
}
