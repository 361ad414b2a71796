//! Reporting of the failures a cache recovers from.
//!
//! Nothing that goes wrong during a refresh cycle or while a cache is being
//! terminated is propagated to the callers of the cache. Instead, every such
//! failure becomes an [`Event`] handed to a [`Reporter`]. The default reporter,
//! [`LogReporter`], writes the events through the [`log`][log-crate] crate when
//! the `logging` feature is enabled.
//!
//! [log-crate]: https://docs.rs/log

pub(crate) mod sink;

use crate::{CloseError, SourceError};

use std::{fmt, time::Duration};

/// Something a cache or an invalidator recovered from, or a summary of a
/// refresh cycle.
#[derive(Debug)]
#[non_exhaustive]
pub enum Event<'a> {
    /// A source contributed nothing to a cycle because it failed, panicked or
    /// missed the deadline. `source` is its position in the bound list.
    SourceFailed {
        source: usize,
        error: &'a SourceError,
    },
    /// A cycle was abandoned because the worker of a source went away.
    /// Nothing was merged in this cycle.
    TickInterrupted {
        tick: u64,
        received: usize,
        dispatched: usize,
    },
    /// A cycle finished. `merged` sources contributed `elements` elements in
    /// total and `failed` sources contributed nothing.
    TickCompleted {
        tick: u64,
        merged: usize,
        failed: usize,
        elements: usize,
        elapsed: Duration,
    },
    /// A resource failed to close while its cache was terminated. `resource`
    /// is its position in registration order.
    CloseFailed {
        resource: usize,
        error: &'a CloseError,
    },
}

impl Event<'_> {
    /// Returns `true` for events reporting a failure rather than progress.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Event::TickCompleted { .. })
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::SourceFailed { source, error } => {
                write!(f, "Source #{source} was skipped: {error}")
            }
            Event::TickInterrupted {
                tick,
                received,
                dispatched,
            } => write!(
                f,
                "Refresh #{tick} was interrupted after {received} of {dispatched} sources answered"
            ),
            Event::TickCompleted {
                tick,
                merged,
                failed,
                elements,
                elapsed,
            } => write!(
                f,
                "Refresh #{tick} merged {elements} elements from {merged} sources \
                ({failed} skipped) in {elapsed:?}"
            ),
            Event::CloseFailed { resource, error } => {
                write!(f, "Resource #{resource} did not close: {error}")
            }
        }
    }
}

/// Receives the events of a cache or an invalidator.
///
/// `report` is called on the thread where the event happened, which for
/// refresh events is the scheduling thread of the invalidator. A slow reporter
/// delays the next cycle. A reporter that panics is disabled.
///
/// Closures taking an `&Event` are reporters:
///
/// ```rust
/// use lexicache::report::{Event, Reporter};
///
/// let reporter = |event: &Event<'_>| eprintln!("{event}");
/// # let _: &dyn Reporter = &reporter;
/// ```
pub trait Reporter: Send + Sync + 'static {
    fn report(&self, event: &Event<'_>);
}

impl<F> Reporter for F
where
    F: Fn(&Event<'_>) + Send + Sync + 'static,
{
    fn report(&self, event: &Event<'_>) {
        self(event)
    }
}

/// The default reporter. Writes failures at the `warn` level, close failures
/// at the `error` level and cycle summaries at the `debug` level.
///
/// Without the `logging` feature this reporter discards every event.
#[derive(Clone, Debug, Default)]
pub struct LogReporter {
    #[cfg_attr(not(feature = "logging"), allow(dead_code))]
    name: Option<String>,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reporter prefixing every message with `[name] `.
    pub fn with_name(name: Option<String>) -> Self {
        Self { name }
    }
}

impl Reporter for LogReporter {
    fn report(&self, event: &Event<'_>) {
        #[cfg(feature = "logging")]
        {
            let cn = self
                .name
                .as_ref()
                .map(|name| format!("[{name}] "))
                .unwrap_or_default();

            match event {
                Event::TickCompleted { .. } => log::debug!("{cn}{event}"),
                Event::CloseFailed { .. } => log::error!("{cn}{event}"),
                _ => log::warn!("{cn}{event}"),
            }
        }

        #[cfg(not(feature = "logging"))]
        let _ = event;
    }
}
