use super::{scheduler::Scheduler, Invalidator, InvalidatorState};
use crate::{
    common::{
        builder_utils,
        concurrent::{
            constants::DEFAULT_TIMEOUT_MILLIS,
            thread_pool::{self, PoolName, Worker},
        },
    },
    report::{
        sink::{ReportSink, SharedReporter},
        LogReporter, Reporter,
    },
    source::{SharedSource, Source},
    Close, CloseError, Merge, ScheduleError,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::{
    fmt, io,
    sync::{Arc, Weak},
    time::Duration,
};

enum State<U> {
    Created(Vec<SharedSource<U>>),
    // Dropping the sender stops the scheduling thread.
    Scheduled { _shutdown: Sender<()> },
    Closed,
}

/// An invalidator refreshing its cache at a fixed rate.
///
/// Every `timeout`, all the sources are called concurrently, each on its own
/// worker thread. The invalidator then waits for them until one deadline shared
/// by the whole cycle, `timeout` after the cycle started, and merges what the
/// sources that made it returned. Sources that failed, panicked or missed the
/// deadline contribute nothing to the cycle and are reported.
///
/// A source that missed a deadline keeps its worker busy until its call
/// returns. It is not called again before then, and is reported as timed out
/// in the cycles it sits out.
///
/// Cycles never overlap. A cycle that runs longer than `timeout` delays the
/// next one, which then starts as soon as it ends.
///
/// # Examples
///
/// ```rust
/// use lexicache::invalidator::DefaultInvalidator;
/// use std::time::Duration;
///
/// let invalidator = DefaultInvalidator::<String>::with_timeout(Duration::from_millis(250))
///     .with_name("words");
/// assert_eq!(invalidator.timeout(), Duration::from_millis(250));
/// assert_eq!(invalidator.name(), Some("words"));
/// ```
pub struct DefaultInvalidator<U> {
    id: String,
    name: Option<String>,
    timeout: Duration,
    reporter: Option<SharedReporter>,
    state: Mutex<State<U>>,
}

impl<U> fmt::Debug for DefaultInvalidator<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultInvalidator")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .finish()
    }
}

impl<U> Default for DefaultInvalidator<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> DefaultInvalidator<U> {
    /// Creates an invalidator with a timeout of one second.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MILLIS))
    }

    /// Creates an invalidator with the given timeout, which is both the
    /// refresh period and the deadline of every cycle.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero or longer than 1000 years.
    pub fn with_timeout(timeout: Duration) -> Self {
        builder_utils::ensure_timeout_or_panic(timeout);

        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(8);

        Self {
            id,
            name: None,
            timeout,
            reporter: None,
            state: Mutex::new(State::Created(Vec::new())),
        }
    }

    /// Names the invalidator. The name prefixes the messages of the default
    /// reporter.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the reporter receiving the failures and summaries of the refresh
    /// cycles. Defaults to a [`LogReporter`].
    pub fn with_reporter(mut self, reporter: impl Reporter) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Returns the name set with [`with_name`](#method.with_name), if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the refresh period, which is also the deadline of every cycle.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns where the invalidator is in its lifecycle.
    pub fn state(&self) -> InvalidatorState {
        match &*self.state.lock() {
            State::Created(_) => InvalidatorState::Created,
            State::Scheduled { .. } => InvalidatorState::Scheduled,
            State::Closed => InvalidatorState::Closed,
        }
    }

    fn reporter(&self) -> SharedReporter {
        self.reporter
            .clone()
            .unwrap_or_else(|| Arc::new(LogReporter::with_name(self.name.clone())))
    }
}

impl<U> DefaultInvalidator<U>
where
    U: Send + 'static,
{
    fn start(
        &self,
        sources: Vec<SharedSource<U>>,
        cache: Weak<dyn Merge<U>>,
    ) -> io::Result<Sender<()>> {
        let workers = (0..sources.len())
            .map(|n| Worker::new(&self.id, n))
            .collect::<io::Result<Vec<_>>>()?;
        let sink = ReportSink::new(self.reporter(), self.name.clone());
        let scheduler = Scheduler::new(sources, workers, cache, self.timeout, sink);

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        thread_pool::spawn(PoolName::Scheduler, &self.id, 0, move || {
            scheduler.run(shutdown_rx)
        })?;
        Ok(shutdown_tx)
    }
}

impl<U> Invalidator<U> for DefaultInvalidator<U>
where
    U: Send + 'static,
{
    fn set_sources(&self, sources: Vec<Arc<dyn Source<U>>>) -> Result<(), ScheduleError> {
        let mut state = self.state.lock();
        match &mut *state {
            State::Created(current) => {
                *current = sources;
                Ok(())
            }
            State::Scheduled { .. } => Err(ScheduleError::AlreadyScheduled),
            State::Closed => Err(ScheduleError::Closed),
        }
    }

    fn schedule_on(&self, cache: Weak<dyn Merge<U>>) -> Result<(), ScheduleError> {
        let mut state = self.state.lock();
        let sources = match &*state {
            State::Created(sources) if sources.is_empty() => return Err(ScheduleError::NoSources),
            State::Created(sources) => sources.clone(),
            State::Scheduled { .. } => return Err(ScheduleError::AlreadyScheduled),
            State::Closed => return Err(ScheduleError::Closed),
        };

        let shutdown = self
            .start(sources, cache)
            .map_err(ScheduleError::ThreadSpawn)?;
        *state = State::Scheduled {
            _shutdown: shutdown,
        };

        #[cfg(feature = "logging")]
        log::debug!(
            "Scheduled invalidator {} every {:?}",
            self.name.as_deref().unwrap_or(&self.id),
            self.timeout
        );
        Ok(())
    }
}

impl<U> Close for DefaultInvalidator<U> {
    /// Stops the refresh cycles without waiting for the one in progress, if
    /// any. Closing an invalidator that was never scheduled only prevents it
    /// from being scheduled. Closing twice does nothing.
    fn close(&self) -> Result<(), CloseError> {
        *self.state.lock() = State::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DefaultInvalidator;
    use crate::{
        invalidator::{Invalidator, InvalidatorState},
        report::Event,
        source::{Fixed, SharedSource},
        Close, Merge, ScheduleError,
    };

    use parking_lot::Mutex;
    use std::{
        sync::{Arc, Weak},
        thread,
        time::Duration,
    };

    #[derive(Default)]
    struct Counter {
        merges: Mutex<usize>,
    }

    impl Merge<u8> for Counter {
        fn merge(&self, _elements: Vec<u8>) {
            *self.merges.lock() += 1;
        }
    }

    fn sources() -> Vec<SharedSource<u8>> {
        vec![Arc::new(Fixed::new(vec![1, 2, 3]))]
    }

    fn weak(cache: &Arc<Counter>) -> Weak<dyn Merge<u8>> {
        let cache: Arc<dyn Merge<u8>> = cache.clone();
        Arc::downgrade(&cache)
    }

    #[test]
    fn default_timeout() {
        let invalidator = DefaultInvalidator::<u8>::new();
        assert_eq!(invalidator.timeout(), Duration::from_secs(1));
        assert_eq!(invalidator.state(), InvalidatorState::Created);
        assert_eq!(invalidator.id.len(), 8);
    }

    #[test]
    #[should_panic(expected = "timeout must be greater than zero")]
    fn zero_timeout() {
        let _ = DefaultInvalidator::<u8>::with_timeout(Duration::ZERO);
    }

    #[test]
    fn schedule_requires_sources() {
        let cache = Arc::new(Counter::default());
        let invalidator = DefaultInvalidator::<u8>::new();
        assert!(matches!(
            invalidator.schedule_on(weak(&cache)),
            Err(ScheduleError::NoSources)
        ));
        assert_eq!(invalidator.state(), InvalidatorState::Created);
    }

    #[test]
    fn lifecycle() {
        let cache = Arc::new(Counter::default());
        let invalidator =
            DefaultInvalidator::<u8>::with_timeout(Duration::from_millis(20)).with_name("test");

        invalidator.set_sources(sources()).expect("Failed to set sources");
        invalidator
            .schedule_on(weak(&cache))
            .expect("Failed to schedule");
        assert_eq!(invalidator.state(), InvalidatorState::Scheduled);

        // Neither the sources nor the schedule may change any more.
        assert!(matches!(
            invalidator.set_sources(sources()),
            Err(ScheduleError::AlreadyScheduled)
        ));
        assert!(matches!(
            invalidator.schedule_on(weak(&cache)),
            Err(ScheduleError::AlreadyScheduled)
        ));

        thread::sleep(Duration::from_millis(100));
        invalidator.close().expect("Failed to close");
        assert_eq!(invalidator.state(), InvalidatorState::Closed);
        assert!(*cache.merges.lock() >= 2);

        // A tick in progress may still merge.
        thread::sleep(Duration::from_millis(50));
        let merges = *cache.merges.lock();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(*cache.merges.lock(), merges);

        assert!(invalidator.close().is_ok());
        assert!(matches!(
            invalidator.schedule_on(weak(&cache)),
            Err(ScheduleError::Closed)
        ));
    }

    #[test]
    fn close_before_schedule() {
        let cache = Arc::new(Counter::default());
        let invalidator = DefaultInvalidator::<u8>::new();
        invalidator.set_sources(sources()).expect("Failed to set sources");

        invalidator.close().expect("Failed to close");
        assert_eq!(invalidator.state(), InvalidatorState::Closed);
        assert!(matches!(
            invalidator.set_sources(sources()),
            Err(ScheduleError::Closed)
        ));
        assert!(matches!(
            invalidator.schedule_on(weak(&cache)),
            Err(ScheduleError::Closed)
        ));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(*cache.merges.lock(), 0);
    }

    #[test]
    fn custom_reporter() {
        let cache = Arc::new(Counter::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let events1 = Arc::clone(&events);
        let invalidator = DefaultInvalidator::<u8>::with_timeout(Duration::from_millis(200))
            .with_reporter(move |event: &Event<'_>| events1.lock().push(event.to_string()));

        let failing: SharedSource<u8> =
            Arc::new(|| Err::<Vec<u8>, _>(std::io::Error::new(std::io::ErrorKind::Other, "down")));
        invalidator
            .set_sources(vec![failing])
            .expect("Failed to set sources");
        invalidator
            .schedule_on(weak(&cache))
            .expect("Failed to schedule");

        thread::sleep(Duration::from_millis(100));
        invalidator.close().expect("Failed to close");

        let events = events.lock();
        assert_eq!(events[0], "Source #0 was skipped: Source failed: down");
        assert!(events[1].starts_with("Refresh #0 merged 0 elements from 0 sources (1 skipped)"));
        assert_eq!(*cache.merges.lock(), 0);
    }
}
