use crate::{
    index::SearchIndex,
    report::{
        sink::{ReportSink, SharedReporter},
        Event,
    },
    Close, Merge,
};

use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// The state shared by every handle of a cache: the index it serves, and the
/// resources it closes when terminated.
pub(crate) struct BaseCache<I> {
    index: I,
    name: Option<String>,
    resources: Mutex<Vec<Arc<dyn Close>>>,
    is_terminated: AtomicBool,
    sink: ReportSink,
}

impl<I> Drop for BaseCache<I> {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl<I> BaseCache<I> {
    pub(crate) fn new(index: I, name: Option<String>, reporter: SharedReporter) -> Self {
        Self {
            index,
            sink: ReportSink::new(reporter, name.clone()),
            name,
            resources: Mutex::new(Vec::new()),
            is_terminated: AtomicBool::new(false),
        }
    }

    pub(crate) fn index(&self) -> &I {
        &self.index
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.is_terminated.load(Ordering::Acquire)
    }

    /// Makes the cache own `resource`. Resources are closed in the order they
    /// were registered. A resource registered after termination is closed
    /// right away.
    pub(crate) fn close_on_exit(&self, resource: Arc<dyn Close>) {
        let mut resources = self.resources.lock();
        if !self.is_terminated() {
            resources.push(resource);
            return;
        }
        let position = resources.len();
        drop(resources);
        self.close_resource(position, &*resource);
    }

    /// Closes every owned resource, continuing past the ones that fail. Only
    /// the first call has any effect.
    pub(crate) fn terminate(&self) {
        let resources = {
            let mut resources = self.resources.lock();
            if self.is_terminated.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *resources)
        };

        for (position, resource) in resources.iter().enumerate() {
            self.close_resource(position, &**resource);
        }
    }

    fn close_resource(&self, position: usize, resource: &dyn Close) {
        if let Err(error) = resource.close() {
            self.sink.report(&Event::CloseFailed {
                resource: position,
                error: &error,
            });
        }
    }
}

impl<I, U> Merge<U> for BaseCache<I>
where
    I: SearchIndex,
    U: AsRef<str>,
{
    /// Inserts the elements into the index. Does nothing once the cache has
    /// been terminated.
    fn merge(&self, elements: Vec<U>) {
        if self.is_terminated() {
            return;
        }
        self.index.insert_keys(elements.iter().map(|e| e.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use super::BaseCache;
    use crate::{
        index::PrefixIndex,
        report::Event,
        Close, CloseError, Merge,
    };

    use parking_lot::Mutex;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Resource {
        id: &'static str,
        fails: bool,
        log: Log,
    }

    impl Close for Resource {
        fn close(&self) -> Result<(), CloseError> {
            self.log.lock().push(format!("close {}", self.id));
            if self.fails {
                Err(CloseError::new(format!("{} is stuck", self.id)))
            } else {
                Ok(())
            }
        }
    }

    fn new_cache(log: &Log) -> BaseCache<PrefixIndex> {
        let log = Arc::clone(log);
        let reporter = move |event: &Event<'_>| log.lock().push(event.to_string());
        BaseCache::new(PrefixIndex::new(), Some("test".into()), Arc::new(reporter))
    }

    fn resource(id: &'static str, fails: bool, log: &Log) -> Arc<dyn Close> {
        Arc::new(Resource {
            id,
            fails,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn terminate_closes_resources_in_order() {
        let log = Log::default();
        let cache = new_cache(&log);
        cache.close_on_exit(resource("a", false, &log));
        cache.close_on_exit(resource("b", true, &log));
        cache.close_on_exit(resource("c", false, &log));

        cache.terminate();
        assert!(cache.is_terminated());
        assert_eq!(
            *log.lock(),
            vec![
                "close a",
                "close b",
                "Resource #1 did not close: Failed to close a cache resource: b is stuck",
                "close c",
            ]
        );

        // Terminating again closes nothing.
        cache.terminate();
        drop(cache);
        assert_eq!(log.lock().len(), 4);
    }

    #[test]
    fn drop_terminates() {
        let log = Log::default();
        let cache = new_cache(&log);
        cache.close_on_exit(resource("a", false, &log));
        drop(cache);
        assert_eq!(*log.lock(), vec!["close a"]);
    }

    #[test]
    fn resource_registered_after_termination() {
        let log = Log::default();
        let cache = new_cache(&log);
        cache.terminate();
        cache.close_on_exit(resource("late", false, &log));
        assert_eq!(*log.lock(), vec!["close late"]);
    }

    #[test]
    fn merges_after_termination_are_ignored() {
        let log = Log::default();
        let cache = new_cache(&log);

        cache.merge(vec!["a", "ab"]);
        cache.merge(vec![String::from("abc")]);
        assert_eq!(cache.index().key_count(), 3);
        assert_eq!(cache.name(), Some("test"));

        cache.terminate();
        cache.merge(vec!["b"]);
        assert_eq!(cache.index().key_count(), 3);
        assert!(!cache.index().contains_key("b"));
        // Still readable.
        assert_eq!(cache.index().keys_starting_with("ab").count(), 2);
    }
}
