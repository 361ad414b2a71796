use super::{PrefixCache, SubstringCache};
use crate::{
    common::base_cache::BaseCache,
    index::{PrefixIndex, SearchIndex, SubstringIndex},
    invalidator::Invalidator,
    report::{sink::SharedReporter, LogReporter, Reporter},
    source::{SharedSource, Source},
    Close, ConfigError, Merge,
};

use std::{
    marker::PhantomData,
    sync::{Arc, Weak},
};

// Both views of one invalidator. Trait objects cannot be upcast, so the
// `Close` view is taken when the invalidator is set.
struct BoundInvalidator<U> {
    schedule: Arc<dyn Invalidator<U>>,
    close: Arc<dyn Close>,
}

/// Builds a [`PrefixCache`][prefix-cache] or a
/// [`SubstringCache`][substring-cache] refreshed by an invalidator.
///
/// An invalidator and at least one source are required. Building the cache
/// schedules the invalidator, so the cache is being refreshed by the time
/// `build` returns.
///
/// [prefix-cache]: ./struct.PrefixCache.html
/// [substring-cache]: ./struct.SubstringCache.html
///
/// # Examples
///
/// ```rust
/// use lexicache::{invalidator::DefaultInvalidator, sync::CacheBuilder};
/// use std::time::Duration;
///
/// let cache = CacheBuilder::new()
///     .name("makes")
///     .invalidator(DefaultInvalidator::with_timeout(Duration::from_millis(500)))
///     .source(|| Ok::<_, std::io::Error>(vec!["Ford", "Fiat", "BMW"]))
///     .build()
///     .expect("Failed to build the cache");
///
/// // The first refresh starts right away, but may not be done yet.
/// let _makes = cache.starting_with("F").collect::<Vec<_>>();
///
/// // Stops the refresh.
/// cache.terminate();
/// ```
pub struct CacheBuilder<U, C> {
    name: Option<String>,
    invalidator: Option<BoundInvalidator<U>>,
    sources: Vec<SharedSource<U>>,
    resources: Vec<Arc<dyn Close>>,
    reporter: Option<SharedReporter>,
    cache_type: PhantomData<C>,
}

impl<U> Default for CacheBuilder<U, PrefixCache<U>> {
    fn default() -> Self {
        Self {
            name: None,
            invalidator: None,
            sources: Vec::new(),
            resources: Vec::new(),
            reporter: None,
            cache_type: PhantomData::default(),
        }
    }
}

impl<U> CacheBuilder<U, PrefixCache<U>> {
    /// Construct a new `CacheBuilder` that will be used to build a
    /// `PrefixCache`, or a `SubstringCache` after calling
    /// [`substring`](#method.substring).
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches to building a `SubstringCache`.
    pub fn substring(self) -> CacheBuilder<U, SubstringCache<U>> {
        CacheBuilder {
            name: self.name,
            invalidator: self.invalidator,
            sources: self.sources,
            resources: self.resources,
            reporter: self.reporter,
            cache_type: PhantomData::default(),
        }
    }
}

impl<U> CacheBuilder<U, PrefixCache<U>>
where
    U: AsRef<str> + Send + 'static,
{
    /// Builds a `PrefixCache<U>` and starts refreshing it.
    ///
    /// # Errors
    ///
    /// Fails if no invalidator or no source was set, or if the invalidator
    /// could not be scheduled. No cache is created and nothing is closed then.
    pub fn build(self) -> Result<PrefixCache<U>, ConfigError> {
        self.build_base::<PrefixIndex>().map(PrefixCache::from_base)
    }
}

impl<U> CacheBuilder<U, SubstringCache<U>>
where
    U: AsRef<str> + Send + 'static,
{
    /// Builds a `SubstringCache<U>` and starts refreshing it.
    ///
    /// # Errors
    ///
    /// Fails if no invalidator or no source was set, or if the invalidator
    /// could not be scheduled. No cache is created and nothing is closed then.
    pub fn build(self) -> Result<SubstringCache<U>, ConfigError> {
        self.build_base::<SubstringIndex>()
            .map(SubstringCache::from_base)
    }
}

impl<U, C> CacheBuilder<U, C> {
    /// Sets the name of the cache. The name prefixes the messages of the
    /// default reporter.
    pub fn name(self, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..self
        }
    }

    /// Sets the invalidator refreshing the cache. The cache takes ownership of
    /// it and closes it first when terminated.
    pub fn invalidator<I>(self, invalidator: I) -> Self
    where
        I: Invalidator<U> + 'static,
    {
        self.shared_invalidator(Arc::new(invalidator))
    }

    /// Like [`invalidator`](#method.invalidator), for an invalidator the
    /// caller wants to keep a handle on.
    pub fn shared_invalidator<I>(self, invalidator: Arc<I>) -> Self
    where
        I: Invalidator<U> + 'static,
    {
        let close: Arc<dyn Close> = invalidator.clone();
        Self {
            invalidator: Some(BoundInvalidator {
                schedule: invalidator,
                close,
            }),
            ..self
        }
    }

    /// Adds a source to the ones polled on every refresh cycle.
    pub fn source<S>(mut self, source: S) -> Self
    where
        S: Source<U>,
    {
        self.sources.push(Arc::new(source));
        self
    }

    /// Replaces the sources polled on every refresh cycle.
    pub fn sources<S, T>(self, sources: T) -> Self
    where
        S: Source<U>,
        T: IntoIterator<Item = S>,
    {
        let sources = sources
            .into_iter()
            .map(|s| Arc::new(s) as SharedSource<U>)
            .collect();
        Self { sources, ..self }
    }

    /// Makes the cache own `resource`, closing it when the cache is
    /// terminated. Resources are closed after the invalidator, in the order
    /// they were added.
    pub fn close_on_exit<R>(mut self, resource: Arc<R>) -> Self
    where
        R: Close + 'static,
    {
        self.resources.push(resource);
        self
    }

    /// Sets the reporter receiving the resources that fail to close. Defaults
    /// to a [`LogReporter`][log-reporter].
    ///
    /// [log-reporter]: ../report/struct.LogReporter.html
    pub fn reporter<R>(self, reporter: R) -> Self
    where
        R: Reporter,
    {
        Self {
            reporter: Some(Arc::new(reporter)),
            ..self
        }
    }

    fn build_base<I>(self) -> Result<Arc<BaseCache<I>>, ConfigError>
    where
        I: SearchIndex + Default,
        U: AsRef<str> + Send + 'static,
    {
        let invalidator = self.invalidator.ok_or(ConfigError::MissingInvalidator)?;
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        invalidator.schedule.set_sources(self.sources)?;

        let name = self.name;
        let reporter = self
            .reporter
            .unwrap_or_else(|| Arc::new(LogReporter::with_name(name.clone())));
        let base = Arc::new(BaseCache::new(I::default(), name, reporter));

        let cache = Arc::downgrade(&base) as Weak<dyn Merge<U>>;
        // On failure `base` is dropped without owning anything, so nothing
        // gets closed.
        invalidator.schedule.schedule_on(cache)?;

        base.close_on_exit(invalidator.close);
        for resource in self.resources {
            base.close_on_exit(resource);
        }
        Ok(base)
    }
}
