use crate::{
    common::concurrent::thread_pool::Worker,
    report::{
        sink::{panic_message, ReportSink},
        Event,
    },
    source::{SharedSource, Source},
    Merge, SourceError,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::{
    borrow::Cow,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Weak},
    time::{Duration, Instant},
};

/// Start times of fixed-rate ticks.
///
/// Ticks are due at `origin + k * period`. A tick that ends after the next slot
/// makes the following tick due right away, and every other slot it overran is
/// skipped.
#[derive(Debug)]
pub(crate) struct FixedRate {
    period: Duration,
    // `None` once the next slot is beyond what `Instant` can represent.
    nominal: Option<Instant>,
}

impl FixedRate {
    pub(crate) fn new(origin: Instant, period: Duration) -> Self {
        Self {
            period,
            nominal: Some(origin),
        }
    }

    pub(crate) fn next_tick(&self) -> Option<Instant> {
        self.nominal
    }

    /// Moves past the tick that just ended at `now`.
    pub(crate) fn advance(&mut self, now: Instant) -> Option<Instant> {
        let next = self.nominal.and_then(|t| t.checked_add(self.period));
        self.nominal = match next {
            Some(next) if next < now => Some(now - rem(now - next, self.period)),
            other => other,
        };
        self.nominal
    }
}

fn rem(lhs: Duration, rhs: Duration) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    let r = lhs.as_nanos() % rhs.as_nanos();
    Duration::new((r / NANOS_PER_SEC) as u64, (r % NANOS_PER_SEC) as u32)
}

fn recv_until<T>(rx: &Receiver<T>, deadline: Option<Instant>) -> Result<T, RecvTimeoutError> {
    match deadline {
        Some(deadline) => rx.recv_deadline(deadline),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

type Outcome<U> = Result<Vec<U>, SourceError>;

// The tick a call was made in, the position of its source and what it returned.
type Answer<U> = (u64, usize, Outcome<U>);

struct Slot<U> {
    source: SharedSource<U>,
    worker: Worker,
    // A call is running on `worker`, possibly one of an earlier tick.
    is_busy: bool,
}

/// The body of the scheduling thread of an invalidator.
///
/// Every source has a worker thread of its own. A source still running a call
/// that missed the deadline of an earlier tick is not called again until that
/// call returns, and times out in the ticks in between.
pub(crate) struct Scheduler<U> {
    slots: Vec<Slot<U>>,
    answers_tx: Sender<Answer<U>>,
    answers_rx: Receiver<Answer<U>>,
    cache: Weak<dyn Merge<U>>,
    period: Duration,
    sink: ReportSink,
    ticks: u64,
}

impl<U> Scheduler<U>
where
    U: Send + 'static,
{
    /// Pairs every source with the worker at the same position.
    pub(crate) fn new(
        sources: Vec<SharedSource<U>>,
        workers: Vec<Worker>,
        cache: Weak<dyn Merge<U>>,
        period: Duration,
        sink: ReportSink,
    ) -> Self {
        let slots = sources
            .into_iter()
            .zip(workers)
            .map(|(source, worker)| Slot {
                source,
                worker,
                is_busy: false,
            })
            .collect::<Vec<_>>();
        // Never full, as every source has at most one call running.
        let (answers_tx, answers_rx) = crossbeam_channel::bounded(slots.len());

        Self {
            slots,
            answers_tx,
            answers_rx,
            cache,
            period,
            sink,
            ticks: 0,
        }
    }

    /// Runs ticks until `shutdown` is disconnected or the cache is dropped.
    ///
    /// Nothing is ever sent through `shutdown`. Dropping its sender is the
    /// shutdown request.
    pub(crate) fn run(mut self, shutdown: Receiver<()>) {
        let mut rate = FixedRate::new(Instant::now(), self.period);

        loop {
            match recv_until(&shutdown, rate.next_tick()) {
                Err(RecvTimeoutError::Timeout) => (),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            let Some(cache) = self.cache.upgrade() else {
                break;
            };
            self.run_tick(&*cache);
            // May be the last handle, in which case the cache is terminated
            // here and closes the invalidator.
            drop(cache);

            rate.advance(Instant::now());
        }
        // Dropping `self` drops the workers. Each finishes the call it is in
        // and exits.
    }

    pub(crate) fn run_tick(&mut self, cache: &dyn Merge<U>) {
        let tick = self.ticks;
        self.ticks += 1;

        let started = Instant::now();
        let deadline = started.checked_add(self.period);
        let num_sources = self.slots.len();

        // Late answers only free their worker.
        for (_, i, _) in self.answers_rx.try_iter() {
            self.slots[i].is_busy = false;
        }

        let mut dispatched = 0;
        let mut interrupted = false;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_busy {
                continue;
            }
            let source = Arc::clone(&slot.source);
            let tx = self.answers_tx.clone();
            let job = Box::new(move || {
                let outcome = produce(&*source);
                // Fails once the scheduler is gone.
                let _ = tx.send((tick, i, outcome));
            });
            if slot.worker.execute(job).is_err() {
                interrupted = true;
                break;
            }
            slot.is_busy = true;
            dispatched += 1;
        }

        let mut outcomes = (0..num_sources).map(|_| None).collect::<Vec<_>>();
        let mut received = 0;
        while !interrupted && received < dispatched {
            match recv_until(&self.answers_rx, deadline) {
                Ok((answered, i, outcome)) => {
                    self.slots[i].is_busy = false;
                    if answered == tick {
                        outcomes[i] = Some(outcome);
                        received += 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => interrupted = true,
            }
        }

        if interrupted {
            self.sink.report(&Event::TickInterrupted {
                tick,
                received,
                dispatched,
            });
            return;
        }

        let (mut merged, mut failed, mut elements) = (0, 0, 0);
        for (i, outcome) in outcomes.into_iter().enumerate() {
            match outcome.unwrap_or(Err(SourceError::TimedOut(self.period))) {
                Ok(batch) => {
                    merged += 1;
                    elements += batch.len();
                    cache.merge(batch);
                }
                Err(error) => {
                    failed += 1;
                    self.sink.report(&Event::SourceFailed {
                        source: i,
                        error: &error,
                    });
                }
            }
        }

        self.sink.report(&Event::TickCompleted {
            tick,
            merged,
            failed,
            elements,
            elapsed: started.elapsed(),
        });
    }
}

fn produce<U: 'static>(source: &dyn Source<U>) -> Outcome<U> {
    match catch_unwind(AssertUnwindSafe(|| source.produce())) {
        Ok(result) => result.map_err(SourceError::Failed),
        Err(payload) => {
            let message = panic_message(&*payload).unwrap_or(Cow::Borrowed("Box<dyn Any>"));
            Err(SourceError::Panicked(message.into_owned()))
        }
    }
}
