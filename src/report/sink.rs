use std::{
    any::Any,
    borrow::Cow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use super::{Event, Reporter};

pub(crate) type SharedReporter = Arc<dyn Reporter>;

/// Hands events to a reporter, and stops doing so once the reporter panicked.
pub(crate) struct ReportSink {
    reporter: SharedReporter,
    is_enabled: AtomicBool,
    #[cfg(feature = "logging")]
    name: Option<String>,
}

impl ReportSink {
    pub(crate) fn new(reporter: SharedReporter, _name: Option<String>) -> Self {
        Self {
            reporter,
            is_enabled: AtomicBool::new(true),
            #[cfg(feature = "logging")]
            name: _name,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.is_enabled.load(Ordering::Acquire)
    }

    pub(crate) fn report(&self, event: &Event<'_>) {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        if !self.is_enabled() {
            return;
        }

        // The reporter is never called again once it has panicked.
        let result = catch_unwind(AssertUnwindSafe(|| self.reporter.report(event)));
        if let Err(_payload) = result {
            self.is_enabled.store(false, Ordering::Release);
            #[cfg(feature = "logging")]
            log_panic(&*_payload, self.name.as_deref());
        }
    }
}

/// Extracts the message of a panic payload, if it is a string.
pub(crate) fn panic_message<'a>(
    payload: &'a (dyn Any + Send + 'static),
) -> Option<Cow<'a, str>> {
    (payload.downcast_ref::<&str>().map(|s| (*s).into()))
        .or_else(|| payload.downcast_ref::<String>().map(|s| s.as_str().into()))
}

#[cfg(feature = "logging")]
fn log_panic(payload: &(dyn Any + Send + 'static), name: Option<&str>) {
    let cn = name.map(|name| format!("[{name}] ")).unwrap_or_default();

    if let Some(m) = panic_message(payload) {
        log::error!("{cn}Disabled the reporter because it panicked at '{m}'");
    } else {
        log::error!("{cn}Disabled the reporter because it panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::{panic_message, ReportSink};
    use crate::report::Event;

    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    fn completed() -> Event<'static> {
        Event::TickCompleted {
            tick: 0,
            merged: 0,
            failed: 0,
            elements: 0,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn panicking_reporter_is_disabled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls1 = Arc::clone(&calls);
        let reporter = move |_: &Event<'_>| {
            if calls1.fetch_add(1, Ordering::AcqRel) == 1 {
                panic!("second call");
            }
        };
        let sink = ReportSink::new(Arc::new(reporter), Some("test".into()));

        sink.report(&completed());
        assert!(sink.is_enabled());
        sink.report(&completed());
        assert!(!sink.is_enabled());
        sink.report(&completed());

        assert_eq!(calls.load(Ordering::Acquire), 2);
    }

    #[test]
    fn panic_messages() {
        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*payload).as_deref(), Some("static"));

        let n = 42;
        let payload = std::panic::catch_unwind(|| panic!("formatted {n}")).unwrap_err();
        assert_eq!(panic_message(&*payload).as_deref(), Some("formatted 42"));

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        assert!(panic_message(&*payload).is_none());
    }
}
