//! Progress events and sinks.
//!
//! Progress is a side channel: sinks observe the run but never influence it.
//! [`ProgressReporter`] sits between the pipeline and the caller's sink and
//! guarantees the reported percentage never goes backwards.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use super::state::Stage;

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Overall completion in `[0, 100]`.
    pub percent: u8,
    pub message: String,
}

/// Receives progress events. Must not block.
///
/// Implemented for any `Fn(ProgressEvent) + Send + Sync`, so a closure is
/// usually enough:
///
/// ```
/// use meeting_protocol::pipeline::{ProgressEvent, ProgressSink};
///
/// let sink = |e: ProgressEvent| println!("[{:>3}%] {}", e.percent, e.message);
/// sink.report(ProgressEvent { percent: 5, message: "Preparing audio".into() });
/// ```
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

// ---------------------------------------------------------------------------
// ProgressReporter
// ---------------------------------------------------------------------------

/// Clamps and de-regresses percentages before forwarding them to a sink.
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    last: AtomicU8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            last: AtomicU8::new(0),
        }
    }

    /// Forward `percent` (clamped to 100, never below the last value sent).
    pub fn report(&self, percent: u8, message: impl Into<String>) {
        let requested = percent.min(100);
        let previous = self.last.fetch_max(requested, Ordering::SeqCst);
        self.sink.report(ProgressEvent {
            percent: previous.max(requested),
            message: message.into(),
        });
    }

    /// Report `done` of `total` units within `stage`'s band.
    pub fn stage(&self, stage: Stage, done: usize, total: usize, message: impl Into<String>) {
        self.report(stage.percent_at(done, total), message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Collects every event for later inspection.
    #[derive(Default)]
    pub(crate) struct CollectingSink {
        pub events: Mutex<Vec<ProgressEvent>>,
    }

    impl CollectingSink {
        pub(crate) fn percents(&self) -> Vec<u8> {
            self.events.lock().unwrap().iter().map(|e| e.percent).collect()
        }

        pub(crate) fn messages(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.message.clone())
                .collect()
        }
    }

    impl ProgressSink for CollectingSink {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |e: ProgressEvent| seen.lock().unwrap().push(e.percent);
        let reporter = ProgressReporter::new(&sink);
        reporter.report(40, "x");
        assert_eq!(*seen.lock().unwrap(), vec![40]);
    }

    #[test]
    fn percent_is_clamped_to_100() {
        let sink = CollectingSink::default();
        let reporter = ProgressReporter::new(&sink);
        reporter.report(250, "overflow");
        assert_eq!(sink.percents(), vec![100]);
    }

    #[test]
    fn regressions_are_suppressed() {
        let sink = CollectingSink::default();
        let reporter = ProgressReporter::new(&sink);
        reporter.report(50, "a");
        reporter.report(30, "b");
        reporter.report(60, "c");
        assert_eq!(sink.percents(), vec![50, 50, 60]);
        assert_eq!(sink.messages(), vec!["a", "b", "c"]);
    }

    #[test]
    fn stage_reports_use_band() {
        let sink = CollectingSink::default();
        let reporter = ProgressReporter::new(&sink);
        reporter.stage(Stage::Transcribing, 1, 2, "half");
        assert_eq!(sink.percents(), vec![51]);
    }
}
