use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio_util::sync::CancellationToken;
use watchrun::errors::{Result, WatchrunError};
use watchrun::exec::Run;

/// A fake [`Run`] implementation that:
/// - records how many times it was invoked
/// - optionally fails on a chosen invocation (1-based).
pub struct RecordingRunner {
    calls: Arc<AtomicUsize>,
    fail_on_call: Option<usize>,
}

impl RecordingRunner {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            fail_on_call: None,
        }
    }

    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }
}

impl Run for RecordingRunner {
    async fn run(&self, _cancel: &CancellationToken) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(WatchrunError::PrimaryFailed(1));
        }
        Ok(())
    }
}
