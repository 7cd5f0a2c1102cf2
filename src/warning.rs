use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use itertools::Itertools;

/// Raised once per tracked request that left context keys unread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedContextWarning {
    /// Display form of the request, e.g. `<Request: GET '/no_context'>`.
    pub request: String,
    pub keys: BTreeSet<String>,
}

impl fmt::Display for UnusedContextWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Request Context {} had unused keys: {{{}}}",
            self.request,
            self.keys.iter().join(", ")
        )
    }
}

/// Where runtime warnings go. The log line is emitted independently.
pub trait WarningSink: Send + Sync {
    fn warn(&self, warning: &UnusedContextWarning);
}

/// Writes each warning as a `UserWarning: <message>` line. The middleware's
/// default, pointed at stderr.
pub struct StreamSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl StreamSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self { out: Mutex::new(Box::new(out)) }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl Default for StreamSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink").finish_non_exhaustive()
    }
}

impl WarningSink for StreamSink {
    fn warn(&self, warning: &UnusedContextWarning) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        // a closed stream must not fail the request
        let _ = writeln!(out, "UserWarning: {warning}").and_then(|()| out.flush());
    }
}

/// Discards warnings. Opt out of the runtime channel with this; the log line
/// is still emitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl WarningSink for NullSink {
    fn warn(&self, _warning: &UnusedContextWarning) {}
}

/// Keeps every warning it receives, for tests and tooling.
#[derive(Debug, Default)]
pub struct WarningRecorder {
    records: Mutex<Vec<UnusedContextWarning>>,
}

impl WarningRecorder {
    pub fn new() -> Self { Self::default() }

    pub fn records(&self) -> Vec<UnusedContextWarning> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drain recorded warnings.
    pub fn take(&self) -> Vec<UnusedContextWarning> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WarningSink for WarningRecorder {
    fn warn(&self, warning: &UnusedContextWarning) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning.clone());
    }
}
