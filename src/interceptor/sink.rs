//! Output sinks.
//!
//! The host writes rendered page text to whichever sink is active. The
//! interceptor swaps in a `CaptureBuffer` during BEFORE and restores the
//! original during AFTER.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A text destination for rendered output.
pub trait OutputSink: Send {
    fn write_str(&mut self, text: &str);
}

/// In-memory text buffer. Clones share the same storage, so the interceptor
/// keeps a handle while the host writes through the installed sink.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<String>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        // A panic while appending cannot leave the String invalid.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_str(&self, text: &str) {
        self.lock().push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Copy of the captured text.
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    /// Move the captured text out, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.lock())
    }
}

impl OutputSink for CaptureBuffer {
    fn write_str(&mut self, text: &str) {
        self.push_str(text);
    }
}
