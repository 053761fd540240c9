//! Wire trace logging.
//!
//! Records every context and message crossing the link to an append-only
//! file, one timestamped line per payload.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::transport::{ReplyHandler, Transport, TransportError};

/// Thread-safe handle to an append-only trace file.
pub type TraceHandle = Arc<Mutex<Option<File>>>;

/// Current UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write a timestamped line to the trace file (if present).
pub fn trace_line(handle: &TraceHandle, direction: &str, data: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "[{}] {}: {}", utc_timestamp(), direction, data);
            let _ = file.flush();
        }
    }
}

/// Open (or create) `{trace_dir}/{trace_id}.log` and return a shared handle.
///
/// Without a directory, or if the file cannot be opened, the handle is empty
/// and tracing is a no-op.
pub fn open_trace_file(trace_dir: Option<&Path>, trace_id: &str) -> TraceHandle {
    let file = trace_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("{trace_id}.log")))
            .ok()
    });
    Arc::new(Mutex::new(file))
}

/// A [`Transport`] that writes every outbound payload to a trace file before
/// handing it to the wrapped transport.
pub struct TracedTransport<T> {
    inner: T,
    handle: TraceHandle,
    direction: String,
}

impl<T: Transport> TracedTransport<T> {
    /// `direction` labels each line, e.g. `"PHONE->WATCH"`.
    pub fn new(inner: T, handle: TraceHandle, direction: impl Into<String>) -> Self {
        Self {
            inner,
            handle,
            direction: direction.into(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn record(&self, kind: &str, payload: &Value, result: &Result<(), TransportError>) {
        let line = match result {
            Ok(()) => format!("{kind} {payload}"),
            Err(e) => format!("{kind} {payload} (failed: {e})"),
        };
        trace_line(&self.handle, &self.direction, &line);
    }
}

impl<T: Transport> Transport for TracedTransport<T> {
    fn update_application_context(&self, context: &Value) -> Result<(), TransportError> {
        let result = self.inner.update_application_context(context);
        self.record("context", context, &result);
        result
    }

    fn send_message(
        &self,
        message: &Value,
        reply: Option<ReplyHandler>,
    ) -> Result<(), TransportError> {
        let result = self.inner.send_message(message, reply);
        self.record("message", message, &result);
        result
    }
}
