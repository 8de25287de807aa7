//! Boundaries to the surrounding application: on-screen alerts, the general
//! log model, and outbound device actions. The core only ever talks to these
//! traits; what sits behind them (a UI, a test recorder) is up to the caller.

use std::sync::Mutex;

use linkmon_proto::{Severity, SourceId};
use tracing::{info, warn};

/// Short human-readable notifications shown on screen. Rate limiting of what
/// gets sent lives in the core, not here.
pub trait AlertSink: Send + Sync {
    fn message(&self, severity: Severity, text: &str);

    fn info(&self, text: &str) {
        self.message(Severity::Info, text);
    }

    fn warning(&self, text: &str) {
        self.message(Severity::Warning, text);
    }
}

/// Receives every status text regardless of alert escalation.
pub trait LogSink: Send + Sync {
    fn log(&self, tag: &str, text: &str, severity: Severity);
}

/// Outbound device actions for a bound session. The result is synchronous;
/// the core never retries.
pub trait DeviceActions: Send + Sync {
    fn send_reboot_shutdown(&self, target: SourceId, reboot: bool) -> bool;
}

/// Forwards alerts and log lines to `tracing`. Good enough for the CLI and
/// for anything headless.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AlertSink for TracingSink {
    fn message(&self, severity: Severity, text: &str) {
        match severity {
            Severity::Warning | Severity::Error => warn!(target: "alerts", "{}", text),
            _ => info!(target: "alerts", "{}", text),
        }
    }
}

impl LogSink for TracingSink {
    fn log(&self, tag: &str, text: &str, severity: Severity) {
        match severity {
            Severity::Warning | Severity::Error => warn!(target: "linklog", tag, "{}", text),
            _ => info!(target: "linklog", tag, "{}", text),
        }
    }
}

/// In-memory sink, used by tests and the replay summary.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<(Severity, String)> {
        std::mem::take(&mut *self.entries.lock().unwrap())
    }

    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl AlertSink for MemorySink {
    fn message(&self, severity: Severity, text: &str) {
        self.entries.lock().unwrap().push((severity, text.to_string()));
    }
}

impl LogSink for MemorySink {
    fn log(&self, tag: &str, text: &str, severity: Severity) {
        self.entries
            .lock()
            .unwrap()
            .push((severity, format!("{}: {}", tag, text)));
    }
}
