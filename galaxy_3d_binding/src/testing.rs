//! Shared helpers for unit tests (test builds only)

use std::sync::{Arc, Mutex};

use crate::engine::Engine;
use crate::log::{LogEntry, LogSeverity, Logger};

/// Logger that records every entry so tests can assert on reported errors
#[derive(Clone, Default)]
pub struct CapturingLogger {
    entries: Arc<Mutex<Vec<(LogSeverity, String, String)>>>,
}

impl CapturingLogger {
    /// Install a fresh capturing logger as the global logger and return a handle to it
    pub fn install() -> Self {
        let logger = Self::default();
        Engine::set_logger(logger.clone());
        logger
    }

    pub fn count(&self, severity: LogSeverity) -> usize {
        self.entries.lock().unwrap().iter().filter(|(s, _, _)| *s == severity).count()
    }

    pub fn errors(&self) -> usize {
        self.count(LogSeverity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(LogSeverity::Warn)
    }

    /// Whether any entry of the given severity contains `needle`
    pub fn contains(&self, severity: LogSeverity, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|(s, _, message)| *s == severity && message.contains(needle))
    }

    /// Number of entries of the given severity containing `needle`
    pub fn count_containing(&self, severity: LogSeverity, needle: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _, message)| *s == severity && message.contains(needle))
            .count()
    }

    pub fn sources(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().map(|(_, source, _)| source.clone()).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries
            .lock()
            .unwrap()
            .push((entry.severity, entry.source.clone(), entry.message.clone()));
    }
}
