//! In-app diagnostics feed.
//!
//! A tee logger forwards every record to the regular `env_logger` output and
//! also keeps this crate's warnings and errors in a bounded global buffer. The
//! UI drains the buffer each frame into the Diagnostics tab, so failed lookups
//! and tile errors are visible without a terminal.

use chrono::{DateTime, Local};
use log::{Level, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Maximum number of entries buffered between drains.
const CAPTURE_CAPACITY: usize = 500;

const CAPTURED_TARGET_PREFIX: &str = "fresnel_link_planner";

#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

static CAPTURED: Mutex<Option<VecDeque<DiagnosticEntry>>> = Mutex::new(None);

/// Start buffering captured records. Records logged before this are not kept.
pub fn init_capture() {
    if let Ok(mut guard) = CAPTURED.lock() {
        *guard = Some(VecDeque::with_capacity(CAPTURE_CAPACITY));
    }
}

pub fn drain_captured() -> Vec<DiagnosticEntry> {
    match CAPTURED.lock() {
        Ok(mut guard) => guard.as_mut().map(|buffer| buffer.drain(..).collect()).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

fn push_entry(entry: DiagnosticEntry) {
    if let Ok(mut guard) = CAPTURED.lock() {
        if let Some(buffer) = guard.as_mut() {
            if buffer.len() >= CAPTURE_CAPACITY {
                buffer.pop_front();
            }
            buffer.push_back(entry);
        }
    }
}

fn should_capture(level: Level, target: &str) -> bool {
    level <= Level::Warn && target.starts_with(CAPTURED_TARGET_PREFIX)
}

pub struct TeeLogger {
    inner: env_logger::Logger,
}

impl TeeLogger {
    pub fn new(inner: env_logger::Logger) -> Self {
        Self { inner }
    }

    pub fn filter(&self) -> log::LevelFilter {
        self.inner.filter()
    }
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.inner.log(record);

        if should_capture(record.level(), record.target()) {
            push_entry(DiagnosticEntry {
                timestamp: Local::now(),
                level: record.level(),
                target: record.target().to_string(),
                message: record.args().to_string(),
            });
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Build the logger from `builder`, wrap it in a [`TeeLogger`] and install it
/// as the global logger.
pub fn install(mut builder: env_logger::Builder) -> Result<(), log::SetLoggerError> {
    init_capture();
    let logger = TeeLogger::new(builder.build());
    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_own_warnings_and_errors_are_captured() {
        assert!(should_capture(Level::Warn, "fresnel_link_planner::elevation::client"));
        assert!(should_capture(Level::Error, "fresnel_link_planner"));
        assert!(!should_capture(Level::Info, "fresnel_link_planner::scene::export"));
        assert!(!should_capture(Level::Debug, "fresnel_link_planner::scene::model"));
        assert!(!should_capture(Level::Error, "wgpu_core::device"));
        assert!(!should_capture(Level::Warn, "reqwest::connect"));
    }

    #[test]
    fn buffer_is_bounded_and_drained() {
        init_capture();
        for i in 0..CAPTURE_CAPACITY + 5 {
            push_entry(DiagnosticEntry {
                timestamp: Local::now(),
                level: Level::Warn,
                target: CAPTURED_TARGET_PREFIX.to_string(),
                message: format!("entry {}", i),
            });
        }
        let drained = drain_captured();
        assert_eq!(drained.len(), CAPTURE_CAPACITY);
        assert_eq!(drained[0].message, "entry 5");
        assert!(drain_captured().is_empty());
    }
}
