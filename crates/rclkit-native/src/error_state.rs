// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-slot error state shared by every native entry point.
//!
//! The native runtime keeps at most one pending error message per runtime
//! instance. A failing entry point writes it; the caller must read and clear
//! it before issuing the next native call, otherwise a stale message leaks
//! into an unrelated failure. [`ErrorSlot::take`] performs the read and the
//! clear under one lock so concurrent callers never observe half of it.

use parking_lot::Mutex;
use std::fmt;

/// Text reported by [`ErrorSlot::get_string`] when nothing is pending.
pub const ERROR_NOT_SET: &str = "error not set";

/// One pending error message plus the location that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub message: String,
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, at {}:{}", self.message, self.file, self.line)
    }
}

/// Process-wide (per runtime instance) error slot.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    slot: Mutex<Option<ErrorRecord>>,
}

impl ErrorSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a message, overwriting any pending one.
    pub fn set(&self, message: impl Into<String>, file: &'static str, line: u32) {
        let record = ErrorRecord {
            message: message.into(),
            file,
            line,
        };
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.as_ref() {
            log::debug!(
                "[error-state] overwriting pending error '{}' with '{}'",
                previous,
                record
            );
        }
        *slot = Some(record);
    }

    /// Whether a message is pending.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Formatted pending message, or [`ERROR_NOT_SET`]. Does not clear.
    #[must_use]
    pub fn get_string(&self) -> String {
        self.slot
            .lock()
            .as_ref()
            .map_or_else(|| ERROR_NOT_SET.to_string(), ToString::to_string)
    }

    /// Drop the pending message, if any.
    pub fn reset(&self) {
        *self.slot.lock() = None;
    }

    /// Read and clear the pending message in one step.
    #[must_use]
    pub fn take(&self) -> Option<String> {
        self.slot.lock().take().map(|record| record.to_string())
    }
}

/// Record a formatted error message on an [`ErrorSlot`] with the call site.
#[macro_export]
macro_rules! set_error {
    ($slot:expr, $($arg:tt)+) => {
        $slot.set(format!($($arg)+), file!(), line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_reports_not_set() {
        let slot = ErrorSlot::new();
        assert!(!slot.is_set());
        assert_eq!(slot.get_string(), ERROR_NOT_SET);
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn take_reads_and_clears() {
        let slot = ErrorSlot::new();
        set_error!(slot, "node name '{}' is invalid", "1abc");

        let message = slot.take().expect("pending message");
        assert!(message.starts_with("node name '1abc' is invalid, at "));
        assert!(!slot.is_set());
        assert_eq!(slot.get_string(), ERROR_NOT_SET);
    }

    #[test]
    fn set_overwrites_pending_message() {
        let slot = ErrorSlot::new();
        slot.set("first", "a.rs", 1);
        slot.set("second", "b.rs", 2);
        assert_eq!(slot.get_string(), "second, at b.rs:2");
    }

    #[test]
    fn get_string_does_not_clear() {
        let slot = ErrorSlot::new();
        slot.set("pending", "c.rs", 3);
        let _ = slot.get_string();
        assert!(slot.is_set());
        slot.reset();
        assert!(!slot.is_set());
    }
}
