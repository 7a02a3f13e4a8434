// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Work-shift clock.
//!
//! The plant runs three fixed shifts keyed to local wall time:
//! S1 = 07:00-15:00, S2 = 15:00-23:00, S3 overnight. Every accumulator in
//! the engine resets when the shift changes, so "what shift is it" goes
//! through the [`Clock`] trait and can be pinned in tests.

use chrono::{Local, Timelike, Utc};

/// Work shift. Boundaries belong to the later shift: 07:00 is S1,
/// 15:00 is S2, 23:00 is S3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shift {
    /// Morning shift, 07:00-15:00
    S1,
    /// Afternoon shift, 15:00-23:00
    S2,
    /// Night shift, 23:00-07:00
    S3,
}

impl Shift {
    /// Shift active at a given local hour (0..24).
    pub fn from_hour(hour: u32) -> Self {
        if (7..15).contains(&hour) {
            Shift::S1
        } else if (15..23).contains(&hour) {
            Shift::S2
        } else {
            Shift::S3
        }
    }

    /// Integer label stamped on outbound documents (`turno` / `shift`).
    pub fn number(self) -> u8 {
        match self {
            Shift::S1 => 1,
            Shift::S2 => 2,
            Shift::S3 => 3,
        }
    }
}

/// Source of the current shift.
pub trait Clock: Send + Sync {
    /// Shift active right now.
    fn now_shift(&self) -> Shift;
}

/// Clock backed by the process-local timezone (set via TZ).
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now_shift(&self) -> Shift {
        Shift::from_hour(Local::now().hour())
    }
}

/// Fresh device timestamp: ISO-8601 UTC with millisecond precision,
/// `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn timestamp_device() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Epoch seconds, used by the pass-through summary documents.
pub fn unix_seconds() -> i64 {
    Utc::now().timestamp()
}
