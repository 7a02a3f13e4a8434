// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Pass-through processor for unknown device codes.
//!
//! Keeps no state. Forwards a minimal summary onto two fixed topics so
//! samples from unconfigured gateways stay visible downstream.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::payload::int_field;
use crate::processors::{Processor, Publication};
use crate::shift::{unix_seconds, Shift};

/// Fallback for samples without a dedicated processor.
pub struct DefaultProcessor;

#[derive(Debug, Serialize)]
struct QuantitySummary {
    quantity: i64,
    ts: i64,
}

#[derive(Debug, Serialize)]
struct AlarmsSummary {
    alarms: i64,
    ts: i64,
}

impl DefaultProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DefaultProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for DefaultProcessor {
    fn process(
        &self,
        msg: &Value,
        isa95_prefix: &str,
        _shift_now: Shift,
    ) -> Result<Vec<Publication>> {
        let quantity = QuantitySummary {
            quantity: int_field(msg, "cantidad"),
            ts: unix_seconds(),
        };
        let alarms = AlarmsSummary {
            alarms: int_field(msg, "alarms"),
            ts: unix_seconds(),
        };

        Ok(vec![
            Publication::json(
                format!("{isa95_prefix}/production/line/quantity"),
                &quantity,
            )?,
            Publication::json(format!("{isa95_prefix}/quality/alarms"), &alarms)?,
        ])
    }
}
