// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Shift accumulator processors.
//!
//! One processor per machine class. Each owns a `lineID -> state` map
//! behind its own mutex; a [`Processor::process`] call acquires the lock
//! once, applies the sample, snapshots the totals, and serializes after
//! the lock is released. Locks are never held across I/O.

mod dryer_in;
mod dryer_out;
mod glaze;
mod kiln_in;
mod kiln_out;
mod passthrough;
mod press;
mod quality;

pub use dryer_in::DryerInProcessor;
pub use dryer_out::DryerOutProcessor;
pub use glaze::GlazeProcessor;
pub use kiln_in::KilnInProcessor;
pub use kiln_out::KilnOutProcessor;
pub use passthrough::DefaultProcessor;
pub use press::PressProcessor;
pub use quality::QualityProcessor;

use serde::Serialize;
use serde_json::Value;

use crate::device::DeviceKind;
use crate::error::Result;
use crate::shift::Shift;

/// A derived document ready for publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Fully-derived topic path
    pub topic: String,
    /// UTF-8 JSON object
    pub payload: String,
}

impl Publication {
    pub(crate) fn json<T: Serialize>(topic: String, doc: &T) -> Result<Self> {
        Ok(Self {
            topic,
            payload: serde_json::to_string(doc)?,
        })
    }
}

/// Shift-scoped message processor for one machine class.
pub trait Processor: Send + Sync {
    /// Convert one inbound sample into its derived publications.
    ///
    /// `shift_now` comes from the router's clock; processors never read
    /// the wall clock for shift decisions.
    fn process(&self, msg: &Value, isa95_prefix: &str, shift_now: Shift)
        -> Result<Vec<Publication>>;
}

/// Alarm document published next to every production document.
#[derive(Debug, Serialize)]
pub(crate) struct AlarmsDoc {
    pub alarms: i64,
    pub timestamp_device: String,
}

/// Topic concatenation is literal; the prefix is not required to end in
/// a separator.
pub(crate) fn alarms_topic(prefix: &str, line_id: i64, slug: &str) -> String {
    format!("{prefix}{line_id}/{slug}/alarms")
}

pub(crate) fn production_topic(prefix: &str, line_id: i64, slug: &str) -> String {
    format!("{prefix}{line_id}/{slug}/production")
}

/// The full processor set, one instance per machine class.
pub struct ProcessorSet {
    press1: PressProcessor,
    press2: PressProcessor,
    dryer_in: DryerInProcessor,
    dryer_out: DryerOutProcessor,
    glaze: GlazeProcessor,
    kiln_in: KilnInProcessor,
    kiln_out: KilnOutProcessor,
    quality: QualityProcessor,
    fallback: DefaultProcessor,
}

impl ProcessorSet {
    /// Create the set with fresh (uninitialized) line state everywhere.
    pub fn new() -> Self {
        Self {
            press1: PressProcessor::new(DeviceKind::Ph1),
            press2: PressProcessor::new(DeviceKind::Ph2),
            dryer_in: DryerInProcessor::new(),
            dryer_out: DryerOutProcessor::new(),
            glaze: GlazeProcessor::new(),
            kiln_in: KilnInProcessor::new(),
            kiln_out: KilnOutProcessor::new(),
            quality: QualityProcessor::new(),
            fallback: DefaultProcessor::new(),
        }
    }

    /// Processor for a resolved device kind.
    pub fn for_kind(&self, kind: DeviceKind) -> &dyn Processor {
        match kind {
            DeviceKind::Ph1 => &self.press1,
            DeviceKind::Ph2 => &self.press2,
            DeviceKind::DryerIn => &self.dryer_in,
            DeviceKind::DryerOut => &self.dryer_out,
            DeviceKind::Glaze => &self.glaze,
            DeviceKind::KilnIn => &self.kiln_in,
            DeviceKind::KilnOut => &self.kiln_out,
            DeviceKind::Quality => &self.quality,
        }
    }

    /// Pass-through processor for unknown device codes.
    pub fn fallback(&self) -> &dyn Processor {
        &self.fallback
    }
}

impl Default for ProcessorSet {
    fn default() -> Self {
        Self::new()
    }
}
