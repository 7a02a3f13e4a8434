// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Inbound topic dispatch.
//!
//! The router itself is stateless; all mutable state lives behind the
//! processors' own locks, so `handle` may be called from concurrent
//! delivery workers. Errors never escape: bad payloads are logged and
//! dropped.

use tracing::{debug, error, info, warn};

use crate::device::DeviceKind;
use crate::payload;
use crate::processors::{ProcessorSet, Publication};
use crate::shift::{Clock, LocalClock};
use crate::{ACK_TOPIC, DATA_TOPIC, ERROR_TOPIC, JOIN_TOPIC};

/// Routes inbound broker messages to the processor set.
pub struct Router {
    processors: ProcessorSet,
    prefix: String,
    clock: Box<dyn Clock>,
}

impl Router {
    /// Router on the local wall clock.
    pub fn new(isa95_prefix: impl Into<String>) -> Self {
        Self::with_clock(isa95_prefix, Box::new(LocalClock))
    }

    /// Router with an injected shift clock (tests pin the shift here).
    pub fn with_clock(isa95_prefix: impl Into<String>, clock: Box<dyn Clock>) -> Self {
        Self {
            processors: ProcessorSet::new(),
            prefix: isa95_prefix.into(),
            clock,
        }
    }

    /// Route one inbound message; returns the publications it produced.
    ///
    /// Only the data topic feeds the engine. The error/join/ACK channels
    /// are observability pass-throughs: logged, never transformed.
    pub fn handle(&self, topic: &str, payload: &str) -> Vec<Publication> {
        match topic {
            DATA_TOPIC => self.handle_data(payload),
            ERROR_TOPIC => {
                error!("[celima/error] {}", payload);
                Vec::new()
            }
            JOIN_TOPIC => {
                info!("[celima/join] {}", payload);
                Vec::new()
            }
            ACK_TOPIC => {
                info!("[celima/ACK] {}", payload);
                Vec::new()
            }
            other => {
                debug!("Message on {} ignored", other);
                Vec::new()
            }
        }
    }

    /// Process one data sample.
    pub fn handle_data(&self, payload: &str) -> Vec<Publication> {
        let msg = match payload::parse(payload) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Invalid JSON on data topic: {} | payload={}", e, payload);
                return Vec::new();
            }
        };

        let code = payload::int_field(&msg, "deviceType");
        let processor = match DeviceKind::from_code(code) {
            Some(kind) => {
                debug!("Dispatching sample to {}", kind.name());
                self.processors.for_kind(kind)
            }
            None => {
                debug!("Unknown deviceType {}, using pass-through", code);
                self.processors.fallback()
            }
        };

        match processor.process(&msg, &self.prefix, self.clock.now_shift()) {
            Ok(pubs) => pubs,
            Err(e) => {
                error!("Processor failed, sample dropped: {}", e);
                Vec::new()
            }
        }
    }

    /// Configured ISA-95 prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
