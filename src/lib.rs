//! # Cerabridge - Shift accumulator engine for ceramic line telemetry
//!
//! Converts raw 15/16-bit PLC counters published by edge gateways into
//! monotonic, overflow-safe, shift-resetting totals, republished as
//! ISA-95-structured JSON documents.
//!
//! ## Key Features
//!
//! - **Wrap-aware counters**: 15-bit (bank-flag MSB) and 16-bit rollover
//!   handled transparently
//! - **Shift scoping**: every accumulator resets at the S1/S2/S3 boundaries
//! - **Noise rejection**: bounded deltas for signals known to emit garbage
//!   bursts
//! - **Per-line state**: each machine class keeps independent totals per
//!   production line
//!
//! ## Quick Start
//!
//! ```rust
//! use cerabridge::Router;
//!
//! let router = Router::new("site/");
//!
//! let pubs = router.handle(
//!     "celima/data",
//!     r#"{"deviceType":4,"lineID":2,"cantidadProductos":120}"#,
//! );
//!
//! // One alarms document, one production document
//! assert_eq!(pubs.len(), 2);
//! assert_eq!(pubs[1].topic, "site/2/salida_secador/production");
//! ```
//!
//! ## Modules
//!
//! - [`shift`]: work-shift clock (S1/S2/S3 from local wall time)
//! - [`counter`]: wrap-around counter arithmetic and accumulators
//! - [`device`]: `deviceType` code registry
//! - [`payload`]: best-effort JSON field extraction
//! - [`processors`]: the per-device shift accumulators
//! - [`router`]: inbound topic dispatch

// Modules
pub mod counter;
pub mod device;
pub mod error;
pub mod payload;
pub mod processors;
pub mod router;
pub mod shift;

// Re-exports for convenient access
pub use device::DeviceKind;
pub use error::{BridgeError, Result};
pub use processors::{Processor, ProcessorSet, Publication};
pub use router::Router;
pub use shift::{Clock, LocalClock, Shift};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Topic carrying gateway data samples
pub const DATA_TOPIC: &str = "celima/data";

/// Gateway error channel, logged untouched
pub const ERROR_TOPIC: &str = "celima/error";

/// Gateway join notifications, logged untouched
pub const JOIN_TOPIC: &str = "celima/join";

/// Gateway acknowledgements, logged untouched
pub const ACK_TOPIC: &str = "celima/ACK";

/// The full inbound subscription set, all QoS 1
pub const SUBSCRIBED_TOPICS: [&str; 4] = [DATA_TOPIC, ERROR_TOPIC, JOIN_TOPIC, ACK_TOPIC];
