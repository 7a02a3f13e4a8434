//! Error types for Cerabridge
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Inbound payload is not a valid JSON document, or an outbound
    /// document failed to serialize
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}
