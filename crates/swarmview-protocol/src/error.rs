//! Error types for protocol framing.

use thiserror::Error;

/// Failures raised while framing messages for the transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The inbound line contained no message.
    #[error("empty protocol frame")]
    EmptyFrame,
    /// The inbound line was not a valid message.
    #[error("failed to decode protocol frame")]
    Decode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The outbound message could not be serialised.
    #[error("failed to encode protocol frame")]
    Encode {
        /// Kind of message that failed to encode.
        kind: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience alias for protocol results.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
