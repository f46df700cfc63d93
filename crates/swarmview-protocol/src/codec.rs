//! Line-delimited JSON framing: one message per line, no embedded newlines.

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::Message;

/// Serialise a message into a single line, including the trailing newline.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the message cannot be serialised.
pub fn encode_line(message: &Message) -> ProtocolResult<String> {
    let mut line = serde_json::to_string(message).map_err(|source| ProtocolError::Encode {
        kind: message.kind(),
        source,
    })?;
    line.push('\n');
    Ok(line)
}

/// Parse a single line into a message. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyFrame`] for blank lines and
/// [`ProtocolError::Decode`] when the line is not a valid message.
pub fn decode_line(line: &str) -> ProtocolResult<Message> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }
    serde_json::from_str(trimmed).map_err(|source| ProtocolError::Decode { source })
}
