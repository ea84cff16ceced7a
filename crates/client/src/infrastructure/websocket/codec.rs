//! Frame codec for the game WebSocket.
//!
//! Inbound: text frame -> `ServerEnvelope` -> `TaggedMessage`. Frames that are not
//! a JSON envelope are coerced into a chat line from `Server`, because the server
//! may still echo plain text. Outbound: `ClientMessage` -> JSON text.

use clocktower_protocol::{
    ChatMessage, ClientMessage, MessageKind, PayloadError, ServerEnvelope, TaggedMessage,
};
use thiserror::Error;

use crate::infrastructure::clock::ClockPort;

/// Sender label for frames coerced into chat.
pub const FALLBACK_SENDER: &str = "Server";

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not a JSON object with a string `type`.
    #[error("frame is not a tagged envelope: {0}")]
    NotAnEnvelope(#[source] serde_json::Error),

    /// The tag is known but the payload does not fit it.
    #[error(transparent)]
    MalformedPayload(#[from] PayloadError),
}

impl DecodeError {
    /// Tag of the message whose payload was rejected, if any.
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            DecodeError::NotAnEnvelope(_) => None,
            DecodeError::MalformedPayload(err) => Some(err.kind),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to encode {tag}: {source}")]
pub struct EncodeError {
    pub tag: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Strict parse: no fallback.
pub fn parse_frame(raw: &str) -> Result<TaggedMessage, DecodeError> {
    let envelope: ServerEnvelope = serde_json::from_str(raw).map_err(DecodeError::NotAnEnvelope)?;
    Ok(TaggedMessage::classify(envelope)?)
}

/// Decode an inbound frame.
///
/// Only `DecodeError::MalformedPayload` is ever returned; anything that is not an
/// envelope becomes a `Server` chat line stamped with `clock`.
pub fn decode(raw: &str, clock: &dyn ClockPort) -> Result<TaggedMessage, DecodeError> {
    match parse_frame(raw) {
        Err(DecodeError::NotAnEnvelope(err)) => {
            tracing::debug!(error = %err, "Non-envelope frame, treating as server chat");
            Ok(TaggedMessage::Chat(ChatMessage::new(
                FALLBACK_SENDER,
                raw,
                clock.now_iso(),
            )))
        }
        other => other,
    }
}

/// Encode an outbound command as a text frame.
pub fn encode(message: &ClientMessage) -> Result<String, EncodeError> {
    serde_json::to_string(message).map_err(|source| EncodeError {
        tag: message.tag(),
        source,
    })
}
