//! Wire frame model for the gateway protocol.
//!
//! Every message exchanged over a client connection is one JSON frame of the
//! shape `{ "type": ..., "content": ..., "metadata": ... }`. Inbound and
//! outbound frames are closed enums so dispatch is exhaustive at compile
//! time; an unrecognized inbound `type` string maps to
//! [`ClientFrame::Unknown`] rather than a parse error, keeping the
//! connection alive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ErrorType;

/// Correlation metadata attached to frames.
///
/// Every outbound frame that answers a `message` or `cancel_stream` carries
/// the originating stream id in `user_input_id`; clients tracking several
/// concurrent streams demultiplex on it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Stream id correlating this frame to the originating request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_input_id: Option<String>,
    /// Error category; set on `error` frames only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl FrameMetadata {
    /// Metadata carrying only a stream id.
    #[must_use]
    pub fn for_stream(stream_id: impl Into<String>) -> Self {
        Self {
            user_input_id: Some(stream_id.into()),
            error_type: None,
        }
    }
}

/// Frames received from a client.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Start a new generation stream for the prompt in `content`.
    Message {
        /// The user prompt.
        content: String,
        /// Must carry `user_input_id`; the caller guarantees uniqueness.
        #[serde(default)]
        metadata: FrameMetadata,
    },
    /// Request cancellation of an in-flight stream.
    CancelStream {
        /// Must carry `user_input_id`.
        #[serde(default)]
        metadata: FrameMetadata,
    },
    /// Read the current AI configuration.
    GetConfig,
    /// Probe submitted credentials without persisting them.
    ValidateConfig {
        /// `{ "provider": ..., "api_key": ... }`.
        content: Value,
    },
    /// Persist a new AI configuration.
    SetConfig {
        /// `{ "provider": ..., "api_key": ... }`.
        content: Value,
    },
    /// Remove the persisted AI configuration.
    DeleteConfig,
    /// Any frame whose `type` is not recognized.
    #[serde(other)]
    Unknown,
}

/// Frames sent to a client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Synchronous receipt acknowledgment for a `message` frame, sent
    /// before generation is requested.
    Ack {
        /// Carries the stream id.
        metadata: FrameMetadata,
    },
    /// One generated token.
    Chunk {
        /// The token text.
        content: String,
        /// Carries the stream id.
        metadata: FrameMetadata,
    },
    /// Normal end of a stream.
    EndStream {
        /// Carries the stream id.
        metadata: FrameMetadata,
    },
    /// A failure, stream-scoped when the metadata carries a stream id.
    Error {
        /// Human-readable description.
        content: String,
        /// Stream id and/or error category.
        metadata: FrameMetadata,
    },
    /// Connection-level notice.
    Status {
        /// Notice text.
        content: String,
    },
    /// Acknowledgment of a `cancel_stream` frame.
    StreamCancelled {
        /// Carries the stream id.
        metadata: FrameMetadata,
    },
    /// Reply to `get_config`.
    Config {
        /// `{ "configured": ..., ... }`.
        content: Value,
    },
    /// Reply to `validate_config`.
    ValidationResult {
        /// `{ "valid": ..., ... }`.
        content: Value,
    },
    /// Reply to `set_config`.
    ConfigSet {
        /// `{ "success": ..., ... }`.
        content: Value,
    },
    /// Reply to `delete_config`.
    ConfigDeleted {
        /// `{ "success": ..., ... }`.
        content: Value,
    },
}

impl ServerFrame {
    /// Receipt acknowledgment for `stream_id`.
    #[must_use]
    pub fn ack(stream_id: &str) -> Self {
        Self::Ack {
            metadata: FrameMetadata::for_stream(stream_id),
        }
    }

    /// One token for `stream_id`.
    #[must_use]
    pub fn chunk(token: impl Into<String>, stream_id: &str) -> Self {
        Self::Chunk {
            content: token.into(),
            metadata: FrameMetadata::for_stream(stream_id),
        }
    }

    /// Normal-completion marker for `stream_id`.
    #[must_use]
    pub fn end_stream(stream_id: &str) -> Self {
        Self::EndStream {
            metadata: FrameMetadata::for_stream(stream_id),
        }
    }

    /// Cancellation acknowledgment for `stream_id`.
    #[must_use]
    pub fn stream_cancelled(stream_id: &str) -> Self {
        Self::StreamCancelled {
            metadata: FrameMetadata::for_stream(stream_id),
        }
    }

    /// Connection-level notice.
    #[must_use]
    pub fn status(notice: impl Into<String>) -> Self {
        Self::Status {
            content: notice.into(),
        }
    }

    /// Error frame, optionally categorized and/or correlated to a stream.
    #[must_use]
    pub fn error(
        message: impl Into<String>,
        error_type: Option<ErrorType>,
        stream_id: Option<&str>,
    ) -> Self {
        Self::Error {
            content: message.into(),
            metadata: FrameMetadata {
                user_input_id: stream_id.map(str::to_owned),
                error_type: error_type.map(|t| t.as_str().to_owned()),
            },
        }
    }

    /// Reply to `get_config`.
    #[must_use]
    pub fn config(content: Value) -> Self {
        Self::Config { content }
    }

    /// Reply to `validate_config`.
    #[must_use]
    pub fn validation_result(content: Value) -> Self {
        Self::ValidationResult { content }
    }

    /// Reply to `set_config`.
    #[must_use]
    pub fn config_set(content: Value) -> Self {
        Self::ConfigSet { content }
    }

    /// Reply to `delete_config`.
    #[must_use]
    pub fn config_deleted(content: Value) -> Self {
        Self::ConfigDeleted { content }
    }
}
