//! Error types for the publisher.

use std::string::FromUtf8Error;

use thiserror::Error;

use crate::config::ConfigViolation;

/// Every way a publish call can fail. No variant implies partial delivery.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("invalid configuration: {}", join(violations))]
    ConfigInvalid { violations: Vec<ConfigViolation> },

    #[error("unknown content type '{content_type}'")]
    UnsupportedFormat { content_type: String },

    #[error("decoding error: {0}")]
    Decode(#[from] CodecError),

    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("request error: {0}")]
    Delivery(#[source] Box<ureq::Transport>),

    #[error("destination rejected the batch with status {status}")]
    DestinationRejected { status: u16 },
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("truncated or unreadable input: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid utf-8 string: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    #[error("unknown namespace segment kind {0}")]
    UnknownSegmentKind(u8),

    #[error("unknown value kind {0}")]
    UnknownValueKind(u8),

    #[error("{len} exceeds the encodable length")]
    TooLong { len: usize },

    #[error("{0} trailing bytes after the last record")]
    TrailingBytes(usize),
}

fn join(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
