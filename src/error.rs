// Allow module inception for error types - this is a common Rust pattern
#![allow(clippy::module_name_repetitions)]

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Step of a lookup round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Write,
    Read,
    Validate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Write => "write",
            Self::Read => "read",
            Self::Validate => "validate",
        };
        f.write_str(name)
    }
}

/// Ways a reply can break the one-line framing or the reply grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("server closed the connection without replying")]
    EmptyReply,

    #[error("reply ended without a newline terminator")]
    MissingTerminator,

    #[error("reply exceeds {limit} bytes without a newline terminator")]
    LineTooLong { limit: usize },

    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

#[derive(Error, Debug)]
pub enum TcpTableError {
    #[error("Connection error: failed to connect to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out during {stage} after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("Validation failed: {0:#}")]
    Validation(anyhow::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TcpTableError {
    /// Round-trip step the error came from, if it came from one
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Connection { .. } => Some(Stage::Connect),
            Self::Io { stage, .. } | Self::Timeout { stage, .. } => Some(*stage),
            Self::Protocol(_) => Some(Stage::Read),
            Self::Validation(_) => Some(Stage::Validate),
            Self::InvalidRequest(_) | Self::InvalidConfig(_) => None,
        }
    }
}

pub type TcpTableResult<T> = Result<T, TcpTableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        let err = TcpTableError::Connection {
            endpoint: "127.0.0.1:1".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(err.stage(), Some(Stage::Connect));

        let err = TcpTableError::Timeout {
            stage: Stage::Write,
            after: Duration::from_millis(10),
        };
        assert_eq!(err.stage(), Some(Stage::Write));

        let err = TcpTableError::from(ProtocolViolation::EmptyReply);
        assert_eq!(err.stage(), Some(Stage::Read));

        let err = TcpTableError::Validation(anyhow::anyhow!("nope"));
        assert_eq!(err.stage(), Some(Stage::Validate));

        assert_eq!(TcpTableError::InvalidConfig("x".into()).stage(), None);
    }

    #[test]
    fn test_error_messages() {
        let err = TcpTableError::from(ProtocolViolation::LineTooLong { limit: 256 });
        assert_eq!(
            err.to_string(),
            "Protocol error: reply exceeds 256 bytes without a newline terminator"
        );

        let err = TcpTableError::Validation(anyhow::anyhow!("unexpected reply 500"));
        assert_eq!(err.to_string(), "Validation failed: unexpected reply 500");
    }
}
