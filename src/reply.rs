//! Reply framing and parsing for `tcp_table(5)`
//!
//! The server answers with exactly one line. The executor only needs the raw
//! line; [`Reply`] is for validators and tools that want the status code and
//! the decoded text.

use crate::error::{ProtocolViolation, Stage, TcpTableError, TcpTableResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// `<code> SPACE <text>`, where text may be empty or absent
static REPLY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{3})(?: (.*))?$").expect("reply pattern is valid"));

/// Read one newline-terminated line of at most `max_len` bytes, terminator
/// included, and return it without the terminator.
///
/// Anything the server sends after the first newline is left unread.
///
/// # Errors
///
/// - `Io` if the underlying read fails
/// - `Protocol(EmptyReply)` if the peer closed before sending anything
/// - `Protocol(MissingTerminator)` if the peer closed mid-line
/// - `Protocol(LineTooLong)` if no newline arrived within `max_len` bytes
pub async fn read_line<R>(reader: &mut R, max_len: usize) -> TcpTableResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(max_len.min(512));
    let limit = u64::try_from(max_len).unwrap_or(u64::MAX);

    let read = reader
        .take(limit)
        .read_until(b'\n', &mut line)
        .await
        .map_err(|source| TcpTableError::Io {
            stage: Stage::Read,
            source,
        })?;

    if read == 0 {
        return Err(ProtocolViolation::EmptyReply.into());
    }

    if line.last() == Some(&b'\n') {
        line.pop();
        return Ok(line);
    }

    if line.len() >= max_len {
        Err(ProtocolViolation::LineTooLong { limit: max_len }.into())
    } else {
        Err(ProtocolViolation::MissingTerminator.into())
    }
}

/// Status code of a `tcp_table` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    /// 200: the key was found, text is the value
    Found,
    /// 400: the server hit a temporary error, text is the reason
    TempFail,
    /// 500: the key was not found, text is the reason
    NotFound,
}

impl ReplyStatus {
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Found => 200,
            Self::TempFail => 400,
            Self::NotFound => 500,
        }
    }

    /// Map a numeric code to a status
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Self::Found),
            400 => Some(Self::TempFail),
            500 => Some(Self::NotFound),
            _ => None,
        }
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A parsed reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: ReplyStatus,
    /// Reply text with `%XX` escapes decoded
    pub text: Vec<u8>,
}

impl Reply {
    /// Parse a reply line (terminator already removed)
    ///
    /// # Errors
    ///
    /// Returns `Protocol(MalformedReply)` if the line is not ASCII, has no
    /// three-digit code, uses an unknown code, or contains a broken `%XX`
    /// escape
    pub fn parse(line: &[u8]) -> TcpTableResult<Self> {
        let line = std::str::from_utf8(line)
            .ok()
            .filter(|s| s.is_ascii())
            .ok_or_else(|| malformed("reply is not ASCII".to_string()))?;

        let captures = REPLY_PATTERN
            .captures(line)
            .ok_or_else(|| malformed(format!("expected '<code> <text>', got '{line}'")))?;

        let code: u16 = captures[1]
            .parse()
            .map_err(|_| malformed(format!("invalid status code '{}'", &captures[1])))?;

        let status = ReplyStatus::from_code(code)
            .ok_or_else(|| malformed(format!("unknown status code {code}")))?;

        let text = decode(captures.get(2).map_or("", |m| m.as_str()))?;

        Ok(Self { status, text })
    }

    /// Decoded text as a string, replacing bytes that are not UTF-8
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// Decode `%XX` escapes
///
/// # Errors
///
/// Returns `Protocol(MalformedReply)` on a truncated or non-hex escape
pub fn decode(text: &str) -> TcpTableResult<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| malformed(format!("bad escape at offset {i}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Ok(out)
}

fn malformed(reason: String) -> TcpTableError {
    ProtocolViolation::MalformedReply(reason).into()
}
