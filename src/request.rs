use crate::error::{TcpTableError, TcpTableResult};

/// Maximum length for a lookup key
const MAX_KEY_LEN: usize = 4096;
/// Maximum length for an endpoint
const MAX_ENDPOINT_LEN: usize = 261;

/// A single `tcp_table` lookup
///
/// The key goes on the wire unchanged, so it must already be in the form the
/// server expects. Postfix never sends partial keys (domains without their
/// subdomains, addresses without the localpart, ...) and neither should a
/// caller replaying its traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    endpoint: String,
    key: String,
}

impl Request {
    /// Create a request after checking the endpoint and key
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the endpoint is not `host:port` or the key
    /// contains whitespace, control or non-ASCII characters
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> TcpTableResult<Self> {
        let endpoint = endpoint.into();
        let key = key.into();

        validate_endpoint(&endpoint)?;
        validate_key(&key)?;

        Ok(Self { endpoint, key })
    }

    /// TCP peer as `host:port`
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Lookup key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Request line as sent to the server: `get SPACE key NEWLINE`
    #[must_use]
    pub fn wire_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.key.len() + 5);
        line.extend_from_slice(b"get ");
        line.extend_from_slice(self.key.as_bytes());
        line.push(b'\n');
        line
    }
}

/// Validate a lookup key
///
/// # Errors
///
/// Returns `InvalidRequest` if the key is empty, too long, or would break the
/// single-line request format
pub fn validate_key(key: &str) -> TcpTableResult<()> {
    if key.is_empty() {
        return Err(TcpTableError::InvalidRequest(
            "Key cannot be empty".to_string(),
        ));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(TcpTableError::InvalidRequest(format!(
            "Key exceeds maximum length of {MAX_KEY_LEN}"
        )));
    }

    if !key.is_ascii() {
        return Err(TcpTableError::InvalidRequest(
            "Key must be ASCII".to_string(),
        ));
    }

    // Whitespace separates request parameters, and newline ends the request
    if key
        .bytes()
        .any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
    {
        return Err(TcpTableError::InvalidRequest(
            "Key contains whitespace or control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate endpoint format (`host:port` or `[v6-address]:port`)
///
/// # Errors
///
/// Returns `InvalidRequest` if the host is missing or malformed, or the port
/// is not a valid `u16`
pub fn validate_endpoint(endpoint: &str) -> TcpTableResult<()> {
    let invalid = |reason: &str| {
        Err(TcpTableError::InvalidRequest(format!(
            "Invalid endpoint '{endpoint}': {reason}"
        )))
    };

    if endpoint.len() > MAX_ENDPOINT_LEN {
        return invalid("too long");
    }

    let Some((host, port)) = endpoint.rsplit_once(':') else {
        return invalid("expected host:port");
    };

    let host = match host.strip_prefix('[') {
        Some(inner) => match inner.strip_suffix(']') {
            Some(v6) if v6.contains(':') => v6,
            _ => return invalid("unbalanced or empty IPv6 brackets"),
        },
        None if host.contains(':') => return invalid("IPv6 hosts must be bracketed"),
        None => host,
    };

    if host.is_empty() {
        return invalid("host cannot be empty");
    }

    if host
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '[' | ']'))
    {
        return invalid("host contains invalid characters");
    }

    if port.parse::<u16>().is_err() {
        return invalid("port must be a number between 0 and 65535");
    }

    Ok(())
}
