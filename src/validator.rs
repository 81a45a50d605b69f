use crate::reply::{Reply, ReplyStatus};
use crate::request::Request;

/// Judges whether a reply is acceptable for the request that produced it
///
/// Called exactly once per round trip that read a full line. The response has
/// its trailing newline removed. Any error rejects the reply and the executor
/// discards the bytes.
#[cfg_attr(test, mockall::automock)]
pub trait ResponseValidator: Send + Sync {
    /// Validate a response
    ///
    /// # Errors
    ///
    /// Returns an error describing why the response is not acceptable
    fn validate(&self, request: &Request, response: &[u8]) -> anyhow::Result<()>;
}

impl<F> ResponseValidator for F
where
    F: Fn(&Request, &[u8]) -> anyhow::Result<()> + Send + Sync,
{
    fn validate(&self, request: &Request, response: &[u8]) -> anyhow::Result<()> {
        self(request, response)
    }
}

/// Accept every reply
#[must_use]
pub fn accept_any() -> impl ResponseValidator {
    |_: &Request, _: &[u8]| -> anyhow::Result<()> { Ok(()) }
}

/// Accept replies whose raw bytes start with `prefix`
#[must_use]
pub fn expect_prefix(prefix: impl Into<Vec<u8>>) -> impl ResponseValidator {
    let prefix = prefix.into();
    move |request: &Request, response: &[u8]| -> anyhow::Result<()> {
        if response.starts_with(&prefix) {
            Ok(())
        } else {
            anyhow::bail!(
                "reply '{}' for key '{}' does not start with '{}'",
                String::from_utf8_lossy(response),
                request.key(),
                String::from_utf8_lossy(&prefix)
            )
        }
    }
}

/// Accept well-formed replies carrying `expected` as their status code
#[must_use]
pub fn expect_status(expected: ReplyStatus) -> impl ResponseValidator {
    move |request: &Request, response: &[u8]| -> anyhow::Result<()> {
        let reply = Reply::parse(response)?;
        if reply.status != expected {
            anyhow::bail!(
                "expected {} for key '{}', got {} {}",
                expected,
                request.key(),
                reply.status,
                reply.text_lossy()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::new("127.0.0.1:9000", "foo").unwrap()
    }

    #[test]
    fn test_accept_any() {
        let v = accept_any();
        assert!(v.validate(&request(), b"").is_ok());
        assert!(v.validate(&request(), b"garbage").is_ok());
    }

    #[test]
    fn test_expect_prefix() {
        let v = expect_prefix("200");
        assert!(v.validate(&request(), b"200 OK").is_ok());
        assert!(v.validate(&request(), b"500 error").is_err());
        assert!(v.validate(&request(), b"20").is_err());
    }

    #[test]
    fn test_expect_prefix_message_names_key() {
        let err = expect_prefix("200")
            .validate(&request(), b"500 error")
            .unwrap_err();
        assert!(err.to_string().contains("'foo'"));
    }

    #[test]
    fn test_expect_status() {
        let found = expect_status(ReplyStatus::Found);
        assert!(found.validate(&request(), b"200 value").is_ok());
        assert!(found.validate(&request(), b"500 missing").is_err());
        assert!(found.validate(&request(), b"not a reply").is_err());

        let missing = expect_status(ReplyStatus::NotFound);
        assert!(missing.validate(&request(), b"500 missing").is_ok());
        assert!(missing.validate(&request(), b"400 try later").is_err());
    }

    #[test]
    fn test_closure_validator() {
        let v = |req: &Request, resp: &[u8]| -> anyhow::Result<()> {
            anyhow::ensure!(resp.ends_with(req.key().as_bytes()), "key not echoed");
            Ok(())
        };
        assert!(v.validate(&request(), b"200 foo").is_ok());
        assert!(v.validate(&request(), b"200 bar").is_err());
    }
}
