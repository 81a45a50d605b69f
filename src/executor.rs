// Allow module inception - this is a common Rust pattern for protocol clients
#![allow(clippy::module_name_repetitions)]

use crate::error::{Stage, TcpTableError, TcpTableResult};
use crate::reply;
use crate::request::Request;
use crate::validator::ResponseValidator;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Default deadline for establishing a connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default deadline for each of the write and read steps
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);
/// Default ceiling on a reply line, terminator included.
///
/// `tcp_table` replies are single short lines, and the protocol itself sets no
/// limit. This bound only keeps a misbehaving server from making a call
/// buffer without end.
pub const DEFAULT_MAX_REPLY_LEN: usize = 256;

/// Boxed future returned by [`TcpTableExecutor::into_fn`]
pub type LookupFuture = Pin<Box<dyn Future<Output = TcpTableResult<Vec<u8>>> + Send>>;

/// Contract between a request driver and a per-request execution strategy
///
/// The driver calls `execute` once per request, possibly from many tasks at
/// once, and records the outcome. `seq_id` is whatever sequence number the
/// driver assigns.
pub trait RequestExecutor: Send + Sync {
    type Request;
    type Response;
    type Error;

    /// Perform one request
    fn execute(
        &self,
        seq_id: u64,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send;
}

/// Opens the byte stream a lookup runs over
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connect to `endpoint` (`host:port`)
    fn connect(&self, endpoint: &str) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plain TCP, one fresh connection per lookup
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &str) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(endpoint).await?;
        // One short request line, no reason to wait for Nagle
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Deadlines and bounds applied to every lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
    pub max_reply_len: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            max_reply_len: DEFAULT_MAX_REPLY_LEN,
        }
    }
}

impl ExecutorConfig {
    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a timeout is zero or the reply bound is zero
    pub fn validate(&self) -> TcpTableResult<()> {
        if self.connect_timeout.is_zero() {
            return Err(TcpTableError::InvalidConfig(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.io_timeout.is_zero() {
            return Err(TcpTableError::InvalidConfig(
                "IO timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_reply_len == 0 {
            return Err(TcpTableError::InvalidConfig(
                "Maximum reply length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Create an executor with the default deadlines over plain TCP
#[must_use]
pub fn create_executor<V: ResponseValidator>(validator: V) -> TcpTableExecutor<V> {
    TcpTableExecutor {
        validator: Arc::new(validator),
        connector: Arc::new(TcpConnector),
        config: ExecutorConfig::default(),
    }
}

/// `tcp_table` lookup executor
///
/// Holds no connection and no mutable state. Clones share the validator and
/// connector, so one executor can serve any number of concurrent lookups.
pub struct TcpTableExecutor<V, C = TcpConnector> {
    validator: Arc<V>,
    connector: Arc<C>,
    config: ExecutorConfig,
}

impl<V, C> Clone for TcpTableExecutor<V, C> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
            connector: Arc::clone(&self.connector),
            config: self.config,
        }
    }
}

impl<V: ResponseValidator> TcpTableExecutor<V> {
    /// Create an executor over plain TCP with explicit deadlines
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation
    pub fn with_config(validator: V, config: ExecutorConfig) -> TcpTableResult<Self> {
        Self::with_connector(validator, config, TcpConnector)
    }
}

impl<V: ResponseValidator, C: Connector> TcpTableExecutor<V, C> {
    /// Create an executor that opens its streams through `connector`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation
    pub fn with_connector(
        validator: V,
        config: ExecutorConfig,
        connector: C,
    ) -> TcpTableResult<Self> {
        config.validate()?;
        Ok(Self {
            validator: Arc::new(validator),
            connector: Arc::new(connector),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Perform one lookup round trip
    ///
    /// Dials the endpoint, sends `get <key>\n`, reads one reply line, strips
    /// its newline and hands it to the validator. The connection belongs to
    /// this call alone and is closed before the call returns, whatever the
    /// outcome. Dropping the returned future closes it as well.
    ///
    /// # Errors
    ///
    /// - `Connection` if the dial fails
    /// - `Timeout` if connect, write or read exceeds its deadline
    /// - `Io` if the write or read fails
    /// - `Protocol` if the reply is empty, unterminated or too long
    /// - `Validation` if the validator rejects the reply
    pub async fn lookup(&self, seq_id: u64, request: &Request) -> TcpTableResult<Vec<u8>> {
        let ExecutorConfig {
            connect_timeout,
            io_timeout,
            max_reply_len,
        } = self.config;

        debug!(
            "Lookup #{} of key '{}' at {}",
            seq_id,
            request.key(),
            request.endpoint()
        );

        let connect = self.connector.connect(request.endpoint());
        let stream = tokio::time::timeout(connect_timeout, connect)
            .await
            .map_err(|_| TcpTableError::Timeout {
                stage: Stage::Connect,
                after: connect_timeout,
            })?
            .map_err(|source| TcpTableError::Connection {
                endpoint: request.endpoint().to_string(),
                source,
            })?;

        let mut stream = BufReader::new(stream);

        let line = request.wire_line();
        tokio::time::timeout(io_timeout, async {
            stream.write_all(&line).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| TcpTableError::Timeout {
            stage: Stage::Write,
            after: io_timeout,
        })?
        .map_err(|source| TcpTableError::Io {
            stage: Stage::Write,
            source,
        })?;

        let read = reply::read_line(&mut stream, max_reply_len);
        let response = tokio::time::timeout(io_timeout, read)
            .await
            .map_err(|_| TcpTableError::Timeout {
                stage: Stage::Read,
                after: io_timeout,
            })??;

        // Done with the peer; release it before running caller code
        drop(stream);

        debug!("Lookup #{} received {} bytes", seq_id, response.len());

        self.validator
            .validate(request, &response)
            .map_err(TcpTableError::Validation)?;

        Ok(response)
    }
}

impl<V, C> TcpTableExecutor<V, C>
where
    V: ResponseValidator + 'static,
    C: Connector + 'static,
{
    /// Turn the executor into a plain `(seq_id, request) -> future` function
    /// for drivers that take closures rather than a [`RequestExecutor`]
    pub fn into_fn(self) -> impl Fn(u64, Request) -> LookupFuture + Clone + Send + Sync {
        move |seq_id: u64, request: Request| -> LookupFuture {
            let executor = self.clone();
            Box::pin(async move { executor.lookup(seq_id, &request).await })
        }
    }
}

impl<V: ResponseValidator, C: Connector> RequestExecutor for TcpTableExecutor<V, C> {
    type Request = Request;
    type Response = Vec<u8>;
    type Error = TcpTableError;

    fn execute(
        &self,
        seq_id: u64,
        request: Request,
    ) -> impl Future<Output = TcpTableResult<Vec<u8>>> + Send {
        async move { self.lookup(seq_id, &request).await }
    }
}
