use crate::executor::ExecutorConfig;
use crate::reply::{Reply, ReplyStatus};
use crate::request::{validate_endpoint, validate_key, Request};
use crate::validator::{expect_status, ResponseValidator};
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// tcptable-query - look up keys in a Postfix tcp_table server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// tcp_table server address (host:port)
    #[arg(
        short = 'e',
        long,
        env = "TCPTABLE_ENDPOINT",
        default_value = "127.0.0.1:10025"
    )]
    pub endpoint: String,

    /// Connection timeout in milliseconds
    #[arg(long, env = "TCPTABLE_CONNECT_TIMEOUT_MS", default_value = "5000")]
    pub connect_timeout_ms: u64,

    /// Write and read timeout in milliseconds
    #[arg(long, env = "TCPTABLE_IO_TIMEOUT_MS", default_value = "5000")]
    pub io_timeout_ms: u64,

    /// Longest accepted reply line in bytes, newline included
    #[arg(long, env = "TCPTABLE_MAX_REPLY_LEN", default_value = "256")]
    pub max_reply_len: usize,

    /// Reply status every lookup must return
    #[arg(long, value_enum, env = "TCPTABLE_EXPECT", default_value_t = Expect::Any)]
    pub expect: Expect,

    /// Keys to look up, one connection each
    #[arg(required = true)]
    pub keys: Vec<String>,
}

/// Expected reply status
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Any well-formed reply
    Any,
    /// 200
    Found,
    /// 500
    NotFound,
    /// 400
    TempFail,
}

impl Expect {
    #[must_use]
    pub fn status(self) -> Option<ReplyStatus> {
        match self {
            Self::Any => None,
            Self::Found => Some(ReplyStatus::Found),
            Self::NotFound => Some(ReplyStatus::NotFound),
            Self::TempFail => Some(ReplyStatus::TempFail),
        }
    }
}

impl ResponseValidator for Expect {
    fn validate(&self, request: &Request, response: &[u8]) -> anyhow::Result<()> {
        match self.status() {
            Some(status) => expect_status(status).validate(request, response),
            None => {
                Reply::parse(response)?;
                Ok(())
            }
        }
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_endpoint(&self.endpoint)?;

        for key in &self.keys {
            validate_key(key)?;
        }

        if self.connect_timeout_ms == 0 {
            anyhow::bail!("Connection timeout must be greater than 0");
        }

        if self.io_timeout_ms == 0 {
            anyhow::bail!("IO timeout must be greater than 0");
        }

        if self.max_reply_len == 0 {
            anyhow::bail!("Maximum reply length must be greater than 0");
        }

        Ok(())
    }

    /// Deadlines and bounds for the executor
    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            io_timeout: Duration::from_millis(self.io_timeout_ms),
            max_reply_len: self.max_reply_len,
        }
    }
}
