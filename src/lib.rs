// Public exports for library usage
pub mod config;
pub mod error;
pub mod executor;
pub mod reply;
pub mod request;
pub mod validator;

pub use error::{ProtocolViolation, Stage, TcpTableError, TcpTableResult};
pub use executor::{
    create_executor, Connector, ExecutorConfig, RequestExecutor, TcpConnector, TcpTableExecutor,
};
pub use reply::{Reply, ReplyStatus};
pub use request::Request;
pub use validator::ResponseValidator;
