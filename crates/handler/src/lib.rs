#![forbid(unsafe_code)]

mod authorization;
mod context;
mod dispatcher;
mod formatter;
mod gateway;
mod log;
mod metrics;
mod path_tracker;

pub mod auth;
pub mod handler;

pub use authorization::{is_allowed, Authorization};
pub use context::UserContext;
pub use dispatcher::Dispatcher;
pub use formatter::{error_record, format_error};
pub use gateway::{Gateway, GatewayBuilder, GatewayConfig, GatewayError};
pub use log::{LogAction, LogRecord, LogSink, MemorySink, RequestScope, TracingSink, TransportMeta};
pub use metrics::Metrics;
pub use path_tracker::PathTracker;
pub use rolegate_executor::{FormattedError, Request, Response};
