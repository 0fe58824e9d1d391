//! Server startup: logging and shutdown plumbing

pub mod logging;
pub mod shutdown;

pub use logging::{LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::shutdown_signal;
