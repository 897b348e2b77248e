//! Error types for stackscan-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running the payload on one target
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to reach the remote host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection attempt exceeded the connect timeout
    #[error("connection timed out after {timeout:?}")]
    ConnectTimeout {
        /// Timeout that was exceeded
        timeout: Duration,
    },

    /// Authentication was rejected or could not be attempted
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// SSH key could not be loaded
    #[error("SSH key error: {0}")]
    KeyError(String),

    /// Execution channel could not be opened
    #[error("failed to open execution channel: {0}")]
    ChannelOpen(String),

    /// Remote side refused to start the command
    #[error("remote command rejected")]
    ExecRejected,

    /// Remote process did not finish within the execution timeout
    #[error("execution timed out after {timeout:?}")]
    Timeout {
        /// Timeout that was exceeded
        timeout: Duration,
    },

    /// I/O error on the execution channel
    #[error("I/O error: {0}")]
    Io(String),
}

impl ExecError {
    /// Whether the failure happened before the remote command started
    #[must_use]
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            ExecError::ConnectionFailed(_)
                | ExecError::ConnectTimeout { .. }
                | ExecError::AuthenticationFailed(_)
                | ExecError::KeyError(_)
        )
    }
}
