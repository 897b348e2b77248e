//! End-to-end execution of the payload on a single target

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument};

use crate::auth::resolve_auth;
use crate::error::ExecError;
use crate::relay::StreamRelay;
use crate::session::SshSession;
use crate::target::TargetSpec;
use crate::traits::{ExecReport, LineSink, TargetRunner};

/// Default bound on connection establishment
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default bound on one remote execution; some payload sections are slow
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(120);

/// SSH-backed [`TargetRunner`]
///
/// One connection attempt and one remote command per target. Failures are
/// reported through the returned [`ExecReport`], never retried.
pub struct SshRunner {
    command: String,
    connect_timeout: Duration,
    exec_timeout: Duration,
}

impl SshRunner {
    /// Create a runner invoking `command` on every target
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
        }
    }

    /// Override the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the execution timeout
    #[must_use]
    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout = timeout;
        self
    }

    /// Echo the failure marker and fold it into the captured transcript
    fn fail(error: ExecError, transcript: String, sink: &mut dyn LineSink) -> ExecReport {
        let marker = format!("  ❌ {error}");
        sink.emit(&marker);
        let captured = if transcript.is_empty() {
            marker
        } else {
            format!("{transcript}\n{marker}")
        };
        ExecReport {
            captured,
            error: Some(error),
            exit_status: None,
        }
    }
}

#[async_trait]
impl TargetRunner for SshRunner {
    #[instrument(skip(self, payload, sink), fields(host = %spec.host, target = %spec.name))]
    async fn run(&self, spec: &TargetSpec, payload: &[u8], sink: &mut dyn LineSink) -> ExecReport {
        let auth = match resolve_auth(spec) {
            Ok(auth) => auth,
            Err(e) => {
                error!(host = %spec.host, error = %e, "credential resolution failed");
                return Self::fail(e, String::new(), sink);
            }
        };

        let mut session = match SshSession::connect(spec, auth, self.connect_timeout).await {
            Ok(session) => session,
            Err(e) => {
                error!(host = %spec.host, error = %e, "connection failed");
                return Self::fail(e, String::new(), sink);
            }
        };

        let mut relay = StreamRelay::new(self.exec_timeout);
        let outcome = match session.execute(&self.command, payload.to_vec()).await {
            Ok(mut handle) => relay.pump(&mut handle, sink).await,
            Err(e) => Err(e),
        };

        // One close per successful connect, on every path
        if let Err(e) = session.close().await {
            debug!(host = %spec.host, error = %e, "disconnect failed");
        }

        match outcome {
            Ok(exit_status) => {
                info!(host = %spec.host, exit_status = ?exit_status, "remote run completed");
                ExecReport {
                    captured: relay.transcript(),
                    error: None,
                    exit_status,
                }
            }
            Err(e) => {
                error!(host = %spec.host, error = %e, "execution failed");
                Self::fail(e, relay.transcript(), sink)
            }
        }
    }
}
