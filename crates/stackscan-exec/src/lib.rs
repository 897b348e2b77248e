//! stackscan-exec: SSH remote execution engine
//!
//! Connects to one target at a time, streams the collector payload to the
//! remote interpreter's stdin and relays the produced report back live.

pub mod auth;
pub mod error;
pub mod relay;
pub mod runner;
pub mod session;
pub mod target;
pub mod traits;

pub use auth::{ResolvedAuth, resolve_auth};
pub use error::ExecError;
pub use relay::StreamRelay;
pub use runner::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_EXEC_TIMEOUT, SshRunner};
pub use session::{ExecHandle, SshSession};
pub use target::{AuthMode, Secret, TargetSpec};
pub use traits::{ChannelEvent, ExecReport, ExecStream, LineSink, StdoutSink, TargetRunner};
