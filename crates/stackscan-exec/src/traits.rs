//! Seam traits between the engine, the relay and the coordinator

use async_trait::async_trait;

use crate::error::ExecError;
use crate::target::TargetSpec;

/// One readiness event surfaced by an execution channel
#[derive(Debug)]
pub enum ChannelEvent {
    /// Primary-stream bytes
    Stdout(Vec<u8>),
    /// Error-stream bytes
    Stderr(Vec<u8>),
    /// Remote process exit status
    Exited(u32),
    /// Remote side finished sending output
    Eof,
    /// Channel torn down
    Closed,
}

/// Source of execution-channel events
///
/// Implemented by the live SSH channel; tests drive the relay with scripted
/// implementations instead.
#[async_trait]
pub trait ExecStream: Send {
    /// Wait for the next channel event
    async fn next_event(&mut self) -> Result<ChannelEvent, ExecError>;
}

/// Live sink for decoded output lines
///
/// Every line is handed over the moment it is complete, preserving the
/// interleaving an operator would see running the command by hand.
pub trait LineSink: Send {
    fn emit(&mut self, line: &str);
}

/// Sink that prints each line to stdout and flushes right away
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn emit(&mut self, line: &str) {
        use std::io::Write;
        println!("{line}");
        let _ = std::io::stdout().flush();
    }
}

/// What one target's execution produced, before persistence
#[derive(Debug)]
pub struct ExecReport {
    /// Everything relayed for this target, in emission order
    pub captured: String,
    /// Failure signal; `None` means the remote run completed
    pub error: Option<ExecError>,
    /// Remote exit status, when the process reported one
    pub exit_status: Option<u32>,
}

impl ExecReport {
    /// Whether the execution step completed without an engine failure
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the payload against one target end to end
#[async_trait]
pub trait TargetRunner: Send + Sync {
    /// Connect, execute and relay to completion; one attempt, no retries
    async fn run(&self, spec: &TargetSpec, payload: &[u8], sink: &mut dyn LineSink) -> ExecReport;
}
