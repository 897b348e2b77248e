//! Incremental line relay over the execution channel
//!
//! Turns the raw byte stream into ordered text lines. Primary-stream lines
//! are echoed the moment they complete, error-stream content is held back
//! until the primary stream is drained, and the remote exit status is
//! reconciled with end-of-stream before the pump returns.

use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::error::ExecError;
use crate::traits::{ChannelEvent, ExecStream, LineSink};

/// Marker prefixed to relayed error-stream content
const STDERR_PREFIX: &str = "\n⚠️  stderr: ";

/// Relays one remote command's output to a live sink
///
/// The transcript stays on the relay after the pump finishes, so a caller
/// can persist whatever was captured even when the pump failed.
pub struct StreamRelay {
    timeout: Duration,
    /// Bytes of the current, not yet terminated line
    pending: Vec<u8>,
    /// Error-stream bytes, held until the primary stream is drained
    stderr: Vec<u8>,
    /// Lines captured for the artifact, in emission order
    lines: Vec<String>,
    exit_status: Option<u32>,
}

impl StreamRelay {
    /// Create a relay enforcing `timeout` over the whole execution
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: Vec::new(),
            stderr: Vec::new(),
            lines: Vec::new(),
            exit_status: None,
        }
    }

    /// Pump `stream` to completion, echoing lines into `sink` as they arrive
    ///
    /// Returns the remote exit status when the process reported one. All
    /// event waits share one deadline; once it passes the pump aborts with
    /// `ExecError::Timeout`, leaving the lines captured so far on the relay.
    ///
    /// # Errors
    /// Returns `Timeout` when the remote run outlives the bound, or any
    /// error surfaced by the underlying stream.
    pub async fn pump(
        &mut self,
        stream: &mut dyn ExecStream,
        sink: &mut dyn LineSink,
    ) -> Result<Option<u32>, ExecError> {
        let deadline = Instant::now() + self.timeout;
        let mut eof = false;

        loop {
            let event = match timeout_at(deadline, stream.next_event()).await {
                Ok(Ok(event)) => event,
                Ok(Err(e)) => {
                    // Salvage buffered output before surfacing the failure
                    self.finish(sink);
                    return Err(e);
                }
                Err(_) => {
                    self.finish(sink);
                    return Err(ExecError::Timeout {
                        timeout: self.timeout,
                    });
                }
            };

            match event {
                ChannelEvent::Stdout(bytes) => self.push_primary(&bytes, sink),
                ChannelEvent::Stderr(bytes) => self.stderr.extend_from_slice(&bytes),
                ChannelEvent::Exited(status) => {
                    self.exit_status = Some(status);
                    if eof {
                        break;
                    }
                }
                ChannelEvent::Eof => {
                    eof = true;
                    if self.exit_status.is_some() {
                        break;
                    }
                }
                ChannelEvent::Closed => break,
            }
        }

        self.finish(sink);

        debug!(
            lines = self.lines.len(),
            exit_status = ?self.exit_status,
            "stream drained"
        );

        Ok(self.exit_status)
    }

    /// Buffer primary-stream bytes and emit every line they complete
    fn push_primary(&mut self, bytes: &[u8], sink: &mut dyn LineSink) {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let rest = self.pending.split_off(pos + 1);
            self.pending.pop();
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending = rest;
            sink.emit(&line);
            self.lines.push(line);
        }
    }

    /// Flush the trailing partial line, then the held-back error stream
    fn finish(&mut self, sink: &mut dyn LineSink) {
        if !self.pending.is_empty() {
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            sink.emit(&line);
            self.lines.push(line);
        }
        if !self.stderr.is_empty() {
            let text = String::from_utf8_lossy(&self.stderr).into_owned();
            self.stderr.clear();
            let line = format!("{STDERR_PREFIX}{text}");
            sink.emit(&line);
            self.lines.push(line);
        }
    }

    /// Everything captured so far, one entry per emitted line
    #[must_use]
    pub fn transcript(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::*;

    /// Scripted event source; `Delay` pauses between events and an empty
    /// script hangs forever like a wedged remote
    enum Step {
        Delay(Duration),
        Event(ChannelEvent),
    }

    struct ScriptedStream {
        steps: VecDeque<Step>,
    }

    impl ScriptedStream {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    #[async_trait]
    impl ExecStream for ScriptedStream {
        async fn next_event(&mut self) -> Result<ChannelEvent, ExecError> {
            loop {
                match self.steps.pop_front() {
                    Some(Step::Delay(d)) => tokio::time::sleep(d).await,
                    Some(Step::Event(event)) => return Ok(event),
                    None => std::future::pending::<()>().await,
                }
            }
        }
    }

    /// Sink recording every emitted line with its arrival instant
    #[derive(Default)]
    struct RecordingSink {
        emitted: Vec<(String, Instant)>,
    }

    impl RecordingSink {
        fn lines(&self) -> Vec<&str> {
            self.emitted.iter().map(|(line, _)| line.as_str()).collect()
        }
    }

    impl LineSink for RecordingSink {
        fn emit(&mut self, line: &str) {
            self.emitted.push((line.to_string(), Instant::now()));
        }
    }

    fn stdout(bytes: &[u8]) -> Step {
        Step::Event(ChannelEvent::Stdout(bytes.to_vec()))
    }

    fn stderr(bytes: &[u8]) -> Step {
        Step::Event(ChannelEvent::Stderr(bytes.to_vec()))
    }

    fn ended(status: u32) -> Vec<Step> {
        vec![
            Step::Event(ChannelEvent::Eof),
            Step::Event(ChannelEvent::Exited(status)),
        ]
    }

    #[tokio::test]
    async fn splits_lines_across_chunk_boundaries() {
        let mut steps = vec![stdout(b"line1\nline"), stdout(b"2\n")];
        steps.extend(ended(0));
        let mut stream = ScriptedStream::new(steps);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_secs(5));

        let status = relay.pump(&mut stream, &mut sink).await.unwrap();

        assert_eq!(status, Some(0));
        assert_eq!(sink.lines(), ["line1", "line2"]);
        assert_eq!(relay.transcript(), "line1\nline2");
    }

    #[tokio::test]
    async fn echoes_lines_as_they_arrive() {
        let mut steps = vec![
            stdout(b"first\n"),
            Step::Delay(Duration::from_millis(50)),
            stdout(b"second\n"),
        ];
        steps.extend(ended(0));
        let mut stream = ScriptedStream::new(steps);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_secs(5));

        relay.pump(&mut stream, &mut sink).await.unwrap();

        assert_eq!(sink.lines(), ["first", "second"]);
        let gap = sink.emitted[1].1.duration_since(sink.emitted[0].1);
        assert!(
            gap >= Duration::from_millis(40),
            "second line must not be emitted before its bytes arrive, gap {gap:?}"
        );
    }

    #[tokio::test]
    async fn holds_error_stream_until_primary_is_drained() {
        let mut steps = vec![
            stderr(b"warning: something odd\n"),
            stdout(b"report line 1\n"),
            stdout(b"report line 2\n"),
        ];
        steps.extend(ended(1));
        let mut stream = ScriptedStream::new(steps);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_secs(5));

        let status = relay.pump(&mut stream, &mut sink).await.unwrap();

        assert_eq!(status, Some(1));
        let lines = sink.lines();
        assert_eq!(lines[0], "report line 1");
        assert_eq!(lines[1], "report line 2");
        assert_eq!(lines[2], "\n⚠️  stderr: warning: something odd\n");
    }

    #[tokio::test]
    async fn aborts_when_the_remote_never_completes() {
        let started = Instant::now();
        let mut stream = ScriptedStream::new(vec![stdout(b"tick\n")]);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_millis(100));

        let err = relay.pump(&mut stream, &mut sink).await.unwrap_err();

        assert!(matches!(err, ExecError::Timeout { .. }));
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_millis(100) && elapsed < Duration::from_secs(2),
            "pump must stop close to the deadline, took {elapsed:?}"
        );
        // Partial transcript survives the abort
        assert_eq!(relay.transcript(), "tick");
    }

    #[tokio::test]
    async fn replaces_malformed_utf8_instead_of_failing() {
        let mut steps = vec![stdout(&[0xff, 0xfe, b'o', b'k', b'\n'])];
        steps.extend(ended(0));
        let mut stream = ScriptedStream::new(steps);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_secs(5));

        relay.pump(&mut stream, &mut sink).await.unwrap();

        assert_eq!(sink.lines(), ["\u{fffd}\u{fffd}ok"]);
    }

    #[tokio::test]
    async fn flushes_a_trailing_partial_line() {
        let mut steps = vec![stdout(b"no trailing newline")];
        steps.extend(ended(0));
        let mut stream = ScriptedStream::new(steps);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_secs(5));

        relay.pump(&mut stream, &mut sink).await.unwrap();

        assert_eq!(sink.lines(), ["no trailing newline"]);
    }

    #[tokio::test]
    async fn reconciles_exit_status_and_eof_in_either_order() {
        let mut stream = ScriptedStream::new(vec![
            stdout(b"a\n"),
            Step::Event(ChannelEvent::Exited(3)),
            Step::Event(ChannelEvent::Eof),
        ]);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_secs(5));
        let status = relay.pump(&mut stream, &mut sink).await.unwrap();
        assert_eq!(status, Some(3));

        let mut stream = ScriptedStream::new(vec![
            stdout(b"b\n"),
            Step::Event(ChannelEvent::Eof),
            Step::Event(ChannelEvent::Exited(4)),
        ]);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_secs(5));
        let status = relay.pump(&mut stream, &mut sink).await.unwrap();
        assert_eq!(status, Some(4));
    }

    #[tokio::test]
    async fn tolerates_teardown_without_exit_status() {
        let mut stream = ScriptedStream::new(vec![
            stdout(b"cut short\n"),
            Step::Event(ChannelEvent::Closed),
        ]);
        let mut sink = RecordingSink::default();
        let mut relay = StreamRelay::new(Duration::from_secs(5));

        let status = relay.pump(&mut stream, &mut sink).await.unwrap();

        assert_eq!(status, None);
        assert_eq!(sink.lines(), ["cut short"]);
    }
}
