//! SSH session management using russh crate

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{Channel, ChannelMsg, Disconnect, client};
use tokio::io::AsyncReadExt;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::auth::ResolvedAuth;
use crate::error::ExecError;
use crate::target::TargetSpec;
use crate::traits::{ChannelEvent, ExecStream};

/// Payload bytes written to the remote stdin per channel turn
const INPUT_CHUNK: usize = 4096;

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Accept all server keys (like StrictHostKeyChecking=no); host
        // identities are not checked against known_hosts
        Ok(true)
    }
}

/// One authenticated SSH connection to one target
///
/// Carries exactly one remote command and is then closed; not meant for
/// concurrent reuse.
pub struct SshSession {
    handle: client::Handle<SshClientHandler>,
    host: String,
}

impl SshSession {
    /// Connect to the target and authenticate
    ///
    /// A single attempt bounded by `connect_timeout`; retrying is the
    /// caller's decision.
    ///
    /// # Errors
    /// Returns `ConnectTimeout`, `ConnectionFailed`, `KeyError` or
    /// `AuthenticationFailed` depending on the phase that fails.
    #[instrument(skip(spec, auth), fields(host = %spec.host, port = spec.port))]
    pub async fn connect(
        spec: &TargetSpec,
        auth: ResolvedAuth,
        connect_timeout: Duration,
    ) -> Result<Self, ExecError> {
        info!(
            host = %spec.host,
            port = spec.port,
            user = %spec.user,
            "connecting to SSH"
        );

        let config = client::Config::default();
        let config = Arc::new(config);

        let handler = SshClientHandler;

        let mut session = timeout(
            connect_timeout,
            client::connect(config, (&spec.host[..], spec.port), handler),
        )
        .await
        .map_err(|_| ExecError::ConnectTimeout {
            timeout: connect_timeout,
        })?
        .map_err(|e| ExecError::ConnectionFailed(e.to_string()))?;

        match auth {
            ResolvedAuth::Key { path, passphrase } => {
                let key_pair =
                    load_secret_key(&path, passphrase.as_ref().map(|secret| secret.expose()))
                        .map_err(|e| ExecError::KeyError(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                let auth_res = session
                    .authenticate_publickey(
                        &spec.user,
                        PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
                    )
                    .await
                    .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

                if !auth_res.success() {
                    return Err(ExecError::AuthenticationFailed(
                        "public key authentication rejected".to_string(),
                    ));
                }
            }
            ResolvedAuth::Password(password) => {
                let auth_res = session
                    .authenticate_password(&spec.user, password.expose())
                    .await
                    .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

                if !auth_res.success() {
                    return Err(ExecError::AuthenticationFailed(
                        "password authentication rejected".to_string(),
                    ));
                }
            }
        }

        info!(host = %spec.host, "SSH connected and authenticated");

        Ok(Self {
            handle: session,
            host: spec.host.clone(),
        })
    }

    /// Open an execution channel, start `command` and hand back the live
    /// channel together with the payload still to be delivered
    ///
    /// # Errors
    /// Returns `ChannelOpen` when the channel cannot be opened or the
    /// command cannot be issued.
    #[instrument(skip(self, payload), fields(host = %self.host))]
    pub async fn execute(
        &mut self,
        command: &str,
        payload: Vec<u8>,
    ) -> Result<ExecHandle, ExecError> {
        debug!(command = %command, payload_len = payload.len(), "opening execution channel");

        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| ExecError::ChannelOpen(e.to_string()))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| ExecError::ChannelOpen(e.to_string()))?;

        Ok(ExecHandle::new(channel, payload))
    }

    /// Release the transport
    ///
    /// # Errors
    /// Returns `Io` when the disconnect cannot be sent.
    pub async fn close(self) -> Result<(), ExecError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| ExecError::Io(e.to_string()))?;
        debug!(host = %self.host, "SSH disconnected");
        Ok(())
    }
}

/// Handle for one in-flight remote command
///
/// Owns the execution channel plus the unsent payload. Events are surfaced
/// one at a time; between events the handle feeds the payload to the remote
/// stdin in bounded chunks, so the write side and the read side make
/// progress together even when the remote emits output before its input is
/// complete.
pub struct ExecHandle {
    channel: Channel<client::Msg>,
    payload: Cursor<Vec<u8>>,
    input_done: bool,
}

impl ExecHandle {
    fn new(channel: Channel<client::Msg>, payload: Vec<u8>) -> Self {
        Self {
            channel,
            payload: Cursor::new(payload),
            input_done: false,
        }
    }
}

#[async_trait]
impl ExecStream for ExecHandle {
    async fn next_event(&mut self) -> Result<ChannelEvent, ExecError> {
        let mut chunk = [0u8; INPUT_CHUNK];
        loop {
            tokio::select! {
                read = self.payload.read(&mut chunk), if !self.input_done => {
                    match read {
                        Ok(0) => {
                            // Payload fully written: half-close so the remote
                            // sees EOF on stdin while output keeps flowing
                            self.channel
                                .eof()
                                .await
                                .map_err(|e| ExecError::Io(e.to_string()))?;
                            self.input_done = true;
                            debug!("payload delivered, stdin half-closed");
                        }
                        Ok(n) => {
                            self.channel
                                .data(&chunk[..n])
                                .await
                                .map_err(|e| ExecError::Io(e.to_string()))?;
                        }
                        Err(e) => return Err(ExecError::Io(e.to_string())),
                    }
                }
                msg = self.channel.wait() => {
                    let event = match msg {
                        Some(ChannelMsg::Data { data }) => ChannelEvent::Stdout(data.to_vec()),
                        Some(ChannelMsg::ExtendedData { data, ext }) if ext == 1 => {
                            ChannelEvent::Stderr(data.to_vec())
                        }
                        Some(ChannelMsg::ExitStatus { exit_status }) => {
                            ChannelEvent::Exited(exit_status)
                        }
                        Some(ChannelMsg::Eof) => ChannelEvent::Eof,
                        Some(ChannelMsg::Failure) => return Err(ExecError::ExecRejected),
                        None => ChannelEvent::Closed,
                        // Success replies, window adjustments and other
                        // extended streams carry nothing for the relay
                        Some(_) => continue,
                    };
                    return Ok(event);
                }
            }
        }
    }
}
