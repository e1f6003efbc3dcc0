//! Low-level SSH transport built on the `russh` crate (the core's only SSH
//! backend — spec treats the transport as an external collaborator).
//!
//! This module owns nothing about device prompts or capture semantics;
//! [`crate::connector`] builds the per-host state machine on top of it.

use crate::error::{Error, Result};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::keys::key::PublicKey;
use russh::ChannelMsg;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

/// Host-key verification is intentionally absent: the devices this tool
/// backs up rarely have a stable, pre-seeded `known_hosts` entry, matching
/// the original's `known_hosts=None` connect option. Every server key is
/// accepted.
struct AcceptAllHostKeys;

#[async_trait]
impl client::Handler for AcceptAllHostKeys {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

fn russh_config(connect_timeout: Duration) -> Arc<client::Config> {
    let mut config = client::Config::default();
    config.inactivity_timeout = Some(connect_timeout);
    Arc::new(config)
}

/// An authenticated SSH connection to one device.
pub struct SshClient {
    handle: Handle<AcceptAllHostKeys>,
}

impl SshClient {
    /// Opens a TCP connection and performs the SSH handshake, over a plain
    /// TCP socket to `(host, port)`.
    pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let socket = timeout(connect_timeout, tokio::net::TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Timeout {
                phase: crate::error::Phase::Connect,
            })?
            .map_err(Error::Transport)?;
        socket.set_nodelay(true).ok();

        let handle = client::connect_stream(
            russh_config(connect_timeout),
            socket,
            AcceptAllHostKeys,
        )
        .await
        .map_err(|e| Error::Ssh(format!("handshake failed: {e}")))?;

        Ok(Self { handle })
    }

    /// Opens a TCP connection over an existing jump-host tunnel channel
    /// instead of a plain socket.
    pub async fn connect_via_tunnel<S>(stream: S, connect_timeout: Duration) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let handle = client::connect_stream(
            russh_config(connect_timeout),
            stream,
            AcceptAllHostKeys,
        )
        .await
        .map_err(|e| Error::Ssh(format!("handshake over tunnel failed: {e}")))?;
        Ok(Self { handle })
    }

    /// Attempts password authentication. Returns `Ok(false)` (not an error)
    /// when the server rejects the password — the credential-fallback loop
    /// decides what to do with that.
    pub async fn authenticate_password(&mut self, username: &str, password: &str) -> Result<bool> {
        self.handle
            .authenticate_password(username, password)
            .await
            .map_err(|e| Error::Ssh(format!("authentication request failed: {e}")))
    }

    /// Opens a `direct-tcpip` channel through this (jump-host) connection to
    /// `(target_host, target_port)`, to be handed to
    /// [`SshClient::connect_via_tunnel`] for the next hop.
    pub async fn open_tunnel(
        &self,
        target_host: &str,
        target_port: u16,
    ) -> Result<impl AsyncRead + AsyncWrite + Unpin + Send + 'static> {
        let channel = self
            .handle
            .channel_open_direct_tcpip(target_host, target_port as u32, "127.0.0.1", 0)
            .await
            .map_err(|e| Error::jump_host(format!("failed to open tunnel: {e}")))?;
        Ok(channel.into_stream())
    }

    /// Exec mode: a single remote-exec of `command`, returning combined
    /// stdout+stderr as a lossy-UTF-8 string. The OS timeout bounds the
    /// whole exec (the original doesn't; the redesign here does).
    pub async fn exec(&self, command: &str, deadline: Duration) -> Result<String> {
        let run = async {
            let mut channel = self
                .handle
                .channel_open_session()
                .await
                .map_err(|e| Error::Ssh(format!("failed to open channel: {e}")))?;
            channel
                .exec(true, command)
                .await
                .map_err(|e| Error::Ssh(format!("failed to exec command: {e}")))?;

            let mut output = Vec::new();
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { ref data } => output.extend_from_slice(data),
                    ChannelMsg::ExtendedData { ref data, .. } => output.extend_from_slice(data),
                    ChannelMsg::Close | ChannelMsg::Eof => break,
                    _ => {}
                }
            }
            Ok(String::from_utf8_lossy(&output).into_owned())
        };
        timeout(deadline, run).await.map_err(|_| Error::Timeout {
            phase: crate::error::Phase::Capture,
        })?
    }

    /// Opens an interactive pseudo-terminal shell session.
    pub async fn open_shell(&self, term: &str) -> Result<InteractiveSession> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Ssh(format!("failed to open channel: {e}")))?;
        channel
            .request_pty(false, term, 200, 50, 0, 0, &[])
            .await
            .map_err(|e| Error::Ssh(format!("failed to request pty: {e}")))?;
        channel
            .request_shell(true)
            .await
            .map_err(|e| Error::Ssh(format!("failed to request shell: {e}")))?;
        Ok(InteractiveSession { channel })
    }
}

/// An open interactive (pty) session, driven by [`crate::connector`]'s
/// wait-for-prompt / pre-capture / capture phases.
pub struct InteractiveSession {
    channel: russh::Channel<client::Msg>,
}

impl InteractiveSession {
    /// Writes a line (command) followed by `\n`.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let data = format!("{line}\n");
        self.channel
            .data(data.as_bytes())
            .await
            .map_err(|e| Error::Ssh(format!("failed to write to session: {e}")))
    }

    /// Reads channel data until `is_done` reports true on the accumulated
    /// buffer (e.g. a prompt regex matches), or `deadline` elapses.
    pub async fn read_until<F>(&mut self, deadline: Duration, mut is_done: F) -> Result<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mut buf = Vec::new();
        let run = async {
            loop {
                let text = String::from_utf8_lossy(&buf).into_owned();
                if is_done(&text) {
                    return Ok(text);
                }
                match self.channel.wait().await {
                    Some(ChannelMsg::Data { data }) => buf.extend_from_slice(&data),
                    Some(ChannelMsg::ExtendedData { data, .. }) => buf.extend_from_slice(&data),
                    Some(ChannelMsg::Close) | Some(ChannelMsg::Eof) | None => {
                        let text = String::from_utf8_lossy(&buf).into_owned();
                        if is_done(&text) {
                            return Ok(text);
                        }
                        return Err(Error::protocol("session closed before expected output"));
                    }
                    _ => {}
                }
            }
        };
        timeout(deadline, run).await.map_err(|_| Error::Timeout {
            phase: crate::error::Phase::Prompt,
        })?
    }

    pub async fn close(mut self) -> Result<()> {
        self.channel
            .eof()
            .await
            .map_err(|e| Error::Ssh(format!("failed to close session: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pty_request_uses_configured_term_type() {
        // Covered indirectly: open_shell always requests crate::consts::PTY_TERM_TYPE
        // from the connector; nothing to assert without a live server beyond
        // compiling the call shape, exercised by the connector's mock-based tests.
        assert_eq!(crate::consts::PTY_TERM_TYPE, "vt100");
    }
}
