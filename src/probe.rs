//! TCP reachability probe (C9), grounded on `netcfgbu/probe.py`.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Attempts a bounded TCP connect to `(host, port)`.
///
/// With `raise_exc = false` (the default used by the `probe` operation),
/// both timeouts and connection errors collapse to `Ok(false)`. With
/// `raise_exc = true`, a timeout surfaces as [`Error::Timeout`] and any
/// other connection failure as [`Error::Transport`].
pub async fn probe(host: &str, port: u16, duration: Duration, raise_exc: bool) -> Result<bool> {
    let addr = format!("{host}:{port}");
    match timeout(duration, TcpStream::connect(&addr)).await {
        Ok(Ok(_stream)) => Ok(true),
        Ok(Err(e)) => {
            if raise_exc {
                Err(Error::Transport(e))
            } else {
                Ok(false)
            }
        }
        Err(_) => {
            if raise_exc {
                Err(Error::Timeout {
                    phase: crate::error::Phase::Connect,
                })
            } else {
                Ok(false)
            }
        }
    }
}
