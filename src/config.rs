use anyhow::{Context, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::cli::{Cli, Mode};
use crate::engine::IdlePolicy;

/// Runtime configuration shared by both roles.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    /// Responder bind address, and the emitter's target.
    pub peer: SocketAddr,
    pub stream_id: u32,
    pub status_interval: Duration,
    pub probe_interval: Duration,
    pub idle_policy: IdlePolicy,
    pub debug: bool,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let peer = (cli.host.as_str(), cli.port)
            .to_socket_addrs()
            .with_context(|| format!("cannot resolve {}:{}", cli.host, cli.port))?
            .next()
            .with_context(|| format!("no address for {}:{}", cli.host, cli.port))?;

        Ok(Self {
            mode: cli.mode,
            peer,
            stream_id: cli.stream_id,
            status_interval: Duration::from_secs(cli.log_interval),
            probe_interval: Duration::from_millis(cli.probe_interval_ms.max(1)),
            idle_policy: if cli.spin {
                IdlePolicy::BusySpin
            } else {
                IdlePolicy::Backoff
            },
            debug: cli.debug,
        })
    }
}
