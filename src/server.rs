//! UDP listener for cwdaemon clients
//!
//! cwdaemon is fire-and-forget: every datagram is one frame and nothing is
//! sent back. By default only loopback clients are served.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

/// Largest frame we accept; longer datagrams are truncated by the socket.
pub const MAX_FRAME_LEN: usize = 1500;

/// Which client addresses may drive the keyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    LocalhostOnly,
    AnyHost,
}

impl AccessPolicy {
    pub fn from_accept_remote(accept_remote: bool) -> Self {
        if accept_remote {
            AccessPolicy::AnyHost
        } else {
            AccessPolicy::LocalhostOnly
        }
    }

    pub fn allows(&self, client: &SocketAddr) -> bool {
        match self {
            AccessPolicy::AnyHost => true,
            AccessPolicy::LocalhostOnly => client.ip().is_loopback(),
        }
    }

    /// Address to bind for `port` under this policy.
    pub fn bind_addr(&self, port: u16) -> SocketAddr {
        let ip = match self {
            AccessPolicy::AnyHost => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AccessPolicy::LocalhostOnly => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        SocketAddr::new(ip, port)
    }
}

/// Bound cwdaemon UDP socket.
#[derive(Debug)]
pub struct CwdaemonListener {
    socket: UdpSocket,
    policy: AccessPolicy,
    local_addr: SocketAddr,
}

impl CwdaemonListener {
    /// Bind the cwdaemon port with the address `policy` calls for.
    pub async fn bind(port: u16, policy: AccessPolicy) -> Result<Self> {
        Self::bind_addr(policy.bind_addr(port), policy).await
    }

    pub async fn bind_addr(addr: SocketAddr, policy: AccessPolicy) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await.map_err(|e| {
            warn!(addr = %addr, error = %e, "Failed to bind UDP socket");
            Error::Io(e)
        })?;
        let local_addr = socket.local_addr()?;

        if policy == AccessPolicy::AnyHost {
            warn!("Warning: listening to nonlocal hosts as well as localhost.");
        }
        info!(addr = %local_addr, "Listening for cwdaemon frames");

        Ok(Self {
            socket,
            policy,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Wait for the next frame from an allowed client.
    ///
    /// Datagrams from other clients are dropped here.
    pub async fn recv_frame(&self) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        loop {
            let (n, client) = self.socket.recv_from(&mut buf).await?;
            if !self.policy.allows(&client) {
                debug!(client = %client, "Dropping frame from non-local client");
                continue;
            }
            trace!(client = %client, bytes = n, "Frame received");
            return Ok((buf[..n].to_vec(), client));
        }
    }
}
