//! # Transport Layer
//!
//! Socket setup and the two background loops that move packets between the
//! connection's queues and the TCP stream.
//!
//! ## Components
//! - **open**: resolve, connect with a bounded wait, tune the socket
//! - **reader**: socket -> inbound queue
//! - **writer**: outbound queue -> socket

pub mod reader;
pub mod writer;

use std::io;
use std::net::SocketAddr;

use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{ConnectionError, Result};
use crate::utils::timeout::{with_timeout, with_timeout_error};

/// Open a TCP connection to `host:port`, trying each resolved address in turn.
///
/// Resolution and every connect attempt are bounded by `config.timeout`.
#[instrument(skip(config))]
pub async fn open(host: &str, port: u16, config: &ClientConfig) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = with_timeout_error(
        async { Ok::<_, ConnectionError>(lookup_host((host, port)).await?.collect()) },
        config.timeout,
    )
    .await?;

    let mut last_error: Option<ConnectionError> = None;
    for addr in addrs {
        match with_timeout(connect_addr(addr, config), config.timeout).await {
            Ok(Ok(stream)) => {
                debug!(%addr, "Socket connected");
                return Ok(stream);
            }
            Ok(Err(e)) => {
                debug!(%addr, error = %e, "Connect attempt failed");
                last_error = Some(e.into());
            }
            Err(e) => {
                debug!(%addr, "Connect attempt timed out");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses resolved for {host}:{port}"),
        )
        .into()
    }))
}

async fn connect_addr(addr: SocketAddr, config: &ClientConfig) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    // The traffic class is only a hint; some platforms refuse it.
    #[cfg(unix)]
    if addr.is_ipv4() {
        if let Err(e) = socket.set_tos_v4(config.traffic_class) {
            debug!(error = %e, "Could not set traffic class");
        }
    }
    #[cfg(not(unix))]
    let _ = config;

    let stream = socket.connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
