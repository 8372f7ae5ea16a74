//! Outbound loop: encode queued packets onto the socket.

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tracing::{debug, trace, warn};

use crate::core::codec::PacketCodec;
use crate::core::packet::Packet;
use crate::error::Result;
use crate::service::session::{SessionState, Task};
use crate::utils::timeout::with_timeout_error;

/// Why the send loop ended.
enum Exit {
    /// Cancelled between packets; whatever is still queued can be flushed.
    Cancelled,
    /// Cancelled mid-write or the queue closed; nothing more can be sent.
    Stopped,
}

pub(crate) struct Writer {
    framed: FramedWrite<OwnedWriteHalf, PacketCodec>,
    outbound: mpsc::UnboundedReceiver<Packet>,
    session: Arc<SessionState>,
    shutdown_timeout: Duration,
}

impl Writer {
    pub(crate) fn new(
        half: OwnedWriteHalf,
        outbound: mpsc::UnboundedReceiver<Packet>,
        session: Arc<SessionState>,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            framed: FramedWrite::new(half, PacketCodec),
            outbound,
            session,
            shutdown_timeout,
        }
    }

    /// Send packets in queue order until cancelled, then flush what is left
    /// and close the write half within the shutdown timeout.
    pub(crate) async fn run(mut self) {
        let session = Arc::clone(&self.session);
        let limit = self.shutdown_timeout;

        if let Exit::Cancelled = self.send_loop().await {
            match with_timeout_error(self.drain(), limit).await {
                Ok(flushed) => {
                    debug!(connection = %session.id(), flushed, "Outbound queue flushed")
                }
                Err(e) => {
                    warn!(connection = %session.id(), error = %e, "Failed to flush outbound queue")
                }
            }
        }
        debug!(connection = %session.id(), "Writer loop stopped");
    }

    async fn send_loop(&mut self) -> Exit {
        let session = Arc::clone(&self.session);
        loop {
            let packet = tokio::select! {
                biased;
                _ = session.cancelled() => return Exit::Cancelled,
                packet = self.outbound.recv() => match packet {
                    Some(packet) => packet,
                    None => return Exit::Stopped,
                },
            };

            let (id, kind) = (packet.id(), packet.name());
            // A write stalled on a full socket is abandoned once teardown starts.
            let sent = tokio::select! {
                biased;
                sent = self.framed.send(packet) => sent,
                _ = session.cancelled() => return Exit::Stopped,
            };

            if let Err(e) = sent {
                session.loop_failed(Task::Writer, &e);
                return Exit::Stopped;
            }
            trace!(connection = %session.id(), id, kind, "Packet sent");
            session.metrics().packet_sent();
        }
    }

    async fn drain(&mut self) -> Result<usize> {
        let mut flushed = 0;
        while let Ok(packet) = self.outbound.try_recv() {
            self.framed.feed(packet).await?;
            self.session.metrics().packet_sent();
            flushed += 1;
        }
        self.framed.close().await?;
        Ok(flushed)
    }
}
