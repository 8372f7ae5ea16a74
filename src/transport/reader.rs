//! Inbound loop: decode packets from the socket and queue them for the application.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, trace};

use crate::core::codec::PacketCodec;
use crate::core::packet::Packet;
use crate::error::ConnectionError;
use crate::service::session::{SessionState, Task};

pub(crate) struct Reader {
    framed: FramedRead<OwnedReadHalf, PacketCodec>,
    inbound: mpsc::UnboundedSender<Packet>,
    session: Arc<SessionState>,
    read_timeout: Duration,
}

impl Reader {
    pub(crate) fn new(
        half: OwnedReadHalf,
        inbound: mpsc::UnboundedSender<Packet>,
        session: Arc<SessionState>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            framed: FramedRead::new(half, PacketCodec),
            inbound,
            session,
            read_timeout,
        }
    }

    /// Run until cancelled, the stream ends, or a kick arrives.
    ///
    /// Each read is bounded by the read timeout; an idle server counts as a
    /// failed connection. A kick is queued for the application before the
    /// connection is shut down with the kick's reason.
    pub(crate) async fn run(mut self) {
        let session = Arc::clone(&self.session);
        loop {
            let next = tokio::select! {
                biased;
                _ = session.cancelled() => break,
                next = tokio::time::timeout(self.read_timeout, self.framed.next()) => next,
            };

            let packet = match next {
                Ok(Some(Ok(packet))) => packet,
                Ok(Some(Err(e))) => {
                    session.loop_failed(Task::Reader, &e);
                    break;
                }
                Ok(None) => {
                    session.loop_failed(Task::Reader, &ConnectionError::ConnectionClosed);
                    break;
                }
                Err(_) => {
                    session.loop_failed(Task::Reader, &ConnectionError::Timeout);
                    break;
                }
            };

            trace!(connection = %session.id(), id = packet.id(), kind = packet.name(), "Packet received");
            session.metrics().packet_received();

            let kick = packet.kick_reason().map(|reason| {
                ConnectionError::Disconnected {
                    reason: reason.to_string(),
                }
                .to_string()
            });

            if self.inbound.send(packet).is_err() {
                // Connection dropped its receiver.
                break;
            }

            if let Some(reason) = kick {
                session.shutdown(&reason);
                break;
            }
        }
        debug!(connection = %session.id(), "Reader loop stopped");
    }
}
