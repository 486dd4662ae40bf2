use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::message::{InboundMessage, OutboundReply};

/// Default channel buffer size for adapter ↔ runner messaging.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// The message bus connecting chat adapters to the agent runner.
///
/// Adapters push observed messages on `inbound_tx`; the runner pushes
/// replies on `outbound_tx`. Built on bounded Tokio mpsc channels.
pub struct LumeBus {
    pub inbound_tx: mpsc::Sender<InboundMessage>,
    pub inbound_rx: Option<mpsc::Receiver<InboundMessage>>,

    pub outbound_tx: mpsc::Sender<OutboundReply>,
    pub outbound_rx: Option<mpsc::Receiver<OutboundReply>>,
}

impl LumeBus {
    /// Create a new bus with default buffer sizes.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);

        info!(buffer_size = buffer, "LumeBus initialized");

        Self {
            inbound_tx,
            inbound_rx: Some(inbound_rx),
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        }
    }

    /// Take the inbound receiver (can only be called once).
    pub fn take_inbound_rx(&mut self) -> Option<mpsc::Receiver<InboundMessage>> {
        debug!("Inbound receiver taken");
        self.inbound_rx.take()
    }

    /// Take the outbound receiver (can only be called once).
    pub fn take_outbound_rx(&mut self) -> Option<mpsc::Receiver<OutboundReply>> {
        debug!("Outbound receiver taken");
        self.outbound_rx.take()
    }
}

impl Default for LumeBus {
    fn default() -> Self {
        Self::new()
    }
}
