use async_trait::async_trait;
use lume_core::{InboundMessage, OutboundReply};
use tokio::sync::mpsc;

pub mod console;
pub mod discord;

pub use console::ConsoleAdapter;
pub use discord::{split_message, DiscordAdapter, DiscordServer};

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Run the adapter: forward platform messages to `inbound_tx` and deliver
    /// replies from `outbound_rx` until the platform connection ends.
    async fn start(
        &self,
        inbound_tx: mpsc::Sender<InboundMessage>,
        outbound_rx: mpsc::Receiver<OutboundReply>,
    ) -> anyhow::Result<()>;
}
