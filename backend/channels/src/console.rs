//! Terminal adapter: one local conversation over stdin/stdout.
//!
//! Useful for trying the assistant without a Discord bot. Replies are
//! printed as they arrive; after stdin closes the adapter keeps printing
//! until every pending reply (reminders included) has been delivered.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use lume_core::{InboundMessage, OutboundReply};

use crate::ChannelAdapter;

pub const CONSOLE_CONVERSATION: &str = "console";
pub const CONSOLE_SERVER: &str = "console";

pub struct ConsoleAdapter {
    author: String,
    prompt: String,
}

impl ConsoleAdapter {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            prompt: "> ".to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Drive the conversation over arbitrary reader/writer halves.
    pub async fn run_with<R, W>(
        &self,
        reader: R,
        mut writer: W,
        inbound_tx: mpsc::Sender<InboundMessage>,
        mut outbound_rx: mpsc::Receiver<OutboundReply>,
    ) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut inbound_tx = Some(inbound_tx);

        self.write_prompt(&mut writer).await?;
        loop {
            tokio::select! {
                line = lines.next_line(), if inbound_tx.is_some() => {
                    let Some(line) = line? else {
                        debug!("Console input closed");
                        inbound_tx = None;
                        continue;
                    };
                    let text = line.trim();
                    if text.is_empty() {
                        self.write_prompt(&mut writer).await?;
                        continue;
                    }
                    let msg = InboundMessage::new(CONSOLE_CONVERSATION, self.author.clone(), text)
                        .in_server(CONSOLE_SERVER);
                    if let Some(tx) = &inbound_tx {
                        if tx.send(msg).await.is_err() {
                            anyhow::bail!("agent runner stopped");
                        }
                    }
                }
                reply = outbound_rx.recv() => {
                    let Some(reply) = reply else { break };
                    writer.write_all(reply.text.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    if inbound_tx.is_some() {
                        self.write_prompt(&mut writer).await?;
                    }
                    writer.flush().await?;
                }
            }
        }
        writer.flush().await?;
        Ok(())
    }

    async fn write_prompt<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.prompt.as_bytes()).await?;
        writer.flush().await
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new("console-user")
    }
}

#[async_trait]
impl ChannelAdapter for ConsoleAdapter {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(
        &self,
        inbound_tx: mpsc::Sender<InboundMessage>,
        outbound_rx: mpsc::Receiver<OutboundReply>,
    ) -> anyhow::Result<()> {
        info!("Starting console adapter");
        let stdin = BufReader::new(tokio::io::stdin());
        self.run_with(stdin, tokio::io::stdout(), inbound_tx, outbound_rx).await
    }
}
