//! Core agent execution loop.
//!
//! One inbound message goes through: user turn appended to memory, context
//! window built, completion requested, model output dispatched, outcome
//! appended to memory, reply emitted. Exactly one reply per message, plus
//! the deferred follow-up a reminder asks for.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use lume_commands::{ActionContext, DispatchOutcome, Dispatcher, FollowUp};
use lume_core::{ConversationId, InboundMessage, LumeError, OutboundReply, Turn};
use lume_logging::{TurnEvent, TurnEventLogger};
use lume_memory::ConversationMemory;
use lume_planner::CompletionClient;

use crate::assistant_identity::AssistantIdentity;
use crate::context_window::ContextWindow;
use crate::router::ConversationRouter;
use crate::system_prompt::PromptBuilder;

#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Turns of memory sent with each completion request.
    pub context_turns: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            context_turns: lume_memory::DEFAULT_WINDOW_TURNS,
        }
    }
}

pub struct AgentRunner {
    dispatcher: Arc<Dispatcher>,
    completion: Arc<CompletionClient>,
    memory: Arc<ConversationMemory>,
    system_prompt: String,
    settings: AgentSettings,
}

impl AgentRunner {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        completion: Arc<CompletionClient>,
        memory: Arc<ConversationMemory>,
        identity: &AssistantIdentity,
        settings: AgentSettings,
    ) -> Self {
        let system_prompt = PromptBuilder::build(identity, dispatcher.registry());
        Self {
            dispatcher,
            completion,
            memory,
            system_prompt,
            settings,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    /// Run one message through the pipeline. `None` for messages the
    /// assistant must ignore (its own).
    #[instrument(skip_all, fields(conversation_id = %msg.conversation_id))]
    pub async fn process(&self, msg: &InboundMessage) -> Option<DispatchOutcome> {
        if msg.from_self {
            debug!("Ignoring self-authored message");
            return None;
        }

        let conversation_id = &msg.conversation_id;
        TurnEventLogger::log_event(
            conversation_id.as_str(),
            TurnEvent::Inbound {
                author_id: msg.author_id.clone(),
                text: msg.text.clone(),
            },
        );

        self.memory.append(conversation_id, Turn::user(msg.text.clone())).await;
        let context = ContextWindow::build(self.memory.window(conversation_id).await, self.settings.context_turns);
        debug!(turns = context.len(), "Requesting completion");

        let outcome = match self
            .completion
            .complete_response(&self.system_prompt, &context.turns)
            .await
        {
            Ok(response) => {
                TurnEventLogger::log_event(
                    conversation_id.as_str(),
                    TurnEvent::Completion {
                        provider: response.provider.clone(),
                        latency_ms: response.latency_ms,
                    },
                );
                let ctx = ActionContext::new(conversation_id.clone(), msg.server_id.clone(), msg.author_id.clone());
                self.dispatcher.dispatch(&ctx, &response.content).await
            }
            Err(err) => {
                error!(error = %err, "Completion failed");
                TurnEventLogger::log_event(
                    conversation_id.as_str(),
                    TurnEvent::UpstreamError { error: err.to_string() },
                );
                DispatchOutcome::upstream_failure()
            }
        };

        self.memory
            .append(conversation_id, Turn::assistant(outcome.message.clone()))
            .await;
        TurnEventLogger::log_event(
            conversation_id.as_str(),
            TurnEvent::Outcome {
                kind: format!("{:?}", outcome.kind),
                message: outcome.message.clone(),
            },
        );
        Some(outcome)
    }

    /// Process `msg`, emit its reply and schedule any follow-up.
    ///
    /// Fails only when the outbound channel is closed.
    pub async fn handle_message(
        &self,
        msg: InboundMessage,
        outbound_tx: &mpsc::Sender<OutboundReply>,
    ) -> Result<(), LumeError> {
        let Some(outcome) = self.process(&msg).await else {
            return Ok(());
        };

        outbound_tx
            .send(OutboundReply::new(msg.conversation_id.clone(), outcome.message))
            .await
            .map_err(|_| LumeError::ChannelClosed("outbound".into()))?;

        if let Some(follow_up) = outcome.follow_up {
            schedule_follow_up(msg.conversation_id, follow_up, outbound_tx.clone());
        }
        Ok(())
    }

    /// Consume inbound messages until the channel closes.
    pub async fn run(
        self: Arc<Self>,
        mut inbound_rx: mpsc::Receiver<InboundMessage>,
        outbound_tx: mpsc::Sender<OutboundReply>,
    ) -> anyhow::Result<()> {
        info!("Agent runner started");
        let mut router = ConversationRouter::new(Arc::clone(&self), outbound_tx);
        while let Some(msg) = inbound_rx.recv().await {
            router.route(msg);
        }
        info!(conversations = router.worker_count(), "Inbound channel closed; agent runner stopping");
        Ok(())
    }
}

/// Emit `follow_up` after its delay without holding up the conversation.
fn schedule_follow_up(conversation_id: ConversationId, follow_up: FollowUp, outbound_tx: mpsc::Sender<OutboundReply>) {
    debug!(conversation_id = %conversation_id, delay_secs = follow_up.delay.as_secs(), "Scheduling follow-up");
    tokio::spawn(async move {
        tokio::time::sleep(follow_up.delay).await;
        if outbound_tx
            .send(OutboundReply::new(conversation_id, follow_up.text))
            .await
            .is_err()
        {
            error!("Outbound channel closed before follow-up was delivered");
        }
    });
}
