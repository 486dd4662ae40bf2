//! Per-conversation workers.
//!
//! Each conversation gets its own queue and task, created on its first
//! message. A conversation's messages are handled one at a time in arrival
//! order; different conversations run concurrently. A worker that sits idle
//! for the idle timeout exits, and the router forgets it on a later route.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use lume_core::{ConversationId, InboundMessage, OutboundReply};

use crate::agent_loop::AgentRunner;

pub const DEFAULT_WORKER_IDLE: Duration = Duration::from_secs(600);

struct Worker {
    tx: mpsc::UnboundedSender<InboundMessage>,
    task: JoinHandle<()>,
}

impl Worker {
    fn is_gone(&self) -> bool {
        self.tx.is_closed() && self.task.is_finished()
    }
}

pub struct ConversationRouter {
    runner: Arc<AgentRunner>,
    outbound_tx: mpsc::Sender<OutboundReply>,
    idle: Duration,
    workers: HashMap<ConversationId, Worker>,
}

impl ConversationRouter {
    pub fn new(runner: Arc<AgentRunner>, outbound_tx: mpsc::Sender<OutboundReply>) -> Self {
        Self {
            runner,
            outbound_tx,
            idle: DEFAULT_WORKER_IDLE,
            workers: HashMap::new(),
        }
    }

    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    /// Queue `msg` on its conversation's worker, starting one if needed.
    pub fn route(&mut self, msg: InboundMessage) {
        self.workers.retain(|_, w| !w.is_gone());

        let conversation_id = msg.conversation_id.clone();
        let (msg, previous) = match self.workers.remove(&conversation_id) {
            Some(worker) => match worker.tx.send(msg) {
                Ok(()) => {
                    self.workers.insert(conversation_id, worker);
                    return;
                }
                // Worker is winding down; the replacement waits for it.
                Err(mpsc::error::SendError(msg)) => (msg, Some(worker.task)),
            },
            None => (msg, None),
        };

        let worker = self.spawn_worker(conversation_id.clone(), previous);
        if worker.tx.send(msg).is_err() {
            error!(conversation_id = %conversation_id, "Conversation worker closed immediately");
        }
        self.workers.insert(conversation_id, worker);
    }

    /// Workers that may still be running.
    pub fn worker_count(&self) -> usize {
        self.workers.values().filter(|w| !w.is_gone()).count()
    }

    fn spawn_worker(&self, conversation_id: ConversationId, previous: Option<JoinHandle<()>>) -> Worker {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundMessage>();
        let runner = Arc::clone(&self.runner);
        let outbound_tx = self.outbound_tx.clone();
        let idle = self.idle;

        debug!(conversation_id = %conversation_id, "Starting conversation worker");
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            loop {
                let msg = match tokio::time::timeout(idle, rx.recv()).await {
                    Ok(Some(msg)) => msg,
                    Ok(None) => break,
                    Err(_) => {
                        // Refuse new sends, then finish whatever was queued.
                        rx.close();
                        match rx.try_recv() {
                            Ok(msg) => msg,
                            Err(_) => {
                                debug!(conversation_id = %conversation_id, "Conversation worker idle; exiting");
                                break;
                            }
                        }
                    }
                };
                if let Err(e) = runner.handle_message(msg, &outbound_tx).await {
                    error!(conversation_id = %conversation_id, error = %e, "Conversation worker stopped");
                    break;
                }
            }
        });
        Worker { tx, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lume_commands::{build_default_dispatcher, InMemoryServer};
    use lume_core::LlmProvider;
    use lume_memory::ConversationMemory;
    use lume_planner::{CompletionClient, CompletionSettings, ScriptedProvider};

    use crate::agent_loop::AgentSettings;
    use crate::assistant_identity::AssistantIdentity;

    const IDLE: Duration = Duration::from_secs(60);

    fn router() -> (ConversationRouter, mpsc::Receiver<OutboundReply>) {
        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new("scripted").with_response("ok"));
        let runner = AgentRunner::new(
            Arc::new(build_default_dispatcher(Arc::new(InMemoryServer::new()))),
            Arc::new(CompletionClient::new(vec![provider], CompletionSettings::default())),
            Arc::new(ConversationMemory::new(10)),
            &AssistantIdentity::default(),
            AgentSettings::default(),
        );
        let (tx, rx) = mpsc::channel(8);
        (ConversationRouter::new(Arc::new(runner), tx).with_idle_timeout(IDLE), rx)
    }

    fn message(conversation: &str, text: &str) -> InboundMessage {
        InboundMessage::new(conversation, "user-1", text).in_server("guild-1")
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_workers_are_forgotten() {
        let (mut router, mut rx) = router();
        router.route(message("a", "hola"));
        router.route(message("b", "hola"));
        assert_eq!(rx.recv().await.unwrap().text, "ok");
        assert_eq!(rx.recv().await.unwrap().text, "ok");
        assert_eq!(router.worker_count(), 2);

        tokio::time::sleep(IDLE + Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(router.worker_count(), 0);

        router.route(message("c", "hola"));
        assert_eq!(router.workers.len(), 1);
        assert_eq!(rx.recv().await.unwrap().conversation_id, ConversationId::from("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn conversation_resumes_after_its_worker_exits() {
        let (mut router, mut rx) = router();
        router.route(message("a", "uno"));
        assert_eq!(rx.recv().await.unwrap().text, "ok");

        tokio::time::sleep(IDLE * 2).await;
        settle().await;

        router.route(message("a", "dos"));
        router.route(message("a", "tres"));
        assert_eq!(rx.recv().await.unwrap().text, "ok");
        assert_eq!(rx.recv().await.unwrap().text, "ok");
        assert_eq!(router.worker_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_conversation_keeps_its_worker() {
        let (mut router, mut rx) = router();
        for i in 0..3 {
            router.route(message("a", &format!("m{i}")));
            assert_eq!(rx.recv().await.unwrap().text, "ok");
            tokio::time::sleep(IDLE / 2).await;
        }
        assert_eq!(router.worker_count(), 1);
    }
}
