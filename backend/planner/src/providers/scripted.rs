use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use lume_core::{LlmProvider, LlmRequest, LlmResponse, Role};

/// A provider that replays queued responses; used offline and in tests.
///
/// Once the queue is drained, the fixed fallback response (if any) is
/// returned forever; an echoing provider repeats the latest user turn;
/// otherwise calls fail.
pub struct ScriptedProvider {
    name: String,
    queue: Mutex<VecDeque<Result<String, String>>>,
    fixed_response: Option<String>,
    echo: bool,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: Mutex::new(VecDeque::new()),
            fixed_response: None,
            echo: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Answer with the latest user turn once the queue is empty. Lets an
    /// offline session type raw action JSON.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Queue one successful response.
    pub fn then_reply(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()));
        self
    }

    /// Queue one failure.
    pub fn then_fail(self, error: impl Into<String>) -> Self {
        self.push(Err(error.into()));
        self
    }

    pub fn push(&self, entry: Result<String, String>) {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).push_back(entry);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, req: &LlmRequest) -> Result<LlmResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(req.clone());

        let next = self.queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        let content = match next {
            Some(Ok(content)) => content,
            Some(Err(error)) => anyhow::bail!("{error}"),
            None => match &self.fixed_response {
                Some(content) => content.clone(),
                None if self.echo => req
                    .turns
                    .iter()
                    .rev()
                    .find(|t| t.role() == Role::User)
                    .map(|t| t.text().to_string())
                    .unwrap_or_default(),
                None => anyhow::bail!("{}: no scripted response left", self.name),
            },
        };

        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model: req.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lume_core::Turn;

    fn request(text: &str) -> LlmRequest {
        LlmRequest {
            model: "scripted".into(),
            system_prompt: String::new(),
            turns: vec![Turn::user(text)],
            max_tokens: 16,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn replays_queue_then_fixed_response() {
        let provider = ScriptedProvider::new("s")
            .then_reply("uno")
            .then_fail("boom")
            .with_response("siempre");

        assert_eq!(provider.complete(&request("a")).await.unwrap().content, "uno");
        assert!(provider.complete(&request("b")).await.is_err());
        assert_eq!(provider.complete(&request("c")).await.unwrap().content, "siempre");
        assert_eq!(provider.complete(&request("d")).await.unwrap().content, "siempre");
        assert_eq!(provider.call_count(), 4);
        assert_eq!(provider.requests()[1].turns[0].text(), "b");
    }

    #[tokio::test]
    async fn empty_script_fails() {
        let provider = ScriptedProvider::new("s");
        assert!(provider.complete(&request("a")).await.is_err());
    }

    #[tokio::test]
    async fn echoing_repeats_latest_user_turn() {
        let provider = ScriptedProvider::new("offline").echoing();
        let mut req = request("primero");
        req.turns.push(Turn::assistant("respuesta"));
        req.turns.push(Turn::user(r#"{"action":"crear_rol","params":{"nombre":"mod"}}"#));
        let response = provider.complete(&req).await.unwrap();
        assert_eq!(response.content, r#"{"action":"crear_rol","params":{"nombre":"mod"}}"#);
    }
}
