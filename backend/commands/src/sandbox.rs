//! In-memory `ServerOps` implementation.
//!
//! Backs `lume chat` and the tests. Every mutating call is recorded so
//! callers can assert exactly which side effects happened. Servers are
//! created lazily on first use.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::server::{MemberRef, PlatformError, PlatformResult, ResourceRef, ServerOps};

#[derive(Debug, Clone)]
struct Channel {
    id: String,
    name: String,
    category_id: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    id: String,
    channel_id: String,
    content: String,
    pinned: bool,
}

#[derive(Debug, Default)]
struct ServerState {
    channels: Vec<Channel>,
    categories: Vec<ResourceRef>,
    roles: Vec<ResourceRef>,
    members: Vec<MemberRef>,
}

#[derive(Debug, Default)]
struct State {
    servers: HashMap<String, ServerState>,
    messages: Vec<StoredMessage>,
    next_id: u64,
    mutations: Vec<String>,
    reject_next: Option<Rejection>,
}

/// An armed failure; `operation: None` matches any mutation.
#[derive(Debug)]
struct Rejection {
    operation: Option<String>,
    reason: String,
}

impl State {
    fn server(&mut self, server_id: &str) -> &mut ServerState {
        self.servers.entry(server_id.to_string()).or_default()
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    /// Record a mutation, or fail it if a rejection was armed.
    fn mutate(&mut self, entry: String) -> PlatformResult<()> {
        let armed = self.reject_next.as_ref().is_some_and(|r| match &r.operation {
            Some(op) => entry.split_whitespace().next() == Some(op.as_str()),
            None => true,
        });
        if armed {
            if let Some(rejection) = self.reject_next.take() {
                return Err(PlatformError::Rejected(rejection.reason));
            }
        }
        debug!(mutation = %entry, "In-memory server mutation");
        self.mutations.push(entry);
        Ok(())
    }
}

pub struct InMemoryServer {
    state: Mutex<State>,
    lookup_delay: Option<Duration>,
}

impl InMemoryServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            lookup_delay: None,
        }
    }

    /// Make every lookup answer `delay` after reading state, widening the
    /// check-then-act window.
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub async fn seed_member(&self, server_id: &str, name: &str) -> String {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.server(server_id).members.push(MemberRef {
            id: id.clone(),
            name: name.to_string(),
            role_ids: Vec::new(),
        });
        id
    }

    pub async fn seed_role(&self, server_id: &str, name: &str) -> String {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.server(server_id).roles.push(ResourceRef::new(id.clone(), name));
        id
    }

    pub async fn seed_text_channel(&self, server_id: &str, name: &str) -> String {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.server(server_id).channels.push(Channel {
            id: id.clone(),
            name: name.to_string(),
            category_id: None,
        });
        id
    }

    /// Fail the next mutating call with `PlatformError::Rejected(reason)`.
    pub async fn reject_next(&self, reason: impl Into<String>) {
        self.state.lock().await.reject_next = Some(Rejection {
            operation: None,
            reason: reason.into(),
        });
    }

    /// Fail the next call to `operation` (e.g. `"pin_message"`); other
    /// mutations go through.
    pub async fn reject_next_call(&self, operation: &str, reason: impl Into<String>) {
        self.state.lock().await.reject_next = Some(Rejection {
            operation: Some(operation.to_string()),
            reason: reason.into(),
        });
    }

    /// Every mutating call made so far, as `"<operation> <target>"`.
    pub async fn mutations(&self) -> Vec<String> {
        self.state.lock().await.mutations.clone()
    }

    pub async fn mutation_count(&self) -> usize {
        self.state.lock().await.mutations.len()
    }

    pub async fn text_channel_names(&self, server_id: &str) -> Vec<String> {
        let mut state = self.state.lock().await;
        state.server(server_id).channels.iter().map(|c| c.name.clone()).collect()
    }

    /// Category id a channel was created under.
    pub async fn channel_category(&self, server_id: &str, channel_name: &str) -> Option<String> {
        let mut state = self.state.lock().await;
        state
            .server(server_id)
            .channels
            .iter()
            .find(|c| c.name == channel_name)
            .and_then(|c| c.category_id.clone())
    }

    pub async fn member_roles(&self, server_id: &str, member_name: &str) -> Vec<String> {
        let mut state = self.state.lock().await;
        let server = state.server(server_id);
        let Some(member) = server.members.iter().find(|m| m.name == member_name) else {
            return Vec::new();
        };
        server
            .roles
            .iter()
            .filter(|r| member.has_role(&r.id))
            .map(|r| r.name.clone())
            .collect()
    }

    /// Contents of the messages posted to a channel, oldest first, with pin state.
    pub async fn channel_messages(&self, channel_id: &str) -> Vec<(String, bool)> {
        self.state
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| (m.content.clone(), m.pinned))
            .collect()
    }

    /// Delay the answer of a lookup whose result was already read, so the
    /// answer can be stale by the time the caller acts on it.
    async fn lookup_pause(&self) {
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for InMemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerOps for InMemoryServer {
    async fn find_text_channel(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>> {
        let found = {
            let mut state = self.state.lock().await;
            state
                .server(server_id)
                .channels
                .iter()
                .find(|c| c.name == name)
                .map(|c| ResourceRef::new(c.id.clone(), c.name.clone()))
        };
        self.lookup_pause().await;
        Ok(found)
    }

    async fn create_text_channel(
        &self,
        server_id: &str,
        name: &str,
        category_id: Option<&str>,
    ) -> PlatformResult<ResourceRef> {
        let mut state = self.state.lock().await;
        state.mutate(format!("create_text_channel {name}"))?;
        let id = state.allocate_id();
        state.server(server_id).channels.push(Channel {
            id: id.clone(),
            name: name.to_string(),
            category_id: category_id.map(str::to_string),
        });
        Ok(ResourceRef::new(id, name))
    }

    async fn delete_channel(&self, server_id: &str, channel_id: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.mutate(format!("delete_channel {channel_id}"))?;
        let server = state.server(server_id);
        server.channels.retain(|c| c.id != channel_id);
        server.categories.retain(|c| c.id != channel_id);
        Ok(())
    }

    async fn rename_channel(&self, server_id: &str, channel_id: &str, new_name: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.mutate(format!("rename_channel {channel_id} {new_name}"))?;
        let channel = state
            .server(server_id)
            .channels
            .iter_mut()
            .find(|c| c.id == channel_id)
            .ok_or_else(|| PlatformError::InvalidId(channel_id.to_string()))?;
        channel.name = new_name.to_string();
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> PlatformResult<ResourceRef> {
        let mut state = self.state.lock().await;
        state.mutate(format!("send_message {channel_id}"))?;
        let id = state.allocate_id();
        state.messages.push(StoredMessage {
            id: id.clone(),
            channel_id: channel_id.to_string(),
            content: content.to_string(),
            pinned: false,
        });
        Ok(ResourceRef::new(id, content))
    }

    async fn pin_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.mutate(format!("pin_message {channel_id} {message_id}"))?;
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.channel_id == channel_id)
            .ok_or_else(|| PlatformError::InvalidId(message_id.to_string()))?;
        message.pinned = true;
        Ok(())
    }

    async fn find_category(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>> {
        let found = {
            let mut state = self.state.lock().await;
            state.server(server_id).categories.iter().find(|c| c.name == name).cloned()
        };
        self.lookup_pause().await;
        Ok(found)
    }

    async fn create_category(&self, server_id: &str, name: &str) -> PlatformResult<ResourceRef> {
        let mut state = self.state.lock().await;
        state.mutate(format!("create_category {name}"))?;
        let id = state.allocate_id();
        let category = ResourceRef::new(id, name);
        state.server(server_id).categories.push(category.clone());
        Ok(category)
    }

    async fn find_role(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>> {
        let found = {
            let mut state = self.state.lock().await;
            state.server(server_id).roles.iter().find(|r| r.name == name).cloned()
        };
        self.lookup_pause().await;
        Ok(found)
    }

    async fn create_role(&self, server_id: &str, name: &str) -> PlatformResult<ResourceRef> {
        let mut state = self.state.lock().await;
        state.mutate(format!("create_role {name}"))?;
        let id = state.allocate_id();
        let role = ResourceRef::new(id, name);
        state.server(server_id).roles.push(role.clone());
        Ok(role)
    }

    async fn delete_role(&self, server_id: &str, role_id: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.mutate(format!("delete_role {role_id}"))?;
        let server = state.server(server_id);
        server.roles.retain(|r| r.id != role_id);
        for member in &mut server.members {
            member.role_ids.retain(|r| r != role_id);
        }
        Ok(())
    }

    async fn find_member(&self, server_id: &str, name: &str) -> PlatformResult<Option<MemberRef>> {
        let found = {
            let mut state = self.state.lock().await;
            state.server(server_id).members.iter().find(|m| m.name == name).cloned()
        };
        self.lookup_pause().await;
        Ok(found)
    }

    async fn add_member_role(&self, server_id: &str, member_id: &str, role_id: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.mutate(format!("add_member_role {member_id} {role_id}"))?;
        let member = state
            .server(server_id)
            .members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| PlatformError::InvalidId(member_id.to_string()))?;
        if !member.has_role(role_id) {
            member.role_ids.push(role_id.to_string());
        }
        Ok(())
    }

    async fn remove_member_role(&self, server_id: &str, member_id: &str, role_id: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.mutate(format!("remove_member_role {member_id} {role_id}"))?;
        let member = state
            .server(server_id)
            .members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| PlatformError::InvalidId(member_id.to_string()))?;
        member.role_ids.retain(|r| r != role_id);
        Ok(())
    }
}
