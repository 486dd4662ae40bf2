use std::future::Future;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, CreateChannel, EditChannel, EditRole, GuildChannel, GuildId, Member, MessageId, RoleId,
    UserId,
};
use serenity::http::Http;
use serenity::model::channel::Message as DiscordMessage;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use lume_commands::{MemberRef, PlatformError, PlatformResult, ResourceRef, ServerOps};
use lume_core::{InboundMessage, OutboundReply};

use crate::ChannelAdapter;

/// Discord's per-message character limit.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

const AUDIT_LOG_REASON: &str = "Lume";

/// Largest page the member listing endpoint returns.
const MEMBER_PAGE_SIZE: usize = 1000;

// ---------------------------------------------------------------------------
// Gateway events
// ---------------------------------------------------------------------------

struct Handler {
    inbound_tx: mpsc::Sender<InboundMessage>,
    bot_id: OnceLock<UserId>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: DiscordMessage) {
        let from_self = self.bot_id.get() == Some(&msg.author.id);
        if msg.author.bot && !from_self {
            debug!(author = %msg.author.name, "Ignoring message from another bot");
            return;
        }

        let channel_id = msg.channel_id.to_string();
        debug!(channel_id = %channel_id, author = %msg.author.name, "Received Discord message");

        let mut inbound = InboundMessage::new(channel_id, msg.author.id.to_string(), msg.content.clone());
        inbound.author_name = msg.author.name.clone();
        inbound.from_self = from_self;
        if let Some(guild_id) = msg.guild_id {
            inbound = inbound.in_server(guild_id.to_string());
        }

        if self.inbound_tx.send(inbound).await.is_err() {
            error!("Inbound channel closed; dropping Discord message");
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        let _ = self.bot_id.set(ready.user.id);
        info!("{} is connected!", ready.user.name);
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct DiscordAdapter {
    token: String,
    http: Arc<Http>,
}

impl DiscordAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let http = Arc::new(Http::new(&token));
        Self { token, http }
    }

    /// REST client sharing this adapter's credentials.
    pub fn http(&self) -> Arc<Http> {
        Arc::clone(&self.http)
    }

    /// Server operations backed by this adapter's credentials.
    pub fn server_ops(&self) -> DiscordServer {
        DiscordServer::new(self.http())
    }
}

#[async_trait]
impl ChannelAdapter for DiscordAdapter {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(
        &self,
        inbound_tx: mpsc::Sender<InboundMessage>,
        outbound_rx: mpsc::Receiver<OutboundReply>,
    ) -> anyhow::Result<()> {
        info!("Starting Discord adapter");

        tokio::spawn(deliver_replies(self.http(), outbound_rx));

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut client = Client::builder(&self.token, intents)
            .event_handler(Handler {
                inbound_tx,
                bot_id: OnceLock::new(),
            })
            .await?;

        if let Err(why) = client.start().await {
            error!("Client error: {:?}", why);
            anyhow::bail!("Discord client error: {:?}", why);
        }

        Ok(())
    }
}

/// Outbound pump: post each reply to its channel, split to fit the limit.
async fn deliver_replies(http: Arc<Http>, mut outbound_rx: mpsc::Receiver<OutboundReply>) {
    while let Some(reply) = outbound_rx.recv().await {
        let channel_id = match parse_id(reply.conversation_id.as_str()) {
            Ok(id) => ChannelId::new(id),
            Err(e) => {
                error!(conversation_id = %reply.conversation_id, error = %e, "Cannot reply to non-Discord conversation");
                continue;
            }
        };

        for chunk in split_message(&reply.text, MAX_MESSAGE_LENGTH) {
            if let Err(e) = channel_id.say(&*http, chunk).await {
                error!(channel_id = %channel_id, error = %e, "Failed to send message to Discord");
                break;
            }
        }
    }
    info!("Outbound channel closed; Discord reply pump stopping");
}

/// Split `text` into pieces of at most `max_chars` characters, breaking on
/// newlines where possible and inside a line only when the line itself is
/// too long.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max = max_chars.max(1);
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    // Current chunk and its length in chars.
    let mut current: Option<(String, usize)> = None;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if let Some((buf, len)) = current.as_mut() {
            if *len + 1 + line_len <= max {
                buf.push('\n');
                buf.push_str(line);
                *len += 1 + line_len;
                continue;
            }
            chunks.push(std::mem::take(buf));
        }

        if line_len <= max {
            current = Some((line.to_string(), line_len));
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut pieces = chars.chunks(max).map(|piece| piece.iter().collect::<String>());
        let mut last = pieces.next();
        for piece in pieces {
            if let Some(done) = last.replace(piece) {
                chunks.push(done);
            }
        }
        current = last.map(|piece| {
            let len = piece.chars().count();
            (piece, len)
        });
    }

    if let Some((buf, _)) = current {
        chunks.push(buf);
    }
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

// ---------------------------------------------------------------------------
// Server operations
// ---------------------------------------------------------------------------

/// `ServerOps` over the Discord REST API.
pub struct DiscordServer {
    http: Arc<Http>,
}

impl DiscordServer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn http(&self) -> &Http {
        &self.http
    }

    async fn guild_channels(&self, server_id: &str) -> PlatformResult<Vec<GuildChannel>> {
        let guild = GuildId::new(parse_id(server_id)?);
        let channels = guild.channels(self.http()).await.map_err(rejected)?;
        Ok(channels.into_values().collect())
    }

    /// Lowest id wins when several channels share a name.
    async fn find_channel(&self, server_id: &str, name: &str, kind: ChannelType) -> PlatformResult<Option<ResourceRef>> {
        let found = self
            .guild_channels(server_id)
            .await?
            .into_iter()
            .filter(|c| c.kind == kind && c.name == name)
            .min_by_key(|c| c.id);
        Ok(found.map(|c| ResourceRef::new(c.id.to_string(), c.name)))
    }
}

fn parse_id(raw: &str) -> PlatformResult<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| PlatformError::InvalidId(raw.to_string()))
}

fn rejected(err: serenity::Error) -> PlatformError {
    warn!(error = %err, "Discord rejected request");
    PlatformError::Rejected(err.to_string())
}

/// Walk a user-id-ordered listing page by page until `matches` hits or a
/// short page marks the end.
async fn find_paged<T, F, Fut>(
    mut fetch: F,
    page_size: usize,
    cursor: impl Fn(&T) -> UserId,
    mut matches: impl FnMut(&T) -> bool,
) -> PlatformResult<Option<T>>
where
    F: FnMut(Option<UserId>) -> Fut,
    Fut: Future<Output = PlatformResult<Vec<T>>>,
{
    let mut after = None;
    loop {
        let page = fetch(after).await?;
        let full = page.len() >= page_size;
        let last = page.last().map(&cursor);
        if let Some(found) = page.into_iter().find(|item| matches(item)) {
            return Ok(Some(found));
        }
        match last {
            Some(id) if full => after = Some(id),
            _ => return Ok(None),
        }
    }
}

/// `<@123>` / `<@!123>` mentions carry the user id.
fn mention_id(query: &str) -> Option<u64> {
    let inner = query.strip_prefix("<@")?.strip_suffix('>')?;
    inner.trim_start_matches('!').parse().ok()
}

/// Match a member by mention, username, global name or server nickname.
fn member_matches(member: &Member, query: &str) -> bool {
    let query = query.trim();
    if let Some(id) = mention_id(query) {
        return member.user.id.get() == id;
    }
    let query = query.trim_start_matches('@');
    member.user.name == query
        || member.user.global_name.as_deref() == Some(query)
        || member.nick.as_deref() == Some(query)
}

#[async_trait]
impl ServerOps for DiscordServer {
    async fn find_text_channel(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>> {
        self.find_channel(server_id, name, ChannelType::Text).await
    }

    async fn create_text_channel(
        &self,
        server_id: &str,
        name: &str,
        category_id: Option<&str>,
    ) -> PlatformResult<ResourceRef> {
        let guild = GuildId::new(parse_id(server_id)?);
        let mut builder = CreateChannel::new(name).kind(ChannelType::Text);
        if let Some(category_id) = category_id {
            builder = builder.category(ChannelId::new(parse_id(category_id)?));
        }
        let channel = guild.create_channel(self.http(), builder).await.map_err(rejected)?;
        info!(server_id, channel = %channel.name, "Created Discord channel");
        Ok(ResourceRef::new(channel.id.to_string(), channel.name))
    }

    async fn delete_channel(&self, _server_id: &str, channel_id: &str) -> PlatformResult<()> {
        ChannelId::new(parse_id(channel_id)?)
            .delete(self.http())
            .await
            .map_err(rejected)?;
        Ok(())
    }

    async fn rename_channel(&self, _server_id: &str, channel_id: &str, new_name: &str) -> PlatformResult<()> {
        ChannelId::new(parse_id(channel_id)?)
            .edit(self.http(), EditChannel::new().name(new_name))
            .await
            .map_err(rejected)?;
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> PlatformResult<ResourceRef> {
        let message = ChannelId::new(parse_id(channel_id)?)
            .say(self.http(), content)
            .await
            .map_err(rejected)?;
        Ok(ResourceRef::new(message.id.to_string(), content))
    }

    async fn pin_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()> {
        ChannelId::new(parse_id(channel_id)?)
            .pin(self.http(), MessageId::new(parse_id(message_id)?))
            .await
            .map_err(rejected)
    }

    async fn find_category(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>> {
        self.find_channel(server_id, name, ChannelType::Category).await
    }

    async fn create_category(&self, server_id: &str, name: &str) -> PlatformResult<ResourceRef> {
        let guild = GuildId::new(parse_id(server_id)?);
        let category = guild
            .create_channel(self.http(), CreateChannel::new(name).kind(ChannelType::Category))
            .await
            .map_err(rejected)?;
        Ok(ResourceRef::new(category.id.to_string(), category.name))
    }

    async fn find_role(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>> {
        let guild = GuildId::new(parse_id(server_id)?);
        let roles = guild.roles(self.http()).await.map_err(rejected)?;
        Ok(roles
            .into_values()
            .filter(|r| r.name == name)
            .min_by_key(|r| r.id)
            .map(|r| ResourceRef::new(r.id.to_string(), r.name)))
    }

    async fn create_role(&self, server_id: &str, name: &str) -> PlatformResult<ResourceRef> {
        let guild = GuildId::new(parse_id(server_id)?);
        let role = guild
            .create_role(self.http(), EditRole::new().name(name))
            .await
            .map_err(rejected)?;
        Ok(ResourceRef::new(role.id.to_string(), role.name))
    }

    async fn delete_role(&self, server_id: &str, role_id: &str) -> PlatformResult<()> {
        GuildId::new(parse_id(server_id)?)
            .delete_role(self.http(), RoleId::new(parse_id(role_id)?))
            .await
            .map_err(rejected)
    }

    async fn find_member(&self, server_id: &str, name: &str) -> PlatformResult<Option<MemberRef>> {
        let guild = GuildId::new(parse_id(server_id)?);
        let http = self.http();
        let found = find_paged(
            |after| async move {
                guild
                    .members(http, Some(MEMBER_PAGE_SIZE as u64), after)
                    .await
                    .map_err(rejected)
            },
            MEMBER_PAGE_SIZE,
            |m: &Member| m.user.id,
            |m| member_matches(m, name),
        )
        .await?;
        Ok(found.map(|m| MemberRef {
            id: m.user.id.to_string(),
            name: m.display_name().to_string(),
            role_ids: m.roles.iter().map(|r| r.to_string()).collect(),
        }))
    }

    async fn add_member_role(&self, server_id: &str, member_id: &str, role_id: &str) -> PlatformResult<()> {
        self.http
            .add_member_role(
                GuildId::new(parse_id(server_id)?),
                UserId::new(parse_id(member_id)?),
                RoleId::new(parse_id(role_id)?),
                Some(AUDIT_LOG_REASON),
            )
            .await
            .map_err(rejected)
    }

    async fn remove_member_role(&self, server_id: &str, member_id: &str, role_id: &str) -> PlatformResult<()> {
        self.http
            .remove_member_role(
                GuildId::new(parse_id(server_id)?),
                UserId::new(parse_id(member_id)?),
                RoleId::new(parse_id(role_id)?),
                Some(AUDIT_LOG_REASON),
            )
            .await
            .map_err(rejected)
    }
}
