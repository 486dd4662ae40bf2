/// Server action handlers.
///
/// Every creation checks for an existing resource first and every mutation
/// checks that its target exists first; in both cases the check happens
/// before any mutating call. The check and the mutation are not atomic:
/// two turns racing on the same name can both pass the check.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lume_core::ConversationId;
use thiserror::Error;
use tracing::{info, warn};

use crate::args::{ActionArgs, ChannelMessageArgs, CreateChannelArgs, MemberRoleArgs, RenameChannelArgs, ReminderArgs};
use crate::server::{normalize_channel_name, PlatformError, ServerOps};

// ---------------------------------------------------------------------------
// Context, reply, error
// ---------------------------------------------------------------------------

/// Where an action was requested from.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub conversation_id: ConversationId,
    /// `None` outside a server (direct messages, local REPL without a server).
    pub server_id: Option<String>,
    pub author_id: String,
}

impl ActionContext {
    pub fn new(conversation_id: ConversationId, server_id: Option<String>, author_id: impl Into<String>) -> Self {
        Self {
            conversation_id,
            server_id,
            author_id: author_id.into(),
        }
    }
}

/// A deferred second reply (reminders).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub delay: Duration,
    pub text: String,
}

/// Successful handler result: the status text, plus an optional follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReply {
    pub text: String,
    pub follow_up: Option<FollowUp>,
}

impl ActionReply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            follow_up: None,
        }
    }

    pub fn with_follow_up(mut self, delay: Duration, text: impl Into<String>) -> Self {
        self.follow_up = Some(FollowUp {
            delay,
            text: text.into(),
        });
        self
    }
}

/// Kinds of server resource a handler can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Channel,
    Category,
    Role,
    Member,
}

impl ResourceKind {
    fn display_name(&self, name: &str) -> String {
        match self {
            ResourceKind::Channel => format!("el canal #{name}"),
            ResourceKind::Category => format!("la categoría {name}"),
            ResourceKind::Role => format!("el rol {name}"),
            ResourceKind::Member => format!("al usuario {name}"),
        }
    }

    fn existing(&self, name: &str) -> String {
        match self {
            ResourceKind::Channel => format!("un canal llamado #{name}"),
            ResourceKind::Category => format!("una categoría llamada {name}"),
            ResourceKind::Role => format!("un rol llamado {name}"),
            ResourceKind::Member => format!("un usuario llamado {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("❌ No encontré {}", .kind.display_name(.name))]
    NotFound { kind: ResourceKind, name: String },

    #[error("⚠️ Ya existe {}", .kind.existing(.name))]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("⚠️ Esa acción solo se puede hacer dentro de un servidor.")]
    OutsideServer,

    #[error("⚠️ No pude completar la acción: {0}")]
    Platform(#[from] PlatformError),
}

impl HandlerError {
    fn not_found(kind: ResourceKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    fn already_exists(kind: ResourceKind, name: &str) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Channel => "channel",
            ResourceKind::Category => "category",
            ResourceKind::Role => "role",
            ResourceKind::Member => "member",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &ActionContext, args: ActionArgs) -> Result<ActionReply, HandlerError>;
}

fn server_of(ctx: &ActionContext) -> Result<&str, HandlerError> {
    ctx.server_id.as_deref().ok_or(HandlerError::OutsideServer)
}

/// Runs actions against a chat server through `ServerOps`.
pub struct ServerActions {
    server: Arc<dyn ServerOps>,
}

impl ServerActions {
    pub fn new(server: Arc<dyn ServerOps>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl ActionHandler for ServerActions {
    async fn handle(&self, ctx: &ActionContext, args: ActionArgs) -> Result<ActionReply, HandlerError> {
        info!(
            conversation_id = %ctx.conversation_id,
            action = ?args.kind(),
            "Running server action"
        );

        let text = match args {
            // Reminders only need the conversation.
            ActionArgs::Reminder(args) => return Ok(reminder(args)),
            ActionArgs::CreateChannel(args) => self.create_channel(server_of(ctx)?, args).await?,
            ActionArgs::DeleteChannel { name } => self.delete_channel(server_of(ctx)?, &name).await?,
            ActionArgs::RenameChannel(args) => self.rename_channel(server_of(ctx)?, args).await?,
            ActionArgs::SendMessage(args) => self.send_message(server_of(ctx)?, args).await?,
            ActionArgs::PinMessage(args) => self.pin_message(server_of(ctx)?, args).await?,
            ActionArgs::CreateCategory { name } => self.create_category(server_of(ctx)?, &name).await?,
            ActionArgs::DeleteCategory { name } => self.delete_category(server_of(ctx)?, &name).await?,
            ActionArgs::CreateRole { name } => self.create_role(server_of(ctx)?, &name).await?,
            ActionArgs::DeleteRole { name } => self.delete_role(server_of(ctx)?, &name).await?,
            ActionArgs::AssignRole(args) => self.assign_role(server_of(ctx)?, args).await?,
            ActionArgs::RemoveRole(args) => self.remove_role(server_of(ctx)?, args).await?,
        };
        Ok(ActionReply::ok(text))
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

impl ServerActions {
    async fn create_channel(&self, server_id: &str, args: CreateChannelArgs) -> Result<String, HandlerError> {
        let name = normalize_channel_name(&args.name);
        if self.server.find_text_channel(server_id, &name).await?.is_some() {
            return Err(HandlerError::already_exists(ResourceKind::Channel, &name));
        }

        let category_id = match &args.category {
            Some(category) => Some(
                self.server
                    .find_category(server_id, category)
                    .await?
                    .ok_or_else(|| HandlerError::not_found(ResourceKind::Category, category))?
                    .id,
            ),
            None => None,
        };

        self.server
            .create_text_channel(server_id, &name, category_id.as_deref())
            .await?;
        Ok(match &args.category {
            Some(category) => format!("✅ Canal creado: #{name} (en {category})"),
            None => format!("✅ Canal creado: #{name}"),
        })
    }

    async fn delete_channel(&self, server_id: &str, name: &str) -> Result<String, HandlerError> {
        let name = normalize_channel_name(name);
        let channel = self
            .server
            .find_text_channel(server_id, &name)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Channel, &name))?;
        self.server.delete_channel(server_id, &channel.id).await?;
        Ok(format!("🗑️ Canal eliminado: #{name}"))
    }

    async fn rename_channel(&self, server_id: &str, args: RenameChannelArgs) -> Result<String, HandlerError> {
        let name = normalize_channel_name(&args.name);
        let new_name = normalize_channel_name(&args.new_name);
        let channel = self
            .server
            .find_text_channel(server_id, &name)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Channel, &name))?;
        if name != new_name && self.server.find_text_channel(server_id, &new_name).await?.is_some() {
            return Err(HandlerError::already_exists(ResourceKind::Channel, &new_name));
        }
        self.server.rename_channel(server_id, &channel.id, &new_name).await?;
        Ok(format!("✏️ Canal renombrado: #{name} → #{new_name}"))
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    async fn send_message(&self, server_id: &str, args: ChannelMessageArgs) -> Result<String, HandlerError> {
        let name = normalize_channel_name(&args.channel);
        let channel = self
            .server
            .find_text_channel(server_id, &name)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Channel, &name))?;
        self.server.send_message(&channel.id, &args.content).await?;
        Ok(format!("📨 Mensaje enviado a #{name}"))
    }

    async fn pin_message(&self, server_id: &str, args: ChannelMessageArgs) -> Result<String, HandlerError> {
        let name = normalize_channel_name(&args.channel);
        let channel = self
            .server
            .find_text_channel(server_id, &name)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Channel, &name))?;
        let message = self.server.send_message(&channel.id, &args.content).await?;
        // The message is already posted; report a partial success.
        if let Err(e) = self.server.pin_message(&channel.id, &message.id).await {
            warn!(channel = %name, error = %e, "Message sent but pin failed");
            return Ok(format!("⚠️ Mensaje enviado en #{name}, pero no pude fijarlo: {e}"));
        }
        Ok(format!("📌 Mensaje fijado en #{name}"))
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    async fn create_category(&self, server_id: &str, name: &str) -> Result<String, HandlerError> {
        if self.server.find_category(server_id, name).await?.is_some() {
            return Err(HandlerError::already_exists(ResourceKind::Category, name));
        }
        self.server.create_category(server_id, name).await?;
        Ok(format!("📂 Categoría creada: {name}"))
    }

    async fn delete_category(&self, server_id: &str, name: &str) -> Result<String, HandlerError> {
        let category = self
            .server
            .find_category(server_id, name)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Category, name))?;
        self.server.delete_channel(server_id, &category.id).await?;
        Ok(format!("🗑️ Categoría eliminada: {name}"))
    }

    // -----------------------------------------------------------------------
    // Roles
    // -----------------------------------------------------------------------

    async fn create_role(&self, server_id: &str, name: &str) -> Result<String, HandlerError> {
        if self.server.find_role(server_id, name).await?.is_some() {
            return Err(HandlerError::already_exists(ResourceKind::Role, name));
        }
        self.server.create_role(server_id, name).await?;
        Ok(format!("🎭 Rol creado: {name}"))
    }

    async fn delete_role(&self, server_id: &str, name: &str) -> Result<String, HandlerError> {
        let role = self
            .server
            .find_role(server_id, name)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Role, name))?;
        self.server.delete_role(server_id, &role.id).await?;
        Ok(format!("🗑️ Rol eliminado: {name}"))
    }

    async fn assign_role(&self, server_id: &str, args: MemberRoleArgs) -> Result<String, HandlerError> {
        let member = self
            .server
            .find_member(server_id, &args.user)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Member, &args.user))?;
        let role = self
            .server
            .find_role(server_id, &args.role)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Role, &args.role))?;

        if member.has_role(&role.id) {
            return Ok(format!("ℹ️ {} ya tiene el rol '{}'", member.mention(), role.name));
        }
        self.server.add_member_role(server_id, &member.id, &role.id).await?;
        Ok(format!("🎭 Rol '{}' asignado a {}", role.name, member.mention()))
    }

    async fn remove_role(&self, server_id: &str, args: MemberRoleArgs) -> Result<String, HandlerError> {
        let member = self
            .server
            .find_member(server_id, &args.user)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Member, &args.user))?;
        let role = self
            .server
            .find_role(server_id, &args.role)
            .await?
            .ok_or_else(|| HandlerError::not_found(ResourceKind::Role, &args.role))?;

        if !member.has_role(&role.id) {
            return Ok(format!("ℹ️ {} no tiene el rol '{}'", member.mention(), role.name));
        }
        self.server.remove_member_role(server_id, &member.id, &role.id).await?;
        Ok(format!("🎭 Rol '{}' retirado a {}", role.name, member.mention()))
    }
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

fn reminder(args: ReminderArgs) -> ActionReply {
    ActionReply::ok(format!("⏳ Te recordaré eso en {} segundos.", args.delay.as_secs()))
        .with_follow_up(args.delay, format!("🔔 Recordatorio: {}", args.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::InMemoryServer;

    const GUILD: &str = "guild-1";

    fn ctx() -> ActionContext {
        ActionContext::new("chan".into(), Some(GUILD.to_string()), "author")
    }

    fn setup() -> (Arc<InMemoryServer>, ServerActions) {
        let server = Arc::new(InMemoryServer::new());
        let actions = ServerActions::new(server.clone());
        (server, actions)
    }

    fn create_channel(name: &str) -> ActionArgs {
        ActionArgs::CreateChannel(CreateChannelArgs {
            name: name.into(),
            category: None,
        })
    }

    #[tokio::test]
    async fn create_channel_is_idempotent() {
        let (server, actions) = setup();

        let first = actions.handle(&ctx(), create_channel("soporte")).await.unwrap();
        assert_eq!(first.text, "✅ Canal creado: #soporte");

        let second = actions.handle(&ctx(), create_channel("soporte")).await.unwrap_err();
        assert_eq!(second.to_string(), "⚠️ Ya existe un canal llamado #soporte");
        assert_eq!(server.mutation_count().await, 1);
    }

    #[tokio::test]
    async fn create_channel_normalizes_name() {
        let (server, actions) = setup();
        let reply = actions.handle(&ctx(), create_channel("Soporte Técnico")).await.unwrap();
        assert_eq!(reply.text, "✅ Canal creado: #soporte-técnico");
        assert_eq!(server.text_channel_names(GUILD).await, vec!["soporte-técnico".to_string()]);
    }

    #[tokio::test]
    async fn create_channel_in_category() {
        let (server, actions) = setup();
        let category = server.create_category(GUILD, "Ayuda").await.unwrap();
        let args = ActionArgs::CreateChannel(CreateChannelArgs {
            name: "tickets".into(),
            category: Some("Ayuda".into()),
        });
        actions.handle(&ctx(), args).await.unwrap();
        assert_eq!(server.channel_category(GUILD, "tickets").await, Some(category.id));
    }

    #[tokio::test]
    async fn create_channel_in_missing_category_has_no_side_effect() {
        let (server, actions) = setup();
        let args = ActionArgs::CreateChannel(CreateChannelArgs {
            name: "tickets".into(),
            category: Some("Nada".into()),
        });
        let err = actions.handle(&ctx(), args).await.unwrap_err();
        assert_eq!(err, HandlerError::not_found(ResourceKind::Category, "Nada"));
        assert_eq!(server.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn delete_missing_channel_is_not_found_without_side_effect() {
        let (server, actions) = setup();
        let err = actions
            .handle(&ctx(), ActionArgs::DeleteChannel { name: "fantasma".into() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "❌ No encontré el canal #fantasma");
        assert_eq!(server.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn rename_missing_channel_is_not_found_without_side_effect() {
        let (server, actions) = setup();
        let args = ActionArgs::RenameChannel(RenameChannelArgs {
            name: "viejo".into(),
            new_name: "nuevo".into(),
        });
        let err = actions.handle(&ctx(), args).await.unwrap_err();
        assert!(matches!(err, HandlerError::NotFound { kind: ResourceKind::Channel, .. }));
        assert_eq!(server.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn rename_onto_existing_name_is_refused() {
        let (server, actions) = setup();
        server.seed_text_channel(GUILD, "a").await;
        server.seed_text_channel(GUILD, "b").await;
        let args = ActionArgs::RenameChannel(RenameChannelArgs {
            name: "a".into(),
            new_name: "b".into(),
        });
        let err = actions.handle(&ctx(), args).await.unwrap_err();
        assert!(matches!(err, HandlerError::AlreadyExists { .. }));
        assert_eq!(server.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn delete_existing_channel() {
        let (server, actions) = setup();
        server.seed_text_channel(GUILD, "viejo").await;
        let reply = actions
            .handle(&ctx(), ActionArgs::DeleteChannel { name: "viejo".into() })
            .await
            .unwrap();
        assert_eq!(reply.text, "🗑️ Canal eliminado: #viejo");
        assert!(server.text_channel_names(GUILD).await.is_empty());
    }

    #[tokio::test]
    async fn pin_message_posts_then_pins() {
        let (server, actions) = setup();
        let channel_id = server.seed_text_channel(GUILD, "anuncios").await;
        let args = ActionArgs::PinMessage(ChannelMessageArgs {
            channel: "anuncios".into(),
            content: "Reglas".into(),
        });
        let reply = actions.handle(&ctx(), args).await.unwrap();
        assert_eq!(reply.text, "📌 Mensaje fijado en #anuncios");
        assert_eq!(server.channel_messages(&channel_id).await, vec![("Reglas".to_string(), true)]);
    }

    #[tokio::test]
    async fn send_message_to_missing_channel() {
        let (server, actions) = setup();
        let args = ActionArgs::SendMessage(ChannelMessageArgs {
            channel: "nada".into(),
            content: "hola".into(),
        });
        assert!(actions.handle(&ctx(), args).await.is_err());
        assert_eq!(server.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn category_and_role_lifecycle() {
        let (server, actions) = setup();
        for args in [
            ActionArgs::CreateCategory { name: "Juegos".into() },
            ActionArgs::CreateRole { name: "mod".into() },
            ActionArgs::DeleteCategory { name: "Juegos".into() },
            ActionArgs::DeleteRole { name: "mod".into() },
        ] {
            actions.handle(&ctx(), args).await.unwrap();
        }
        assert_eq!(server.mutation_count().await, 4);

        let err = actions
            .handle(&ctx(), ActionArgs::DeleteRole { name: "mod".into() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "❌ No encontré el rol mod");
    }

    #[tokio::test]
    async fn assign_role_is_idempotent() {
        let (server, actions) = setup();
        let ana = server.seed_member(GUILD, "Ana").await;
        server.seed_role(GUILD, "mod").await;
        let args = || {
            ActionArgs::AssignRole(MemberRoleArgs {
                user: "Ana".into(),
                role: "mod".into(),
            })
        };

        let first = actions.handle(&ctx(), args()).await.unwrap();
        assert_eq!(first.text, format!("🎭 Rol 'mod' asignado a <@{ana}>"));
        let second = actions.handle(&ctx(), args()).await.unwrap();
        assert!(second.text.contains("ya tiene el rol"));
        assert_eq!(server.mutation_count().await, 1);
    }

    #[tokio::test]
    async fn assign_role_to_unknown_member() {
        let (server, actions) = setup();
        server.seed_role(GUILD, "mod").await;
        let err = actions
            .handle(
                &ctx(),
                ActionArgs::AssignRole(MemberRoleArgs {
                    user: "Nadie".into(),
                    role: "mod".into(),
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "❌ No encontré al usuario Nadie");
    }

    #[tokio::test]
    async fn remove_role_without_holding_it_is_a_no_op() {
        let (server, actions) = setup();
        server.seed_member(GUILD, "Ana").await;
        server.seed_role(GUILD, "mod").await;
        let reply = actions
            .handle(
                &ctx(),
                ActionArgs::RemoveRole(MemberRoleArgs {
                    user: "Ana".into(),
                    role: "mod".into(),
                }),
            )
            .await
            .unwrap();
        assert!(reply.text.contains("no tiene el rol"));
        assert_eq!(server.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn reminder_schedules_follow_up_without_server() {
        let (_, actions) = setup();
        let dm = ActionContext::new("dm".into(), None, "author");
        let reply = actions
            .handle(
                &dm,
                ActionArgs::Reminder(ReminderArgs {
                    content: "beber agua".into(),
                    delay: Duration::from_secs(30),
                }),
            )
            .await
            .unwrap();
        assert_eq!(reply.text, "⏳ Te recordaré eso en 30 segundos.");
        assert_eq!(
            reply.follow_up,
            Some(FollowUp {
                delay: Duration::from_secs(30),
                text: "🔔 Recordatorio: beber agua".into()
            })
        );
    }

    #[tokio::test]
    async fn failed_pin_still_reports_the_posted_message() {
        let (server, actions) = setup();
        let channel_id = server.seed_text_channel(GUILD, "anuncios").await;
        server.reject_next_call("pin_message", "Missing Permissions").await;
        let args = ActionArgs::PinMessage(ChannelMessageArgs {
            channel: "anuncios".into(),
            content: "Reglas".into(),
        });
        let reply = actions.handle(&ctx(), args).await.unwrap();
        assert_eq!(
            reply.text,
            "⚠️ Mensaje enviado en #anuncios, pero no pude fijarlo: the platform rejected the operation: Missing Permissions"
        );
        assert_eq!(server.channel_messages(&channel_id).await, vec![("Reglas".to_string(), false)]);
    }

    #[tokio::test]
    async fn reminders_work_outside_a_server() {
        let (server, actions) = setup();
        let dm = ActionContext::new("dm".into(), None, "author");
        let reply = actions
            .handle(
                &dm,
                ActionArgs::Reminder(ReminderArgs {
                    content: "estirar".into(),
                    delay: Duration::from_secs(5),
                }),
            )
            .await
            .unwrap();
        assert!(reply.follow_up.is_some());
        assert_eq!(server.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn server_actions_need_a_server() {
        let (_, actions) = setup();
        let dm = ActionContext::new("dm".into(), None, "author");
        let err = actions.handle(&dm, create_channel("x")).await.unwrap_err();
        assert_eq!(err, HandlerError::OutsideServer);
    }

    #[tokio::test]
    async fn platform_rejection_is_a_handler_error() {
        let (server, actions) = setup();
        server.reject_next("Missing Permissions").await;
        let err = actions.handle(&ctx(), create_channel("x")).await.unwrap_err();
        assert_eq!(
            err,
            HandlerError::Platform(PlatformError::Rejected("Missing Permissions".into()))
        );
    }

    /// Known limitation: the existence check and the creation are not atomic,
    /// so two concurrent requests for the same name can both create it.
    #[tokio::test(start_paused = true)]
    async fn concurrent_creates_race_past_existence_check() {
        let server = Arc::new(InMemoryServer::new().with_lookup_delay(Duration::from_millis(50)));
        let actions = Arc::new(ServerActions::new(server.clone()));

        let a = {
            let actions = actions.clone();
            tokio::spawn(async move { actions.handle(&ctx(), create_channel("soporte")).await })
        };
        let b = {
            let actions = actions.clone();
            tokio::spawn(async move { actions.handle(&ctx(), create_channel("soporte")).await })
        };

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        assert_eq!(server.text_channel_names(GUILD).await, vec!["soporte".to_string(), "soporte".to_string()]);
    }
}
