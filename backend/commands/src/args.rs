/// Typed argument records, one per action, built only from resolved parameters.
use std::time::Duration;

use crate::resolver::{ResolveError, ResolvedParams};
use crate::types::{ActionDescriptor, ActionKind};

/// Delay used when a reminder does not say when.
pub const DEFAULT_REMINDER_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChannelArgs {
    pub name: String,
    /// `None` means "no category".
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameChannelArgs {
    pub name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessageArgs {
    pub channel: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRoleArgs {
    pub user: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderArgs {
    pub content: String,
    pub delay: Duration,
}

/// The arguments of one fully resolved action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionArgs {
    CreateChannel(CreateChannelArgs),
    DeleteChannel { name: String },
    RenameChannel(RenameChannelArgs),
    SendMessage(ChannelMessageArgs),
    PinMessage(ChannelMessageArgs),
    CreateCategory { name: String },
    DeleteCategory { name: String },
    CreateRole { name: String },
    DeleteRole { name: String },
    AssignRole(MemberRoleArgs),
    RemoveRole(MemberRoleArgs),
    Reminder(ReminderArgs),
}

impl ActionArgs {
    /// Build the typed record for `descriptor` from its resolved parameters.
    pub fn build(descriptor: &ActionDescriptor, params: &ResolvedParams) -> Result<Self, ResolveError> {
        let text = |name: &str| -> Result<String, ResolveError> {
            params.text(name).map(str::to_string).ok_or_else(|| ResolveError::Missing {
                param: name.to_string(),
                description: descriptor
                    .param(name)
                    .map(|p| p.description.clone())
                    .unwrap_or_default(),
            })
        };

        let args = match descriptor.kind {
            ActionKind::CreateChannel => ActionArgs::CreateChannel(CreateChannelArgs {
                name: text("nombre")?,
                category: params.text("categoria").map(str::to_string),
            }),
            ActionKind::DeleteChannel => ActionArgs::DeleteChannel { name: text("nombre")? },
            ActionKind::RenameChannel => ActionArgs::RenameChannel(RenameChannelArgs {
                name: text("nombre")?,
                new_name: text("nuevo_nombre")?,
            }),
            ActionKind::SendMessage => ActionArgs::SendMessage(ChannelMessageArgs {
                channel: text("canal")?,
                content: text("contenido")?,
            }),
            ActionKind::PinMessage => ActionArgs::PinMessage(ChannelMessageArgs {
                channel: text("canal")?,
                content: text("contenido")?,
            }),
            ActionKind::CreateCategory => ActionArgs::CreateCategory { name: text("nombre")? },
            ActionKind::DeleteCategory => ActionArgs::DeleteCategory { name: text("nombre")? },
            ActionKind::CreateRole => ActionArgs::CreateRole { name: text("nombre")? },
            ActionKind::DeleteRole => ActionArgs::DeleteRole { name: text("nombre")? },
            ActionKind::AssignRole => ActionArgs::AssignRole(MemberRoleArgs {
                user: text("usuario")?,
                role: text("rol")?,
            }),
            ActionKind::RemoveRole => ActionArgs::RemoveRole(MemberRoleArgs {
                user: text("usuario")?,
                role: text("rol")?,
            }),
            ActionKind::Reminder => ActionArgs::Reminder(ReminderArgs {
                content: text("contenido")?,
                delay: Duration::from_secs(params.number("segundos").unwrap_or(DEFAULT_REMINDER_SECS)),
            }),
        };
        Ok(args)
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionArgs::CreateChannel(_) => ActionKind::CreateChannel,
            ActionArgs::DeleteChannel { .. } => ActionKind::DeleteChannel,
            ActionArgs::RenameChannel(_) => ActionKind::RenameChannel,
            ActionArgs::SendMessage(_) => ActionKind::SendMessage,
            ActionArgs::PinMessage(_) => ActionKind::PinMessage,
            ActionArgs::CreateCategory { .. } => ActionKind::CreateCategory,
            ActionArgs::DeleteCategory { .. } => ActionKind::DeleteCategory,
            ActionArgs::CreateRole { .. } => ActionKind::CreateRole,
            ActionArgs::DeleteRole { .. } => ActionKind::DeleteRole,
            ActionArgs::AssignRole(_) => ActionKind::AssignRole,
            ActionArgs::RemoveRole(_) => ActionKind::RemoveRole,
            ActionArgs::Reminder(_) => ActionKind::Reminder,
        }
    }
}
