//! Platform operations on a chat server (a Discord guild, or an in-memory stand-in).
//!
//! Lookups return `Ok(None)` when nothing matches; only transport or
//! permission problems are errors.

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("the platform rejected the operation: {0}")]
    Rejected(String),

    #[error("invalid platform id: {0}")]
    InvalidId(String),
}

/// A named server resource (channel, category, role, message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A server member and the roles they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub id: String,
    pub name: String,
    pub role_ids: Vec<String>,
}

impl MemberRef {
    /// Platform mention markup.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.iter().any(|r| r == role_id)
    }
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[async_trait]
pub trait ServerOps: Send + Sync {
    // Text channels
    async fn find_text_channel(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>>;
    async fn create_text_channel(
        &self,
        server_id: &str,
        name: &str,
        category_id: Option<&str>,
    ) -> PlatformResult<ResourceRef>;
    async fn delete_channel(&self, server_id: &str, channel_id: &str) -> PlatformResult<()>;
    async fn rename_channel(&self, server_id: &str, channel_id: &str, new_name: &str) -> PlatformResult<()>;

    // Messages
    async fn send_message(&self, channel_id: &str, content: &str) -> PlatformResult<ResourceRef>;
    async fn pin_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()>;

    // Categories
    async fn find_category(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>>;
    async fn create_category(&self, server_id: &str, name: &str) -> PlatformResult<ResourceRef>;

    // Roles
    async fn find_role(&self, server_id: &str, name: &str) -> PlatformResult<Option<ResourceRef>>;
    async fn create_role(&self, server_id: &str, name: &str) -> PlatformResult<ResourceRef>;
    async fn delete_role(&self, server_id: &str, role_id: &str) -> PlatformResult<()>;

    // Members
    async fn find_member(&self, server_id: &str, name: &str) -> PlatformResult<Option<MemberRef>>;
    async fn add_member_role(&self, server_id: &str, member_id: &str, role_id: &str) -> PlatformResult<()>;
    async fn remove_member_role(&self, server_id: &str, member_id: &str, role_id: &str) -> PlatformResult<()>;
}

/// Normalise a channel name the way chat platforms store text channels:
/// trimmed, lowercase, whitespace runs collapsed to `-`.
pub fn normalize_channel_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_are_normalized() {
        assert_eq!(normalize_channel_name("Soporte Técnico"), "soporte-técnico");
        assert_eq!(normalize_channel_name("  anuncios  "), "anuncios");
        assert_eq!(normalize_channel_name("a   b"), "a-b");
    }

    #[test]
    fn member_role_lookup_and_mention() {
        let member = MemberRef {
            id: "7".into(),
            name: "Ana".into(),
            role_ids: vec!["r1".into()],
        };
        assert!(member.has_role("r1"));
        assert!(!member.has_role("r2"));
        assert_eq!(member.mention(), "<@7>");
    }
}
