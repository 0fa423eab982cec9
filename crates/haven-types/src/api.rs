//! REST wire shapes.
//!
//! The server's field names differ from the client model in a few places
//! (`user_id` vs author, `profiles` vs `sender`, `parent_id` in older
//! builds). All of that is absorbed here; nothing past `into_message` sees
//! wire naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Author, ChannelId, Message, MessageId, UserId};
use crate::reactions::{Reaction, ReactionLedger};

// -- Messages --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<MessageId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: MessageId,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    pub user_id: UserId,
    #[serde(default, alias = "sender", alias = "user")]
    pub profiles: Option<ProfileResponse>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, alias = "parent_id")]
    pub parent_message_id: Option<MessageId>,
    #[serde(default)]
    pub reactions: Vec<ReactionResponse>,
}

impl MessageResponse {
    /// Map to the client model. `channel_id` is used when the payload omits it.
    pub fn into_message(self, channel_id: &ChannelId) -> Message {
        let author = match self.profiles {
            Some(profile) if !profile.username.is_empty() => Author {
                id: self.user_id,
                username: profile.username,
                avatar_url: profile.avatar_url,
            },
            _ => Author::new(self.user_id),
        };
        Message {
            id: self.id,
            channel_id: self.channel_id.unwrap_or_else(|| channel_id.clone()),
            author,
            content: self.content,
            created_at: self.created_at,
            is_edited: self.is_edited,
            is_deleted: self.is_deleted,
            parent_message_id: self.parent_message_id,
            reactions: self
                .reactions
                .into_iter()
                .map(|r| Reaction::new(r.emoji, r.user_id))
                .collect::<ReactionLedger>(),
        }
    }
}

// -- Reactions --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub emoji: String,
    pub user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddReactionRequest {
    pub emoji: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_server_message_with_profiles() {
        let json = r#"{
            "id": "m2",
            "content": "reply",
            "created_at": "2024-03-01T12:00:00.000Z",
            "is_edited": false,
            "parent_message_id": "m1",
            "user_id": "u1",
            "profiles": {"username": "alice", "avatar_url": null},
            "reactions": [{"emoji": "👍", "user_id": "u2", "profiles": {"username": "bob"}}]
        }"#;
        let wire: MessageResponse = serde_json::from_str(json).unwrap();
        let msg = wire.into_message(&ChannelId::from("general"));

        assert_eq!(msg.channel_id, ChannelId::from("general"));
        assert_eq!(msg.author.username, "alice");
        assert_eq!(msg.parent_message_id, Some(MessageId::from("m1")));
        assert_eq!(msg.reactions.count("👍"), 1);
    }

    #[test]
    fn accepts_legacy_field_names() {
        let json = r#"{
            "id": "m3",
            "channel_id": "random",
            "user_id": "u9",
            "sender": {"username": "zoe"},
            "content": "hi",
            "created_at": "2024-03-01T12:00:00Z",
            "parent_id": null
        }"#;
        let wire: MessageResponse = serde_json::from_str(json).unwrap();
        let msg = wire.into_message(&ChannelId::from("general"));

        assert_eq!(msg.channel_id, ChannelId::from("random"));
        assert_eq!(msg.author.username, "zoe");
        assert!(msg.parent_message_id.is_none());
        assert!(msg.reactions.is_empty());
    }

    #[test]
    fn send_request_omits_missing_parent() {
        let req = SendMessageRequest {
            content: "hello".into(),
            parent_message_id: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"content":"hello"}"#);
    }
}
