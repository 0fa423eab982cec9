use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reactions::ReactionLedger;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Server-assigned message identifier. Immutable once issued.
    MessageId
);
string_id!(ChannelId);
string_id!(UserId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl Author {
    /// Author known only by id; the username falls back to the id.
    pub fn new(id: impl Into<UserId>) -> Self {
        let id = id.into();
        Self {
            username: id.0.clone(),
            id,
            avatar_url: None,
        }
    }
}

/// A chat message as held by the client.
///
/// `parent_message_id` is the reply edge the author declared. Whether the
/// message is actually shown under that parent depends on the parent being
/// present in the current view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_edited: bool,
    /// Tombstone flag. Deleted messages keep their place in the tree.
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub parent_message_id: Option<MessageId>,
    #[serde(default)]
    pub reactions: ReactionLedger,
}

impl Message {
    pub fn new(
        id: impl Into<MessageId>,
        channel_id: impl Into<ChannelId>,
        author: Author,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            author,
            content: content.into(),
            created_at,
            is_edited: false,
            is_deleted: false,
            parent_message_id: None,
            reactions: ReactionLedger::default(),
        }
    }

    /// Builder-style setter for the declared parent.
    pub fn reply_to(mut self, parent: impl Into<MessageId>) -> Self {
        self.parent_message_id = Some(parent.into());
        self
    }

    pub fn is_reply(&self) -> bool {
        self.parent_message_id.is_some()
    }
}

/// Partial in-place edit of a message.
///
/// Only mutable attributes are representable, so applying a patch can never
/// move a message within its thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_edited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
}

impl MessagePatch {
    /// Content edit; marks the message as edited.
    pub fn edit(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            is_edited: Some(true),
            is_deleted: None,
        }
    }

    pub fn deleted(is_deleted: bool) -> Self {
        Self {
            is_deleted: Some(is_deleted),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.is_edited.is_none() && self.is_deleted.is_none()
    }

    /// Apply to `message`. Returns true if any field actually changed.
    pub fn apply(&self, message: &mut Message) -> bool {
        let mut changed = false;
        if let Some(content) = &self.content {
            if message.content != *content {
                message.content = content.clone();
                changed = true;
            }
        }
        if let Some(is_edited) = self.is_edited {
            changed |= message.is_edited != is_edited;
            message.is_edited = is_edited;
        }
        if let Some(is_deleted) = self.is_deleted {
            changed |= message.is_deleted != is_deleted;
            message.is_deleted = is_deleted;
        }
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    Member,
    Moderator,
    Admin,
}

impl ChannelRole {
    /// Moderators and admins may act on other members' messages.
    pub fn can_moderate(self) -> bool {
        self >= ChannelRole::Moderator
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    pub channel_id: ChannelId,
    #[serde(alias = "profile_id")]
    pub user_id: UserId,
    pub role: ChannelRole,
    pub joined_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message() -> Message {
        Message::new(
            "m1",
            "general",
            Author::new("alice"),
            "hello",
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn patch_edits_content_and_flags() {
        let mut msg = message();
        assert!(MessagePatch::edit("hello, world").apply(&mut msg));
        assert_eq!(msg.content, "hello, world");
        assert!(msg.is_edited);

        // Same patch again changes nothing.
        assert!(!MessagePatch::edit("hello, world").apply(&mut msg));
    }

    #[test]
    fn patch_cannot_touch_thread_fields() {
        let mut msg = message().reply_to("root");
        MessagePatch::deleted(true).apply(&mut msg);
        assert!(msg.is_deleted);
        assert_eq!(msg.parent_message_id, Some(MessageId::from("root")));
        assert_eq!(msg.id, MessageId::from("m1"));
    }

    #[test]
    fn role_ordering() {
        assert!(ChannelRole::Admin.can_moderate());
        assert!(ChannelRole::Moderator.can_moderate());
        assert!(!ChannelRole::Member.can_moderate());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&MessageId::from("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
