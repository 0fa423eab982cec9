use serde::{Deserialize, Serialize};

use crate::models::{ChannelId, Message, MessageId, MessagePatch, UserId};

/// Events pushed to the client over the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: UserId },

    /// A new message was posted
    MessageCreate { message: Message },

    /// A message was edited or tombstoned
    MessageUpdate {
        channel_id: ChannelId,
        message_id: MessageId,
        patch: MessagePatch,
    },

    /// A message was removed outright
    MessageDelete {
        channel_id: ChannelId,
        message_id: MessageId,
    },

    /// A reaction was added to a message
    ReactionAdd {
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: String,
    },

    /// A reaction was removed from a message
    ReactionRemove {
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: String,
    },
}

impl GatewayEvent {
    /// Returns the channel_id if this event is scoped to a specific channel.
    /// Events that return `None` are connection-level.
    pub fn channel_id(&self) -> Option<&ChannelId> {
        match self {
            Self::MessageCreate { message } => Some(&message.channel_id),
            Self::MessageUpdate { channel_id, .. }
            | Self::MessageDelete { channel_id, .. }
            | Self::ReactionAdd { channel_id, .. }
            | Self::ReactionRemove { channel_id, .. } => Some(channel_id),
            Self::Ready { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::MessageCreate { .. } => "message_create",
            Self::MessageUpdate { .. } => "message_update",
            Self::MessageDelete { .. } => "message_delete",
            Self::ReactionAdd { .. } => "reaction_add",
            Self::ReactionRemove { .. } => "reaction_remove",
        }
    }
}

/// Commands sent FROM client TO server over the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the connection
    Identify { token: String },

    /// Start receiving channel-scoped events for `channel_id`
    JoinChannel { channel_id: ChannelId },

    /// Stop receiving channel-scoped events for `channel_id`
    LeaveChannel { channel_id: ChannelId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_shape() {
        let cmd = GatewayCommand::JoinChannel {
            channel_id: ChannelId::from("general"),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "JoinChannel");
        assert_eq!(json["data"]["channel_id"], "general");
    }

    #[test]
    fn reaction_event_is_channel_scoped() {
        let json = r#"{
            "type": "ReactionAdd",
            "data": {"channel_id": "c1", "message_id": "9", "user_id": "alice", "emoji": "👍"}
        }"#;
        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.channel_id(), Some(&ChannelId::from("c1")));
        assert_eq!(event.kind(), "reaction_add");
    }

    #[test]
    fn ready_is_not_scoped() {
        let event = GatewayEvent::Ready {
            user_id: UserId::from("alice"),
        };
        assert!(event.channel_id().is_none());
    }
}
