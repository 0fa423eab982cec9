use std::collections::HashMap;

use haven_types::{ChannelId, ChannelMember, ChannelRole, Message, UserId};

/// Supplies the viewer's role in a channel.
pub trait MembershipGate {
    fn role(&self, channel_id: &ChannelId, user_id: &UserId) -> Option<ChannelRole>;
}

/// Gate over a fetched member list.
#[derive(Debug, Clone, Default)]
pub struct MemberList {
    roles: HashMap<(ChannelId, UserId), ChannelRole>,
}

impl MemberList {
    pub fn new(members: impl IntoIterator<Item = ChannelMember>) -> Self {
        Self {
            roles: members
                .into_iter()
                .map(|m| ((m.channel_id, m.user_id), m.role))
                .collect(),
        }
    }
}

impl MembershipGate for MemberList {
    fn role(&self, channel_id: &ChannelId, user_id: &UserId) -> Option<ChannelRole> {
        self.roles.get(&(channel_id.clone(), user_id.clone())).copied()
    }
}

/// What the viewer may do in one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    pub viewer: UserId,
    pub role: Option<ChannelRole>,
}

impl Permissions {
    pub fn resolve(gate: &impl MembershipGate, channel_id: &ChannelId, viewer: &UserId) -> Self {
        Self {
            viewer: viewer.clone(),
            role: gate.role(channel_id, viewer),
        }
    }

    pub fn is_member(&self) -> bool {
        self.role.is_some()
    }

    /// Post new messages and replies.
    pub fn can_post(&self) -> bool {
        self.is_member()
    }

    pub fn can_react(&self) -> bool {
        self.is_member()
    }

    pub fn can_edit(&self, message: &Message) -> bool {
        self.is_member() && message.author.id == self.viewer
    }

    pub fn can_delete(&self, message: &Message) -> bool {
        match self.role {
            Some(role) => role.can_moderate() || message.author.id == self.viewer,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use haven_types::Author;

    fn member(user: &str, role: ChannelRole) -> ChannelMember {
        ChannelMember {
            channel_id: "general".into(),
            user_id: user.into(),
            role,
            joined_at: None,
        }
    }

    fn perms(user: &str) -> Permissions {
        let gate = MemberList::new(vec![
            member("alice", ChannelRole::Member),
            member("mod", ChannelRole::Moderator),
        ]);
        Permissions::resolve(&gate, &"general".into(), &user.into())
    }

    #[test]
    fn members_post_and_react() {
        let p = perms("alice");
        assert!(p.can_post());
        assert!(p.can_react());
    }

    #[test]
    fn outsiders_can_do_nothing() {
        let p = perms("mallory");
        assert!(!p.can_post());
        assert!(!p.can_react());

        let theirs = Message::new("1", "general", Author::new("mallory"), "hi", Utc::now());
        assert!(!p.can_edit(&theirs));
        assert!(!p.can_delete(&theirs));
    }

    #[test]
    fn only_authors_edit_but_moderators_delete() {
        let bobs = Message::new("1", "general", Author::new("bob"), "hi", Utc::now());
        let alices = Message::new("2", "general", Author::new("alice"), "hi", Utc::now());

        assert!(!perms("alice").can_edit(&bobs));
        assert!(perms("alice").can_edit(&alices));
        assert!(!perms("alice").can_delete(&bobs));
        assert!(perms("alice").can_delete(&alices));

        assert!(!perms("mod").can_edit(&bobs));
        assert!(perms("mod").can_delete(&bobs));
    }
}
