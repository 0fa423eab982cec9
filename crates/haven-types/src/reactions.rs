use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// A single (emoji, user) marker on a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub user_id: UserId,
}

impl Reaction {
    pub fn new(emoji: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            emoji: emoji.into(),
            user_id: user_id.into(),
        }
    }

    fn matches(&self, emoji: &str, user_id: &UserId) -> bool {
        self.emoji == emoji && self.user_id == *user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// Per-emoji projection of a ledger for one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: usize,
    pub user_ids: Vec<UserId>,
    /// Whether the viewer is one of `user_ids`.
    pub acted: bool,
}

/// Reactions on one message, in arrival order.
///
/// Holds at most one entry per (emoji, user). The wire form is a plain list;
/// duplicate pairs in it are dropped on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Reaction>", into = "Vec<Reaction>")]
pub struct ReactionLedger {
    entries: Vec<Reaction>,
}

impl ReactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, emoji: &str, user_id: &UserId) -> bool {
        self.entries.iter().any(|r| r.matches(emoji, user_id))
    }

    /// Returns true if the pair was not present before.
    pub fn add(&mut self, emoji: &str, user_id: &UserId) -> bool {
        if self.contains(emoji, user_id) {
            return false;
        }
        self.entries.push(Reaction::new(emoji, user_id.clone()));
        true
    }

    /// Returns true if the pair was present.
    pub fn remove(&mut self, emoji: &str, user_id: &UserId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|r| !r.matches(emoji, user_id));
        self.entries.len() != before
    }

    /// Flip the presence of (emoji, user).
    pub fn toggle(&mut self, emoji: &str, user_id: &UserId) -> ToggleOutcome {
        if self.remove(emoji, user_id) {
            ToggleOutcome::Removed
        } else {
            self.entries.push(Reaction::new(emoji, user_id.clone()));
            ToggleOutcome::Added
        }
    }

    pub fn count(&self, emoji: &str) -> usize {
        self.entries.iter().filter(|r| r.emoji == emoji).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reaction> {
        self.entries.iter()
    }

    /// Group by emoji, ordered by each emoji's first appearance.
    pub fn groups(&self, viewer: Option<&UserId>) -> Vec<ReactionGroup> {
        let mut groups: Vec<ReactionGroup> = Vec::new();
        for reaction in &self.entries {
            let idx = match groups.iter().position(|g| g.emoji == reaction.emoji) {
                Some(idx) => idx,
                None => {
                    groups.push(ReactionGroup {
                        emoji: reaction.emoji.clone(),
                        count: 0,
                        user_ids: Vec::new(),
                        acted: false,
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx];
            group.count += 1;
            group.user_ids.push(reaction.user_id.clone());
            if viewer == Some(&reaction.user_id) {
                group.acted = true;
            }
        }
        groups
    }
}

impl From<Vec<Reaction>> for ReactionLedger {
    fn from(reactions: Vec<Reaction>) -> Self {
        let mut ledger = Self::default();
        for reaction in reactions {
            ledger.add(&reaction.emoji, &reaction.user_id);
        }
        ledger
    }
}

impl From<ReactionLedger> for Vec<Reaction> {
    fn from(ledger: ReactionLedger) -> Self {
        ledger.entries
    }
}

impl FromIterator<Reaction> for ReactionLedger {
    fn from_iter<I: IntoIterator<Item = Reaction>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}
