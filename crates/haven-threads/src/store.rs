use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use haven_types::{ChannelId, Message, MessageId, MessagePatch, ToggleOutcome, UserId};

use crate::assembler::assemble;
use crate::forest::{ThreadForest, ThreadNode, Walk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Id already present; nothing changed.
    Duplicate,
    /// Message belongs to another channel; nothing changed.
    WrongChannel,
}

/// Mutable reply forest for one open channel.
///
/// All writes go through the methods below. Lookups by id are O(1).
#[derive(Debug, Clone)]
pub struct ThreadStore {
    channel_id: ChannelId,
    forest: ThreadForest,
    /// Ids hard-removed here; a stale fetch must not bring them back.
    removed: HashSet<MessageId>,
}

impl ThreadStore {
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            forest: ThreadForest::new(),
            removed: HashSet::new(),
        }
    }

    /// Assemble a store from a fetched batch. Messages for other channels are
    /// dropped.
    pub fn from_batch(channel_id: ChannelId, batch: Vec<Message>) -> Self {
        let batch = retain_channel(&channel_id, batch);
        Self {
            forest: assemble(batch),
            channel_id,
            removed: HashSet::new(),
        }
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn forest(&self) -> &ThreadForest {
        &self.forest
    }

    pub fn get(&self, id: &MessageId) -> Option<&ThreadNode> {
        self.forest.get(id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.forest.contains(id)
    }

    pub fn len(&self) -> usize {
        self.forest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forest.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &ThreadNode> {
        self.forest.roots()
    }

    pub fn children(&self, id: &MessageId) -> impl Iterator<Item = &ThreadNode> {
        self.forest.children(id)
    }

    pub fn walk(&self) -> Walk<'_> {
        self.forest.walk()
    }

    /// Direct replies under `id`; `None` for unknown ids.
    pub fn reply_count(&self, id: &MessageId) -> Option<usize> {
        self.forest.get(id).map(ThreadNode::reply_count)
    }

    /// Idempotent insert.
    ///
    /// A new message goes under its parent as the last reply, or at the end of
    /// the root list if the parent is not here. Roots that were waiting for
    /// this message as their parent are moved under it.
    pub fn merge_insert(&mut self, message: Message) -> InsertOutcome {
        if message.channel_id != self.channel_id {
            debug!(
                message_id = %message.id,
                channel = %message.channel_id,
                expected = %self.channel_id,
                "ignoring message for another channel"
            );
            return InsertOutcome::WrongChannel;
        }
        if self.forest.contains(&message.id) {
            debug!(message_id = %message.id, "duplicate insert ignored");
            return InsertOutcome::Duplicate;
        }

        let id = message.id.clone();
        self.removed.remove(&id);
        let parent = self.forest.resolve_parent(&message);
        self.forest.index(message);
        match &parent {
            Some(parent) => self.forest.attach(&id, parent),
            None => self.forest.push_root(id.clone()),
        }

        let waiting: Vec<MessageId> = self
            .forest
            .roots()
            .filter(|node| node.id() != &id)
            .filter(|node| node.message().parent_message_id.as_ref() == Some(&id))
            .map(|node| node.id().clone())
            .collect();
        for orphan in &waiting {
            if self.forest.is_ancestor(orphan, &id) {
                continue;
            }
            self.forest.detach(orphan);
            self.forest.attach(orphan, &id);
        }

        debug!(
            message_id = %id,
            parent = ?parent,
            adopted = waiting.len(),
            "message merged"
        );
        InsertOutcome::Inserted
    }

    /// Patch a message in place. Unknown ids are a silent no-op. Returns true
    /// if the message exists.
    pub fn update(&mut self, id: &MessageId, patch: &MessagePatch) -> bool {
        match self.forest.node_mut(id) {
            Some(node) => {
                if patch.apply(node.message_mut()) {
                    debug!(message_id = %id, "message updated");
                }
                true
            }
            None => false,
        }
    }

    /// Soft delete. The node keeps its place and its replies.
    pub fn tombstone(&mut self, id: &MessageId) -> bool {
        self.update(id, &MessagePatch::deleted(true))
    }

    pub fn restore(&mut self, id: &MessageId) -> bool {
        self.update(id, &MessagePatch::deleted(false))
    }

    /// Hard remove. Direct replies of the removed node are promoted to roots,
    /// appended in their reply order.
    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        if !self.forest.contains(id) {
            return None;
        }
        self.forest.detach(id);

        let orphans: Vec<MessageId> = self
            .forest
            .get(id)
            .map(|node| node.child_ids().to_vec())
            .unwrap_or_default();
        for orphan in &orphans {
            self.forest.detach(orphan);
            self.forest.push_root(orphan.clone());
        }

        let node = self.forest.take(id)?;
        self.removed.insert(id.clone());
        debug!(message_id = %id, promoted = orphans.len(), "message removed");
        Some(node.into_message())
    }

    pub fn toggle_reaction(
        &mut self,
        id: &MessageId,
        emoji: &str,
        user_id: &UserId,
    ) -> Option<ToggleOutcome> {
        let node = self.forest.node_mut(id)?;
        Some(node.message_mut().reactions.toggle(emoji, user_id))
    }

    /// Idempotent add; `Some(true)` if the reaction was new.
    pub fn add_reaction(&mut self, id: &MessageId, emoji: &str, user_id: &UserId) -> Option<bool> {
        let node = self.forest.node_mut(id)?;
        Some(node.message_mut().reactions.add(emoji, user_id))
    }

    /// Idempotent remove; `Some(true)` if the reaction was present.
    pub fn remove_reaction(
        &mut self,
        id: &MessageId,
        emoji: &str,
        user_id: &UserId,
    ) -> Option<bool> {
        let node = self.forest.node_mut(id)?;
        Some(node.message_mut().reactions.remove(emoji, user_id))
    }

    /// Rebuild from a freshly fetched batch plus whatever is already held.
    ///
    /// The held copy wins for ids present in both, so live edits, reactions
    /// and deletes applied while the fetch was in flight survive it. Batch
    /// messages for ids removed here are skipped. Returns the resulting
    /// message count.
    pub fn reconcile(&mut self, batch: Vec<Message>) -> usize {
        let batch = retain_channel(&self.channel_id, batch);
        let fetched = batch.len();

        let mut merged: HashMap<MessageId, Message> = self
            .forest
            .messages()
            .map(|m| (m.id.clone(), m.clone()))
            .collect();
        let local = merged.len();
        let mut skipped = 0;
        for message in batch {
            if self.removed.contains(&message.id) {
                skipped += 1;
                continue;
            }
            merged.entry(message.id.clone()).or_insert(message);
        }

        self.forest = assemble(merged.into_values());
        debug!(
            channel = %self.channel_id,
            fetched,
            local,
            skipped,
            total = self.forest.len(),
            "store reconciled"
        );
        self.forest.len()
    }
}

fn retain_channel(channel_id: &ChannelId, batch: Vec<Message>) -> Vec<Message> {
    let before = batch.len();
    let batch: Vec<Message> = batch
        .into_iter()
        .filter(|m| m.channel_id == *channel_id)
        .collect();
    if batch.len() != before {
        warn!(
            channel = %channel_id,
            dropped = before - batch.len(),
            "batch contained messages for other channels"
        );
    }
    batch
}
