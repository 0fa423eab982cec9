use tracing::debug;

use haven_types::GatewayEvent;

use crate::store::{InsertOutcome, ThreadStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    /// Already present (fetch race, redelivery, own send echo).
    Duplicate,
    Updated,
    Removed,
    ReactionChanged,
    /// Reaction event that matched the current state already.
    ReactionUnchanged,
    /// Target message is not in the store.
    UnknownTarget,
    /// Connection-level event or another channel's event.
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub applied: u64,
    pub duplicates: u64,
    pub unknown_targets: u64,
    pub ignored: u64,
}

impl MergeStats {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted
            | MergeOutcome::Updated
            | MergeOutcome::Removed
            | MergeOutcome::ReactionChanged => self.applied += 1,
            MergeOutcome::Duplicate | MergeOutcome::ReactionUnchanged => self.duplicates += 1,
            MergeOutcome::UnknownTarget => self.unknown_targets += 1,
            MergeOutcome::Ignored => self.ignored += 1,
        }
    }
}

/// Applies gateway events to a [`ThreadStore`].
///
/// Every path is idempotent: a message create goes through
/// [`ThreadStore::merge_insert`], and reaction events use add/remove rather
/// than toggle, so the same event delivered twice leaves the store as if it
/// had arrived once. Live messages are appended, never re-sorted.
#[derive(Debug, Default)]
pub struct LiveMerger {
    stats: MergeStats,
}

impl LiveMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    pub fn apply(&mut self, store: &mut ThreadStore, event: GatewayEvent) -> MergeOutcome {
        let kind = event.kind();
        let outcome = if event.channel_id() != Some(store.channel_id()) {
            MergeOutcome::Ignored
        } else {
            apply_scoped(store, event)
        };
        self.stats.record(outcome);
        debug!(event = kind, outcome = ?outcome, channel = %store.channel_id(), "live event merged");
        outcome
    }
}

fn apply_scoped(store: &mut ThreadStore, event: GatewayEvent) -> MergeOutcome {
    match event {
        GatewayEvent::MessageCreate { message } => match store.merge_insert(message) {
            InsertOutcome::Inserted => MergeOutcome::Inserted,
            InsertOutcome::Duplicate => MergeOutcome::Duplicate,
            InsertOutcome::WrongChannel => MergeOutcome::Ignored,
        },
        GatewayEvent::MessageUpdate {
            message_id, patch, ..
        } => {
            if store.update(&message_id, &patch) {
                MergeOutcome::Updated
            } else {
                MergeOutcome::UnknownTarget
            }
        }
        GatewayEvent::MessageDelete { message_id, .. } => match store.remove(&message_id) {
            Some(_) => MergeOutcome::Removed,
            None => MergeOutcome::UnknownTarget,
        },
        GatewayEvent::ReactionAdd {
            message_id,
            user_id,
            emoji,
            ..
        } => reaction_outcome(store.add_reaction(&message_id, &emoji, &user_id)),
        GatewayEvent::ReactionRemove {
            message_id,
            user_id,
            emoji,
            ..
        } => reaction_outcome(store.remove_reaction(&message_id, &emoji, &user_id)),
        GatewayEvent::Ready { .. } => MergeOutcome::Ignored,
    }
}

fn reaction_outcome(changed: Option<bool>) -> MergeOutcome {
    match changed {
        Some(true) => MergeOutcome::ReactionChanged,
        Some(false) => MergeOutcome::ReactionUnchanged,
        None => MergeOutcome::UnknownTarget,
    }
}
