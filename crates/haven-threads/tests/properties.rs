use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use haven_threads::{InsertOutcome, ThreadStore, assemble};
use haven_types::{Author, ChannelId, Message, MessageId};

/// Batches of uniquely-identified messages with colliding timestamps and
/// parent links that may be missing, self-referential or mutual.
fn batch() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec((0i64..12, prop::option::of(0usize..20)), 0..16).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (t, parent))| {
                let m = Message::new(
                    format!("m{i}"),
                    "c1",
                    Author::new("alice"),
                    format!("body {i}"),
                    Utc.timestamp_opt(t, 0).unwrap(),
                );
                match parent {
                    Some(p) => m.reply_to(format!("m{p}")),
                    None => m,
                }
            })
            .collect()
    })
}

fn batch_and_permutation() -> impl Strategy<Value = (Vec<Message>, Vec<Message>)> {
    batch().prop_flat_map(|b| (Just(b.clone()), Just(b).prop_shuffle()))
}

fn id_set(store: &ThreadStore) -> BTreeSet<MessageId> {
    store.forest().messages().map(|m| m.id.clone()).collect()
}

proptest! {
    #[test]
    fn assembly_is_deterministic((batch, shuffled) in batch_and_permutation()) {
        let first = assemble(batch.clone());
        let again = assemble(batch);
        let from_shuffled = assemble(shuffled);

        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &from_shuffled);
    }

    #[test]
    fn every_message_is_indexed_and_reachable(batch in batch()) {
        let forest = assemble(batch.clone());

        prop_assert!(forest.is_consistent());
        prop_assert_eq!(forest.len(), batch.len());
        prop_assert_eq!(forest.walk().count(), batch.len());
        for m in &batch {
            let node = forest.get(&m.id);
            prop_assert!(node.is_some());
            prop_assert_eq!(&node.unwrap().message().id, &m.id);
        }
    }

    #[test]
    fn merge_insert_is_idempotent(batch in batch(), split in 0usize..16) {
        let split = split.min(batch.len());
        let (initial, live) = batch.split_at(split);

        let mut once = ThreadStore::from_batch(ChannelId::from("c1"), initial.to_vec());
        let mut twice = once.clone();
        for m in live {
            once.merge_insert(m.clone());
            twice.merge_insert(m.clone());
            prop_assert_eq!(twice.merge_insert(m.clone()), InsertOutcome::Duplicate);
        }

        prop_assert_eq!(once.forest(), twice.forest());
        prop_assert!(once.forest().is_consistent());
    }

    /// Membership converges regardless of arrival order. Reply order within a
    /// thread may legitimately differ, since live inserts are appended.
    #[test]
    fn insert_order_does_not_change_membership((batch, shuffled) in batch_and_permutation()) {
        let mut a = ThreadStore::new(ChannelId::from("c1"));
        let mut b = ThreadStore::new(ChannelId::from("c1"));
        for m in batch.iter().cloned() {
            a.merge_insert(m);
        }
        for m in shuffled {
            b.merge_insert(m);
        }

        prop_assert_eq!(id_set(&a), id_set(&b));
        prop_assert_eq!(a.len(), batch.len());
        prop_assert!(a.forest().is_consistent());
        prop_assert!(b.forest().is_consistent());
    }

    #[test]
    fn removal_keeps_every_survivor_reachable(batch in batch(), victim in 0usize..16) {
        let mut store = ThreadStore::from_batch(ChannelId::from("c1"), batch.clone());
        let victim = MessageId::new(format!("m{victim}"));
        let existed = store.contains(&victim);

        prop_assert_eq!(store.remove(&victim).is_some(), existed);
        prop_assert!(!store.contains(&victim));
        prop_assert!(store.forest().is_consistent());
        prop_assert_eq!(store.walk().count(), store.len());
    }
}
