use std::cmp::Ordering;

use tracing::debug;

use haven_types::{Message, MessageId};

use crate::forest::ThreadForest;

/// Creation time ascending, id as tie-breaker.
pub fn chronological(a: &Message, b: &Message) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Build the reply forest for one channel's batch of messages.
///
/// Pure function of the input set. Roots and each child list come out in
/// ascending creation order. A message whose declared parent is not in the
/// batch becomes a root; so does one whose parent link would close a cycle.
/// If the batch carries the same id twice, the earliest copy is kept.
pub fn assemble<I>(messages: I) -> ThreadForest
where
    I: IntoIterator<Item = Message>,
{
    let mut sorted: Vec<Message> = messages.into_iter().collect();
    sorted.sort_by(chronological);

    let mut forest = ThreadForest::new();
    let mut order: Vec<MessageId> = Vec::with_capacity(sorted.len());

    // Pass 1: index everything so parents later in the batch resolve.
    for message in sorted {
        if forest.contains(&message.id) {
            debug!(message_id = %message.id, "duplicate id in batch, keeping earliest");
            continue;
        }
        order.push(message.id.clone());
        forest.index(message);
    }

    // Pass 2: wire up edges in the same order.
    for id in order {
        let parent = forest
            .get(&id)
            .and_then(|node| forest.resolve_parent(node.message()));
        match parent {
            Some(parent) => forest.attach(&id, &parent),
            None => forest.push_root(id),
        }
    }

    forest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use haven_types::Author;

    fn msg(id: &str, parent: Option<&str>, t: i64) -> Message {
        let m = Message::new(id, "c1", Author::new("alice"), id, Utc.timestamp_opt(t, 0).unwrap());
        match parent {
            Some(p) => m.reply_to(p),
            None => m,
        }
    }

    fn outline(forest: &ThreadForest) -> Vec<(usize, String)> {
        forest
            .walk()
            .map(|(depth, node)| (depth, node.id().to_string()))
            .collect()
    }

    #[test]
    fn root_with_one_reply() {
        let forest = assemble(vec![msg("1", None, 1), msg("2", Some("1"), 2)]);

        assert_eq!(forest.root_ids(), &[MessageId::from("1")]);
        let kids: Vec<_> = forest.children(&"1".into()).map(|n| n.id().clone()).collect();
        assert_eq!(kids, vec![MessageId::from("2")]);
        assert!(forest.is_consistent());
    }

    #[test]
    fn parent_later_in_input_still_attaches() {
        // Input order is reversed, and the reply is older than its parent.
        let forest = assemble(vec![msg("2", Some("1"), 1), msg("1", None, 5)]);

        assert_eq!(forest.root_ids(), &[MessageId::from("1")]);
        assert_eq!(forest.get(&"2".into()).unwrap().parent(), Some(&MessageId::from("1")));
    }

    #[test]
    fn missing_parent_degrades_to_root() {
        let forest = assemble(vec![msg("5", Some("gone"), 1), msg("6", None, 2)]);

        assert_eq!(forest.root_ids(), &[MessageId::from("5"), MessageId::from("6")]);
        assert!(forest.is_consistent());
    }

    #[test]
    fn ordering_is_by_time_then_id() {
        let forest = assemble(vec![
            msg("b", None, 10),
            msg("a", None, 10),
            msg("r2", Some("a"), 30),
            msg("r1", Some("a"), 20),
            msg("c", None, 5),
        ]);

        assert_eq!(
            outline(&forest),
            vec![
                (0, "c".to_string()),
                (0, "a".to_string()),
                (1, "r1".to_string()),
                (1, "r2".to_string()),
                (0, "b".to_string()),
            ]
        );
    }

    #[test]
    fn self_and_mutual_parents_do_not_cycle() {
        let forest = assemble(vec![
            msg("x", Some("x"), 1),
            msg("p", Some("q"), 2),
            msg("q", Some("p"), 3),
        ]);

        assert!(forest.is_consistent());
        assert_eq!(forest.len(), 3);
        // p attaches under q first; q's link back to p is refused.
        assert_eq!(forest.root_ids(), &[MessageId::from("x"), MessageId::from("q")]);
        assert_eq!(forest.get(&"p".into()).unwrap().parent(), Some(&MessageId::from("q")));
    }

    #[test]
    fn duplicate_ids_keep_earliest() {
        let mut late = msg("1", None, 9);
        late.content = "late copy".into();
        let forest = assemble(vec![late, msg("1", None, 1)]);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest.get(&"1".into()).unwrap().message().content, "1");
    }

    #[test]
    fn deep_threads_walk_in_preorder() {
        let forest = assemble(vec![
            msg("1", None, 1),
            msg("2", Some("1"), 2),
            msg("3", Some("2"), 3),
            msg("4", Some("1"), 4),
        ]);

        assert_eq!(
            outline(&forest),
            vec![
                (0, "1".to_string()),
                (1, "2".to_string()),
                (2, "3".to_string()),
                (1, "4".to_string()),
            ]
        );
        assert_eq!(forest.descendant_count(&"1".into()), 3);
    }
}
