use std::collections::{HashMap, HashSet};

use haven_types::{Message, MessageId};

/// One message and the ids of the replies attached under it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadNode {
    message: Message,
    /// Parent this node is actually attached to. May be `None` even when the
    /// message declares a parent that is not in the view.
    parent: Option<MessageId>,
    children: Vec<MessageId>,
}

impl ThreadNode {
    pub(crate) fn new(message: Message) -> Self {
        Self {
            message,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.message.id
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub(crate) fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    pub(crate) fn into_message(self) -> Message {
        self.message
    }

    pub fn parent(&self) -> Option<&MessageId> {
        self.parent.as_ref()
    }

    pub fn child_ids(&self) -> &[MessageId] {
        &self.children
    }

    pub fn reply_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena of thread nodes for one channel.
///
/// `nodes` is the flat index; `roots` and each node's `children` are the
/// tree. Both sides only ever refer to each other by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadForest {
    nodes: HashMap<MessageId, ThreadNode>,
    roots: Vec<MessageId>,
}

impl ThreadForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &MessageId) -> Option<&ThreadNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_ids(&self) -> &[MessageId] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &ThreadNode> {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Replies directly under `id`, oldest attachment first. Empty for
    /// unknown ids.
    pub fn children(&self, id: &MessageId) -> impl Iterator<Item = &ThreadNode> {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.nodes.get(child))
    }

    /// Every message in the arena, in no particular order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.nodes.values().map(|node| &node.message)
    }

    /// Pre-order traversal yielding `(depth, node)`, roots at depth 0.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            forest: self,
            stack: self.roots.iter().rev().map(|id| (0, id)).collect(),
        }
    }

    /// Number of nodes below `id`, at any depth.
    pub fn descendant_count(&self, id: &MessageId) -> usize {
        let mut count = 0;
        let mut stack: Vec<&MessageId> = match self.nodes.get(id) {
            Some(node) => node.children.iter().collect(),
            None => return 0,
        };
        while let Some(next) = stack.pop() {
            count += 1;
            if let Some(node) = self.nodes.get(next) {
                stack.extend(node.children.iter());
            }
        }
        count
    }

    /// Checks the arena/tree invariants: every indexed node is reachable from
    /// exactly one root path, every reachable id is indexed, and parent links
    /// agree with child lists.
    pub fn is_consistent(&self) -> bool {
        let mut seen: HashSet<&MessageId> = HashSet::with_capacity(self.nodes.len());
        let mut stack: Vec<(Option<&MessageId>, &MessageId)> =
            self.roots.iter().map(|id| (None, id)).collect();

        while let Some((parent, id)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                return false;
            };
            if !seen.insert(id) || node.parent.as_ref() != parent || node.message.id != *id {
                return false;
            }
            stack.extend(node.children.iter().map(|child| (Some(id), child)));
        }

        seen.len() == self.nodes.len()
    }

    /// True if `ancestor` is on the attached parent chain of `id` (or is `id`).
    pub(crate) fn is_ancestor(&self, ancestor: &MessageId, id: &MessageId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|node| node.parent.as_ref());
        }
        false
    }

    /// The id `message` may be attached under, if its declared parent is
    /// indexed and attaching would not close a cycle.
    pub(crate) fn resolve_parent(&self, message: &Message) -> Option<MessageId> {
        let parent = message.parent_message_id.as_ref()?;
        if !self.nodes.contains_key(parent) || self.is_ancestor(&message.id, parent) {
            return None;
        }
        Some(parent.clone())
    }

    pub(crate) fn index(&mut self, message: Message) {
        self.nodes.insert(message.id.clone(), ThreadNode::new(message));
    }

    pub(crate) fn node_mut(&mut self, id: &MessageId) -> Option<&mut ThreadNode> {
        self.nodes.get_mut(id)
    }

    /// Append `child` under `parent`. Both must be indexed and `child` must be
    /// detached.
    pub(crate) fn attach(&mut self, child: &MessageId, parent: &MessageId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child.clone());
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent.clone());
        }
    }

    pub(crate) fn push_root(&mut self, id: MessageId) {
        self.roots.push(id);
    }

    /// Remove `id` from whichever list currently holds it.
    pub(crate) fn detach(&mut self, id: &MessageId) {
        let parent = self.nodes.get_mut(id).and_then(|node| node.parent.take());
        match parent {
            Some(parent) => {
                if let Some(node) = self.nodes.get_mut(&parent) {
                    node.children.retain(|child| child != id);
                }
            }
            None => self.roots.retain(|root| root != id),
        }
    }

    /// Drop `id` from the arena. The caller detaches it and its children first.
    pub(crate) fn take(&mut self, id: &MessageId) -> Option<ThreadNode> {
        self.nodes.remove(id)
    }
}

/// Depth-first iterator returned by [`ThreadForest::walk`].
pub struct Walk<'a> {
    forest: &'a ThreadForest,
    stack: Vec<(usize, &'a MessageId)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a ThreadNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, id) = self.stack.pop()?;
            let Some(node) = self.forest.nodes.get(id) else {
                continue;
            };
            self.stack
                .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
            return Some((depth, node));
        }
    }
}
