use std::fmt::{self, Write};

use haven_threads::{ThreadNode, ThreadStore};
use haven_types::UserId;

/// Indented outline of the channel: one line per message, replies nested
/// under their parent, reply counts and reaction groups appended.
pub fn outline(store: &ThreadStore, viewer: &UserId) -> String {
    let mut out = String::new();
    for (depth, node) in store.walk() {
        // Writing into a String cannot fail.
        let _ = write_line(&mut out, depth, node, viewer);
    }
    out
}

fn write_line(out: &mut String, depth: usize, node: &ThreadNode, viewer: &UserId) -> fmt::Result {
    let message = node.message();
    write!(out, "{}", "  ".repeat(depth))?;
    if message.is_deleted {
        out.push_str("[deleted]");
    } else {
        write!(out, "{}: {}", message.author.username, message.content)?;
        if message.is_edited {
            out.push_str(" (edited)");
        }
    }
    match node.reply_count() {
        0 => {}
        1 => out.push_str(" [1 reply]"),
        n => write!(out, " [{n} replies]")?,
    }
    for group in message.reactions.groups(Some(viewer)) {
        let marker = if group.acted { "*" } else { "" };
        write!(out, " {}{}{marker}", group.emoji, group.count)?;
    }
    out.push('\n');
    Ok(())
}
