//! Removal of synthetic continue prompts.

use crate::message::Message;

/// Drop every human message whose content equals `target` exactly.
///
/// The input is left untouched. All other messages keep their relative order.
pub fn remove_continue_messages(messages: &[Message], target: &str) -> Vec<Message> {
    messages
        .iter()
        .filter(|m| !(m.is_human() && m.content == target))
        .cloned()
        .collect()
}
