//! Splicing response and continuation fragments into a single message.

use tracing::debug;

use super::fence::{
    fence_state, opens_labeled_fence, starts_with_fence, FenceState, FENCE_MARKER,
};
use crate::message::Message;

/// Join a fragment onto the content accumulated so far.
///
/// Rules, first match wins:
/// 1. `previous` ends with a bare fence marker that would leave the block open
///    without it, and `next` is code that closes a block of its own: the model
///    closed the block early when it was cut off. The marker is dropped and the
///    code continues across the seam with a single line break.
/// 2. `previous` ends inside an open fence and `next` does not open a labeled
///    fence: `next` continues the code, so the two are concatenated directly.
/// 3. Otherwise `next` is a separate block and is joined after a blank line.
pub fn join_fragments(previous: &str, next: &str) -> String {
    if next.is_empty() {
        return previous.to_string();
    }
    if previous.is_empty() {
        return next.to_string();
    }

    if let Some(body) = previous.strip_suffix(FENCE_MARKER) {
        if fence_state(body) == FenceState::Open {
            if starts_with_fence(next) {
                debug!(
                    "Continuation opens a fence after a dangling marker; joining as a new block"
                );
                return join_as_new_block(previous, next);
            }
            if fence_state(next) == FenceState::Open {
                let body = match body.strip_suffix('\n') {
                    Some(trimmed) if next.starts_with('\n') => trimmed,
                    _ => body,
                };
                return format!("{body}{next}");
            }
        }
    }

    if fence_state(previous) == FenceState::Open {
        if opens_labeled_fence(next) {
            debug!("Continuation opens a labeled fence inside an open block; joining as a new block");
            return join_as_new_block(previous, next);
        }
        return format!("{previous}{next}");
    }

    join_as_new_block(previous, next)
}

/// Join with exactly one blank line between the two parts, counting newlines
/// already present at the seam.
fn join_as_new_block(previous: &str, next: &str) -> String {
    let trailing = previous.len() - previous.trim_end_matches('\n').len();
    let leading = next.len() - next.trim_start_matches('\n').len();
    let missing = 2usize.saturating_sub(trailing + leading);

    let mut joined = String::with_capacity(previous.len() + missing + next.len());
    joined.push_str(previous);
    joined.extend(std::iter::repeat('\n').take(missing));
    joined.push_str(next);
    joined
}

/// Fold every run of consecutive AI messages into the first message of the run.
///
/// Non-AI messages pass through untouched and in order. Runs are folded left
/// to right with [`join_fragments`], so the result is the same for any number
/// of fragments.
pub fn merge_messages(messages: &[Message]) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(messages.len());

    for message in messages {
        match merged.last_mut() {
            Some(last) if last.is_ai() && message.is_ai() => {
                last.content = join_fragments(&last.content, &message.content);
            }
            _ => merged.push(message.clone()),
        }
    }

    merged
}
