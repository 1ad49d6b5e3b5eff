//! Continuation repair for truncated model output.
//!
//! When a model stops mid-answer (typically inside a fenced code block), the
//! session asks it to continue with a fixed human prompt and collects the
//! fragments. This module holds the pure pieces of that process:
//!
//! - **fence**: decide whether a fragment was cut off inside a code block
//! - **merge**: splice response + continuation fragments into one message
//! - **filter**: drop the synthetic continue prompts once merging is done
//!
//! None of these functions fail. Ambiguous input degrades to the most
//! conservative structurally valid output.
//!
//! ## Example
//!
//! ```rust
//! use convo_core::continuation::{merge_messages, remove_continue_messages, CONTINUE_PROMPT};
//! use convo_core::Message;
//!
//! let transcript = vec![
//!     Message::human("write it"),
//!     Message::ai("```\nfn main() {"),
//!     Message::human(CONTINUE_PROMPT),
//!     Message::ai("}\n```\n"),
//! ];
//!
//! let merged = merge_messages(&remove_continue_messages(&transcript, CONTINUE_PROMPT));
//! assert_eq!(merged.len(), 2);
//! assert_eq!(merged[1].content, "```\nfn main() {}\n```\n");
//! ```

mod fence;
mod filter;
mod merge;
#[cfg(test)]
mod proptest;

pub use fence::{count_fence_markers, fence_state, needs_continuation, FenceState, FENCE_MARKER};
pub use filter::remove_continue_messages;
pub use merge::{join_fragments, merge_messages};

/// Human prompt used to solicit the rest of a truncated answer.
pub const CONTINUE_PROMPT: &str = "continue: your text that was not finished";
