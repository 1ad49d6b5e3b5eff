//! Property-based tests for continuation repair using proptest.
//!
//! These cover the invariants that must hold for arbitrary transcripts:
//!
//! - Filtering continue prompts is idempotent and order preserving
//! - Merging never touches non-AI messages and never grows the transcript
//! - An open fence absorbs the next fragment verbatim

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::continuation::{
        join_fragments, merge_messages, needs_continuation, remove_continue_messages,
        CONTINUE_PROMPT,
    };
    use crate::continuation::fence::opens_labeled_fence;
    use crate::message::{Message, Role};

    fn role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::System), Just(Role::Human), Just(Role::Ai)]
    }

    // Content biased toward fences, newlines and the continue sentinel
    fn content() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(CONTINUE_PROMPT.to_string()),
            Just("```".to_string()),
            Just("\n".to_string()),
            "[a-z ]{0,12}",
            "(```|\n|[a-z]{1,4}){0,6}",
        ]
    }

    fn message() -> impl Strategy<Value = Message> {
        (role(), content()).prop_map(|(role, content)| Message::new(role, content))
    }

    fn transcript() -> impl Strategy<Value = Vec<Message>> {
        prop::collection::vec(message(), 0..12)
    }

    proptest! {
        /// A second filter pass is a no-op.
        #[test]
        fn filter_is_idempotent(messages in transcript()) {
            let once = remove_continue_messages(&messages, CONTINUE_PROMPT);
            let twice = remove_continue_messages(&once, CONTINUE_PROMPT);
            prop_assert_eq!(once, twice);
        }

        /// The filter returns exactly the non-sentinel messages, in order.
        #[test]
        fn filter_keeps_non_sentinels_in_order(messages in transcript()) {
            let expected: Vec<Message> = messages
                .iter()
                .filter(|m| !(m.role == Role::Human && m.content == CONTINUE_PROMPT))
                .cloned()
                .collect();
            prop_assert_eq!(remove_continue_messages(&messages, CONTINUE_PROMPT), expected);
        }

        /// Merging preserves the sequence of non-AI messages.
        #[test]
        fn merge_preserves_non_ai_messages(messages in transcript()) {
            let merged = merge_messages(&messages);
            let before: Vec<&Message> = messages.iter().filter(|m| !m.is_ai()).collect();
            let after: Vec<&Message> = merged.iter().filter(|m| !m.is_ai()).collect();
            prop_assert_eq!(before, after);
            prop_assert!(merged.len() <= messages.len());
        }

        /// No two AI messages are adjacent after merging.
        #[test]
        fn merge_leaves_no_adjacent_ai(messages in transcript()) {
            let merged = merge_messages(&messages);
            for pair in merged.windows(2) {
                prop_assert!(!(pair[0].is_ai() && pair[1].is_ai()));
            }
        }

        /// Merging is a no-op once there is nothing left to merge.
        #[test]
        fn merge_is_idempotent(messages in transcript()) {
            let once = merge_messages(&messages);
            prop_assert_eq!(merge_messages(&once), once.clone());
        }

        /// A fragment ending inside an open fence (without a dangling marker)
        /// absorbs the next fragment verbatim unless it opens a labeled fence.
        #[test]
        fn open_fence_concatenates(code in "[a-z ]{1,10}", rest in content()) {
            let previous = format!("```\n{code}\n");
            prop_assume!(needs_continuation(&previous));
            prop_assume!(!opens_labeled_fence(&rest));
            prop_assert_eq!(join_fragments(&previous, &rest), format!("{previous}{rest}"));
        }
    }
}
