//! Code-fence scanning.
//!
//! Markers are counted literally. No markdown parsing happens here, so the
//! result is deterministic for any input.

/// Triple-backtick code fence delimiter.
pub const FENCE_MARKER: &str = "```";

/// Whether a piece of content leaves a code block open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceState {
    /// Every opened fence has been closed
    Closed,
    /// An odd number of markers: generation stopped inside a code block
    Open,
}

/// Count non-overlapping occurrences of the fence marker.
pub fn count_fence_markers(content: &str) -> usize {
    content.matches(FENCE_MARKER).count()
}

/// Fence state at the end of `content`.
pub fn fence_state(content: &str) -> FenceState {
    if count_fence_markers(content) % 2 == 1 {
        FenceState::Open
    } else {
        FenceState::Closed
    }
}

/// True when an AI turn ended inside an unterminated code fence.
pub fn needs_continuation(content: &str) -> bool {
    fence_state(content) == FenceState::Open
}

/// True when `content`, ignoring leading whitespace, starts with a fence marker.
pub(crate) fn starts_with_fence(content: &str) -> bool {
    content.trim_start().starts_with(FENCE_MARKER)
}

/// True when `content`, ignoring leading whitespace, opens a fence with an
/// info string such as ` ```python `. A bare marker may close a block instead.
pub(crate) fn opens_labeled_fence(content: &str) -> bool {
    content
        .trim_start()
        .strip_prefix(FENCE_MARKER)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_fence_markers() {
        assert_eq!(count_fence_markers("no code here"), 0);
        assert_eq!(count_fence_markers("```rust\nfn a() {}\n```"), 2);
        assert_eq!(count_fence_markers("```\nopen"), 1);
        // Six backticks are two markers, not four overlapping ones.
        assert_eq!(count_fence_markers("``````"), 2);
    }

    #[test]
    fn test_fence_state() {
        assert_eq!(fence_state(""), FenceState::Closed);
        assert_eq!(fence_state("```py\nprint(1)\n```\n"), FenceState::Closed);
        assert_eq!(fence_state("intro\n```py\nprint(1)\n"), FenceState::Open);
        assert_eq!(fence_state("```a```\n```b"), FenceState::Open);
    }

    #[test]
    fn test_needs_continuation() {
        assert!(needs_continuation("path/demo.py\n```\ndef test:\n"));
        assert!(!needs_continuation("path/demo.py\n```\ndef test:\n```\n"));
        assert!(!needs_continuation("plain prose without any code"));
    }

    #[test]
    fn test_starts_with_fence() {
        assert!(starts_with_fence("```\ncode"));
        assert!(starts_with_fence("\n  ```python\ncode"));
        assert!(!starts_with_fence("\n    print(\"message\")\n```\n"));
        assert!(!starts_with_fence(""));
    }

    #[test]
    fn test_opens_labeled_fence() {
        assert!(opens_labeled_fence("```python\nnew\n```\n"));
        assert!(opens_labeled_fence("\n```rust\n"));
        assert!(!opens_labeled_fence("```\nclosing"));
        assert!(!opens_labeled_fence("```"));
        assert!(!opens_labeled_fence("plain text"));
    }
}
