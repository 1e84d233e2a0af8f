//! Reply segmentation and UTF-8–safe truncation.

/// Split a generated reply into the fragments published as chunk events.
///
/// Splits on runs of whitespace and re-attaches a single trailing space to
/// every word, so `"hello there"` becomes `["hello ", "there "]`. Concatenating
/// the fragments reproduces the reply with whitespace runs collapsed.
/// Whitespace-only input yields no fragments.
pub fn segment_reply(reply: &str) -> Vec<String> {
    reply.split_whitespace().map(|word| format!("{word} ")).collect()
}

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
#[inline]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Short single-line preview of user text for log fields.
pub fn preview(s: &str, max_bytes: usize) -> String {
    let line = s.lines().next().unwrap_or_default();
    let cut = truncate_str(line, max_bytes);
    if cut.len() < s.len() {
        format!("{cut}…")
    } else {
        cut.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn segments_words_with_trailing_space() {
        assert_eq!(segment_reply("hello there"), vec!["hello ", "there "]);
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(
            segment_reply("  one\t two\n\nthree "),
            vec!["one ", "two ", "three "]
        );
    }

    #[test]
    fn empty_reply_has_no_segments() {
        assert!(segment_reply("").is_empty());
        assert!(segment_reply(" \n\t ").is_empty());
    }

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn truncate_snaps_to_char_boundary() {
        // 'é' is 2 bytes
        assert_eq!(truncate_str("café", 4), "caf");
        assert_eq!(truncate_str("café", 5), "café");
    }

    #[test]
    fn preview_takes_first_line() {
        assert_eq!(preview("first\nsecond", 80), "first…");
        assert_eq!(preview("short", 80), "short");
        assert_eq!(preview("abcdef", 3), "abc…");
    }

    proptest! {
        #[test]
        fn segments_rejoin_to_normalized_text(s in "[a-z \\t\\n]{0,64}") {
            let joined: String = segment_reply(&s).concat();
            let expected: String = s
                .split_whitespace()
                .map(|w| format!("{w} "))
                .collect();
            prop_assert_eq!(joined, expected);
        }

        #[test]
        fn segments_never_contain_inner_whitespace(s in "\\PC{0,64}") {
            for seg in segment_reply(&s) {
                let word = seg.strip_suffix(' ').unwrap();
                prop_assert!(!word.is_empty());
                prop_assert!(!word.chars().any(char::is_whitespace));
            }
        }

        #[test]
        fn truncate_never_exceeds_limit(s in "\\PC{0,64}", max in 0usize..80) {
            let out = truncate_str(&s, max);
            prop_assert!(out.len() <= max);
            prop_assert!(s.starts_with(out));
        }
    }
}
