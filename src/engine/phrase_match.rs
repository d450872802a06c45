//! Character-by-character comparison of typed input against a target phrase.
//!
//! All indices are in `char`s, not bytes.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharStatus {
    Correct,
    Incorrect(char),
    Pending,
}

/// Live comparison state, recomputed on every keystroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveMatch {
    pub mismatch_index: usize,
    pub has_mismatch: bool,
    pub next_expected: Option<char>,
    /// Typed characters beyond the end of the target.
    pub overflow: usize,
}

/// Length of the longest common prefix of `target` and `typed`, or the full
/// target length when the two are identical.
pub fn first_mismatch_index(target: &str, typed: &str) -> usize {
    if typed == target {
        return target.chars().count();
    }
    target
        .chars()
        .zip(typed.chars())
        .take_while(|(t, y)| t == y)
        .count()
}

/// Completion ignores leading and trailing whitespace only.
pub fn is_complete(target: &str, typed: &str) -> bool {
    typed.trim() == target.trim()
}

pub fn live_status(target: &str, typed: &str) -> LiveMatch {
    let mismatch_index = first_mismatch_index(target, typed);
    let typed_len = typed.chars().count();
    let target_len = target.chars().count();
    LiveMatch {
        mismatch_index,
        has_mismatch: mismatch_index < typed_len,
        next_expected: if mismatch_index < typed_len {
            None
        } else {
            target.chars().nth(typed_len)
        },
        overflow: typed_len.saturating_sub(target_len),
    }
}

/// Per-target-character status for highlighting. Everything from the first
/// mismatch onward that has been typed is marked incorrect.
pub fn char_statuses(target: &str, typed: &str) -> Vec<CharStatus> {
    let mismatch_index = first_mismatch_index(target, typed);
    let mut typed_chars = typed.chars();
    target
        .chars()
        .enumerate()
        .map(|(i, _)| match typed_chars.next() {
            Some(_) if i < mismatch_index => CharStatus::Correct,
            Some(actual) => CharStatus::Incorrect(actual),
            None => CharStatus::Pending,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_match_returns_target_length() {
        assert_eq!(first_mismatch_index("fdsa", "fdsa"), 4);
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(first_mismatch_index("", ""), 0);
        assert_eq!(first_mismatch_index("", "abc"), 0);
        assert_eq!(first_mismatch_index("abc", ""), 0);
    }

    #[test]
    fn mismatch_in_middle() {
        assert_eq!(first_mismatch_index("all sad lads", "all sed"), 5);
    }

    #[test]
    fn typed_past_end_of_target() {
        assert_eq!(first_mismatch_index("abc", "abcd"), 3);
        let live = live_status("abc", "abcd");
        assert!(live.has_mismatch);
        assert_eq!(live.overflow, 1);
    }

    #[test]
    fn counts_chars_not_bytes() {
        assert_eq!(first_mismatch_index("héllo", "hélp"), 3);
        assert_eq!(first_mismatch_index("héllo", "héllo"), 5);
    }

    #[test]
    fn completion_trims_only_the_ends() {
        assert!(is_complete("all sad lads fall", "  all sad lads fall "));
        assert!(is_complete("all sad lads fall", "all sad lads fall\n"));
        assert!(!is_complete("all sad lads fall", "all  sad lads fall"));
        assert!(!is_complete("all sad lads fall", "all sad lads fal"));
    }

    #[test]
    fn live_status_tracks_next_expected() {
        let live = live_status("jkl;", "jk");
        assert_eq!(live.mismatch_index, 2);
        assert!(!live.has_mismatch);
        assert_eq!(live.next_expected, Some('l'));

        let live = live_status("jkl;", "jx");
        assert_eq!(live.mismatch_index, 1);
        assert!(live.has_mismatch);
        assert_eq!(live.next_expected, None);

        let live = live_status("jkl;", "jkl;");
        assert!(!live.has_mismatch);
        assert_eq!(live.next_expected, None);
    }

    #[test]
    fn statuses_mark_everything_after_first_error() {
        let statuses = char_statuses("fdsa", "fxsa");
        assert_eq!(
            statuses,
            vec![
                CharStatus::Correct,
                CharStatus::Incorrect('x'),
                CharStatus::Incorrect('s'),
                CharStatus::Incorrect('a'),
            ]
        );
    }

    #[test]
    fn statuses_pending_beyond_typed() {
        let statuses = char_statuses("fdsa", "fd");
        assert_eq!(
            statuses,
            vec![
                CharStatus::Correct,
                CharStatus::Correct,
                CharStatus::Pending,
                CharStatus::Pending,
            ]
        );
    }

    proptest! {
        #[test]
        fn identical_strings_match_fully(t in ".{0,40}") {
            prop_assert_eq!(first_mismatch_index(&t, &t), t.chars().count());
        }

        #[test]
        fn strict_prefix_matches_its_length(t in ".{1,40}", cut in 0usize..40) {
            let chars: Vec<char> = t.chars().collect();
            let cut = cut % chars.len();
            let prefix: String = chars[..cut].iter().collect();
            prop_assert_eq!(first_mismatch_index(&t, &prefix), cut);
        }

        #[test]
        fn substitution_is_found(t in "[a-z ]{1,40}", pos in 0usize..40) {
            let mut chars: Vec<char> = t.chars().collect();
            let pos = pos % chars.len();
            chars[pos] = if chars[pos] == '#' { '%' } else { '#' };
            let edited: String = chars.iter().collect();
            prop_assert_eq!(first_mismatch_index(&t, &edited), pos);
        }
    }
}
