//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Postoffice.
//
// Postoffice is free  software: you can redistribute it  and/or modify it
// under the terms of the GNU  General Public License as published by the Free
// Software Foundation,  either version 3  of the License, or  (at your
// option) any later version.
//
// Postoffice is distributed  in the hope that it will  be useful, but WITHOUT
// ANY WARRANTY; without even the  implied warranty of MERCHANTABILITY or
// FITNESS FOR  A PARTICULAR  PURPOSE. See the  GNU General  Public License
// for more details.
//
// You should have received a copy of the GNU General Public License along
// with Postoffice. If not, see <http://www.gnu.org/licenses/>.

//! Wildcard matching of `LIST` target patterns against absolute names.
//!
//! Listing fetches every absolute name the record store knows and narrows it
//! down here, instead of a more ideal recursive filtering; the flat key
//! space is small enough that this does not matter.
//!
//! Only a restricted form of RFC 3501 matching is supported: a pattern with
//! no wildcards matches by equality, and a single `%` in the final position
//! matches the direct children of the prefix before it. `*` anywhere, `%`
//! away from the end, and multiple wildcards never match anything. Clients
//! that need those forms are out of luck until a complete matcher is
//! designed deliberately; silently approximating them would be worse than
//! refusing.

/// Whether `pattern` contains any `LIST` wildcard at all.
pub fn contains_wildcard(pattern: &str) -> bool {
    pattern.contains('%') || pattern.contains('*')
}

/// Test `candidate` against `pattern` under the restricted matching policy.
///
/// `separator` is the hierarchy separator of the namespace the pattern
/// targets; it bounds what a trailing `%` may consume.
pub fn pattern_matches(
    pattern: &str,
    candidate: &str,
    separator: char,
) -> bool {
    if !contains_wildcard(pattern) {
        return pattern == candidate;
    }

    // The one supported wildcard form: a lone % in the final position.
    if pattern.contains('*') {
        return false;
    }
    let percent = match pattern.find('%') {
        Some(ix) => ix,
        None => return false,
    };
    if percent + 1 != pattern.len() {
        return false;
    }

    // % may not cross a separator boundary, so the candidate must extend the
    // prefix by at most one hierarchy level. The prefix itself also matches.
    let prefix = &pattern[..percent];
    if !candidate.starts_with(prefix) {
        return false;
    }
    !candidate[prefix.len()..].contains(separator)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact_match_without_wildcards() {
        assert!(pattern_matches(
            "#mail.alice.INBOX",
            "#mail.alice.INBOX",
            '.'
        ));
        assert!(!pattern_matches("#mail.alice.INBOX", "#mail.alice.Work", '.'));
        assert!(!pattern_matches(
            "#mail.alice.INBOX",
            "#mail.alice.INBOX.Sub",
            '.'
        ));
    }

    #[test]
    fn trailing_percent_matches_direct_children_only() {
        let names = [
            "#mail.alice.INBOX",
            "#mail.alice.Work",
            "#mail.alice.Work.Sub",
        ];
        let matched: Vec<&str> = names
            .iter()
            .cloned()
            .filter(|n| pattern_matches("#mail.alice.%", n, '.'))
            .collect();
        assert_eq!(vec!["#mail.alice.INBOX", "#mail.alice.Work"], matched);
    }

    #[test]
    fn trailing_percent_accepts_prefix_equality() {
        assert!(pattern_matches("#mail.alice.%", "#mail.alice.", '.'));
        assert!(pattern_matches("#mail.alice%", "#mail.alice", '.'));
        assert!(!pattern_matches("#mail.alice%", "#mail.alice.INBOX", '.'));
    }

    #[test]
    fn unsupported_forms_never_match() {
        assert!(!pattern_matches("#mail.alice.*", "#mail.alice.INBOX", '.'));
        assert!(!pattern_matches("*", "#mail.alice.INBOX", '.'));
        assert!(!pattern_matches("#mail.%.INBOX", "#mail.alice.INBOX", '.'));
        assert!(!pattern_matches("#mail.%.%", "#mail.alice.INBOX", '.'));
        assert!(!pattern_matches("#mail.alice.%X", "#mail.alice.X", '.'));
    }
}
