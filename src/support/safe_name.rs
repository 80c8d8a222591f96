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

/// Determine whether the given hierarchy segment is "safe".
///
/// Segments are the pieces of a mailbox name between hierarchy separators,
/// after the namespace prefix has been stripped. Since the separator is
/// configurable per namespace, it is passed in and rejected alongside the
/// characters that cause directory traversal or have special meaning within
/// IMAP.
///
/// This does not care about whether the segment is ultimately a valid file
/// name; for that, we simply rely on the OS rejecting it.
pub fn is_safe_segment(name: &str, separator: char) -> bool {
    !name.is_empty() &&
        // Block directory traversal through .. and creation of hidden files
        // on UNIX
        name.chars().next() != Some('.') &&
        name.find(separator).is_none() &&
        name.find('/').is_none() &&
        // Only a path separator on Windows, but always block since it has
        // high potential of causing problems
        name.find('\\').is_none() &&
        // The namespace token must only ever occur at the very start of a
        // full name
        name.find('#').is_none() &&
        // Don't allow any ASCII control characters
        name.find(|c| c < ' ' || c == '\x7F').is_none() &&
        // * and % are very special in *some* IMAP contexts, so forbid
        // everywhere
        name.find(|c| c == '*' || c == '%').is_none()
}

#[cfg(test)]
mod test {
    use super::is_safe_segment;

    #[test]
    fn test_is_safe_segment() {
        assert!(is_safe_segment("foo", '.'));
        assert!(is_safe_segment("PRN", '.'));
        assert!(is_safe_segment("Entwürfe", '.'));
        assert!(is_safe_segment("郵便", '.'));
        assert!(is_safe_segment("folder 1", '.'));
        assert!(is_safe_segment("foo.bar", '/'));
        assert!(!is_safe_segment("", '.'));
        assert!(!is_safe_segment(".hidden", '.'));
        assert!(!is_safe_segment("foo.bar", '.'));
        assert!(!is_safe_segment("foo/bar", '.'));
        assert!(!is_safe_segment("foo\\bar", '.'));
        assert!(!is_safe_segment("#news", '.'));
        assert!(!is_safe_segment("news#2", '.'));
        assert!(!is_safe_segment("foo\0", '.'));
        assert!(!is_safe_segment("foo\r", '.'));
        assert!(!is_safe_segment("fo\x7Fo", '.'));
        assert!(!is_safe_segment("foo*bar", '.'));
        assert!(!is_safe_segment("foo%bar", '.'));
    }
}
