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

//! Translation between the mailbox names users see and the absolute names
//! the folder record store is keyed by.
//!
//! Three namespaces exist. The private namespace holds a user's own
//! mailboxes: `#mail.INBOX` as seen by alice is `#mail.alice.INBOX` in the
//! store. The other-users namespace is purely a view: `#users.bob.INBOX`
//! maps into *bob's* private tree, `#mail.bob.INBOX`. The shared namespace
//! is not qualified per user at all, so full and absolute names coincide
//! there.

use serde::{Deserialize, Serialize};

/// Prefix token and hierarchy separator for each of the three namespaces.
///
/// This is intended to be spliced into the embedding server's configuration
/// file; all fields default to the conventional values.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NamespaceConfig {
    #[serde(default = "default_private_prefix")]
    pub private_prefix: String,
    #[serde(default = "default_separator")]
    pub private_separator: char,
    #[serde(default = "default_other_users_prefix")]
    pub other_users_prefix: String,
    #[serde(default = "default_separator")]
    pub other_users_separator: char,
    #[serde(default = "default_shared_prefix")]
    pub shared_prefix: String,
    #[serde(default = "default_separator")]
    pub shared_separator: char,
}

fn default_private_prefix() -> String {
    "#mail".to_owned()
}

fn default_other_users_prefix() -> String {
    "#users".to_owned()
}

fn default_shared_prefix() -> String {
    "#shared".to_owned()
}

fn default_separator() -> char {
    '.'
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        NamespaceConfig {
            private_prefix: default_private_prefix(),
            private_separator: default_separator(),
            other_users_prefix: default_other_users_prefix(),
            other_users_separator: default_separator(),
            shared_prefix: default_shared_prefix(),
            shared_separator: default_separator(),
        }
    }
}

/// The name-resolution logic, configured once at directory construction.
#[derive(Clone, Debug)]
pub struct Namespaces {
    config: NamespaceConfig,
}

impl Namespaces {
    pub fn new(config: NamespaceConfig) -> Self {
        Namespaces { config }
    }

    /// Translate the name `user` typed into the store key.
    ///
    /// `None` means the name starts with no recognised namespace prefix and
    /// cannot be interpreted at all. Callers treat that as a usage error,
    /// never as a lookup miss.
    pub fn to_absolute(&self, user: &str, full_name: &str) -> Option<String> {
        let c = &self.config;

        if let Some(rest) = strip_namespace(
            full_name,
            &c.private_prefix,
            c.private_separator,
        ) {
            return Some(match rest {
                None => self.private_root_of(user),
                Some(rest) => format!(
                    "{}{}{}{}{}",
                    c.private_prefix,
                    c.private_separator,
                    user,
                    c.private_separator,
                    rest
                ),
            });
        }

        if let Some(rest) = strip_namespace(
            full_name,
            &c.other_users_prefix,
            c.other_users_separator,
        ) {
            // The first segment after the prefix names the target user; the
            // remainder is a path in that user's private tree.
            let rest = rest?;
            return Some(match rest.find(c.other_users_separator) {
                None => self.private_root_of(rest),
                Some(ix) => format!(
                    "{}{}{}{}{}",
                    c.private_prefix,
                    c.private_separator,
                    &rest[..ix],
                    c.private_separator,
                    &rest[ix + c.other_users_separator.len_utf8()..]
                ),
            });
        }

        if strip_namespace(full_name, &c.shared_prefix, c.shared_separator)
            .is_some()
        {
            return Some(full_name.to_owned());
        }

        None
    }

    /// Translate a store key back into the name `user` would address it by.
    ///
    /// For private-tree keys this distinguishes the user's own mailboxes
    /// from other users' by splitting the key at the second separator after
    /// the private prefix: the segment between the first and second
    /// separators is the owner.
    pub fn to_relative(
        &self,
        user: &str,
        absolute_name: &str,
    ) -> Option<String> {
        let c = &self.config;

        if strip_namespace(absolute_name, &c.shared_prefix, c.shared_separator)
            .is_some()
        {
            return Some(absolute_name.to_owned());
        }

        let rest = strip_namespace(
            absolute_name,
            &c.private_prefix,
            c.private_separator,
        )??;

        Some(match rest.find(c.private_separator) {
            None => {
                // The key is a user's namespace root.
                if rest == user {
                    c.private_prefix.clone()
                } else {
                    format!(
                        "{}{}{}",
                        c.other_users_prefix, c.other_users_separator, rest
                    )
                }
            },
            Some(ix) => {
                let owner = &rest[..ix];
                let tail = &rest[ix + c.private_separator.len_utf8()..];
                if owner == user {
                    format!(
                        "{}{}{}",
                        c.private_prefix, c.private_separator, tail
                    )
                } else {
                    format!(
                        "{}{}{}{}{}",
                        c.other_users_prefix,
                        c.other_users_separator,
                        owner,
                        c.other_users_separator,
                        tail
                    )
                }
            },
        })
    }

    /// The absolute name of `user`'s private namespace root, e.g.
    /// `#mail.alice`.
    pub fn private_root_of(&self, user: &str) -> String {
        format!(
            "{}{}{}",
            self.config.private_prefix, self.config.private_separator, user
        )
    }

    /// The absolute name one hierarchy level above `absolute_name`, or
    /// `None` when the name sits directly under a namespace root and so has
    /// no parent mailbox.
    pub fn parent_of(&self, absolute_name: &str) -> Option<String> {
        let c = &self.config;

        let (prefix, sep) = if strip_namespace(
            absolute_name,
            &c.private_prefix,
            c.private_separator,
        )
        .is_some()
        {
            (&c.private_prefix, c.private_separator)
        } else if strip_namespace(
            absolute_name,
            &c.shared_prefix,
            c.shared_separator,
        )
        .is_some()
        {
            (&c.shared_prefix, c.shared_separator)
        } else {
            return None;
        };

        let rest = &absolute_name[prefix.len() + sep.len_utf8()..];
        rest.rfind(sep)
            .map(|ix| format!("{}{}{}", prefix, sep, &rest[..ix]))
    }

    /// The prefix and separator of the namespace `name` belongs to, if any.
    pub fn namespace_root_of(&self, name: &str) -> Option<(&str, char)> {
        let c = &self.config;
        if name.starts_with(&c.private_prefix) {
            Some((&c.private_prefix, c.private_separator))
        } else if name.starts_with(&c.other_users_prefix) {
            Some((&c.other_users_prefix, c.other_users_separator))
        } else if name.starts_with(&c.shared_prefix) {
            Some((&c.shared_prefix, c.shared_separator))
        } else {
            None
        }
    }

    /// The namespace root a `LIST` reference points into, defaulting to the
    /// private namespace for unqualified references.
    pub fn root_for_reference(&self, reference: &str) -> (&str, char) {
        self.namespace_root_of(reference).unwrap_or((
            &self.config.private_prefix,
            self.config.private_separator,
        ))
    }

    /// The hierarchy separator governing `name`, defaulting to the private
    /// namespace's for unqualified names.
    pub fn separator_of(&self, name: &str) -> char {
        self.namespace_root_of(name)
            .map(|(_, sep)| sep)
            .unwrap_or(self.config.private_separator)
    }

    /// Whether `name` already starts with one of the namespace prefixes.
    pub fn is_namespace_qualified(&self, name: &str) -> bool {
        self.namespace_root_of(name).is_some()
    }
}

/// Strip `prefix` from `name`.
///
/// `None`: `name` is not in this namespace. `Some(None)`: `name` is exactly
/// the prefix. `Some(Some(rest))`: the part after the prefix and its
/// separator. A prefix match is only accepted at a separator boundary, so
/// `#mailbox` is not part of the `#mail` namespace.
fn strip_namespace<'a>(
    name: &'a str,
    prefix: &str,
    separator: char,
) -> Option<Option<&'a str>> {
    if !name.starts_with(prefix) {
        return None;
    }

    let rest = &name[prefix.len()..];
    if rest.is_empty() {
        Some(None)
    } else if rest.starts_with(separator) {
        Some(Some(&rest[separator.len_utf8()..]))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn ns() -> Namespaces {
        Namespaces::new(NamespaceConfig::default())
    }

    #[test]
    fn test_to_absolute() {
        let ns = ns();

        assert_eq!(
            Some("#mail.alice.INBOX".to_owned()),
            ns.to_absolute("alice", "#mail.INBOX")
        );
        assert_eq!(
            Some("#mail.alice.Work.Sub".to_owned()),
            ns.to_absolute("alice", "#mail.Work.Sub")
        );
        assert_eq!(
            Some("#mail.alice".to_owned()),
            ns.to_absolute("alice", "#mail")
        );
        assert_eq!(
            Some("#mail.bob.INBOX".to_owned()),
            ns.to_absolute("alice", "#users.bob.INBOX")
        );
        assert_eq!(
            Some("#mail.bob".to_owned()),
            ns.to_absolute("alice", "#users.bob")
        );
        assert_eq!(
            Some("#shared.announce".to_owned()),
            ns.to_absolute("alice", "#shared.announce")
        );
        assert_eq!(None, ns.to_absolute("alice", "INBOX"));
        assert_eq!(None, ns.to_absolute("alice", "#mailbox.INBOX"));
        assert_eq!(None, ns.to_absolute("alice", "#users"));
    }

    #[test]
    fn test_to_relative() {
        let ns = ns();

        assert_eq!(
            Some("#mail.INBOX".to_owned()),
            ns.to_relative("alice", "#mail.alice.INBOX")
        );
        assert_eq!(
            Some("#mail".to_owned()),
            ns.to_relative("alice", "#mail.alice")
        );
        assert_eq!(
            Some("#users.bob.INBOX".to_owned()),
            ns.to_relative("alice", "#mail.bob.INBOX")
        );
        assert_eq!(
            Some("#users.bob".to_owned()),
            ns.to_relative("alice", "#mail.bob")
        );
        assert_eq!(
            Some("#shared.announce".to_owned()),
            ns.to_relative("alice", "#shared.announce")
        );
        assert_eq!(None, ns.to_relative("alice", "unqualified"));
    }

    #[test]
    fn test_parent_of() {
        let ns = ns();

        assert_eq!(
            Some("#mail.alice.Work".to_owned()),
            ns.parent_of("#mail.alice.Work.Sub")
        );
        assert_eq!(
            Some("#mail.alice".to_owned()),
            ns.parent_of("#mail.alice.Work")
        );
        assert_eq!(None, ns.parent_of("#mail.alice"));
        assert_eq!(
            Some("#shared.lists".to_owned()),
            ns.parent_of("#shared.lists.rust")
        );
        assert_eq!(None, ns.parent_of("#shared.lists"));
    }

    #[test]
    fn test_separator_and_qualification() {
        let ns = ns();

        assert_eq!('.', ns.separator_of("#mail.alice.INBOX"));
        assert!(ns.is_namespace_qualified("#shared.announce"));
        assert!(!ns.is_namespace_qualified("INBOX"));
    }

    proptest! {
        #[test]
        fn private_names_round_trip(
            user in "[a-z]{1,8}",
            path in "[A-Za-z0-9 ]{1,12}(\\.[A-Za-z0-9 ]{1,12}){0,3}",
        ) {
            let ns = ns();
            let full = format!("#mail.{}", path);
            let absolute = ns.to_absolute(&user, &full).unwrap();
            prop_assert_eq!(Some(full), ns.to_relative(&user, &absolute));
        }

        #[test]
        fn other_users_names_round_trip(
            user in "[a-z]{1,8}",
            owner in "[a-z]{1,8}",
            path in "[A-Za-z0-9 ]{1,12}",
        ) {
            prop_assume!(user != owner);

            let ns = ns();
            let full = format!("#users.{}.{}", owner, path);
            let absolute = ns.to_absolute(&user, &full).unwrap();
            prop_assert_eq!(Some(full), ns.to_relative(&user, &absolute));
        }
    }
}
