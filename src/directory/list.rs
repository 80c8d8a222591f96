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

use super::defs::MailboxDirectory;
use crate::directory::model::{ListEntry, MailboxAttribute};
use crate::directory::pattern::pattern_matches;
use crate::support::error::Error;

impl MailboxDirectory {
    /// Enumerate the mailboxes matching `reference_name` + `mailbox_name`,
    /// as `user` would see them.
    ///
    /// `subscribed_only` (the LSUB flavour) is not implemented.
    ///
    /// An empty `mailbox_name` is a query for the hierarchy itself and
    /// reports the root of whichever namespace the reference points into.
    pub fn list_mailboxes(
        &self,
        user: &str,
        reference_name: &str,
        mailbox_name: &str,
        subscribed_only: bool,
    ) -> Result<Vec<ListEntry>, Error> {
        if subscribed_only {
            return Err(Error::NotImplemented("LSUB"));
        }

        if mailbox_name.is_empty() {
            let (prefix, separator) =
                self.namespaces.root_for_reference(reference_name);
            return Ok(vec![ListEntry {
                attributes: vec![MailboxAttribute::Noselect],
                separator,
                name: prefix.to_owned(),
            }]);
        }

        // A leading % that merely restates a namespace boundary is
        // redundant; drop it so the remainder resolves as a qualified name.
        let mailbox_name = if mailbox_name.starts_with('%')
            && self.namespaces.is_namespace_qualified(&mailbox_name[1..])
        {
            &mailbox_name[1..]
        } else {
            mailbox_name
        };

        let target = if self.namespaces.is_namespace_qualified(mailbox_name)
            || reference_name.is_empty()
        {
            mailbox_name.to_owned()
        } else {
            let separator = self.namespaces.separator_of(reference_name);
            if reference_name.ends_with(separator) {
                format!("{}{}", reference_name, mailbox_name)
            } else {
                format!("{}{}{}", reference_name, separator, mailbox_name)
            }
        };

        let pattern = self.resolve(user, &target)?;
        let separator = self.namespaces.separator_of(&pattern);

        let inner = self.inner.lock().unwrap();
        let mut entries = Vec::new();
        for candidate in inner.store.absolute_names()? {
            if !pattern_matches(&pattern, &candidate, separator) {
                continue;
            }
            let record = match inner.store.retrieve(&candidate)? {
                Some(record) => record,
                None => continue,
            };
            let display = match self.namespaces.to_relative(user, &candidate)
            {
                Some(name) => name,
                None => continue,
            };
            // The one name every client knows. Whatever tree it actually
            // lives in, it is presented as the bare INBOX.
            let display = if display.to_ascii_uppercase().contains("INBOX") {
                "INBOX".to_owned()
            } else {
                display
            };

            let open = inner.open.get(&candidate);
            let selectable = match open {
                Some(entry) => entry.handle.is_selectable(user),
                None => !record.not_selectable_by_anyone,
            };

            let mut attributes = Vec::new();
            if record.deleted || !selectable {
                attributes.push(MailboxAttribute::Noselect);
            } else {
                let marked = match open {
                    Some(entry) => entry.handle.is_marked(),
                    None => record.marked,
                };
                attributes.push(if marked {
                    MailboxAttribute::Marked
                } else {
                    MailboxAttribute::Unmarked
                });
            }

            entries.push(ListEntry {
                attributes,
                separator,
                name: display,
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::directory::testing::TestFixture;

    fn list_formatted(
        fixture: &TestFixture,
        user: &str,
        reference_name: &str,
        mailbox_name: &str,
    ) -> String {
        let mut entries = fixture
            .directory
            .list_mailboxes(user, reference_name, mailbox_name, false)
            .unwrap()
            .into_iter()
            .map(|entry| entry.to_string())
            .collect::<Vec<_>>();
        entries.sort();
        entries.join("\n")
    }

    fn fixture_with_tree() -> TestFixture {
        let fixture = TestFixture::provisioned("alice");
        for name in &["#mail.Work", "#mail.Work.Sub"] {
            let handle =
                fixture.directory.create_mailbox("alice", name).unwrap();
            fixture
                .directory
                .release_mailbox("alice", Some(handle))
                .unwrap();
        }
        fixture
    }

    #[test]
    fn trailing_percent_lists_direct_children() {
        let fixture = fixture_with_tree();

        assert_eq!(
            "(\\Unmarked) \".\" \"#mail.Work\"\n\
             (\\Unmarked) \".\" \"INBOX\"",
            list_formatted(&fixture, "alice", "#mail", "%")
        );
    }

    #[test]
    fn qualified_pattern_ignores_reference() {
        let fixture = fixture_with_tree();

        assert_eq!(
            "(\\Unmarked) \".\" \"#mail.Work.Sub\"",
            list_formatted(
                &fixture,
                "alice",
                "#mail.whatever",
                "#mail.Work.Sub"
            )
        );
    }

    #[test]
    fn redundant_boundary_percent_is_dropped() {
        let fixture = fixture_with_tree();

        assert_eq!(
            "(\\Unmarked) \".\" \"#mail.Work.Sub\"",
            list_formatted(&fixture, "alice", "", "%#mail.Work.Sub")
        );
    }

    #[test]
    fn empty_mailbox_name_reports_namespace_root() {
        let fixture = fixture_with_tree();

        assert_eq!(
            "(\\Noselect) \".\" \"#mail\"",
            list_formatted(&fixture, "alice", "#mail", "")
        );
        assert_eq!(
            "(\\Noselect) \".\" \"#shared\"",
            list_formatted(&fixture, "alice", "#shared.lists", "")
        );
    }

    #[test]
    fn deleted_mailboxes_report_noselect() {
        let fixture = fixture_with_tree();
        fixture.store.tombstone("#mail.alice.Work.Sub");

        assert_eq!(
            "(\\Noselect) \".\" \"#mail.Work.Sub\"",
            list_formatted(&fixture, "alice", "", "#mail.Work.Sub")
        );
    }

    #[test]
    fn marked_state_comes_from_live_handle_when_open() {
        let fixture = fixture_with_tree();

        let handle = fixture
            .directory
            .get_mailbox("alice", "#mail.Work")
            .unwrap();
        fixture.factory.last_created().mutate(|state| {
            state.marked = true;
        });

        assert_eq!(
            "(\\Marked) \".\" \"#mail.Work\"",
            list_formatted(&fixture, "alice", "", "#mail.Work")
        );

        fixture
            .directory
            .release_mailbox("alice", Some(handle))
            .unwrap();

        // Closed again: the flushed record still says \Marked.
        assert_eq!(
            "(\\Marked) \".\" \"#mail.Work\"",
            list_formatted(&fixture, "alice", "", "#mail.Work")
        );
    }

    #[test]
    fn foreign_mailboxes_requalify_under_other_users() {
        let fixture = TestFixture::provisioned("bob");

        assert_eq!(
            "(\\Noselect) \".\" \"#users.bob\"",
            list_formatted(&fixture, "alice", "", "#users.bob")
        );
    }

    #[test]
    fn lsub_flavour_is_not_implemented() {
        let fixture = TestFixture::provisioned("alice");

        assert_matches!(
            Err(Error::NotImplemented("LSUB")),
            fixture.directory.list_mailboxes("alice", "", "#mail.%", true)
        );
    }
}
