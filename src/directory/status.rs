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
use crate::directory::model::{RecordLookup, StatusItems};
use crate::support::error::Error;

impl MailboxDirectory {
    /// The `STATUS`-style query: report the requested data items for
    /// `full_name` without opening it.
    ///
    /// A mailbox somebody has open answers from its live handle; a closed
    /// one answers from its folder record, whose counters date from the
    /// last release.
    pub fn mailbox_status(
        &self,
        user: &str,
        full_name: &str,
        items: &StatusItems,
    ) -> Result<String, Error> {
        let absolute_name = self.resolve(user, full_name)?;

        let inner = self.inner.lock().unwrap();
        let record = match Self::look_up_record(&inner, &absolute_name)? {
            RecordLookup::Active(record) => record,
            RecordLookup::Tombstoned(_) => {
                return Err(Error::MailboxTombstoned)
            },
            RecordLookup::Unknown => return Err(Error::NxMailbox),
        };

        let mut parts = Vec::new();
        if let Some(entry) = inner.open.get(&absolute_name) {
            let handle = &entry.handle;
            if !handle.has_lookup_rights(user) {
                return Err(Error::NoLookupRights);
            }

            if items.messages {
                parts.push(format!("MESSAGES {}", handle.message_count()));
            }
            if items.recent {
                parts.push(format!("RECENT {}", handle.recent_count()));
            }
            if items.uidnext {
                parts.push(format!("UIDNEXT {}", handle.next_uid()));
            }
            if items.uidvalidity {
                parts.push(format!("UIDVALIDITY {}", handle.uid_validity()));
            }
            if items.unseen {
                let unseen = handle
                    .unseen_by_user()
                    .get(user)
                    .copied()
                    .unwrap_or_else(|| handle.message_count());
                parts.push(format!("UNSEEN {}", unseen));
            }
        } else {
            if !record.has_lookup_rights(user) {
                return Err(Error::NoLookupRights);
            }

            if items.messages {
                parts.push(format!("MESSAGES {}", record.exists));
            }
            if items.recent {
                parts.push(format!("RECENT {}", record.recent));
            }
            if items.uidnext {
                parts.push(format!("UIDNEXT {}", record.highest_uid + 1));
            }
            if items.uidvalidity {
                parts.push(format!("UIDVALIDITY {}", record.uid_validity));
            }
            if items.unseen {
                parts.push(format!("UNSEEN {}", record.unseen_for(user)));
            }
        }

        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::directory::testing::TestFixture;

    const ALL_ITEMS: StatusItems = StatusItems {
        messages: true,
        recent: true,
        uidnext: true,
        uidvalidity: true,
        unseen: true,
    };

    #[test]
    fn status_of_closed_mailbox_reads_record() {
        let fixture = TestFixture::provisioned("alice");
        fixture.store.amend("#mail.alice.INBOX", |record| {
            record.exists = 3;
            record.recent = 1;
            record.highest_uid = 41;
            record.uid_validity = 7;
        });

        assert_eq!(
            "UIDNEXT 42",
            fixture
                .directory
                .mailbox_status(
                    "alice",
                    "#mail.INBOX",
                    &StatusItems {
                        uidnext: true,
                        ..StatusItems::default()
                    }
                )
                .unwrap()
        );
        assert_eq!(
            "MESSAGES 3 RECENT 1 UIDNEXT 42 UIDVALIDITY 7 UNSEEN 3",
            fixture
                .directory
                .mailbox_status("alice", "#mail.INBOX", &ALL_ITEMS)
                .unwrap()
        );
    }

    #[test]
    fn unseen_falls_back_to_exists_for_untracked_users() {
        let fixture = TestFixture::provisioned("alice");
        fixture.store.amend("#mail.alice.INBOX", |record| {
            record.exists = 9;
            record
                .unseen_by_user
                .insert("internal-delivery".to_owned(), 4);
        });

        assert_eq!(
            "UNSEEN 9",
            fixture
                .directory
                .mailbox_status(
                    "alice",
                    "#mail.INBOX",
                    &StatusItems {
                        unseen: true,
                        ..StatusItems::default()
                    }
                )
                .unwrap()
        );
        assert_eq!(
            "UNSEEN 4",
            fixture
                .directory
                .mailbox_status(
                    "internal-delivery",
                    "#users.alice.INBOX",
                    &StatusItems {
                        unseen: true,
                        ..StatusItems::default()
                    }
                )
                .unwrap()
        );
    }

    #[test]
    fn status_of_open_mailbox_reads_live_handle() {
        let fixture = TestFixture::provisioned("alice");
        fixture.store.amend("#mail.alice.INBOX", |record| {
            record.exists = 1;
            record.highest_uid = 10;
        });

        let handle =
            fixture.directory.get_mailbox("alice", "#mail.INBOX").unwrap();
        fixture.factory.last_created().mutate(|state| {
            state.message_count = 6;
            state.recent_count = 2;
            state.next_uid = 100;
            state.uid_validity = 55;
        });

        assert_eq!(
            "MESSAGES 6 RECENT 2 UIDNEXT 100 UIDVALIDITY 55 UNSEEN 6",
            fixture
                .directory
                .mailbox_status("alice", "#mail.INBOX", &ALL_ITEMS)
                .unwrap()
        );

        fixture
            .directory
            .release_mailbox("alice", Some(handle))
            .unwrap();
    }

    #[test]
    fn status_respects_existence_and_rights() {
        let fixture = TestFixture::provisioned("alice");

        assert_matches!(
            Err(Error::NxMailbox),
            fixture.directory.mailbox_status(
                "alice",
                "#mail.Nonesuch",
                &ALL_ITEMS
            )
        );

        fixture.store.tombstone("#mail.alice.INBOX");
        assert_matches!(
            Err(Error::MailboxTombstoned),
            fixture.directory.mailbox_status(
                "alice",
                "#mail.INBOX",
                &ALL_ITEMS
            )
        );

        let fixture = TestFixture::provisioned("bob");
        assert_matches!(
            Err(Error::NoLookupRights),
            fixture.directory.mailbox_status(
                "mallory",
                "#users.bob.INBOX",
                &ALL_ITEMS
            )
        );
    }
}
