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

use std::sync::Arc;

use log::{error, warn};

use super::defs::{DirectoryInner, MailboxDirectory, OpenMailbox};
use crate::directory::handle::MailboxHandle;
use crate::directory::model::RecordLookup;
use crate::support::error::Error;

impl MailboxDirectory {
    /// Obtain the open mailbox for `full_name`, as addressed by `user`.
    ///
    /// A mailbox someone else already has open is shared: the caller gets
    /// the same handle and the reference count goes up. Otherwise the
    /// mailbox is revived from its backing storage. Either way the caller
    /// owes a matching `release_mailbox`.
    pub fn get_mailbox(
        &self,
        user: &str,
        full_name: &str,
    ) -> Result<Arc<dyn MailboxHandle>, Error> {
        let absolute_name = self.resolve(user, full_name)?;
        let mut inner = self.inner.lock().unwrap();
        self.open_locked(&mut inner, user, &absolute_name)
    }

    pub(super) fn open_locked(
        &self,
        inner: &mut DirectoryInner,
        user: &str,
        absolute_name: &str,
    ) -> Result<Arc<dyn MailboxHandle>, Error> {
        let record = match Self::look_up_record(inner, absolute_name)? {
            RecordLookup::Active(record) => record,
            RecordLookup::Tombstoned(_) => {
                return Err(Error::MailboxTombstoned)
            },
            RecordLookup::Unknown => return Err(Error::NxMailbox),
        };

        if let Some(entry) = inner.open.get_mut(absolute_name) {
            if !entry.handle.has_lookup_rights(user) {
                return Err(Error::NoLookupRights);
            }
            entry.ref_count += 1;
            return Ok(Arc::clone(&entry.handle));
        }

        let location =
            self.locator.location_of(absolute_name, &record.owner);
        let handle = match self.factory.reopen_mailbox(&location) {
            Ok(handle) => handle,
            Err(e) => {
                error!(
                    "{} Failed to reopen mailbox '{}' from {}: {}",
                    self.log_prefix,
                    absolute_name,
                    location.display(),
                    e
                );
                return Err(e);
            },
        };
        if !handle.has_lookup_rights(user) {
            // The caller may never see this mailbox, so it must not enter
            // the cache either.
            let _ = handle.dispose();
            return Err(Error::NoLookupRights);
        }

        inner.open.insert(
            absolute_name.to_owned(),
            OpenMailbox {
                handle: Arc::clone(&handle),
                ref_count: 1,
            },
        );
        Ok(handle)
    }

    /// Give up one reference to an open mailbox.
    ///
    /// `None` is accepted and ignored so callers can unconditionally
    /// release whatever they may or may not have opened. Unless `user` is
    /// the internal delivery identity, the mailbox loses its \Recent state
    /// first. When the last reference goes, the handle's live state is
    /// flushed into its folder record and the handle is torn down; this is
    /// the only path by which in-memory mailbox mutations become durable.
    pub fn release_mailbox(
        &self,
        user: &str,
        handle: Option<Arc<dyn MailboxHandle>>,
    ) -> Result<(), Error> {
        let handle = match handle {
            Some(handle) => handle,
            None => return Ok(()),
        };

        if user != self.internal_delivery_user {
            handle.clear_recent();
        }

        let mut inner = self.inner.lock().unwrap();
        self.release_locked(&mut inner, &handle)
    }

    /// The ref-count bookkeeping of release, shared with the internal
    /// paths that must not touch the \Recent state.
    pub(super) fn release_locked(
        &self,
        inner: &mut DirectoryInner,
        handle: &Arc<dyn MailboxHandle>,
    ) -> Result<(), Error> {
        let absolute_name = handle.absolute_name();

        let mut entry = match inner.open.remove(&absolute_name) {
            Some(entry) => entry,
            None => {
                warn!(
                    "{} Release of mailbox '{}' which is not open",
                    self.log_prefix, absolute_name
                );
                return Ok(());
            },
        };

        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            inner.open.insert(absolute_name, entry);
            return Ok(());
        }

        let mut record = match inner.store.retrieve(&absolute_name)? {
            Some(record) => record,
            None => return Err(Error::CorruptRecordStore),
        };
        record.absorb_handle(&*entry.handle);
        if let Err(e) = inner.store.store(record) {
            error!(
                "{} Failed to persist folder record for '{}': {}",
                self.log_prefix, absolute_name, e
            );
            return Err(e);
        }

        entry.handle.dispose()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::directory::testing::TestFixture;

    #[test]
    fn get_unknown_mailbox_is_nx() {
        let fixture = TestFixture::provisioned("alice");

        assert_matches!(
            Err(Error::NxMailbox),
            fixture.directory.get_mailbox("alice", "#mail.Nonesuch")
        );
    }

    #[test]
    fn get_unresolvable_name_is_usage_error() {
        let fixture = TestFixture::provisioned("alice");

        assert_matches!(
            Err(Error::UnresolvableName),
            fixture.directory.get_mailbox("alice", "INBOX")
        );
    }

    #[test]
    fn tombstone_blocks_reopen() {
        let fixture = TestFixture::provisioned("alice");
        fixture.store.tombstone("#mail.alice.INBOX");

        assert_matches!(
            Err(Error::MailboxTombstoned),
            fixture.directory.get_mailbox("alice", "#mail.INBOX")
        );
    }

    #[test]
    fn open_release_cycle_flushes_record_once() {
        let fixture = TestFixture::provisioned("alice");

        let first =
            fixture.directory.get_mailbox("alice", "#mail.INBOX").unwrap();
        let second =
            fixture.directory.get_mailbox("alice", "#mail.INBOX").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            Some(2),
            fixture.directory.open_ref_count("#mail.alice.INBOX")
        );

        // Script some live activity into the open mailbox.
        fixture.factory.last_created().mutate(|state| {
            state.message_count = 5;
            state.recent_count = 2;
            state.next_uid = 42;
            state.marked = true;
            state.unseen_by_user.insert("alice".to_owned(), 3);
        });

        let stores_before = fixture.store.store_count();
        fixture
            .directory
            .release_mailbox("alice", Some(first))
            .unwrap();
        assert_eq!(
            Some(1),
            fixture.directory.open_ref_count("#mail.alice.INBOX")
        );
        assert_eq!(stores_before, fixture.store.store_count());

        fixture
            .directory
            .release_mailbox("alice", Some(second))
            .unwrap();
        assert_eq!(0, fixture.directory.open_count());
        assert_eq!(stores_before + 1, fixture.store.store_count());
        assert!(fixture.factory.last_created().state().disposed);

        let record = fixture.store.snapshot("#mail.alice.INBOX").unwrap();
        assert_eq!(5, record.exists);
        // The first release already cleared \Recent on the live handle.
        assert_eq!(0, record.recent);
        assert_eq!(41, record.highest_uid);
        assert!(record.marked);
        assert_eq!(3, record.unseen_for("alice"));
    }

    #[test]
    fn release_of_none_is_a_no_op() {
        let fixture = TestFixture::provisioned("alice");
        fixture.directory.release_mailbox("alice", None).unwrap();
    }

    #[test]
    fn delivery_identity_keeps_recent() {
        let fixture = TestFixture::provisioned("alice");

        let handle = fixture
            .directory
            .get_mailbox("internal-delivery", "#users.alice.INBOX")
            .unwrap();
        fixture.factory.last_created().mutate(|state| {
            state.recent_count = 4;
        });
        fixture
            .directory
            .release_mailbox("internal-delivery", Some(handle))
            .unwrap();

        let record = fixture.store.snapshot("#mail.alice.INBOX").unwrap();
        assert_eq!(4, record.recent);
    }

    #[test]
    fn lookup_rights_enforced_on_cached_and_reopened() {
        let fixture = TestFixture::provisioned("alice");

        // Closed mailbox: the reopened handle is interrogated and thrown
        // away again.
        assert_matches!(
            Err(Error::NoLookupRights),
            fixture.directory.get_mailbox("mallory", "#users.alice.INBOX")
        );
        assert_eq!(0, fixture.directory.open_count());

        // Cached mailbox: the live handle is interrogated.
        let handle =
            fixture.directory.get_mailbox("alice", "#mail.INBOX").unwrap();
        assert_matches!(
            Err(Error::NoLookupRights),
            fixture.directory.get_mailbox("mallory", "#users.alice.INBOX")
        );
        assert_eq!(
            Some(1),
            fixture.directory.open_ref_count("#mail.alice.INBOX")
        );
        fixture
            .directory
            .release_mailbox("alice", Some(handle))
            .unwrap();
    }

    #[test]
    fn concurrent_opens_share_one_handle() {
        let fixture = TestFixture::provisioned("alice");
        let created_before = fixture.factory.created_count();
        let stores_before = fixture.store.store_count();
        let directory = Arc::new(fixture.directory);

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let directory = Arc::clone(&directory);
                thread::spawn(move || {
                    directory.get_mailbox("alice", "#mail.INBOX").unwrap()
                })
            })
            .collect();
        let handles: Vec<_> =
            threads.into_iter().map(|t| t.join().unwrap()).collect();

        // Exactly one revival happened regardless of the race.
        assert_eq!(created_before + 1, fixture.factory.created_count());
        assert_eq!(
            Some(8),
            directory.open_ref_count("#mail.alice.INBOX")
        );
        for pair in handles.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }

        let threads: Vec<_> = handles
            .into_iter()
            .map(|handle| {
                let directory = Arc::clone(&directory);
                thread::spawn(move || {
                    directory
                        .release_mailbox("alice", Some(handle))
                        .unwrap()
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(0, directory.open_count());
        assert_eq!(stores_before + 1, fixture.store.store_count());
    }
}
