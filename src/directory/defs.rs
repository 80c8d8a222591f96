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

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::directory::handle::{
    MailboxFactory, MailboxHandle, MailboxLocator,
};
use crate::directory::model::RecordLookup;
use crate::directory::namespaces::{NamespaceConfig, Namespaces};
use crate::directory::store::FolderRecordStore;
use crate::support::error::Error;

/// The mailbox directory: the one component that knows every mailbox on the
/// host.
///
/// It resolves user-relative names, keeps the reference-counted cache of
/// open mailboxes, and is the sole writer of folder records. Every
/// operation is a blocking call; the worker thread of the connection that
/// issued the command simply waits.
pub struct MailboxDirectory {
    pub(super) log_prefix: String,
    pub(super) namespaces: Namespaces,
    pub(super) factory: Box<dyn MailboxFactory>,
    pub(super) locator: Box<dyn MailboxLocator>,
    /// The identity the delivery agent runs as. Releases by this identity
    /// leave the \Recent state of the mailbox alone.
    pub(super) internal_delivery_user: String,
    pub(super) inner: Mutex<DirectoryInner>,
}

/// Everything mutable, behind one mutex.
///
/// The open map and the record store must only ever change together (an
/// open mailbox without a live record is unrepresentable), so they share a
/// single critical section rather than carrying separate locks.
pub(super) struct DirectoryInner {
    pub(super) store: Box<dyn FolderRecordStore>,
    pub(super) open: HashMap<String, OpenMailbox>,
}

/// A cache entry for one open mailbox.
///
/// `ref_count` is at least 1 while the entry exists; the entry is removed
/// and the handle's state flushed to its record exactly when the count
/// drops to 0.
pub(super) struct OpenMailbox {
    pub(super) handle: Arc<dyn MailboxHandle>,
    pub(super) ref_count: u32,
}

impl MailboxDirectory {
    pub fn new(
        log_prefix: String,
        config: NamespaceConfig,
        store: Box<dyn FolderRecordStore>,
        factory: Box<dyn MailboxFactory>,
        locator: Box<dyn MailboxLocator>,
        internal_delivery_user: String,
    ) -> Self {
        MailboxDirectory {
            log_prefix,
            namespaces: Namespaces::new(config),
            factory,
            locator,
            internal_delivery_user,
            inner: Mutex::new(DirectoryInner {
                store,
                open: HashMap::new(),
            }),
        }
    }

    /// Resolve `full_name` for `user`, surfacing unrecognised namespaces as
    /// a typed usage error.
    pub(super) fn resolve(
        &self,
        user: &str,
        full_name: &str,
    ) -> Result<String, Error> {
        self.namespaces
            .to_absolute(user, full_name)
            .ok_or(Error::UnresolvableName)
    }

    /// Consult the record store for `absolute_name` and classify the
    /// outcome.
    pub(super) fn look_up_record(
        inner: &DirectoryInner,
        absolute_name: &str,
    ) -> Result<RecordLookup, Error> {
        Ok(match inner.store.retrieve(absolute_name)? {
            None => RecordLookup::Unknown,
            Some(record) if record.deleted => RecordLookup::Tombstoned(record),
            Some(record) => RecordLookup::Active(record),
        })
    }

    /// Mailbox deletion. Not implemented: records carry the tombstone flag,
    /// but nothing sets it yet.
    pub fn delete_mailbox(
        &self,
        _user: &str,
        _full_name: &str,
    ) -> Result<(), Error> {
        Err(Error::NotImplemented("DELETE"))
    }

    /// Mailbox renaming. Not implemented.
    pub fn rename_mailbox(
        &self,
        _user: &str,
        _existing_name: &str,
        _new_name: &str,
    ) -> Result<(), Error> {
        Err(Error::NotImplemented("RENAME"))
    }

    /// Subscriptions. Not implemented.
    pub fn subscribe(
        &self,
        _user: &str,
        _full_name: &str,
    ) -> Result<(), Error> {
        Err(Error::NotImplemented("SUBSCRIBE"))
    }

    /// Subscriptions. Not implemented.
    pub fn unsubscribe(
        &self,
        _user: &str,
        _full_name: &str,
    ) -> Result<(), Error> {
        Err(Error::NotImplemented("UNSUBSCRIBE"))
    }

    /// The number of distinct mailboxes currently open.
    #[cfg(test)]
    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().open.len()
    }

    /// The reference count of the given open mailbox, if it is open.
    #[cfg(test)]
    pub fn open_ref_count(&self, absolute_name: &str) -> Option<u32> {
        self.inner
            .lock()
            .unwrap()
            .open
            .get(absolute_name)
            .map(|entry| entry.ref_count)
    }
}
