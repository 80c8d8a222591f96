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

use log::error;

use super::defs::{DirectoryInner, MailboxDirectory, OpenMailbox};
use crate::directory::handle::MailboxHandle;
use crate::directory::model::{FolderRecord, RecordLookup};
use crate::support::error::Error;
use crate::support::safe_name::is_safe_segment;

/// How many missing ancestors a single create may manufacture.
///
/// RFC 2683 cautions against mailbox hierarchies much deeper than this;
/// anything beyond is assumed to be a malformed or malicious name rather
/// than a real request.
const MAX_HIERARCHY_DEPTH: u32 = 20;

/// The rights granted to the delivery identity on a fresh INBOX: lookup,
/// read, keep-seen, write, and insert.
const DELIVERY_RIGHTS: &str = "lrswi";

impl MailboxDirectory {
    /// Create the mailbox `full_name` for `user` and return it, open, with
    /// one reference held by the caller.
    ///
    /// Ancestors missing from the hierarchy are created on the way, and the
    /// caller must hold create rights on the (possibly just-created)
    /// parent. A tombstoned record under the same name does not block
    /// creation; the name is resurrected with a strictly greater UID
    /// validity.
    pub fn create_mailbox(
        &self,
        user: &str,
        full_name: &str,
    ) -> Result<Arc<dyn MailboxHandle>, Error> {
        let absolute_name = self.resolve(user, full_name)?;
        self.check_segments(&absolute_name)?;

        let mut inner = self.inner.lock().unwrap();
        self.create_locked(&mut inner, user, &absolute_name, 0)
    }

    /// Validate every hierarchy segment of `absolute_name`.
    fn check_segments(&self, absolute_name: &str) -> Result<(), Error> {
        let (prefix, separator) = self
            .namespaces
            .namespace_root_of(absolute_name)
            .ok_or(Error::UnresolvableName)?;

        let rest = &absolute_name[prefix.len()..];
        let rest = match rest.chars().next() {
            Some(c) if c == separator => &rest[separator.len_utf8()..],
            // The bare namespace root is not a creatable mailbox.
            _ => return Err(Error::UnsafeName),
        };

        for segment in rest.split(separator) {
            if !is_safe_segment(segment, separator) {
                return Err(Error::UnsafeName);
            }
        }
        Ok(())
    }

    fn create_locked(
        &self,
        inner: &mut DirectoryInner,
        user: &str,
        absolute_name: &str,
        depth: u32,
    ) -> Result<Arc<dyn MailboxHandle>, Error> {
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(Error::HierarchyTooDeep);
        }

        let tombstone = match Self::look_up_record(inner, absolute_name)? {
            RecordLookup::Active(_) => return Err(Error::MailboxExists),
            RecordLookup::Tombstoned(record) => Some(record),
            RecordLookup::Unknown => None,
        };

        if let Some(parent_name) = self.namespaces.parent_of(absolute_name) {
            let parent = match Self::look_up_record(inner, &parent_name)? {
                RecordLookup::Active(_) => {
                    self.open_locked(inner, user, &parent_name)?
                },
                // Missing or tombstoned: manufacture the ancestor first.
                _ => self.create_locked(
                    inner,
                    user,
                    &parent_name,
                    depth + 1,
                )?,
            };

            let allowed = parent.has_create_rights(user);
            // Internal release: checking rights on the parent must not
            // consume its \Recent state.
            self.release_locked(inner, &parent)?;
            if !allowed {
                return Err(Error::NoCreateRights);
            }
        }

        let full_name = self
            .namespaces
            .to_relative(user, absolute_name)
            .ok_or(Error::UnresolvableName)?;

        let handle = self.factory.blank_mailbox()?;
        handle.prepare_mailbox(user, absolute_name, user)?;

        let mut record = FolderRecord::for_new_mailbox(
            &full_name,
            user,
            absolute_name,
            &*handle,
        );
        if let Some(tombstone) = tombstone {
            // The name is being resurrected; clients must never observe the
            // same (name, UIDVALIDITY) pair for two different mailboxes.
            record.set_uid_validity(tombstone.uid_validity + 1);
        }
        inner.store.store(record)?;

        inner.open.insert(
            absolute_name.to_owned(),
            OpenMailbox {
                handle: Arc::clone(&handle),
                ref_count: 1,
            },
        );
        Ok(handle)
    }

    /// Provision `user`'s private mail account: the namespace root (a pure
    /// hierarchy node nobody can select) and the INBOX the delivery agent
    /// may drop mail into.
    ///
    /// Both mailboxes are prepared in memory before either record is
    /// persisted, so a failure cannot commit half an account. Anything that
    /// does go wrong is logged and reported as `false`; callers must treat
    /// that as "state unknown, inspect before retrying".
    pub fn create_private_mail_account(&self, user: &str) -> bool {
        match self.provision_private_account(user) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "{} Failed to provision mail account for '{}': {}",
                    self.log_prefix, user, e
                );
                false
            },
        }
    }

    fn provision_private_account(&self, user: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();

        let root_name = self.namespaces.private_root_of(user);
        let separator = self.namespaces.separator_of(&root_name);
        let inbox_name = format!("{}{}INBOX", root_name, separator);

        let root_active = match Self::look_up_record(&inner, &root_name)? {
            RecordLookup::Active(_) => true,
            _ => false,
        };
        let inbox_active = match Self::look_up_record(&inner, &inbox_name)? {
            RecordLookup::Active(_) => true,
            _ => false,
        };
        if root_active && inbox_active {
            return Ok(());
        }

        let root = self.factory.blank_mailbox()?;
        root.prepare_mailbox(user, &root_name, user)?;
        root.set_not_selectable_by_anyone(true);

        let inbox = self.factory.blank_mailbox()?;
        inbox.prepare_mailbox(user, &inbox_name, user)?;
        inbox.set_rights(
            &self.internal_delivery_user,
            user,
            DELIVERY_RIGHTS,
        )?;

        // Both mailboxes are fully prepared; only now touch the store.
        if !root_active {
            let full_name = self
                .namespaces
                .to_relative(user, &root_name)
                .ok_or(Error::UnresolvableName)?;
            inner.store.store(FolderRecord::for_new_mailbox(
                &full_name, user, &root_name, &*root,
            ))?;
        }
        if !inbox_active {
            let full_name = self
                .namespaces
                .to_relative(user, &inbox_name)
                .ok_or(Error::UnresolvableName)?;
            inner.store.store(FolderRecord::for_new_mailbox(
                &full_name, user, &inbox_name, &*inbox,
            ))?;
        }

        root.dispose()?;
        inbox.dispose()?;
        Ok(())
    }
}
