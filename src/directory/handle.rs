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

//! The capability interfaces the directory consumes.
//!
//! The actual opened-mailbox implementation lives with the message storage
//! engine; the directory only caches handles, interrogates them for rights
//! and counters, and reconciles their state into folder records on the last
//! release.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::support::error::Error;

/// An opened, live mailbox.
///
/// Handles are shared between every connection that has the mailbox open,
/// so implementations synchronise internally and all methods take `&self`.
pub trait MailboxHandle: fmt::Debug + Send + Sync {
    /// The namespace-qualified name this mailbox was prepared with.
    fn absolute_name(&self) -> String;

    fn has_lookup_rights(&self, user: &str) -> bool;
    fn has_read_rights(&self, user: &str) -> bool;
    fn has_create_rights(&self, user: &str) -> bool;
    /// Whether `user` could SELECT this mailbox.
    fn is_selectable(&self, user: &str) -> bool;

    fn is_marked(&self) -> bool;
    fn is_not_selectable_by_anyone(&self) -> bool;
    fn set_not_selectable_by_anyone(&self, value: bool);

    /// Number of messages currently in the mailbox.
    fn message_count(&self) -> u32;
    /// Number of \Recent messages.
    fn recent_count(&self) -> u32;
    /// Drop the \Recent status of every message.
    fn clear_recent(&self);

    fn uid_validity(&self) -> u32;
    /// The UID that will be assigned to the next delivered message.
    fn next_uid(&self) -> u32;

    fn users_with_lookup_rights(&self) -> BTreeSet<String>;
    fn users_with_read_rights(&self) -> BTreeSet<String>;
    /// Per-user unseen counts for every user the mailbox tracks.
    fn unseen_by_user(&self) -> BTreeMap<String, u32>;

    /// Grant `user` the rights in `rights` (IMAP ACL letters, e.g.
    /// `"lrswi"`), on the authority of `grantor`.
    fn set_rights(
        &self,
        user: &str,
        grantor: &str,
        rights: &str,
    ) -> Result<(), Error>;

    /// First-time initialisation of a freshly constructed handle: bind it to
    /// its absolute name, record `owner`, and grant `rights_for` the full
    /// initial rights set.
    fn prepare_mailbox(
        &self,
        owner: &str,
        absolute_name: &str,
        rights_for: &str,
    ) -> Result<(), Error>;

    /// Release every resource behind the handle. The handle must not be
    /// used afterwards.
    fn dispose(&self) -> Result<(), Error>;
}

/// Creates and revives mailbox handles.
pub trait MailboxFactory: Send + Sync {
    /// A fresh handle that has not yet been prepared.
    fn blank_mailbox(&self) -> Result<Arc<dyn MailboxHandle>, Error>;

    /// Deserialize the mailbox persisted at `location` and re-initialise it
    /// with the current runtime context.
    fn reopen_mailbox(
        &self,
        location: &Path,
    ) -> Result<Arc<dyn MailboxHandle>, Error>;
}

/// Maps a mailbox identity to the physical location of its backing storage.
pub trait MailboxLocator: Send + Sync {
    fn location_of(&self, absolute_name: &str, owner: &str) -> PathBuf;
}
