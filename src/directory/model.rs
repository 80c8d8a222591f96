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

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::directory::handle::MailboxHandle;

/// The persisted description of one mailbox, independent of whether that
/// mailbox is currently open.
///
/// Exactly one record exists per absolute name for the lifetime of the
/// server. A record is written when its mailbox is created, replaced
/// wholesale each time the last holder of the open mailbox releases it, and
/// never physically removed; deletion only sets the `deleted` tombstone so
/// that the fate of the name stays deterministic.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FolderRecord {
    /// The name under which the owner created this mailbox, e.g.
    /// `#mail.INBOX`. Informational only.
    pub full_name: String,
    /// The user that created the mailbox. Immutable.
    pub owner: String,
    /// The namespace-qualified, user-independent name, e.g.
    /// `#mail.alice.INBOX`. Immutable; primary key of the record store.
    pub absolute_name: String,
    /// Whether the record has been initialised.
    pub name_in_use: bool,
    /// Tombstone. Once set, the name is retired from active use but the
    /// record is retained.
    pub deleted: bool,
    /// The UID validity of the mailbox as of the last release. Only ever
    /// raised; see `set_uid_validity`.
    pub uid_validity: u32,
    /// The last UID assigned to a message in this mailbox.
    pub highest_uid: u32,
    pub users_with_lookup_rights: BTreeSet<String>,
    pub users_with_read_rights: BTreeSet<String>,
    /// Whether the mailbox reports `\Marked` while closed.
    pub marked: bool,
    /// Whether the mailbox is unselectable for everyone (e.g. a pure
    /// hierarchy node such as a user's namespace root).
    pub not_selectable_by_anyone: bool,
    /// Message count as of the last release.
    pub exists: u32,
    /// Recent count as of the last release.
    pub recent: u32,
    /// Per-user unseen counts as of the last release. Users without an entry
    /// fall back to `exists`.
    pub unseen_by_user: BTreeMap<String, u32>,
}

impl FolderRecord {
    /// Build the initial record for a mailbox that was just prepared,
    /// seeding the persisted fields from the handle's initial state.
    pub fn for_new_mailbox(
        full_name: &str,
        owner: &str,
        absolute_name: &str,
        handle: &dyn MailboxHandle,
    ) -> Self {
        let mut record = FolderRecord {
            full_name: full_name.to_owned(),
            owner: owner.to_owned(),
            absolute_name: absolute_name.to_owned(),
            name_in_use: true,
            deleted: false,
            uid_validity: 0,
            highest_uid: 0,
            users_with_lookup_rights: BTreeSet::new(),
            users_with_read_rights: BTreeSet::new(),
            marked: false,
            not_selectable_by_anyone: false,
            exists: 0,
            recent: 0,
            unseen_by_user: BTreeMap::new(),
        };
        record.absorb_handle(handle);
        record
    }

    /// Raise `uid_validity` to `value`.
    ///
    /// Values at or below the current one are ignored; the stored validity
    /// never decreases.
    pub fn set_uid_validity(&mut self, value: u32) {
        if value > self.uid_validity {
            self.uid_validity = value;
        }
    }

    /// The number of messages `user` has not seen, falling back to the full
    /// message count for users the mailbox has never tracked.
    pub fn unseen_for(&self, user: &str) -> u32 {
        self.unseen_by_user
            .get(user)
            .copied()
            .unwrap_or(self.exists)
    }

    /// Whether `user` may look this mailbox up while it is closed.
    pub fn has_lookup_rights(&self, user: &str) -> bool {
        user == self.owner || self.users_with_lookup_rights.contains(user)
    }

    /// Snapshot the live state of `handle` into this record.
    ///
    /// This is the one place in-memory mailbox mutations become durable, so
    /// it copies everything the record mirrors: UID state, rights, LIST
    /// flags, and the message counters.
    pub fn absorb_handle(&mut self, handle: &dyn MailboxHandle) {
        self.set_uid_validity(handle.uid_validity());
        self.highest_uid = handle.next_uid().saturating_sub(1);
        self.users_with_lookup_rights = handle.users_with_lookup_rights();
        self.users_with_read_rights = handle.users_with_read_rights();
        self.marked = handle.is_marked();
        self.not_selectable_by_anyone = handle.is_not_selectable_by_anyone();
        self.exists = handle.message_count();
        self.recent = handle.recent_count();
        self.unseen_by_user = handle.unseen_by_user();
    }
}

/// The outcome of consulting the record store for a name.
///
/// Existence and tombstoning are ordinary states to branch on, not
/// exceptional conditions.
#[derive(Clone, Debug)]
pub enum RecordLookup {
    /// A live record exists for the name.
    Active(FolderRecord),
    /// A record exists but is tombstoned.
    Tombstoned(FolderRecord),
    /// The store has never heard of the name.
    Unknown,
}

/// The data items a `STATUS`-style query may request.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusItems {
    /// Return the number of messages.
    pub messages: bool,
    /// Return the number of \Recent messages.
    pub recent: bool,
    /// Return the next UID value.
    pub uidnext: bool,
    /// Return the UID validity.
    pub uidvalidity: bool,
    /// Return the number of not-\Seen messages for the requesting user.
    pub unseen: bool,
}

/// Name attributes reported for each `LIST` result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MailboxAttribute {
    Noselect,
    Marked,
    Unmarked,
}

impl MailboxAttribute {
    pub fn name(&self) -> &'static str {
        match self {
            &MailboxAttribute::Noselect => "\\Noselect",
            &MailboxAttribute::Marked => "\\Marked",
            &MailboxAttribute::Unmarked => "\\Unmarked",
        }
    }
}

impl fmt::Display for MailboxAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One formatted `LIST` result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListEntry {
    pub attributes: Vec<MailboxAttribute>,
    /// The hierarchy separator of the namespace the entry lives in.
    pub separator: char,
    /// The name as the requesting user would address it.
    pub name: String,
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (ix, attr) in self.attributes.iter().enumerate() {
            if ix > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", attr)?;
        }
        write!(f, ") \"{}\" \"{}\"", self.separator, self.name)
    }
}
