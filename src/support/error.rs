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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsafe mailbox name")]
    UnsafeName,
    #[error("Mailbox name is not in any known namespace")]
    UnresolvableName,
    #[error("Mailbox does not exist locally")]
    NxMailbox,
    #[error("Mailbox was deleted")]
    MailboxTombstoned,
    #[error("Mailbox already exists")]
    MailboxExists,
    #[error("Not authorised to look up that mailbox")]
    NoLookupRights,
    #[error("Not authorised to create mailboxes there")]
    NoCreateRights,
    #[error("Mailbox hierarchy too deep")]
    HierarchyTooDeep,
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
    #[error("Folder record store is corrupt")]
    CorruptRecordStore,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
