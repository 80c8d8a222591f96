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

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::directory::model::FolderRecord;
use crate::support::error::Error;
use crate::support::file_ops;

/// Durable key-value mapping from absolute mailbox name to `FolderRecord`.
///
/// The directory is the sole writer. `store` replaces any existing record
/// under the same absolute name wholesale.
pub trait FolderRecordStore: Send {
    fn contains_record(&self, absolute_name: &str) -> bool;
    fn retrieve(
        &self,
        absolute_name: &str,
    ) -> Result<Option<FolderRecord>, Error>;
    fn store(&mut self, record: FolderRecord) -> Result<(), Error>;
    /// Every absolute name ever recorded, tombstoned ones included.
    fn absolute_names(&self) -> Result<Vec<String>, Error>;
}

/// On-disk form of the record table: one TOML document holding every
/// folder record, keyed by absolute name.
#[derive(Serialize, Deserialize, Default)]
struct RecordFile {
    #[serde(default)]
    folders: BTreeMap<String, FolderRecord>,
}

/// A `FolderRecordStore` backed by a single TOML file.
///
/// The whole table is loaded at open and rewritten on every `store`. Writes
/// are staged in `tmp` and renamed into place, so a crash mid-write leaves
/// either the old table or the new one, never a torn file.
pub struct FsRecordStore {
    path: PathBuf,
    tmp: PathBuf,
    file: RecordFile,
}

impl FsRecordStore {
    /// Open the record table at `path`, creating an empty one in memory if
    /// no file exists yet. `tmp` must be a directory on the same filesystem
    /// as `path`.
    pub fn open(path: PathBuf, tmp: PathBuf) -> Result<Self, Error> {
        let file = match fs::File::open(&path) {
            Ok(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                toml::from_slice(&data)?
            },
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                RecordFile::default()
            },
            Err(e) => return Err(e.into()),
        };

        Ok(FsRecordStore { path, tmp, file })
    }

    fn flush(&self) -> Result<(), Error> {
        let data = toml::to_string_pretty(&self.file)?;
        file_ops::spit(&self.tmp, &self.path, true, 0o600, data.as_bytes())?;
        Ok(())
    }
}

impl FolderRecordStore for FsRecordStore {
    fn contains_record(&self, absolute_name: &str) -> bool {
        self.file.folders.contains_key(absolute_name)
    }

    fn retrieve(
        &self,
        absolute_name: &str,
    ) -> Result<Option<FolderRecord>, Error> {
        Ok(self.file.folders.get(absolute_name).cloned())
    }

    fn store(&mut self, record: FolderRecord) -> Result<(), Error> {
        self.file
            .folders
            .insert(record.absolute_name.clone(), record);
        self.flush()
    }

    fn absolute_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.file.folders.keys().cloned().collect())
    }
}
