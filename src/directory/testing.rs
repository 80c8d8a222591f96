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

//! Test doubles for the directory's collaborators, and the standard test
//! fixture built from them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::directory::defs::MailboxDirectory;
use crate::directory::handle::{
    MailboxFactory, MailboxHandle, MailboxLocator,
};
use crate::directory::model::FolderRecord;
use crate::directory::namespaces::NamespaceConfig;
use crate::directory::store::FolderRecordStore;
use crate::support::error::Error;

/// An in-memory record store with shared interior, so tests keep a clone
/// and can inspect or seed records behind the directory's back.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<BTreeMap<String, FolderRecord>>>,
    store_count: Arc<AtomicUsize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, absolute_name: &str) -> Option<FolderRecord> {
        self.records.lock().unwrap().get(absolute_name).cloned()
    }

    /// How many times the directory has written a record.
    pub fn store_count(&self) -> usize {
        self.store_count.load(Ordering::SeqCst)
    }

    /// Edit a stored record in place, bypassing the directory.
    pub fn amend(
        &self,
        absolute_name: &str,
        f: impl FnOnce(&mut FolderRecord),
    ) {
        let mut records = self.records.lock().unwrap();
        f(records.get_mut(absolute_name).expect("no such record"));
    }

    pub fn tombstone(&self, absolute_name: &str) {
        self.amend(absolute_name, |record| record.deleted = true);
    }
}

impl FolderRecordStore for MemoryRecordStore {
    fn contains_record(&self, absolute_name: &str) -> bool {
        self.records.lock().unwrap().contains_key(absolute_name)
    }

    fn retrieve(
        &self,
        absolute_name: &str,
    ) -> Result<Option<FolderRecord>, Error> {
        Ok(self.records.lock().unwrap().get(absolute_name).cloned())
    }

    fn store(&mut self, record: FolderRecord) -> Result<(), Error> {
        self.records
            .lock()
            .unwrap()
            .insert(record.absolute_name.clone(), record);
        self.store_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn absolute_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.records.lock().unwrap().keys().cloned().collect())
    }
}

/// The scriptable state of a `StubMailbox`.
#[derive(Clone, Debug, Default)]
pub struct StubState {
    pub absolute_name: String,
    pub owner: String,
    pub lookup_rights: BTreeSet<String>,
    pub read_rights: BTreeSet<String>,
    pub create_rights: BTreeSet<String>,
    pub marked: bool,
    pub not_selectable_by_anyone: bool,
    pub message_count: u32,
    pub recent_count: u32,
    pub uid_validity: u32,
    pub next_uid: u32,
    pub unseen_by_user: BTreeMap<String, u32>,
    pub disposed: bool,
}

/// A mailbox handle whose "backing storage" is the factory's saved-state
/// map: `dispose` saves the state under the same location the
/// `StubLocator` computes, and `reopen_mailbox` revives it from there.
#[derive(Debug)]
pub struct StubMailbox {
    state: Mutex<StubState>,
    saved: Arc<Mutex<BTreeMap<PathBuf, StubState>>>,
}

impl StubMailbox {
    pub fn mutate(&self, f: impl FnOnce(&mut StubState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn state(&self) -> StubState {
        self.state.lock().unwrap().clone()
    }

    fn location(state: &StubState) -> PathBuf {
        PathBuf::from(format!("{}/{}", state.owner, state.absolute_name))
    }
}

impl MailboxHandle for StubMailbox {
    fn absolute_name(&self) -> String {
        self.state.lock().unwrap().absolute_name.clone()
    }

    fn has_lookup_rights(&self, user: &str) -> bool {
        self.state.lock().unwrap().lookup_rights.contains(user)
    }

    fn has_read_rights(&self, user: &str) -> bool {
        self.state.lock().unwrap().read_rights.contains(user)
    }

    fn has_create_rights(&self, user: &str) -> bool {
        self.state.lock().unwrap().create_rights.contains(user)
    }

    fn is_selectable(&self, user: &str) -> bool {
        let state = self.state.lock().unwrap();
        !state.not_selectable_by_anyone && state.lookup_rights.contains(user)
    }

    fn is_marked(&self) -> bool {
        self.state.lock().unwrap().marked
    }

    fn is_not_selectable_by_anyone(&self) -> bool {
        self.state.lock().unwrap().not_selectable_by_anyone
    }

    fn set_not_selectable_by_anyone(&self, value: bool) {
        self.state.lock().unwrap().not_selectable_by_anyone = value;
    }

    fn message_count(&self) -> u32 {
        self.state.lock().unwrap().message_count
    }

    fn recent_count(&self) -> u32 {
        self.state.lock().unwrap().recent_count
    }

    fn clear_recent(&self) {
        self.state.lock().unwrap().recent_count = 0;
    }

    fn uid_validity(&self) -> u32 {
        self.state.lock().unwrap().uid_validity
    }

    fn next_uid(&self) -> u32 {
        self.state.lock().unwrap().next_uid
    }

    fn users_with_lookup_rights(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().lookup_rights.clone()
    }

    fn users_with_read_rights(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().read_rights.clone()
    }

    fn unseen_by_user(&self) -> BTreeMap<String, u32> {
        self.state.lock().unwrap().unseen_by_user.clone()
    }

    fn set_rights(
        &self,
        user: &str,
        _grantor: &str,
        rights: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        for right in rights.chars() {
            // The stub only models the rights the directory interrogates.
            match right {
                'l' => {
                    state.lookup_rights.insert(user.to_owned());
                },
                'r' => {
                    state.read_rights.insert(user.to_owned());
                },
                'c' => {
                    state.create_rights.insert(user.to_owned());
                },
                _ => (),
            }
        }
        Ok(())
    }

    fn prepare_mailbox(
        &self,
        owner: &str,
        absolute_name: &str,
        rights_for: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.owner = owner.to_owned();
        state.absolute_name = absolute_name.to_owned();
        state.lookup_rights.insert(rights_for.to_owned());
        state.read_rights.insert(rights_for.to_owned());
        state.create_rights.insert(rights_for.to_owned());
        Ok(())
    }

    fn dispose(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let mut saved = state.clone();
        saved.disposed = false;
        self.saved
            .lock()
            .unwrap()
            .insert(StubMailbox::location(&state), saved);
        state.disposed = true;
        Ok(())
    }
}

/// Factory for `StubMailbox`es. Cloning shares the saved-state map and the
/// creation log, so the fixture can hand one clone to the directory and
/// keep another for scripting.
#[derive(Clone, Default)]
pub struct StubFactory {
    saved: Arc<Mutex<BTreeMap<PathBuf, StubState>>>,
    created: Arc<Mutex<Vec<Arc<StubMailbox>>>>,
    next_uid_validity: Arc<AtomicU32>,
}

impl StubFactory {
    /// The most recently constructed handle, for scripting live state.
    pub fn last_created(&self) -> Arc<StubMailbox> {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no mailboxes created yet")
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    fn track(&self, mailbox: Arc<StubMailbox>) -> Arc<StubMailbox> {
        self.created.lock().unwrap().push(Arc::clone(&mailbox));
        mailbox
    }
}

impl MailboxFactory for StubFactory {
    fn blank_mailbox(&self) -> Result<Arc<dyn MailboxHandle>, Error> {
        let mut state = StubState::default();
        state.uid_validity =
            self.next_uid_validity.fetch_add(1, Ordering::SeqCst) + 1;
        state.next_uid = 1;
        let mailbox = self.track(Arc::new(StubMailbox {
            state: Mutex::new(state),
            saved: Arc::clone(&self.saved),
        }));
        Ok(mailbox)
    }

    fn reopen_mailbox(
        &self,
        location: &Path,
    ) -> Result<Arc<dyn MailboxHandle>, Error> {
        let state = self
            .saved
            .lock()
            .unwrap()
            .get(location)
            .cloned()
            .ok_or(Error::CorruptRecordStore)?;
        let mailbox = self.track(Arc::new(StubMailbox {
            state: Mutex::new(state),
            saved: Arc::clone(&self.saved),
        }));
        Ok(mailbox)
    }
}

/// Deterministic location mapping; `StubMailbox::dispose` saves under the
/// same key.
pub struct StubLocator;

impl MailboxLocator for StubLocator {
    fn location_of(&self, absolute_name: &str, owner: &str) -> PathBuf {
        PathBuf::from(format!("{}/{}", owner, absolute_name))
    }
}

/// A directory wired to the in-memory store and stub mailboxes.
pub struct TestFixture {
    pub directory: MailboxDirectory,
    pub store: MemoryRecordStore,
    pub factory: StubFactory,
}

impl TestFixture {
    pub fn new() -> Self {
        let store = MemoryRecordStore::new();
        let factory = StubFactory::default();
        let directory = MailboxDirectory::new(
            "~test".to_owned(),
            NamespaceConfig::default(),
            Box::new(store.clone()),
            Box::new(factory.clone()),
            Box::new(StubLocator),
            "internal-delivery".to_owned(),
        );
        TestFixture {
            directory,
            store,
            factory,
        }
    }

    /// A fixture whose `user` already has a provisioned mail account.
    pub fn provisioned(user: &str) -> Self {
        let fixture = Self::new();
        assert!(fixture.directory.create_private_mail_account(user));
        fixture
    }
}
