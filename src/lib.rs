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

//! Postoffice is the mailbox directory of a simple, single-host mail
//! server: the component that turns the mailbox names users type into the
//! server's internal identities, caches open mailboxes with reference
//! counting, and persists per-mailbox metadata independently of the
//! messages themselves.
//!
//! The protocol layer, the per-mailbox message stores, and the user
//! database are collaborators living elsewhere; this crate consumes them
//! through the traits in `directory::handle` and `directory::store`.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod directory;
pub mod support;
