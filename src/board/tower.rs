// Copyright 2023 Tobin Edwards
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

use super::piece::{Colour, Piece};
use super::posn::Posn;
use super::unit::{UnitId, UnitPool};
use super::{Error, MAX_TOWER_SIZE};

/// An ordered stack of up to three units at one board square, bottom at
/// tier 0.  The tier-exchange dirty flag blocks two consecutive 1-3 tier
/// exchanges in the same tower; the controller sets it on an exchange and
/// clears it on the next action that is not one.
#[derive(Debug, Clone)]
pub struct Tower {
    posn: Posn,
    members: Vec<UnitId>,
    tier_exchange_dirty: bool,
}

impl Tower {
    pub fn new(posn: Posn) -> Self {
        Self {
            posn,
            members: Vec::with_capacity(MAX_TOWER_SIZE),
            tier_exchange_dirty: false,
        }
    }

    #[inline]
    pub fn posn(&self) -> Posn {
        self.posn
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[inline]
    pub fn members(&self) -> &[UnitId] {
        &self.members
    }

    #[inline]
    pub fn top(&self) -> Option<UnitId> {
        self.members.last().copied()
    }

    /// The occupant at `tier`, bottom being tier 0.
    pub fn at(&self, tier: usize) -> Result<UnitId, Error> {
        self.members.get(tier).copied().ok_or(Error::OutOfRange)
    }

    /// The tier the given unit stands on.
    pub fn tier_of(&self, id: UnitId) -> Result<usize, Error> {
        self.members
            .iter()
            .position(|member| *member == id)
            .ok_or(Error::NotAMember)
    }

    /// Would adding a unit with this colour and active front break the
    /// duplicate rule?  No two units in one tower may share both.
    pub fn is_duplicate(&self, colour: Colour, front: Piece, pool: &UnitPool) -> bool {
        self.members.iter().any(|member| {
            let unit = &pool[*member];
            unit.colour() == colour && unit.front() == front
        })
    }

    /// Append `id` at the top and point its back-reference here.
    pub fn add(&mut self, id: UnitId, pool: &mut UnitPool) -> Result<(), Error> {
        if self.height() == MAX_TOWER_SIZE {
            return Err(Error::FullTower);
        }
        if self.is_duplicate(pool[id].colour(), pool[id].front(), pool) {
            return Err(Error::Duplicate);
        }
        self.members.push(id);
        pool[id].set_loc(self.posn);
        Ok(())
    }

    /// Remove `id` from the stack and clear its back-reference.
    pub fn remove(&mut self, id: UnitId, pool: &mut UnitPool) -> Result<(), Error> {
        let tier = self.tier_of(id)?;
        self.members.remove(tier);
        pool[id].clear_loc();
        Ok(())
    }

    /// Swap the bottom and top occupants (the middle one is unchanged).
    pub fn exchange_ends(&mut self) {
        debug_assert!(self.height() == MAX_TOWER_SIZE);
        let last = self.members.len() - 1;
        self.members.swap(0, last);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.tier_exchange_dirty
    }

    pub fn mark_dirty(&mut self) {
        self.tier_exchange_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.tier_exchange_dirty = false;
    }

    pub fn reset(&mut self) {
        self.members.clear();
        self.tier_exchange_dirty = false;
    }
}
