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
use super::unit::{UnitId, UnitPool};
use super::Error;

/// One of the two armies.  Owns an ordered collection of unit handles and a
/// distinguished link to its Commander; active units stand on the board, the
/// rest form the hand.
#[derive(Debug, Clone)]
pub struct Player {
    colour: Colour,
    units: Vec<UnitId>,
    commander: Option<UnitId>,
}

impl Player {
    pub fn new(colour: Colour) -> Self {
        Self {
            colour,
            units: Vec::new(),
            commander: None,
        }
    }

    #[inline]
    pub fn colour(&self) -> Colour {
        self.colour
    }

    #[inline]
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    #[inline]
    pub fn commander(&self) -> Option<UnitId> {
        self.commander
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains(&id)
    }

    /// Units standing on the board.
    pub fn active_units(&self, pool: &UnitPool) -> Vec<UnitId> {
        self.units
            .iter()
            .copied()
            .filter(|id| pool[*id].is_active())
            .collect()
    }

    /// Units in the hand.
    pub fn inactive_units(&self, pool: &UnitPool) -> Vec<UnitId> {
        self.units
            .iter()
            .copied()
            .filter(|id| !pool[*id].is_active())
            .collect()
    }

    /// Take ownership of a unit: recolours it to this army and binds the
    /// commander link when the unit's front is the Commander.
    pub fn add_unit(&mut self, id: UnitId, pool: &mut UnitPool) -> Result<(), Error> {
        if self.contains(id) {
            return Err(Error::Duplicate);
        }
        if pool[id].front() == Piece::Commander {
            debug_assert!(self.commander.is_none());
            self.commander = Some(id);
        }
        pool[id].set_colour(self.colour);
        self.units.push(id);
        Ok(())
    }

    pub fn remove_unit(&mut self, id: UnitId) -> Result<(), Error> {
        let index = self
            .units
            .iter()
            .position(|unit| *unit == id)
            .ok_or(Error::NotAMember)?;
        if self.commander == Some(id) {
            self.commander = None;
        }
        self.units.remove(index);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.units.clear();
        self.commander = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::posn::Posn;
    use crate::board::unit::Unit;
    use Colour::*;
    use Piece::*;

    #[test]
    fn test_add_unit_binds_commander_and_colour() {
        let mut pool = UnitPool::new();
        let commander = pool.push(Unit::new(Commander, None, White));
        let pawn = pool.push(Unit::new(Pawn, Some(Bronze), White));
        let mut player = Player::new(Black);
        player.add_unit(commander, &mut pool).unwrap();
        player.add_unit(pawn, &mut pool).unwrap();
        assert_eq!(player.commander(), Some(commander));
        // Ownership recolours the unit.
        assert_eq!(pool[commander].colour(), Black);
        assert_eq!(pool[pawn].colour(), Black);
    }

    #[test]
    fn test_add_unit_twice_is_duplicate() {
        let mut pool = UnitPool::new();
        let pawn = pool.push(Unit::new(Pawn, Some(Bronze), Black));
        let mut player = Player::new(Black);
        player.add_unit(pawn, &mut pool).unwrap();
        assert_eq!(player.add_unit(pawn, &mut pool).unwrap_err(), Error::Duplicate);
    }

    #[test]
    fn test_remove_unit_unbinds_commander() {
        let mut pool = UnitPool::new();
        let commander = pool.push(Unit::new(Commander, None, Black));
        let mut player = Player::new(Black);
        player.add_unit(commander, &mut pool).unwrap();
        player.remove_unit(commander).unwrap();
        assert_eq!(player.commander(), None);
        assert_eq!(player.remove_unit(commander).unwrap_err(), Error::NotAMember);
    }

    #[test]
    fn test_active_and_inactive_partition() {
        let mut pool = UnitPool::new();
        let pawn = pool.push(Unit::new(Pawn, Some(Bronze), Black));
        let bow = pool.push(Unit::new(Bow, Some(Arrow), Black));
        let mut player = Player::new(Black);
        player.add_unit(pawn, &mut pool).unwrap();
        player.add_unit(bow, &mut pool).unwrap();
        pool[pawn].set_loc(Posn::new(0, 8));
        assert_eq!(player.active_units(&pool), vec![pawn]);
        assert_eq!(player.inactive_units(&pool), vec![bow]);
    }
}
