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

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use super::moves::{moveset, TierMoves};
use super::piece::{code, Colour, EffectSet, Piece};
use super::posn::Posn;
use super::Error;

/// Handle to a unit in a [`UnitPool`].  Players and towers refer to units
/// exclusively through these.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(u32);

impl UnitId {
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(&self) -> usize {
        self.0 as usize
    }
}

/// A piece instance bound to a colour.  The active side starts as the front
/// identity; a flip swaps front and back and refreshes the cached effect and
/// immunity sets.  `loc` is the non-owning back-reference to the tower the
/// unit currently occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    front: Piece,
    back: Option<Piece>,
    colour: Colour,
    effects: EffectSet,
    immunities: EffectSet,
    loc: Option<Posn>,
}

impl Unit {
    pub fn new(front: Piece, back: Option<Piece>, colour: Colour) -> Self {
        Self {
            front,
            back,
            colour,
            effects: front.effects(),
            immunities: front.immunities(),
            loc: None,
        }
    }

    /// The active side.
    #[inline]
    pub fn front(&self) -> Piece {
        self.front
    }

    /// The hidden side, if any.
    #[inline]
    pub fn back(&self) -> Option<Piece> {
        self.back
    }

    #[inline]
    pub fn colour(&self) -> Colour {
        self.colour
    }

    #[inline]
    pub fn effects(&self) -> EffectSet {
        self.effects
    }

    #[inline]
    pub fn immunities(&self) -> EffectSet {
        self.immunities
    }

    #[inline]
    pub fn loc(&self) -> Option<Posn> {
        self.loc
    }

    /// A unit is active when it stands in a tower on the board.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.loc.is_some()
    }

    /// Move sequences available to the active side at the given `tier`.
    #[inline]
    pub fn moves(&self, tier: usize) -> TierMoves {
        moveset(self.front)[tier]
    }

    /// Swap which side is active and refresh the cached effect sets.
    pub fn flip(&mut self) -> Result<(), Error> {
        let back = self.back.ok_or(Error::NoBack)?;
        self.back = Some(self.front);
        self.front = back;
        self.effects = back.effects();
        self.immunities = back.immunities();
        Ok(())
    }

    pub fn set_colour(&mut self, colour: Colour) {
        self.colour = colour;
    }

    pub fn set_loc(&mut self, posn: Posn) {
        self.loc = Some(posn);
    }

    pub fn clear_loc(&mut self) {
        self.loc = None;
    }

    /// Two-letter display code: active front letter, then back letter (`-`
    /// for no back).
    pub fn code(&self) -> String {
        code(self.front, self.back)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.front, self.colour)
    }
}

/// Arena of all units in a game.  Units are created at game start and live
/// for the whole game; captures and betrayals only move handles around.
#[derive(Debug, Clone, Default)]
pub struct UnitPool(Vec<Unit>);

impl UnitPool {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, unit: Unit) -> UnitId {
        let id = UnitId::new(self.0.len() as u32);
        self.0.push(unit);
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.0
            .iter()
            .enumerate()
            .map(|(index, unit)| (UnitId::new(index as u32), unit))
    }
}

impl Index<UnitId> for UnitPool {
    type Output = Unit;

    #[inline]
    fn index(&self, id: UnitId) -> &Self::Output {
        &self.0[id.value()]
    }
}

impl IndexMut<UnitId> for UnitPool {
    #[inline]
    fn index_mut(&mut self, id: UnitId) -> &mut Self::Output {
        &mut self.0[id.value()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Colour::*;
    use Piece::*;

    #[test]
    fn test_new_unit_caches_front_side() {
        let unit = Unit::new(Fortress, Some(Lance), Black);
        assert_eq!(unit.front(), Fortress);
        assert_eq!(unit.back(), Some(Lance));
        assert!(unit.effects().contains(EffectSet::LAND_LINK));
        assert!(unit.effects().contains(EffectSet::MOBILE_RANGE_EXPANSION_1));
        assert!(!unit.is_active());
    }

    #[test]
    fn test_flip_swaps_sides_and_caches() {
        let mut unit = Unit::new(Fortress, Some(Lance), Black);
        unit.flip().unwrap();
        assert_eq!(unit.front(), Lance);
        assert_eq!(unit.back(), Some(Fortress));
        assert!(unit.effects().contains(EffectSet::FORCED_REARRANGEMENT));
        assert!(!unit.effects().contains(EffectSet::MOBILE_RANGE_EXPANSION_1));
        unit.flip().unwrap();
        assert_eq!(unit.front(), Fortress);
    }

    #[test]
    fn test_commander_cannot_flip() {
        let mut unit = Unit::new(Commander, None, White);
        assert_eq!(unit.flip().unwrap_err(), Error::NoBack);
        assert_eq!(unit.front(), Commander);
    }

    #[test]
    fn test_codes() {
        assert_eq!(Unit::new(Pawn, Some(Bronze), Black).code(), "PZ");
        assert_eq!(Unit::new(Commander, None, Black).code(), "O-");
        let mut unit = Unit::new(Pawn, Some(Gold), White);
        unit.flip().unwrap();
        assert_eq!(unit.code(), "GP");
    }

    #[test]
    fn test_pool_handles() {
        let mut pool = UnitPool::new();
        let a = pool.push(Unit::new(Pawn, Some(Bronze), Black));
        let b = pool.push(Unit::new(Bow, Some(Arrow), White));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[a].front(), Pawn);
        assert_eq!(pool[b].colour(), White);
        pool[a].set_loc(Posn::new(0, 0));
        assert!(pool[a].is_active());
    }
}
