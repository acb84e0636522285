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

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr, BitOrAssign, Index, IndexMut, Not};
use strum::IntoEnumIterator;
use strum_macros::Display;
use strum_macros::EnumIter;

use Colour::{Black, White};

#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Colour {
    Black,
    White,
}

impl Colour {
    #[inline]
    pub const fn to_index(&self) -> usize {
        *self as usize
    }
}

impl Not for Colour {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        match self {
            Black => White,
            White => Black,
        }
    }
}

/// Per-colour pair of values, indexable by `Colour`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pair<T>((T, T));

impl<T> Pair<T> {
    pub const fn new(black: T, white: T) -> Self {
        Self((black, white))
    }
    pub fn black(&self) -> &T {
        &self.0 .0
    }
    pub fn black_mut(&mut self) -> &mut T {
        &mut self.0 .0
    }
    pub fn white(&self) -> &T {
        &self.0 .1
    }
    pub fn white_mut(&mut self) -> &mut T {
        &mut self.0 .1
    }
}

impl<T: Hash> Hash for Pair<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.black().hash(state);
        self.white().hash(state);
    }
}

impl<T> Index<Colour> for Pair<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: Colour) -> &Self::Output {
        match index {
            Black => self.black(),
            White => self.white(),
        }
    }
}

impl<T> IndexMut<Colour> for Pair<T> {
    #[inline(always)]
    fn index_mut(&mut self, index: Colour) -> &mut Self::Output {
        match index {
            Black => self.black_mut(),
            White => self.white_mut(),
        }
    }
}

/// The twenty piece identities: ten fronts followed by ten backs.  A unit
/// binds one of each (except the Commander, which has no back).
#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Piece {
    Pawn,
    Bow,
    Prodigy,
    #[strum(serialize = "Hidden Dragon")]
    HiddenDragon,
    Fortress,
    Catapult,
    Spy,
    Samurai,
    Captain,
    Commander,
    Bronze,
    Silver,
    Gold,
    Arrow,
    Phoenix,
    #[strum(serialize = "Dragon King")]
    DragonKing,
    Lance,
    Clandestinite,
    Pike,
    Pistol,
}

use Piece::*;

pub const NUM_PIECES: usize = 20;

impl Piece {
    #[inline]
    pub const fn to_index(&self) -> usize {
        *self as usize
    }

    #[inline]
    pub const fn is_front(&self) -> bool {
        (*self as usize) < (Commander as usize) + 1
    }

    #[inline]
    pub const fn is_back(&self) -> bool {
        !self.is_front()
    }

    /// The effects this piece carries while it is the active side.
    pub const fn effects(self) -> EffectSet {
        match self {
            Pawn => EffectSet::FORCED_RECOVERY,
            Bow => EffectSet::JUMP,
            Fortress => EffectSet::LAND_LINK
                .with(EffectSet::MOBILE_RANGE_EXPANSION_1)
                .with(EffectSet::PASSIVE)
                .with(EffectSet::NO_STACK),
            Catapult => EffectSet::LAND_LINK
                .with(EffectSet::MOBILE_RANGE_EXPANSION_2)
                .with(EffectSet::NO_STACK),
            Spy => EffectSet::LAND_LINK
                .with(EffectSet::FORCED_RECOVERY)
                .with(EffectSet::BACK_DROP_ONLY)
                .with(EffectSet::JUMP),
            Samurai => EffectSet::SUBSTITUTION,
            Captain => EffectSet::TIER_1_3_EXCHANGE,
            Commander => EffectSet::NO_TOWER,
            Bronze => EffectSet::BETRAYAL,
            Lance => EffectSet::FORCED_REARRANGEMENT.with(EffectSet::FORCED_RECOVERY),
            Clandestinite => EffectSet::LAND_LINK
                .with(EffectSet::FRONT_DROP_ONLY)
                .with(EffectSet::JUMP),
            _ => EffectSet::empty(),
        }
    }

    /// The effects this piece is immune to while it is the active side.
    pub const fn immunities(self) -> EffectSet {
        match self {
            Prodigy | HiddenDragon | Phoenix | DragonKing => EffectSet::MOBILE_RANGE_EXPANSION,
            Commander => EffectSet::MOBILE_RANGE_EXPANSION.with(EffectSet::TIER_1_3_EXCHANGE),
            _ => EffectSet::empty(),
        }
    }

    /// Single-letter Gungi Notation identifier.
    pub const fn gn_letter(self) -> char {
        match self {
            Pawn => 'P',
            Bow => 'B',
            Prodigy => 'R',
            HiddenDragon => 'H',
            Fortress => 'F',
            Catapult => 'T',
            Spy => 'Y',
            Samurai => 'S',
            Captain => 'C',
            Commander => 'O',
            Bronze => 'Z',
            Silver => 'V',
            Gold => 'G',
            Arrow => 'A',
            Phoenix => 'X',
            DragonKing => 'K',
            Lance => 'L',
            Clandestinite => 'N',
            Pike => 'E',
            Pistol => 'I',
        }
    }

    pub fn from_gn_letter(ch: char) -> Option<Self> {
        GN_LETTERS.get(&ch.to_ascii_uppercase()).copied()
    }
}

static GN_LETTERS: Lazy<HashMap<char, Piece>> = Lazy::new(|| {
    Piece::iter().map(|piece| (piece.gn_letter(), piece)).collect()
});

/// Letter pair shown for a unit: active front letter followed by the back
/// letter, `-` standing in for a missing back.
pub fn code(front: Piece, back: Option<Piece>) -> String {
    let mut s = String::with_capacity(2);
    s.push(front.gn_letter());
    s.push(back.map_or('-', Piece::gn_letter));
    s
}

/// Starting hand per player: (front, back, count), 23 units in total.
pub const STARTING_HAND: [(Piece, Option<Piece>, usize); 12] = [
    (Pawn, Some(Bronze), 7),
    (Pawn, Some(Silver), 1),
    (Pawn, Some(Gold), 1),
    (Bow, Some(Arrow), 2),
    (Prodigy, Some(Phoenix), 1),
    (HiddenDragon, Some(DragonKing), 1),
    (Fortress, Some(Lance), 1),
    (Catapult, Some(Lance), 1),
    (Spy, Some(Clandestinite), 3),
    (Samurai, Some(Pike), 2),
    (Captain, Some(Pistol), 2),
    (Commander, None, 1),
];

/// Bitset over the piece effects.  Immunities use the same flag space.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EffectSet(u16);

impl EffectSet {
    pub const LAND_LINK: Self = Self(1 << 0);
    pub const MOBILE_RANGE_EXPANSION_1: Self = Self(1 << 1);
    pub const MOBILE_RANGE_EXPANSION_2: Self = Self(1 << 2);
    pub const TIER_1_3_EXCHANGE: Self = Self(1 << 3);
    pub const SUBSTITUTION: Self = Self(1 << 4);
    pub const BETRAYAL: Self = Self(1 << 5);
    pub const FORCED_RECOVERY: Self = Self(1 << 6);
    pub const FORCED_REARRANGEMENT: Self = Self(1 << 7);
    pub const NO_TOWER: Self = Self(1 << 8);
    pub const PASSIVE: Self = Self(1 << 9);
    pub const NO_STACK: Self = Self(1 << 10);
    pub const FRONT_DROP_ONLY: Self = Self(1 << 11);
    pub const BACK_DROP_ONLY: Self = Self(1 << 12);
    pub const JUMP: Self = Self(1 << 13);

    /// Either flavour of mobile range expansion.
    pub const MOBILE_RANGE_EXPANSION: Self =
        Self::MOBILE_RANGE_EXPANSION_1.with(Self::MOBILE_RANGE_EXPANSION_2);

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EffectSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EffectSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EffectSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectSet({:#016b})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colour_not() {
        assert_eq!(!Black, White);
        assert_eq!(!White, Black);
    }

    #[test]
    fn test_pair_indexing() {
        let mut pair = Pair::new(1, 2);
        assert_eq!(pair[Black], 1);
        assert_eq!(pair[White], 2);
        pair[Black] = 10;
        assert_eq!(*pair.black(), 10);
    }

    #[test]
    fn test_front_back_partition() {
        let fronts: Vec<Piece> = Piece::iter().filter(Piece::is_front).collect();
        let backs: Vec<Piece> = Piece::iter().filter(Piece::is_back).collect();
        assert_eq!(fronts.len(), 10);
        assert_eq!(backs.len(), 10);
        assert!(fronts.contains(&Commander));
        assert!(backs.contains(&Bronze));
    }

    #[test]
    fn test_starting_hand_totals() {
        let total: usize = STARTING_HAND.iter().map(|(_, _, n)| n).sum();
        assert_eq!(total, 23);
        let commanders: usize = STARTING_HAND
            .iter()
            .filter(|(front, _, _)| *front == Commander)
            .map(|(_, _, n)| n)
            .sum();
        assert_eq!(commanders, 1);
        // Only the fronts go into the hand; backs are all back-class pieces.
        for (front, back, _) in STARTING_HAND {
            assert!(front.is_front());
            if let Some(back) = back {
                assert!(back.is_back());
            }
        }
    }

    #[test]
    fn test_effect_assignments() {
        assert!(Pawn.effects().contains(EffectSet::FORCED_RECOVERY));
        assert!(Bow.effects().contains(EffectSet::JUMP));
        assert!(Fortress.effects().contains(EffectSet::LAND_LINK));
        assert!(Fortress.effects().contains(EffectSet::MOBILE_RANGE_EXPANSION_1));
        assert!(Fortress.effects().contains(EffectSet::NO_STACK));
        assert!(Catapult.effects().contains(EffectSet::MOBILE_RANGE_EXPANSION_2));
        assert!(Commander.effects().contains(EffectSet::NO_TOWER));
        assert!(Bronze.effects().contains(EffectSet::BETRAYAL));
        assert!(Lance.effects().contains(EffectSet::FORCED_REARRANGEMENT));
        assert!(Silver.effects().is_empty());
        assert!(Gold.effects().is_empty());
    }

    #[test]
    fn test_immunity_assignments() {
        for piece in [Prodigy, HiddenDragon, Phoenix, DragonKing] {
            assert!(piece.immunities().contains(EffectSet::MOBILE_RANGE_EXPANSION));
        }
        assert!(Commander.immunities().contains(EffectSet::TIER_1_3_EXCHANGE));
        assert!(Pawn.immunities().is_empty());
    }

    #[test]
    fn test_gn_letters_unique_and_round_trip() {
        for piece in Piece::iter() {
            assert_eq!(Piece::from_gn_letter(piece.gn_letter()), Some(piece));
        }
        assert_eq!(GN_LETTERS.len(), NUM_PIECES);
        assert_eq!(Piece::from_gn_letter('p'), Some(Pawn));
        assert_eq!(Piece::from_gn_letter('?'), None);
    }

    #[test]
    fn test_unit_codes() {
        assert_eq!(code(Pawn, Some(Bronze)), "PZ");
        assert_eq!(code(Commander, None), "O-");
        assert_eq!(code(Catapult, Some(Lance)), "TL");
    }
}
