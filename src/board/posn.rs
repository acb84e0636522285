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
use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use super::BOARD_LENGTH;

/// Direction bitset over the four cardinal bits.  Diagonals compose, e.g.
/// `DirSet::UP | DirSet::LEFT` is the up-left diagonal.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DirSet(u8);

impl DirSet {
    pub const NONE: Self = Self(0);
    pub const UP: Self = Self(1 << 0);
    pub const DOWN: Self = Self(1 << 1);
    pub const LEFT: Self = Self(1 << 2);
    pub const RIGHT: Self = Self(1 << 3);
    pub const UP_LEFT: Self = Self(Self::UP.0 | Self::LEFT.0);
    pub const UP_RIGHT: Self = Self(Self::UP.0 | Self::RIGHT.0);
    pub const DOWN_LEFT: Self = Self(Self::DOWN.0 | Self::LEFT.0);
    pub const DOWN_RIGHT: Self = Self(Self::DOWN.0 | Self::RIGHT.0);

    #[inline]
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0 && other.0 != 0
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// True for exactly one cardinal bit.
    #[inline]
    pub const fn is_orthogonal(&self) -> bool {
        self.0.count_ones() == 1
    }
}

impl BitOr for DirSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A position on the 9×9 board.  Columns and rows run 0..9 from the
/// bottom-left corner; out-of-bounds positions are representable (motion off
/// the edge produces them) but must only be tested, never dereferenced.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Posn {
    col: i8,
    row: i8,
}

impl Posn {
    #[inline]
    pub const fn new(col: i8, row: i8) -> Self {
        Self { col, row }
    }

    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self {
            col: (index % BOARD_LENGTH) as i8,
            row: (index / BOARD_LENGTH) as i8,
        }
    }

    #[inline]
    pub const fn col(&self) -> i8 {
        self.col
    }

    #[inline]
    pub const fn row(&self) -> i8 {
        self.row
    }

    /// Row-major index into an 81-slot array.  Only meaningful when
    /// `is_valid()`.
    #[inline]
    pub const fn index(&self) -> usize {
        debug_assert!(self.is_valid());
        self.row as usize * BOARD_LENGTH + self.col as usize
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.col >= 0
            && self.row >= 0
            && (self.col as usize) < BOARD_LENGTH
            && (self.row as usize) < BOARD_LENGTH
    }

    /// The 8-neighbour direction from `self` to `other`, or `NONE` when
    /// `other` is not immediately adjacent.  Directions are board-absolute
    /// (up means increasing row).
    pub fn adjacent(&self, other: &Posn) -> DirSet {
        let dc = other.col - self.col;
        let dr = other.row - self.row;
        if (dc, dr) == (0, 0) || dc.abs() > 1 || dr.abs() > 1 {
            return DirSet::NONE;
        }
        let mut dir = DirSet::NONE;
        if dr > 0 {
            dir = dir | DirSet::UP;
        } else if dr < 0 {
            dir = dir | DirSet::DOWN;
        }
        if dc > 0 {
            dir = dir | DirSet::RIGHT;
        } else if dc < 0 {
            dir = dir | DirSet::LEFT;
        }
        dir
    }

    // Mutating motion.  `invert` swaps both axes so that "up" is always
    // toward the opponent.

    #[inline]
    pub fn up(&mut self, invert: bool) {
        self.row += if invert { -1 } else { 1 };
    }

    #[inline]
    pub fn down(&mut self, invert: bool) {
        self.row += if invert { 1 } else { -1 };
    }

    #[inline]
    pub fn left(&mut self, invert: bool) {
        self.col += if invert { 1 } else { -1 };
    }

    #[inline]
    pub fn right(&mut self, invert: bool) {
        self.col += if invert { -1 } else { 1 };
    }
}

impl fmt::Display for Posn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}-{})", self.col, self.row)
    }
}

impl PartialOrd for Posn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Posn {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.row, self.col).cmp(&(other.row, other.col))
    }
}

/// The squares strictly between `a` and `b` on the straight-line Bresenham
/// path, excluding both endpoints.
pub fn crossed(a: &Posn, b: &Posn) -> Vec<Posn> {
    let (x0, y0) = (a.col as i32, a.row as i32);
    let (x1, y1) = (b.col as i32, b.row as i32);
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();

    let x_inc = if x1 > x0 { 1 } else { -1 };
    let y_inc = if y1 > y0 { 1 } else { -1 };

    let mut x = x0;
    let mut y = y0;
    let mut n = 1 + dx + dy;
    let mut error = dx - dy;
    let dx = dx * 2;
    let dy = dy * 2;

    let mut posns = Vec::new();
    while n > 0 {
        posns.push(Posn::new(x as i8, y as i8));
        match error.cmp(&0) {
            Ordering::Greater => {
                x += x_inc;
                error -= dy;
            }
            Ordering::Less => {
                y += y_inc;
                error += dx;
            }
            Ordering::Equal => {
                x += x_inc;
                y += y_inc;
                n -= 1;
            }
        }
        n -= 1;
    }

    if posns.len() < 2 {
        return Vec::new();
    }
    posns[1..posns.len() - 1].to_vec()
}

/// An 81-bit set of board squares, one bit per row-major index.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mask(u128);

const ALL_SQUARES: u128 = (1u128 << (BOARD_LENGTH * BOARD_LENGTH)) - 1;

impl Mask {
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn all() -> Self {
        Self(ALL_SQUARES)
    }

    pub fn from_posns<I>(posns: I) -> Self
    where
        I: IntoIterator<Item = Posn>,
    {
        let mut mask = Self::empty();
        for posn in posns {
            mask.set(posn);
        }
        mask
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn contains(&self, posn: Posn) -> bool {
        (self.0 & (1u128 << posn.index())) != 0
    }

    #[inline]
    pub fn set(&mut self, posn: Posn) {
        self.0 |= 1u128 << posn.index();
    }

    #[inline]
    pub fn reset(&mut self, posn: Posn) {
        self.0 &= !(1u128 << posn.index());
    }

    pub fn iter(&self) -> MaskIter {
        MaskIter(self.0)
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..BOARD_LENGTH as i8).rev() {
            for col in 0..BOARD_LENGTH as i8 {
                let posn = Posn::new(col, row);
                write!(f, "{}", if self.contains(posn) { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Not for Mask {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0 & ALL_SQUARES)
    }
}

impl BitOr for Mask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitOr<Posn> for Mask {
    type Output = Self;

    fn bitor(self, rhs: Posn) -> Self {
        Self(self.0 | (1u128 << rhs.index()))
    }
}

impl BitOrAssign<Posn> for Mask {
    fn bitor_assign(&mut self, rhs: Posn) {
        self.0 |= 1u128 << rhs.index();
    }
}

impl BitAnd for Mask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Mask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskIter(u128);

impl Iterator for MaskIter {
    type Item = Posn;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 != 0 {
            let index = self.0.trailing_zeros() as usize;
            self.0 &= self.0 - 1;
            return Some(Posn::from_index(index));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(Posn::new(0, 0).is_valid());
        assert!(Posn::new(8, 8).is_valid());
        assert!(!Posn::new(-1, 0).is_valid());
        assert!(!Posn::new(0, 9).is_valid());
    }

    #[test]
    fn test_index_round_trip() {
        for index in 0..81 {
            assert_eq!(Posn::from_index(index).index(), index);
        }
        assert_eq!(Posn::new(3, 2).index(), 21);
    }

    #[test]
    fn test_ordering_is_row_major() {
        let mut posns = vec![Posn::new(1, 1), Posn::new(8, 0), Posn::new(0, 1)];
        posns.sort();
        assert_eq!(posns, vec![Posn::new(8, 0), Posn::new(0, 1), Posn::new(1, 1)]);
    }

    #[test]
    fn test_motion_and_inversion() {
        let mut posn = Posn::new(4, 4);
        posn.up(false);
        assert_eq!(posn, Posn::new(4, 5));
        posn.up(true);
        assert_eq!(posn, Posn::new(4, 4));
        posn.left(false);
        assert_eq!(posn, Posn::new(3, 4));
        posn.left(true);
        assert_eq!(posn, Posn::new(4, 4));
        posn.down(false);
        posn.right(false);
        assert_eq!(posn, Posn::new(5, 3));
    }

    #[test]
    fn test_motion_off_board_is_testable() {
        let mut posn = Posn::new(0, 0);
        posn.down(false);
        assert!(!posn.is_valid());
        posn.up(false);
        assert!(posn.is_valid());
    }

    #[test]
    fn test_adjacent() {
        let posn = Posn::new(4, 4);
        assert_eq!(posn.adjacent(&Posn::new(4, 5)), DirSet::UP);
        assert_eq!(posn.adjacent(&Posn::new(3, 4)), DirSet::LEFT);
        assert_eq!(posn.adjacent(&Posn::new(5, 3)), DirSet::DOWN_RIGHT);
        assert_eq!(posn.adjacent(&Posn::new(4, 4)), DirSet::NONE);
        assert_eq!(posn.adjacent(&Posn::new(6, 4)), DirSet::NONE);
        assert!(posn.adjacent(&Posn::new(4, 3)).is_orthogonal());
        assert!(!posn.adjacent(&Posn::new(5, 5)).is_orthogonal());
    }

    #[test]
    fn test_crossed_straight_line() {
        let crossed = crossed(&Posn::new(0, 0), &Posn::new(0, 4));
        assert_eq!(
            crossed,
            vec![Posn::new(0, 1), Posn::new(0, 2), Posn::new(0, 3)]
        );
    }

    #[test]
    fn test_crossed_diagonal() {
        let crossed = crossed(&Posn::new(1, 1), &Posn::new(4, 4));
        assert_eq!(crossed, vec![Posn::new(2, 2), Posn::new(3, 3)]);
    }

    #[test]
    fn test_crossed_adjacent_is_empty() {
        assert!(crossed(&Posn::new(1, 1), &Posn::new(1, 2)).is_empty());
        assert!(crossed(&Posn::new(1, 1), &Posn::new(2, 2)).is_empty());
    }

    #[test]
    fn test_mask_basics() {
        let mut mask = Mask::empty();
        assert!(mask.is_empty());
        mask.set(Posn::new(0, 0));
        mask |= Posn::new(8, 8);
        assert_eq!(mask.len(), 2);
        assert!(mask.contains(Posn::new(0, 0)));
        assert!(mask.contains(Posn::new(8, 8)));
        mask.reset(Posn::new(0, 0));
        assert!(!mask.contains(Posn::new(0, 0)));
    }

    #[test]
    fn test_mask_not_stays_on_board() {
        let mask = !Mask::empty();
        assert_eq!(mask.len(), 81);
        assert_eq!(mask, Mask::all());
    }

    #[test]
    fn test_mask_iter_ascending() {
        let mask = Mask::from_posns([Posn::new(4, 4), Posn::new(0, 0), Posn::new(8, 8)]);
        let posns: Vec<Posn> = mask.iter().collect();
        assert_eq!(
            posns,
            vec![Posn::new(0, 0), Posn::new(4, 4), Posn::new(8, 8)]
        );
    }
}
