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

//! Per-piece movesets and walk evaluation.
//!
//! A piece has a different list of moves at each tower tier.  Each move is a
//! sequence of steps; a step pairs a direction bitset with an extent (one
//! square, or sliding until blocked or off the board).  A walk is valid when
//! some sequence's final square equals the target.

use super::piece::Piece;
use super::posn::{DirSet, Posn};
use super::Error;
use super::MAX_TOWER_SIZE;

use Extent::{Single, Unlimited};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// One square in the stated direction.
    Single,
    /// Repeat until the board edge is reached or the target is matched.
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub dir: DirSet,
    pub extent: Extent,
}

pub type MoveSeq = &'static [Step];
pub type TierMoves = &'static [MoveSeq];

/// Move sequences for one piece, indexed by tower tier.
pub type Moveset = [TierMoves; MAX_TOWER_SIZE];

const fn one(dir: DirSet) -> Step {
    Step {
        dir,
        extent: Single,
    }
}

const fn slide(dir: DirSet) -> Step {
    Step {
        dir,
        extent: Unlimited,
    }
}

const UP: DirSet = DirSet::UP;
const DOWN: DirSet = DirSet::DOWN;
const LEFT: DirSet = DirSet::LEFT;
const RIGHT: DirSet = DirSet::RIGHT;
const UP_LEFT: DirSet = DirSet::UP_LEFT;
const UP_RIGHT: DirSet = DirSet::UP_RIGHT;
const DOWN_LEFT: DirSet = DirSet::DOWN_LEFT;
const DOWN_RIGHT: DirSet = DirSet::DOWN_RIGHT;

/// The moveset for the given `piece`.
pub const fn moveset(piece: Piece) -> &'static Moveset {
    match piece {
        Piece::Pawn => &PAWN_MOVES,
        Piece::Bow => &BOW_MOVES,
        Piece::Prodigy => &PRODIGY_MOVES,
        Piece::HiddenDragon => &HIDDEN_DRAGON_MOVES,
        Piece::Fortress => &FORTRESS_MOVES,
        Piece::Catapult => &CATAPULT_MOVES,
        Piece::Spy => &SPY_MOVES,
        Piece::Samurai => &SAMURAI_MOVES,
        Piece::Captain => &CAPTAIN_MOVES,
        Piece::Commander => &COMMANDER_MOVES,
        Piece::Bronze => &BRONZE_MOVES,
        Piece::Silver => &SILVER_MOVES,
        Piece::Gold => &GOLD_MOVES,
        Piece::Arrow => &ARROW_MOVES,
        Piece::Phoenix => &PHOENIX_MOVES,
        Piece::DragonKing => &DRAGON_KING_MOVES,
        Piece::Lance => &LANCE_MOVES,
        Piece::Clandestinite => &CLANDESTINITE_MOVES,
        Piece::Pike => &PIKE_MOVES,
        Piece::Pistol => &PISTOL_MOVES,
    }
}

static PAWN_MOVES: Moveset = [
    &[&[one(UP)]],
    &[
        &[one(UP)],
        &[one(LEFT), one(LEFT)],
        &[one(RIGHT), one(RIGHT)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(LEFT), one(LEFT)],
        &[one(RIGHT), one(RIGHT)],
    ],
];

static BOW_MOVES: Moveset = [
    &[
        &[one(UP), one(UP)],
        &[one(LEFT), one(LEFT)],
        &[one(RIGHT), one(RIGHT)],
    ],
    &[
        &[one(UP)],
        &[one(DOWN)],
        &[one(UP_LEFT), one(UP_LEFT)],
        &[one(UP_RIGHT), one(UP_RIGHT)],
    ],
    &[
        &[one(UP_LEFT), one(UP_LEFT)],
        &[one(UP_RIGHT), one(UP_RIGHT)],
        &[one(LEFT), one(LEFT)],
        &[one(RIGHT), one(RIGHT)],
        &[one(DOWN), one(DOWN)],
    ],
];

static PRODIGY_MOVES: Moveset = [
    &[
        &[slide(UP_LEFT)],
        &[slide(UP_RIGHT)],
        &[slide(DOWN_LEFT)],
        &[slide(DOWN_RIGHT)],
    ],
    &[&[one(UP)], &[one(RIGHT)], &[one(LEFT)], &[one(DOWN)]],
    &[&[one(UP)], &[one(RIGHT)], &[one(LEFT)], &[one(DOWN)]],
];

static HIDDEN_DRAGON_MOVES: Moveset = [
    &[
        &[slide(UP)],
        &[slide(LEFT)],
        &[slide(RIGHT)],
        &[slide(DOWN)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
];

// The Fortress and Catapult are passive emplacements.
static FORTRESS_MOVES: Moveset = [&[], &[], &[]];
static CATAPULT_MOVES: Moveset = [&[], &[], &[]];

static SPY_MOVES: Moveset = [
    &[&[one(UP_LEFT), one(UP)], &[one(UP_RIGHT), one(UP)]],
    &[
        &[one(UP_LEFT), one(UP)],
        &[one(UP_RIGHT), one(UP)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
    ],
    &[
        &[one(UP_LEFT), one(UP)],
        &[one(UP_RIGHT), one(UP)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
    ],
];

static SAMURAI_MOVES: Moveset = [
    &[
        &[one(UP)],
        &[one(LEFT)],
        &[one(RIGHT)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
    ],
    &[
        &[one(UP), one(UP)],
        &[one(UP_RIGHT)],
        &[one(UP_LEFT)],
        &[one(LEFT)],
        &[one(RIGHT)],
        &[one(DOWN), one(DOWN)],
    ],
    &[
        &[one(UP), one(UP)],
        &[one(UP_RIGHT)],
        &[one(UP_LEFT)],
        &[one(LEFT)],
        &[one(RIGHT)],
        &[one(DOWN), one(DOWN)],
    ],
];

static CAPTAIN_MOVES: Moveset = [
    &[
        &[one(UP)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_RIGHT)],
        &[one(DOWN_LEFT)],
    ],
    &[
        &[one(UP)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN)],
        &[one(DOWN_RIGHT)],
        &[one(DOWN_LEFT)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(UP_RIGHT), one(UP_RIGHT)],
        &[one(UP_LEFT), one(UP_LEFT)],
        &[one(LEFT), one(LEFT)],
        &[one(RIGHT), one(RIGHT)],
        &[one(DOWN_RIGHT)],
        &[one(DOWN_LEFT)],
    ],
];

static COMMANDER_MOVES: Moveset = [
    &[
        &[one(UP)],
        &[one(LEFT)],
        &[one(RIGHT)],
        &[one(DOWN)],
        &[one(UP_RIGHT)],
        &[one(UP_LEFT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP)],
        &[one(LEFT)],
        &[one(RIGHT)],
        &[one(DOWN)],
        &[one(UP_RIGHT)],
        &[one(UP_LEFT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP)],
        &[one(LEFT)],
        &[one(RIGHT)],
        &[one(DOWN)],
        &[one(UP_RIGHT)],
        &[one(UP_LEFT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
];

static BRONZE_MOVES: Moveset = [
    &[&[one(LEFT)], &[one(RIGHT)]],
    &[&[one(LEFT)], &[one(RIGHT)]],
    &[&[one(LEFT)], &[one(RIGHT)]],
];

static SILVER_MOVES: Moveset = [
    &[&[one(UP)], &[one(LEFT)], &[one(DOWN)], &[one(RIGHT)]],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
];

static GOLD_MOVES: Moveset = [
    &[
        &[one(UP)],
        &[one(LEFT)],
        &[one(DOWN)],
        &[one(RIGHT)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
    ],
    &[
        &[one(UP)],
        &[one(LEFT)],
        &[one(DOWN)],
        &[one(RIGHT)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
    ],
    &[
        &[one(UP)],
        &[one(LEFT)],
        &[one(DOWN)],
        &[one(RIGHT)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
    ],
];

static ARROW_MOVES: Moveset = [
    &[
        &[one(UP)],
        &[one(DOWN)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP)],
        &[one(DOWN)],
        &[one(DOWN_LEFT), one(DOWN_LEFT)],
        &[one(DOWN_RIGHT), one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP)],
        &[one(DOWN)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
        &[one(DOWN_LEFT), one(DOWN_LEFT)],
        &[one(DOWN_RIGHT), one(DOWN_RIGHT)],
    ],
];

static PHOENIX_MOVES: Moveset = [
    &[
        &[slide(UP_LEFT)],
        &[slide(UP_RIGHT)],
        &[slide(DOWN_LEFT)],
        &[slide(DOWN_RIGHT)],
        &[one(UP)],
        &[one(RIGHT)],
        &[one(LEFT)],
        &[one(DOWN)],
    ],
    &[&[one(UP)], &[one(RIGHT)], &[one(LEFT)], &[one(DOWN)]],
    &[&[one(UP)], &[one(RIGHT)], &[one(LEFT)], &[one(DOWN)]],
];

static DRAGON_KING_MOVES: Moveset = [
    &[
        &[slide(UP)],
        &[slide(LEFT)],
        &[slide(RIGHT)],
        &[slide(DOWN)],
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
];

static LANCE_MOVES: Moveset = [
    &[&[slide(UP)]],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_RIGHT)],
        &[one(DOWN_LEFT)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_RIGHT)],
        &[one(DOWN_LEFT)],
    ],
];

static CLANDESTINITE_MOVES: Moveset = [
    &[
        &[one(UP_LEFT), one(UP)],
        &[one(UP_RIGHT), one(UP)],
        &[one(DOWN)],
    ],
    &[
        &[one(UP_LEFT), one(UP)],
        &[one(UP_RIGHT), one(UP)],
        &[one(UP_RIGHT)],
        &[one(UP_LEFT)],
        &[one(DOWN)],
    ],
    &[
        &[one(UP_LEFT), one(UP)],
        &[one(UP_RIGHT), one(UP)],
        &[one(UP_RIGHT)],
        &[one(UP_LEFT)],
        &[one(DOWN)],
        &[one(DOWN_LEFT), one(DOWN)],
        &[one(DOWN_RIGHT), one(DOWN)],
        &[one(DOWN_LEFT), one(DOWN_LEFT)],
        &[one(DOWN_RIGHT), one(DOWN_RIGHT)],
    ],
];

static PIKE_MOVES: Moveset = [
    &[
        &[one(UP), one(UP)],
        &[one(UP)],
        &[one(LEFT)],
        &[one(RIGHT)],
        &[one(DOWN)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[
        &[one(UP_LEFT)],
        &[one(UP_RIGHT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
];

static PISTOL_MOVES: Moveset = [
    &[
        &[one(UP_RIGHT)],
        &[one(UP_LEFT)],
        &[one(DOWN_LEFT)],
        &[one(DOWN_RIGHT)],
    ],
    &[&[one(UP)], &[one(LEFT)], &[one(RIGHT)], &[one(DOWN)]],
    &[&[one(UP)], &[one(LEFT)], &[one(RIGHT)], &[one(DOWN)]],
];

#[inline]
fn advance(pos: &mut Posn, dir: DirSet, invert: bool) {
    if dir.contains(DirSet::UP) {
        pos.up(invert);
    }
    if dir.contains(DirSet::DOWN) {
        pos.down(invert);
    }
    if dir.contains(DirSet::LEFT) {
        pos.left(invert);
    }
    if dir.contains(DirSet::RIGHT) {
        pos.right(invert);
    }
}

/// Does any move sequence for `piece` at `tier` stay on the board for at
/// least one step from `start`?
pub fn any_walk(piece: Piece, tier: usize, start: Posn, invert: bool) -> bool {
    for seq in moveset(piece)[tier] {
        let mut pos = start;
        for step in *seq {
            match step.extent {
                Single => advance(&mut pos, step.dir, invert),
                Unlimited => {
                    advance(&mut pos, step.dir, invert);
                    if pos.is_valid() {
                        return true;
                    }
                }
            }
        }
        if pos.is_valid() {
            return true;
        }
    }
    false
}

/// Every square reachable from `start` by step enumeration.  Squares reached
/// by more than one sequence appear more than once.
pub fn all_walks(piece: Piece, tier: usize, start: Posn, invert: bool) -> Vec<Posn> {
    let mut posns = Vec::new();
    for seq in moveset(piece)[tier] {
        let mut pos = start;
        for step in *seq {
            match step.extent {
                Single => advance(&mut pos, step.dir, invert),
                Unlimited => loop {
                    advance(&mut pos, step.dir, invert);
                    if !pos.is_valid() {
                        break;
                    }
                    posns.push(pos);
                },
            }
        }
        if pos.is_valid() {
            posns.push(pos);
        }
    }
    posns
}

/// The first move sequence whose final square equals `end`, as the ordered
/// list of squares visited including both `start` and `end`.
pub fn get_walk(
    piece: Piece,
    tier: usize,
    start: Posn,
    end: Posn,
    invert: bool,
) -> Result<Vec<Posn>, Error> {
    for seq in moveset(piece)[tier] {
        let mut pos = start;
        let mut walk = vec![start];
        'steps: for step in *seq {
            match step.extent {
                Single => {
                    advance(&mut pos, step.dir, invert);
                    walk.push(pos);
                }
                Unlimited => loop {
                    advance(&mut pos, step.dir, invert);
                    walk.push(pos);
                    if pos == end || !pos.is_valid() {
                        break 'steps;
                    }
                },
            }
        }
        if pos == end {
            return Ok(walk);
        }
    }
    Err(Error::NoWalk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Piece::*;

    #[test]
    fn test_pawn_advances_one_square() {
        let walk = get_walk(Pawn, 0, Posn::new(4, 4), Posn::new(4, 5), false).unwrap();
        assert_eq!(walk, vec![Posn::new(4, 4), Posn::new(4, 5)]);
        assert_eq!(
            get_walk(Pawn, 0, Posn::new(4, 4), Posn::new(4, 3), false).unwrap_err(),
            Error::NoWalk
        );
    }

    #[test]
    fn test_pawn_inverted_advances_toward_white() {
        let walk = get_walk(Pawn, 0, Posn::new(4, 4), Posn::new(4, 3), true).unwrap();
        assert_eq!(walk, vec![Posn::new(4, 4), Posn::new(4, 3)]);
    }

    #[test]
    fn test_hidden_dragon_slides() {
        let walk = get_walk(HiddenDragon, 0, Posn::new(0, 0), Posn::new(0, 6), false).unwrap();
        assert_eq!(walk.len(), 7);
        assert_eq!(walk[0], Posn::new(0, 0));
        assert_eq!(walk[6], Posn::new(0, 6));
        // At tier 1 the dragon steps diagonally only.
        assert!(get_walk(HiddenDragon, 1, Posn::new(0, 0), Posn::new(0, 6), false).is_err());
        assert!(get_walk(HiddenDragon, 1, Posn::new(4, 4), Posn::new(5, 5), false).is_ok());
    }

    #[test]
    fn test_prodigy_slides_diagonally() {
        assert!(get_walk(Prodigy, 0, Posn::new(0, 0), Posn::new(8, 8), false).is_ok());
        assert!(get_walk(Prodigy, 0, Posn::new(0, 0), Posn::new(0, 5), false).is_err());
    }

    #[test]
    fn test_two_step_sequence_final_square_only() {
        // Bow at tier 0 reaches two squares up; the intermediate square is
        // not a destination.
        assert!(get_walk(Bow, 0, Posn::new(4, 4), Posn::new(4, 6), false).is_ok());
        assert!(get_walk(Bow, 0, Posn::new(4, 4), Posn::new(4, 5), false).is_err());
    }

    #[test]
    fn test_fortress_never_moves() {
        for tier in 0..3 {
            assert!(!any_walk(Fortress, tier, Posn::new(4, 4), false));
            assert!(all_walks(Fortress, tier, Posn::new(4, 4), false).is_empty());
        }
    }

    #[test]
    fn test_any_walk_at_board_edge() {
        // A white pawn on the last rank has no continuation at tier 0.
        assert!(!any_walk(Pawn, 0, Posn::new(4, 8), false));
        assert!(any_walk(Pawn, 0, Posn::new(4, 7), false));
        // At tier 1 it can also shift two squares sideways.
        assert!(any_walk(Pawn, 1, Posn::new(4, 8), false));
        // A black pawn is inverted, so the first rank is its dead end.
        assert!(!any_walk(Pawn, 0, Posn::new(4, 0), true));
    }

    #[test]
    fn test_all_walks_commander() {
        let posns = all_walks(Commander, 0, Posn::new(4, 4), false);
        assert_eq!(posns.len(), 8);
        let posns = all_walks(Commander, 0, Posn::new(0, 0), false);
        assert_eq!(posns.len(), 3);
    }

    #[test]
    fn test_unlimited_stops_at_target() {
        let walk = get_walk(Lance, 0, Posn::new(3, 1), Posn::new(3, 4), false).unwrap();
        assert_eq!(
            walk,
            vec![
                Posn::new(3, 1),
                Posn::new(3, 2),
                Posn::new(3, 3),
                Posn::new(3, 4)
            ]
        );
    }
}
