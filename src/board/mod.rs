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

//! Gungi rules core.
//!
//! Gungi is played on a 9-by-9 board on which up to three pieces may stack
//! vertically in a _tower_ at each square.  This module is the authority on
//! legality: given a position and a candidate action it accepts or rejects
//! the action with a precise reason, applies accepted actions, detects
//! check, checkmate and draw-by-repetition, and maintains the auxiliary
//! state the rules require (mobile-range-expansion regions, forced-recovery
//! and forced-rearrangement obligations).
//!
//! Some of the key abstractions include:
//!
//! * A `Posn` is a position on the board, addressed by column and file from
//!   the bottom-left corner.  Each player's movement is oriented so that
//!   "up" advances toward the opponent; for Black this inverts both axes.
//!
//! * A `Mask` is a 128-bit value in which the low 81 bits map to squares on
//!   the board.  Masks represent the square sets the rules reason about:
//!   mobile-range-expansion regions, check points, commander escape routes.
//!
//! * A `Unit` is a piece instance bound to a colour.  Units carry a front
//!   and a back identity; capture flips which side is active.  All units
//!   live in a `UnitPool` arena owned by the controller, and players and
//!   towers refer to them through `UnitId` handles.
//!
//! * A `Tower` is the ordered stack of up to three units at one square.
//!
//! * The `Controller` holds the full game state: the 81 towers, both
//!   players, the turn/check/checkmate/draw flags, and the pending
//!   obligations.  There are exactly five mutating actions: drop, move,
//!   immobile strike, exchange, and the forced-recovery answer.  Each is
//!   backed by a validating predicate that reports the reason a candidate
//!   action is illegal; rejected actions have no observable effect.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod controller;
pub mod moves;
pub mod piece;
pub mod player;
pub mod posn;
pub mod recorder;
pub mod tower;
pub mod unit;

pub use controller::*;
pub use moves::*;
pub use piece::*;
pub use player::*;
pub use posn::*;
pub use recorder::*;
pub use tower::*;
pub use unit::*;

/// Length of one board side.
pub const BOARD_LENGTH: usize = 9;

/// Total number of squares.
pub const BOARD_SIZE: usize = BOARD_LENGTH * BOARD_LENGTH;

/// Maximum height of a tower.
pub const MAX_TOWER_SIZE: usize = 3;

/// Units each player starts with in hand.
pub const START_PIECE_COUNT: usize = 23;

/// Units in a game across both players.
pub const PIECE_COUNT: usize = START_PIECE_COUNT * 2;

/// Repetition count at which the game is drawn.
pub const MAX_POSITION_REPETITIONS: u32 = 4;

pub trait Turn {
    fn turn(&self) -> Colour;
}

/// Reasons an action or lookup is rejected.  Every public operation reports
/// exactly one of these; on rejection the controller's observable state is
/// unchanged.
#[derive(Error, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    #[error("not a valid unit identifier")]
    InvalidIdx,
    #[error("unit does not have a back side")]
    NoBack,
    #[error("tower is full")]
    FullTower,
    #[error("unit is not a member of the tower")]
    NotAMember,
    #[error("no unit at the given tower tier")]
    OutOfRange,
    #[error("cannot add same unit to tower twice")]
    Duplicate,
    #[error("can't reach position")]
    NoWalk,
    #[error("game is over")]
    GameOver,
    #[error("unit is not valid")]
    InvalidUnit,
    #[error("move/drop is not valid for escaping check")]
    Check,
    #[error("can only drop in territory")]
    Territory,
    #[error("can only move a unit at the top of a tower")]
    NotTop,
    #[error("cannot drop Pawn into same file as another Pawn")]
    PawnFile,
    #[error("cannot put Bronze into same file as another Bronze")]
    BronzeFile,
    #[error("can only drop on units with the Land Link effect")]
    LandLink,
    #[error("cannot attack a unit on the same team")]
    SameTeam,
    #[error("Pawn cannot be used to achieve checkmate")]
    PawnCheckmate,
    #[error("Bronze cannot be used to achieve checkmate")]
    BronzeCheckmate,
    #[error("tower cannot be built on unit")]
    NoTower,
    #[error("only back pieces can be dropped on unit")]
    BackOnly,
    #[error("only front pieces can be dropped on unit")]
    FrontOnly,
    #[error("unit is immune to effect")]
    Immune,
    #[error("tier exchange is invalid")]
    InvalidExchange,
    #[error("substitution is invalid")]
    InvalidSub,
    #[error("unit cannot be dropped on another unit")]
    NoStack,
    #[error("it is not this player's turn")]
    NotTurn,
    #[error("only drops allowed during initial arrangement")]
    DropsOnly,
    #[error("move cannot be performed in game's current state")]
    InvalidState,
}
