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
use std::ops::BitOr;

use super::moves::{any_walk, get_walk};
use super::piece::{Colour, EffectSet, Pair, Piece, STARTING_HAND};
use super::player::Player;
use super::posn::{crossed, Mask, Posn};
use super::recorder::BoardRecorder;
use super::tower::Tower;
use super::unit::{Unit, UnitId, UnitPool};
use super::{Error, Turn};
use super::{BOARD_LENGTH, BOARD_SIZE, MAX_POSITION_REPETITIONS, MAX_TOWER_SIZE, PIECE_COUNT};

use Colour::{Black, White};

/// Game state overlay bitset.  Exactly one of the turn bits is set during
/// play; `CHECK` and `CHECKMATE` are relative to the player whose turn it
/// is.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GameState(u8);

impl GameState {
    pub const INITIAL_ARRANGEMENT: Self = Self(1 << 0);
    pub const TURN_BLACK: Self = Self(1 << 1);
    pub const TURN_WHITE: Self = Self(1 << 2);
    pub const CHECK: Self = Self(1 << 3);
    pub const CHECKMATE: Self = Self(1 << 4);
    pub const DRAW: Self = Self(1 << 5);

    #[inline]
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn toggle(&mut self, other: Self) {
        self.0 ^= other.0;
    }
}

impl BitOr for GameState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The two exchange actions.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// A qualifying unit swaps with its Commander to escape check.
    Substitution,
    /// The bottom and top of one tower swap.
    Tier13,
}

/// A pending forced-recovery decision.  The player to move must answer
/// `force_recover` before any other action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recovery {
    /// The unit that ran out of moves.
    pub unit: UnitId,
    /// Whose hand receives the unit if it is recovered.
    pub destination: Colour,
    /// The square the unit stands on.
    pub posn: Posn,
}

fn in_territory(posn: Posn, colour: Colour) -> bool {
    let index = posn.index();
    match colour {
        White => index < BOARD_LENGTH * 3,
        Black => index >= BOARD_SIZE - BOARD_LENGTH * 3,
    }
}

fn inverted(colour: Colour) -> bool {
    let far_corner = Posn::new((BOARD_LENGTH - 1) as i8, (BOARD_LENGTH - 1) as i8);
    in_territory(far_corner, colour)
}

/// The game state machine.  Owns the unit arena, both players, the 81
/// towers and all derived rule state.
#[derive(Debug)]
pub struct Controller {
    units: UnitPool,
    players: Pair<Player>,
    board: Vec<Tower>,
    recorder: BoardRecorder,
    state: GameState,
    to_rearrange: Option<UnitId>,
    recovery: Option<Recovery>,
    expansions: Pair<Mask>,
    escape_routes: Mask,
    check_points: Mask,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Turn for Controller {
    #[inline]
    fn turn(&self) -> Colour {
        if self.state.contains(GameState::TURN_WHITE) {
            White
        } else {
            Black
        }
    }
}

impl Controller {
    pub fn new() -> Self {
        let mut controller = Self {
            units: UnitPool::new(),
            players: Pair::new(Player::new(Black), Player::new(White)),
            board: Vec::new(),
            recorder: BoardRecorder::new(),
            state: GameState::INITIAL_ARRANGEMENT,
            to_rearrange: None,
            recovery: None,
            expansions: Pair::new(Mask::empty(), Mask::empty()),
            escape_routes: Mask::empty(),
            check_points: Mask::empty(),
        };
        controller.reset();
        controller
    }

    /// Set up a new game.  Black goes first.
    pub fn new_game(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.units.clear();
        self.board = (0..BOARD_SIZE).map(|i| Tower::new(Posn::from_index(i))).collect();
        for colour in [Black, White] {
            self.players[colour].reset();
            let mut hand_size = 0;
            for (front, back, count) in STARTING_HAND {
                for _ in 0..count {
                    let id = self.units.push(Unit::new(front, back, colour));
                    let added = self.players[colour].add_unit(id, &mut self.units);
                    debug_assert!(added.is_ok());
                    hand_size += 1;
                }
            }
            debug_assert!(hand_size == super::START_PIECE_COUNT);
        }
        self.state = GameState::INITIAL_ARRANGEMENT | GameState::TURN_BLACK;
        self.recorder.reset();
        self.to_rearrange = None;
        self.recovery = None;
        self.expansions = Pair::new(Mask::empty(), Mask::empty());
        self.escape_routes = Mask::empty();
        self.check_points = Mask::empty();
    }

    // ---- accessors ----

    #[inline]
    pub fn board(&self) -> &[Tower] {
        &self.board
    }

    #[inline]
    pub fn tower(&self, posn: Posn) -> &Tower {
        &self.board[posn.index()]
    }

    #[inline]
    pub fn units(&self) -> &UnitPool {
        &self.units
    }

    #[inline]
    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id]
    }

    #[inline]
    pub fn black(&self) -> &Player {
        self.players.black()
    }

    #[inline]
    pub fn white(&self) -> &Player {
        self.players.white()
    }

    #[inline]
    pub fn player(&self, colour: Colour) -> &Player {
        &self.players[colour]
    }

    #[inline]
    pub fn state(&self) -> GameState {
        self.state
    }

    #[inline]
    pub fn escape_routes(&self) -> Mask {
        self.escape_routes
    }

    #[inline]
    pub fn check_points(&self) -> Mask {
        self.check_points
    }

    /// The winning colour, or `None` while the game runs or after a draw.
    pub fn winner(&self) -> Option<Colour> {
        if !self.is_over() || self.is_draw() {
            return None;
        }
        if self.is_in_checkmate_for(Black) {
            Some(White)
        } else {
            Some(Black)
        }
    }

    pub fn unit_id_at(&self, posn: Posn, tier: usize) -> Option<UnitId> {
        self.board[posn.index()].at(tier).ok()
    }

    pub fn unit_at(&self, posn: Posn, tier: usize) -> Option<&Unit> {
        self.unit_id_at(posn, tier).map(|id| &self.units[id])
    }

    /// A unit in the given player's hand with this exact front and back.
    pub fn hand_unit(&self, colour: Colour, front: Piece, back: Option<Piece>) -> Option<UnitId> {
        self.players[colour].units().iter().copied().find(|id| {
            let unit = &self.units[*id];
            unit.front() == front && unit.back() == back && !unit.is_active()
        })
    }

    pub fn forced_rearrange_unit(&self) -> Option<UnitId> {
        self.to_rearrange
    }

    pub fn forced_recovery(&self) -> Option<&Recovery> {
        self.recovery.as_ref()
    }

    // ---- predicates ----

    #[inline]
    pub fn is_draw(&self) -> bool {
        self.state.contains(GameState::DRAW)
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.state.intersects(GameState::CHECKMATE | GameState::DRAW)
    }

    pub fn is_players_turn(&self, colour: Colour) -> bool {
        if self.state.contains(GameState::TURN_WHITE) {
            colour == White
        } else if self.state.contains(GameState::TURN_BLACK) {
            colour == Black
        } else {
            false
        }
    }

    #[inline]
    pub fn is_initial_arrangement(&self) -> bool {
        self.state.contains(GameState::INITIAL_ARRANGEMENT)
    }

    #[inline]
    pub fn is_in_check(&self) -> bool {
        self.state.contains(GameState::CHECK)
    }

    /// A player can only be in check on their own turn.
    pub fn is_in_check_for(&self, colour: Colour) -> bool {
        self.is_players_turn(colour) && self.is_in_check()
    }

    #[inline]
    pub fn is_in_checkmate(&self) -> bool {
        self.state.contains(GameState::CHECKMATE)
    }

    pub fn is_in_checkmate_for(&self, colour: Colour) -> bool {
        self.is_players_turn(colour) && self.is_in_checkmate()
    }

    /// Black's movement is inverted so "up" advances toward White.
    pub fn is_inverted(&self, colour: Colour) -> bool {
        inverted(colour)
    }

    /// The three ranks nearest a player's starting edge.
    pub fn is_in_territory(&self, posn: Posn, colour: Colour) -> bool {
        in_territory(posn, colour)
    }

    pub fn is_in_mobile_range_expansion(&self, posn: Posn, colour: Colour) -> bool {
        self.expansions[colour].contains(posn)
    }

    pub fn is_forced_rearrangement(&self) -> bool {
        self.to_rearrange.is_some()
    }

    /// The rearrangement obligation binds the player who captured the
    /// triggering unit, on that player's turns.
    pub fn is_forced_rearrange_for(&self, colour: Colour) -> bool {
        self.is_players_turn(colour)
            && self
                .to_rearrange
                .is_some_and(|id| self.units[id].colour() == colour)
    }

    pub fn is_forced_recovery(&self) -> bool {
        self.recovery.is_some()
    }

    pub fn is_forced_recovery_for(&self, colour: Colour) -> bool {
        self.is_players_turn(colour) && self.is_forced_recovery()
    }

    // ---- legality predicates ----

    /// Can this hand unit legally be dropped at `posn`?
    pub fn is_valid_drop(&self, posn: Posn, id: UnitId) -> Result<(), Error> {
        debug_assert!(posn.is_valid());
        let unit = &self.units[id];
        let colour = unit.colour();

        if self.is_forced_recovery_for(colour) {
            return Err(Error::InvalidState);
        }
        if self.is_over() {
            return Err(Error::GameOver);
        }
        if unit.is_active() {
            return Err(Error::InvalidUnit);
        }
        if self.is_in_check_for(colour) && !self.check_points.contains(posn) {
            return Err(Error::Check);
        }

        let initial = self.is_initial_arrangement();
        let rearrange = self.is_forced_rearrange_for(colour);
        if (rearrange || initial) && !in_territory(posn, colour) {
            return Err(Error::Territory);
        }
        if rearrange && self.to_rearrange != Some(id) {
            return Err(Error::InvalidUnit);
        }

        let tower = &self.board[posn.index()];
        if tower.height() == MAX_TOWER_SIZE {
            return Err(Error::FullTower);
        }

        if matches!(unit.front(), Piece::Pawn | Piece::Bronze)
            && self.is_duplicate_in_file(colour, unit.front(), posn)
        {
            return Err(match unit.front() {
                Piece::Pawn => Error::PawnFile,
                _ => Error::BronzeFile,
            });
        }

        let Some(top) = tower.top() else {
            return Ok(());
        };
        let top = &self.units[top];
        if !initial
            && (!top.effects().contains(EffectSet::LAND_LINK)
                || unit.immunities().contains(EffectSet::LAND_LINK))
        {
            return Err(Error::LandLink);
        }
        if top.effects().contains(EffectSet::NO_TOWER) {
            return Err(Error::NoTower);
        }
        if unit.effects().contains(EffectSet::NO_STACK) {
            return Err(Error::NoStack);
        }
        if top.effects().contains(EffectSet::BACK_DROP_ONLY) && unit.front().is_front() {
            return Err(Error::BackOnly);
        }
        if top.effects().contains(EffectSet::FRONT_DROP_ONLY) && unit.front().is_back() {
            return Err(Error::FrontOnly);
        }
        if tower.is_duplicate(colour, unit.front(), &self.units) {
            return Err(Error::Duplicate);
        }
        Ok(())
    }

    /// Can this board unit legally move to `target`?  Returns the walk.
    pub fn is_valid_move(&self, target: Posn, id: UnitId) -> Result<Vec<Posn>, Error> {
        self.validate_move(target, id, true)
    }

    fn validate_move(
        &self,
        target: Posn,
        id: UnitId,
        commander_safety: bool,
    ) -> Result<Vec<Posn>, Error> {
        debug_assert!(target.is_valid());
        if self.is_initial_arrangement() {
            return Err(Error::DropsOnly);
        }
        let unit = &self.units[id];
        let colour = unit.colour();
        if self.is_forced_rearrange_for(colour) || self.is_forced_recovery_for(colour) {
            return Err(Error::InvalidState);
        }
        if self.is_over() {
            return Err(Error::GameOver);
        }
        let Some(start) = unit.loc() else {
            return Err(Error::InvalidUnit);
        };
        if self.is_in_check_for(colour) && !self.check_points.contains(target) {
            return Err(Error::Check);
        }

        let target_tower = &self.board[target.index()];
        if let Some(top) = target_tower.top() {
            let top = &self.units[top];
            if top.colour() == colour {
                // Stacking onto a friendly top; a full tower or a Commander
                // cannot take another unit, and the duplicate rule holds on
                // moves too.  An enemy top is usurped instead.
                if target_tower.height() == MAX_TOWER_SIZE {
                    return Err(Error::FullTower);
                }
                if top.effects().contains(EffectSet::NO_TOWER) {
                    return Err(Error::NoTower);
                }
                if target_tower.is_duplicate(colour, unit.front(), &self.units) {
                    return Err(Error::Duplicate);
                }
            }
        }

        if unit.front() == Piece::Bronze && self.is_duplicate_in_file(colour, Piece::Bronze, target)
        {
            return Err(Error::BronzeFile);
        }

        let unit_tower = &self.board[start.index()];
        let tier = unit_tower.tier_of(id)?;
        if tier != unit_tower.height() - 1 {
            return Err(Error::NotTop);
        }

        let walk = self.walk_with_blockers(id, tier, start, target)?;

        if commander_safety
            && unit.front() == Piece::Commander
            && self.is_reachable_after_move(target, !colour)
        {
            return Err(Error::Check);
        }
        Ok(walk)
    }

    /// Walk evaluation with blocker detection, including the mobile-range
    /// expansion retry at the next tier up.
    fn walk_with_blockers(
        &self,
        id: UnitId,
        tier: usize,
        start: Posn,
        target: Posn,
    ) -> Result<Vec<Posn>, Error> {
        let unit = &self.units[id];
        let colour = unit.colour();
        let enemy = !colour;
        let invert = inverted(colour);

        let mut tiers = vec![tier];
        if self.is_in_mobile_range_expansion(start, colour)
            && !unit.immunities().intersects(EffectSet::MOBILE_RANGE_EXPANSION)
            && tier + 1 < MAX_TOWER_SIZE
        {
            tiers.push(tier + 1);
        }

        for t in tiers {
            let Ok(walk) = get_walk(unit.front(), t, start, target, invert) else {
                continue;
            };
            let mut valid = true;
            for posn in crossed(&start, &target) {
                let tower = &self.board[posn.index()];
                let Some(top) = tower.top() else {
                    continue;
                };
                if unit.effects().contains(EffectSet::JUMP) {
                    // Jumpers clear occupied squares, except enemy tops
                    // standing in the enemy's own expansion region.
                    if self.units[top].colour() == enemy
                        && self.is_in_mobile_range_expansion(posn, enemy)
                    {
                        valid = false;
                        break;
                    }
                } else {
                    valid = false;
                    break;
                }
            }
            if valid {
                return Ok(walk);
            }
        }
        Err(Error::NoWalk)
    }

    /// Attack coverage: could this unit's walk end on `target`, ignoring
    /// what currently occupies the target tower?
    fn can_reach(&self, target: Posn, id: UnitId) -> bool {
        let unit = &self.units[id];
        let Some(start) = unit.loc() else {
            return false;
        };
        let tower = &self.board[start.index()];
        if tower.top() != Some(id) {
            return false;
        }
        let tier = tower.height() - 1;
        self.walk_with_blockers(id, tier, start, target).is_ok()
    }

    /// Would any of `by`'s active units reach `posn` after an opposing unit
    /// has moved there?
    fn is_reachable_after_move(&self, posn: Posn, by: Colour) -> bool {
        for id in self.players[by].active_units(&self.units) {
            let start = self.units[id].loc().unwrap();
            if start == posn {
                // The mover captures this tower's top; a same-coloured unit
                // directly beneath then answers with an immobile strike.
                let tower = &self.board[start.index()];
                let tier = tower.tier_of(id).unwrap();
                if tier + 2 == tower.height() {
                    let above = tower.at(tier + 1).unwrap();
                    if self.units[above].colour() == self.units[id].colour() {
                        return true;
                    }
                }
            } else if self.can_reach(posn, id) {
                return true;
            }
        }
        false
    }

    fn is_duplicate_in_file(&self, colour: Colour, front: Piece, posn: Posn) -> bool {
        let col = posn.col();
        for row in 0..BOARD_LENGTH as i8 {
            let tower = &self.board[Posn::new(col, row).index()];
            for member in tower.members() {
                let unit = &self.units[*member];
                if unit.colour() == colour && unit.front() == front {
                    return true;
                }
            }
        }
        false
    }

    /// Can the striker hit the occupant of `target_tier` in its own tower?
    pub fn is_valid_immobile_strike(&self, id: UnitId, target_tier: usize) -> Result<(), Error> {
        debug_assert!(target_tier < MAX_TOWER_SIZE);
        if self.is_initial_arrangement() {
            return Err(Error::DropsOnly);
        }
        let unit = &self.units[id];
        let colour = unit.colour();
        if self.is_forced_rearrange_for(colour) || self.is_forced_recovery_for(colour) {
            return Err(Error::InvalidState);
        }
        if self.is_over() {
            return Err(Error::GameOver);
        }
        let Some(posn) = unit.loc() else {
            return Err(Error::InvalidUnit);
        };

        let tower = &self.board[posn.index()];
        let target = tower.at(target_tier).map_err(|_| Error::OutOfRange)?;
        if self.units[target].colour() == colour {
            return Err(Error::SameTeam);
        }
        let tier = tower.tier_of(id)?;
        if tier.abs_diff(target_tier) > 1 {
            return Err(Error::OutOfRange);
        }
        if self.is_in_check_for(colour)
            && (!self.check_points.contains(posn) || target_tier != tower.height() - 1)
        {
            // Escaping check by strike requires taking the top attacker in a
            // tower that blocks the check.
            return Err(Error::Check);
        }
        Ok(())
    }

    /// Can `a` invoke the given exchange with `b`?
    pub fn is_valid_exchange(&self, kind: Exchange, a: UnitId, b: UnitId) -> Result<(), Error> {
        if self.is_initial_arrangement() {
            return Err(Error::DropsOnly);
        }
        let unit = &self.units[a];
        let target = &self.units[b];
        let colour = unit.colour();
        if self.is_forced_rearrange_for(colour) || self.is_forced_recovery_for(colour) {
            return Err(Error::InvalidState);
        }
        if self.is_over() {
            return Err(Error::GameOver);
        }
        let (Some(a_posn), Some(b_posn)) = (unit.loc(), target.loc()) else {
            return Err(Error::InvalidUnit);
        };

        match kind {
            Exchange::Tier13 => {
                if !unit.effects().contains(EffectSet::TIER_1_3_EXCHANGE) {
                    return Err(Error::InvalidUnit);
                }
                if target.immunities().contains(EffectSet::TIER_1_3_EXCHANGE) {
                    return Err(Error::Immune);
                }
                if self.is_in_check_for(colour) {
                    // An exchange within a tower never resolves check.
                    return Err(Error::Check);
                }
                let tower = &self.board[a_posn.index()];
                if a_posn != b_posn || colour != target.colour() || tower.is_dirty() {
                    return Err(Error::InvalidExchange);
                }
                let a_tier = tower.tier_of(a)?;
                let b_tier = tower.tier_of(b)?;
                if a_tier.abs_diff(b_tier) <= 1 {
                    return Err(Error::InvalidExchange);
                }
                if a_tier == MAX_TOWER_SIZE - 1
                    && matches!(target.front(), Piece::Catapult | Piece::Fortress)
                {
                    // The emplacements may not be lifted to the top.
                    return Err(Error::InvalidExchange);
                }
                Ok(())
            }
            Exchange::Substitution => {
                if !unit.effects().contains(EffectSet::SUBSTITUTION) {
                    return Err(Error::InvalidUnit);
                }
                if target.immunities().contains(EffectSet::SUBSTITUTION) {
                    return Err(Error::Immune);
                }
                if target.colour() != colour
                    || target.front() != Piece::Commander
                    || !self.is_in_check_for(colour)
                {
                    return Err(Error::InvalidSub);
                }
                let tower = &self.board[a_posn.index()];
                if self.escape_routes.contains(a_posn) && tower.top() == Some(a) {
                    Ok(())
                } else {
                    Err(Error::InvalidSub)
                }
            }
        }
    }

    // ---- mutators ----

    /// Drop a unit with this front and back from the current player's hand.
    pub fn drop_unit(&mut self, front: Piece, back: Option<Piece>, to: Posn) -> Result<(), Error> {
        if !to.is_valid() {
            return Err(Error::OutOfRange);
        }
        let id = self
            .hand_unit(self.turn(), front, back)
            .ok_or(Error::InvalidUnit)?;
        self.drop_unit_by_id(id, to)
    }

    pub fn drop_unit_by_id(&mut self, id: UnitId, to: Posn) -> Result<(), Error> {
        if !self.is_players_turn(self.units[id].colour()) {
            return Err(Error::NotTurn);
        }
        self.is_valid_drop(to, id)?;

        let front = self.units[id].front();
        let added = self.board[to.index()].add(id, &mut self.units);
        debug_assert!(added.is_ok());

        let saved_rearrange = self.to_rearrange;
        if self.to_rearrange == Some(id) {
            self.to_rearrange = None;
        }

        match self.update_state_after_turn(Some(front)) {
            Ok(()) => Ok(()),
            Err(err) => {
                // Foul play: the drop produced a forbidden checkmate.
                let removed = self.board[to.index()].remove(id, &mut self.units);
                debug_assert!(removed.is_ok());
                self.to_rearrange = saved_rearrange;
                self.update_mobile_range_expansion();
                Err(err)
            }
        }
    }

    /// Move the unit at `tier` in the tower at `from` to `to`.
    pub fn move_unit(&mut self, from: Posn, tier: usize, to: Posn) -> Result<(), Error> {
        if !from.is_valid() || !to.is_valid() {
            return Err(Error::OutOfRange);
        }
        let id = self.board[from.index()].at(tier)?;
        self.move_unit_by_id(id, to)
    }

    pub fn move_unit_by_id(&mut self, id: UnitId, to: Posn) -> Result<(), Error> {
        let colour = self.units[id].colour();
        if !self.is_players_turn(colour) {
            return Err(Error::NotTurn);
        }
        self.validate_move(to, id, true)?;

        let enemy = !colour;
        let from = self.units[id].loc().unwrap();
        let saved_rearrange = self.to_rearrange;

        // Capture the enemy top of the target tower, and with the betrayal
        // effect turn the rest of its garrison.
        let mut captured = None;
        let mut betrayed = Vec::new();
        if let Some(top) = self.board[to.index()].top() {
            if self.units[top].colour() != colour {
                self.capture_unit(top, enemy, colour, true);
                captured = Some(top);
                if self.units[id].effects().contains(EffectSet::BETRAYAL) {
                    for member in self.board[to.index()].members().to_vec() {
                        if self.units[member].colour() != colour {
                            self.capture_unit(member, enemy, colour, false);
                            betrayed.push(member);
                        }
                    }
                }
            }
        }

        let removed = self.board[from.index()].remove(id, &mut self.units);
        debug_assert!(removed.is_ok());
        let added = self.board[to.index()].add(id, &mut self.units);
        debug_assert!(added.is_ok());

        if self.units[id].effects().contains(EffectSet::FORCED_RECOVERY) {
            let tier = self.board[to.index()].tier_of(id).unwrap();
            let invert = inverted(colour);
            let destination = if captured.is_some() { enemy } else { colour };
            let front = self.units[id].front();
            if !any_walk(front, tier, to, invert) {
                self.recovery = Some(Recovery {
                    unit: id,
                    destination,
                    posn: to,
                });
            }
            if self.is_in_mobile_range_expansion(to, colour)
                && tier + 1 < MAX_TOWER_SIZE
                && !any_walk(front, tier + 1, to, invert)
            {
                self.recovery = Some(Recovery {
                    unit: id,
                    destination,
                    posn: to,
                });
            }
        }

        if self.units[id].front() == Piece::Bronze {
            // A Bronze may not deliver a forbidden checkmate; the move and
            // every capture and betrayal roll back as one transaction.
            debug_assert!(!self.is_forced_recovery());
            match self.update_state_after_turn(Some(Piece::Bronze)) {
                Ok(()) => Ok(()),
                Err(err) => {
                    let removed = self.board[to.index()].remove(id, &mut self.units);
                    debug_assert!(removed.is_ok());
                    let added = self.board[from.index()].add(id, &mut self.units);
                    debug_assert!(added.is_ok());
                    for member in betrayed {
                        self.capture_unit(member, colour, enemy, false);
                    }
                    if let Some(top) = captured {
                        self.capture_unit(top, colour, enemy, false);
                        let _ = self.units[top].flip();
                        let added = self.board[to.index()].add(top, &mut self.units);
                        debug_assert!(added.is_ok());
                    }
                    self.to_rearrange = saved_rearrange;
                    self.update_mobile_range_expansion();
                    Err(err)
                }
            }
        } else {
            self.update_state_after_turn(None)
        }
    }

    /// Strike from `tier` at `target_tier` within the tower at `posn`.
    pub fn immobile_strike(
        &mut self,
        posn: Posn,
        tier: usize,
        target_tier: usize,
    ) -> Result<(), Error> {
        if !posn.is_valid() || target_tier >= MAX_TOWER_SIZE {
            return Err(Error::OutOfRange);
        }
        let id = self.board[posn.index()].at(tier)?;
        self.immobile_strike_by_id(id, target_tier)
    }

    pub fn immobile_strike_by_id(&mut self, id: UnitId, target_tier: usize) -> Result<(), Error> {
        let colour = self.units[id].colour();
        if !self.is_players_turn(colour) {
            return Err(Error::NotTurn);
        }
        self.is_valid_immobile_strike(id, target_tier)?;

        let posn = self.units[id].loc().unwrap();
        let target = self.board[posn.index()].at(target_tier).unwrap();
        self.capture_unit(target, !colour, colour, true);

        self.update_state_after_turn(None)
    }

    /// Perform an exchange between the units at the given tiers.
    pub fn exchange_units(
        &mut self,
        kind: Exchange,
        from: Posn,
        from_tier: usize,
        to: Posn,
        to_tier: usize,
    ) -> Result<(), Error> {
        if !from.is_valid() || !to.is_valid() {
            return Err(Error::OutOfRange);
        }
        let a = self.board[from.index()].at(from_tier)?;
        let b = self.board[to.index()].at(to_tier)?;
        self.exchange_units_by_id(kind, a, b)
    }

    pub fn exchange_units_by_id(&mut self, kind: Exchange, a: UnitId, b: UnitId) -> Result<(), Error> {
        if !self.is_players_turn(self.units[a].colour()) {
            return Err(Error::NotTurn);
        }
        self.is_valid_exchange(kind, a, b)?;

        let a_posn = self.units[a].loc().unwrap();
        match kind {
            Exchange::Substitution => {
                let b_posn = self.units[b].loc().unwrap();
                let removed = self.board[a_posn.index()].remove(a, &mut self.units);
                debug_assert!(removed.is_ok());
                let removed = self.board[b_posn.index()].remove(b, &mut self.units);
                debug_assert!(removed.is_ok());
                let added = self.board[a_posn.index()].add(b, &mut self.units);
                debug_assert!(added.is_ok());
                let added = self.board[b_posn.index()].add(a, &mut self.units);
                debug_assert!(added.is_ok());
            }
            Exchange::Tier13 => {
                self.board[a_posn.index()].exchange_ends();
            }
        }

        self.update_state_after_turn(None)?;
        if kind == Exchange::Tier13 {
            self.board[a_posn.index()].mark_dirty();
        }
        Ok(())
    }

    /// Answer a pending forced recovery.  Either way the pending state is
    /// cleared and the turn advances.
    pub fn force_recover(&mut self, recover: bool) -> Result<(), Error> {
        let Some(recovery) = self.recovery.take() else {
            return Err(Error::InvalidState);
        };
        if recover {
            let current = self.turn();
            let Self {
                players,
                units,
                board,
                ..
            } = self;
            let removed = players[current].remove_unit(recovery.unit);
            debug_assert!(removed.is_ok());
            let added = players[recovery.destination].add_unit(recovery.unit, units);
            debug_assert!(added.is_ok());
            let removed = board[recovery.posn.index()].remove(recovery.unit, units);
            debug_assert!(removed.is_ok());
        }
        self.update_state_after_turn(None)
    }

    // ---- internals ----

    /// Transfer `id` between armies; when `remove` is set the unit is also
    /// lifted off the board and flipped (a capture).
    fn capture_unit(&mut self, id: UnitId, from: Colour, to: Colour, remove: bool) {
        let Self {
            players,
            units,
            board,
            to_rearrange,
            ..
        } = self;
        let result = players[from].remove_unit(id);
        debug_assert!(result.is_ok());
        let result = players[to].add_unit(id, units);
        debug_assert!(result.is_ok());
        if remove {
            let posn = units[id].loc().unwrap();
            let result = board[posn.index()].remove(id, units);
            debug_assert!(result.is_ok());
            // The captive turns its back to its new owner; the Commander has
            // no back, and taking it ends the game anyway.
            let _ = units[id].flip();
            if units[id].effects().contains(EffectSet::FORCED_REARRANGEMENT) {
                *to_rearrange = Some(id);
            }
        }
    }

    fn update_mobile_range_expansion(&mut self) {
        self.expansions = Pair::new(Mask::empty(), Mask::empty());

        let sources: Vec<(Colour, EffectSet, Posn)> = self
            .units
            .iter()
            .filter_map(|(_, unit)| {
                let posn = unit.loc()?;
                if unit.effects().intersects(EffectSet::MOBILE_RANGE_EXPANSION) {
                    Some((unit.colour(), unit.effects(), posn))
                } else {
                    None
                }
            })
            .collect();

        for (colour, effects, posn) in sources {
            let invert = inverted(colour);

            if effects.contains(EffectSet::MOBILE_RANGE_EXPANSION_1) {
                // Fortress: the column from the unit to the opposing edge.
                let mut pos = posn;
                while pos.is_valid() {
                    self.expansions[colour].set(pos);
                    pos.up(invert);
                }
            }

            if effects.contains(EffectSet::MOBILE_RANGE_EXPANSION_2) {
                // Catapult: a 1-3-5-3-1 diamond clipped to own territory.
                const UP_AMOUNTS: [i32; 5] = [2, 1, 0, -1, -2];
                const LEFT_AMOUNTS: [i32; 5] = [0, 1, 2, 1, 0];
                const RIGHT_AMOUNTS: [i32; 5] = [0, 2, 4, 2, 0];
                for i in 0..UP_AMOUNTS.len() {
                    let mut pos = posn;
                    let mut up = UP_AMOUNTS[i];
                    while up != 0 {
                        if up < 0 {
                            pos.down(invert);
                            up += 1;
                        } else {
                            pos.up(invert);
                            up -= 1;
                        }
                    }
                    if !pos.is_valid() || !in_territory(pos, colour) {
                        continue;
                    }
                    for _ in 0..LEFT_AMOUNTS[i] {
                        pos.left(invert);
                    }
                    let mut right = RIGHT_AMOUNTS[i];
                    while right >= 0 {
                        if pos.is_valid() {
                            self.expansions[colour].set(pos);
                        }
                        pos.right(invert);
                        right -= 1;
                    }
                }
            }
        }
    }

    /// Squares the commander may flee to: on-board, non-full 8-neighbours,
    /// plus the squares of friendly substitution units that top their towers
    /// orthogonally adjacent to the commander.
    fn commander_escape_routes(&self, commander: UnitId) -> Mask {
        let posn = self.units[commander].loc().unwrap();
        let colour = self.units[commander].colour();

        let mut escapes = Mask::empty();
        for dc in -1i8..=1 {
            for dr in -1i8..=1 {
                if (dc, dr) == (0, 0) {
                    continue;
                }
                let p = Posn::new(posn.col() + dc, posn.row() + dr);
                if p.is_valid() && self.board[p.index()].height() < MAX_TOWER_SIZE {
                    escapes.set(p);
                }
            }
        }

        for id in self.players[colour].units() {
            let unit = &self.units[*id];
            if !unit.effects().contains(EffectSet::SUBSTITUTION) {
                continue;
            }
            let Some(sub_posn) = unit.loc() else {
                continue;
            };
            if self.board[sub_posn.index()].top() != Some(*id) {
                continue;
            }
            if sub_posn.adjacent(&posn).is_orthogonal() {
                escapes.set(sub_posn);
            }
        }
        escapes
    }

    /// Would moving `friend` to `point` lift the check on the commander at
    /// `target`?  The move is simulated and undone.
    fn trial_resolves_check(
        &mut self,
        friend: UnitId,
        point: Posn,
        target: Posn,
        enemy: Colour,
    ) -> bool {
        if self.validate_move(point, friend, true).is_err() {
            return false;
        }
        let from = self.units[friend].loc().unwrap();
        let colour = self.units[friend].colour();

        let mut removed = None;
        if let Some(top) = self.board[point.index()].top() {
            if self.units[top].colour() != colour {
                let result = self.board[point.index()].remove(top, &mut self.units);
                debug_assert!(result.is_ok());
                removed = Some(top);
            }
        }
        let result = self.board[from.index()].remove(friend, &mut self.units);
        debug_assert!(result.is_ok());
        let added = self.board[point.index()].add(friend, &mut self.units).is_ok();

        let mut resolved = false;
        if added {
            resolved = true;
            for enemy_id in self.players[enemy].active_units(&self.units) {
                if self.validate_move(target, enemy_id, false).is_ok() {
                    resolved = false;
                    break;
                }
            }
            let result = self.board[point.index()].remove(friend, &mut self.units);
            debug_assert!(result.is_ok());
        }
        let result = self.board[from.index()].add(friend, &mut self.units);
        debug_assert!(result.is_ok());
        if let Some(top) = removed {
            let result = self.board[point.index()].add(top, &mut self.units);
            debug_assert!(result.is_ok());
        }
        resolved
    }

    /// Recompute derived state after an accepted action.  Advances the turn
    /// unless a forced recovery is pending, maintains the arrangement
    /// phase, computes check, checkmate and the repetition draw, and commits
    /// the escape and check-point sets.
    fn update_state_after_turn(&mut self, dropped: Option<Piece>) -> Result<(), Error> {
        for tower in &mut self.board {
            tower.mark_clean();
        }

        if self.is_forced_recovery() {
            // The same player must answer the recovery first; the turn does
            // not advance.
            return Ok(());
        }

        self.update_mobile_range_expansion();

        let original_state = self.state;

        self.state
            .toggle(GameState::TURN_BLACK | GameState::TURN_WHITE);
        self.state.remove(GameState::CHECK | GameState::CHECKMATE);

        let mut initial_placed = 0;
        if self.is_initial_arrangement() {
            initial_placed = self.units.iter().filter(|(_, unit)| unit.is_active()).count();
            if initial_placed >= PIECE_COUNT - 1 {
                // Cleared for good once all units stand; cleared temporarily
                // at one-to-go so the final placer can be caught in check.
                self.state.remove(GameState::INITIAL_ARRANGEMENT);
            }
        }

        let current = self.turn();
        let enemy = !current;

        let Some(commander) = self.players[current].commander() else {
            self.check_points = Mask::empty();
            self.escape_routes = Mask::empty();
            return Ok(());
        };
        let Some(target) = self.units[commander].loc() else {
            // Mid-arrangement with the commander still in hand.
            self.state.insert(GameState::INITIAL_ARRANGEMENT);
            self.check_points = Mask::empty();
            self.escape_routes = Mask::empty();
            return Ok(());
        };

        let mut escapes = self.commander_escape_routes(commander);
        let mut check_points = Mask::empty();
        let mut in_check = false;

        for enemy_id in self.players[enemy].active_units(&self.units) {
            let start = self.units[enemy_id].loc().unwrap();
            let walk = self.validate_move(target, enemy_id, true);

            for escape in escapes.iter().collect::<Vec<_>>() {
                if escape == start {
                    // Fleeing onto an enemy top leaves the commander open to
                    // an immobile strike from below.
                    if self.board[start.index()].top() == Some(enemy_id) {
                        escapes.reset(escape);
                    }
                } else if self.validate_move(escape, enemy_id, false).is_ok() {
                    escapes.reset(escape);
                }
            }

            let Ok(mut walk) = walk else {
                continue;
            };
            walk.pop();
            let walk = Mask::from_posns(walk);
            // A block must intersect every attacker's path.
            check_points = if in_check { check_points & walk } else { walk };
            in_check = true;
        }

        if initial_placed == PIECE_COUNT - 1 {
            self.state.insert(GameState::INITIAL_ARRANGEMENT);
        }

        if !check_points.is_empty() {
            // Keep only the points the current player can actually serve
            // with a legal drop or a non-commander move.
            let mut available = Mask::empty();
            for friend in self.players[current].units().to_vec() {
                if Some(friend) == self.players[current].commander() {
                    continue;
                }
                for point in check_points.iter().collect::<Vec<_>>() {
                    if available.contains(point) {
                        continue;
                    }
                    if self.units[friend].is_active() {
                        if self.is_initial_arrangement() {
                            continue;
                        }
                        if self.trial_resolves_check(friend, point, target, enemy) {
                            available.set(point);
                        }
                    } else if self.is_valid_drop(point, friend).is_ok() {
                        available.set(point);
                    }
                }
            }
            check_points = available;
        }

        if in_check {
            self.state.insert(GameState::CHECK);
            if check_points.is_empty() && escapes.is_empty() {
                match dropped {
                    Some(Piece::Pawn) => {
                        self.state = original_state;
                        return Err(Error::PawnCheckmate);
                    }
                    Some(Piece::Bronze) => {
                        self.state = original_state;
                        return Err(Error::BronzeCheckmate);
                    }
                    _ => self.state.insert(GameState::CHECKMATE),
                }
            }
        }

        let repetitions = self.recorder.record(&self.board, &self.units);
        if !self.state.contains(GameState::CHECKMATE) && repetitions == MAX_POSITION_REPETITIONS {
            self.state.insert(GameState::DRAW);
        }

        self.escape_routes = escapes;
        self.check_points = check_points;
        Ok(())
    }
}

impl fmt::Display for Controller {
    /// The 9x9 board with three slots per square, topmost tier first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = BOARD_LENGTH * 6 + 1;
        writeln!(f)?;
        write!(f, "   0")?;
        for col in 1..BOARD_LENGTH {
            write!(f, "     {}", col)?;
        }
        writeln!(f)?;
        for row in (0..BOARD_LENGTH).rev() {
            writeln!(f, "{}", "-".repeat(len))?;
            for tier in (0..MAX_TOWER_SIZE).rev() {
                write!(f, "|")?;
                for col in 0..BOARD_LENGTH {
                    let posn = Posn::new(col as i8, row as i8);
                    match self.unit_at(posn, tier) {
                        None => write!(f, "    ")?,
                        Some(unit) => write!(
                            f,
                            " {}{}",
                            if unit.colour() == Black { "B" } else { "W" },
                            unit.code()
                        )?,
                    }
                    write!(f, " |")?;
                    if tier == MAX_TOWER_SIZE / 2 && col == BOARD_LENGTH - 1 {
                        write!(f, " {}", row)?;
                    }
                }
                writeln!(f)?;
            }
        }
        writeln!(f, "{}", "-".repeat(len))
    }
}
