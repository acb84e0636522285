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

//! Game sessions: identifiers, results, and the registry a host embeds to
//! run many games at once.  The registry is an ordinary value — there is no
//! hidden process-wide state — and its identifier allocation is monotone,
//! probing forward from the last assigned id and committing the counter
//! with a compare-and-swap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::board::{Colour, Controller, Error, Exchange, Piece, Posn, Turn};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameId(u32);

impl GameId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Win(Colour, WinReason),
    Draw(DrawReason),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum WinReason {
    Checkmate,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    Repetition,
}

impl GameResult {
    /// The outcome of a finished game, or `None` while it runs.
    pub fn of(controller: &Controller) -> Option<Self> {
        if !controller.is_over() {
            return None;
        }
        if controller.is_draw() {
            return Some(GameResult::Draw(DrawReason::Repetition));
        }
        controller
            .winner()
            .map(|colour| GameResult::Win(colour, WinReason::Checkmate))
    }
}

/// Maps numeric game identifiers to controller instances.  Concurrent
/// access to different games is safe behind the host's own sharding;
/// a single game instance must not be mutated concurrently.
#[derive(Debug, Default)]
pub struct Registry {
    games: HashMap<u32, Controller>,
    last_id: AtomicU32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Start a new game under a fresh identifier.  Probes forward from the
    /// last assigned id, wrapping at `u32::MAX`, and commits the counter
    /// with a compare-and-swap.
    pub fn start(&mut self) -> GameId {
        let mut next = self.last_id.load(Ordering::Relaxed);
        while self.games.contains_key(&next) {
            next = next.wrapping_add(1);
        }
        loop {
            let current = self.last_id.load(Ordering::Relaxed);
            if self
                .last_id
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
        self.games.insert(next, Controller::new());
        GameId(next)
    }

    /// Release one game instance.
    pub fn clear(&mut self, id: GameId) -> bool {
        self.games.remove(&id.0).is_some()
    }

    /// Release every game instance.
    pub fn clear_all(&mut self) {
        self.games.clear();
    }

    pub fn get(&self, id: GameId) -> Option<&Controller> {
        self.games.get(&id.0)
    }

    pub fn get_mut(&mut self, id: GameId) -> Option<&mut Controller> {
        self.games.get_mut(&id.0)
    }

    fn with<T>(&self, id: GameId, f: impl FnOnce(&Controller) -> T) -> Result<T, Error> {
        self.get(id).map(f).ok_or(Error::InvalidIdx)
    }

    fn with_mut(
        &mut self,
        id: GameId,
        f: impl FnOnce(&mut Controller) -> Result<(), Error>,
    ) -> Result<(), Error> {
        f(self.get_mut(id).ok_or(Error::InvalidIdx)?)
    }

    pub fn restart(&mut self, id: GameId) -> Result<(), Error> {
        self.with_mut(id, |controller| {
            controller.new_game();
            Ok(())
        })
    }

    pub fn is_over(&self, id: GameId) -> Result<bool, Error> {
        self.with(id, Controller::is_over)
    }

    pub fn is_draw(&self, id: GameId) -> Result<bool, Error> {
        self.with(id, Controller::is_draw)
    }

    pub fn is_forced_recovery(&self, id: GameId) -> Result<bool, Error> {
        self.with(id, Controller::is_forced_recovery)
    }

    pub fn is_forced_rearrangement(&self, id: GameId) -> Result<bool, Error> {
        self.with(id, Controller::is_forced_rearrangement)
    }

    pub fn turn(&self, id: GameId) -> Result<Colour, Error> {
        self.with(id, |controller| controller.turn())
    }

    /// The winner, or `None` while undecided or drawn.
    pub fn winner(&self, id: GameId) -> Result<Option<Colour>, Error> {
        self.with(id, Controller::winner)
    }

    pub fn drop_unit(
        &mut self,
        id: GameId,
        front: Piece,
        back: Option<Piece>,
        to: Posn,
    ) -> Result<(), Error> {
        self.with_mut(id, |controller| controller.drop_unit(front, back, to))
    }

    pub fn move_unit(
        &mut self,
        id: GameId,
        from: Posn,
        tier: usize,
        to: Posn,
    ) -> Result<(), Error> {
        self.with_mut(id, |controller| controller.move_unit(from, tier, to))
    }

    pub fn immobile_strike(
        &mut self,
        id: GameId,
        posn: Posn,
        tier: usize,
        target_tier: usize,
    ) -> Result<(), Error> {
        self.with_mut(id, |controller| {
            controller.immobile_strike(posn, tier, target_tier)
        })
    }

    pub fn substitution(
        &mut self,
        id: GameId,
        from: Posn,
        from_tier: usize,
        to: Posn,
        to_tier: usize,
    ) -> Result<(), Error> {
        self.with_mut(id, |controller| {
            controller.exchange_units(Exchange::Substitution, from, from_tier, to, to_tier)
        })
    }

    pub fn tier_exchange(
        &mut self,
        id: GameId,
        from: Posn,
        from_tier: usize,
        to: Posn,
        to_tier: usize,
    ) -> Result<(), Error> {
        self.with_mut(id, |controller| {
            controller.exchange_units(Exchange::Tier13, from, from_tier, to, to_tier)
        })
    }

    pub fn force_recover(&mut self, id: GameId, recover: bool) -> Result<(), Error> {
        self.with_mut(id, |controller| controller.force_recover(recover))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Piece::*;

    #[test]
    fn test_ids_are_unique_and_monotone() {
        let mut registry = Registry::new();
        let a = registry.start();
        let b = registry.start();
        let c = registry.start();
        assert_eq!(a.value(), 0);
        assert_eq!(b.value(), 1);
        assert_eq!(c.value(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_cleared_games_release_their_slot() {
        let mut registry = Registry::new();
        let a = registry.start();
        let _b = registry.start();
        assert!(registry.clear(a));
        assert!(!registry.clear(a));
        // The allocator keeps probing forward rather than reusing `a`.
        let c = registry.start();
        assert_eq!(c.value(), 2);
        registry.clear_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_operations_address_their_game() {
        let mut registry = Registry::new();
        let a = registry.start();
        let b = registry.start();
        registry
            .drop_unit(a, Pawn, Some(Bronze), Posn::new(0, 8))
            .unwrap();
        assert_eq!(registry.turn(a).unwrap(), Colour::White);
        assert_eq!(registry.turn(b).unwrap(), Colour::Black);
        assert_eq!(registry.winner(a).unwrap(), None);
        assert!(!registry.is_over(a).unwrap());
        registry.restart(a).unwrap();
        assert_eq!(registry.turn(a).unwrap(), Colour::Black);
    }

    #[test]
    fn test_unknown_ids_are_rejected() {
        let mut registry = Registry::new();
        let ghost = GameId::new(7);
        assert_eq!(registry.turn(ghost).unwrap_err(), Error::InvalidIdx);
        assert_eq!(
            registry
                .drop_unit(ghost, Pawn, Some(Bronze), Posn::new(0, 8))
                .unwrap_err(),
            Error::InvalidIdx
        );
    }

    #[test]
    fn test_game_result() {
        let controller = Controller::new();
        assert_eq!(GameResult::of(&controller), None);
    }
}
