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

use super::piece::Piece;
use super::tower::Tower;
use super::unit::UnitPool;

/// Canonical board snapshots with repetition counts, used for the
/// draw-by-repetition rule.  Two boards are equal when, square by square,
/// the bottom-to-top sequences of active front identifiers match; colours
/// are ignored.
#[derive(Debug, Clone, Default)]
pub struct BoardRecorder {
    positions: Vec<Position>,
}

#[derive(Debug, Clone)]
struct Position {
    board: Vec<Vec<Piece>>,
    repetitions: u32,
}

fn canonical_key(board: &[Tower], pool: &UnitPool) -> Vec<Vec<Piece>> {
    board
        .iter()
        .map(|tower| {
            tower
                .members()
                .iter()
                .map(|member| pool[*member].front())
                .collect()
        })
        .collect()
}

impl BoardRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the board and return how many times this snapshot had been
    /// entered before this call (0 for a first sighting).
    pub fn record(&mut self, board: &[Tower], pool: &UnitPool) -> u32 {
        let key = canonical_key(board, pool);
        if let Some(position) = self
            .positions
            .iter_mut()
            .find(|position| position.board == key)
        {
            position.repetitions += 1;
            return position.repetitions;
        }
        self.positions.push(Position {
            board: key,
            repetitions: 0,
        });
        0
    }

    /// The stored repetition count for the given board, if it has been seen.
    pub fn repetitions(&self, board: &[Tower], pool: &UnitPool) -> Option<u32> {
        let key = canonical_key(board, pool);
        self.positions
            .iter()
            .find(|position| position.board == key)
            .map(|position| position.repetitions)
    }

    pub fn reset(&mut self) {
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::piece::Colour::*;
    use crate::board::posn::Posn;
    use crate::board::unit::Unit;
    use crate::board::BOARD_SIZE;
    use Piece::*;

    fn empty_board() -> Vec<Tower> {
        (0..BOARD_SIZE).map(|i| Tower::new(Posn::from_index(i))).collect()
    }

    #[test]
    fn test_first_sighting_returns_zero() {
        let mut recorder = BoardRecorder::new();
        let pool = UnitPool::new();
        let board = empty_board();
        assert_eq!(recorder.record(&board, &pool), 0);
        assert_eq!(recorder.repetitions(&board, &pool), Some(0));
    }

    #[test]
    fn test_repetition_counts_post_increment() {
        let mut recorder = BoardRecorder::new();
        let pool = UnitPool::new();
        let board = empty_board();
        assert_eq!(recorder.record(&board, &pool), 0);
        assert_eq!(recorder.record(&board, &pool), 1);
        assert_eq!(recorder.record(&board, &pool), 2);
        assert_eq!(recorder.record(&board, &pool), 3);
        assert_eq!(recorder.record(&board, &pool), 4);
    }

    #[test]
    fn test_snapshots_are_colour_agnostic() {
        let mut recorder = BoardRecorder::new();
        let mut pool = UnitPool::new();
        let black_pawn = pool.push(Unit::new(Pawn, Some(Bronze), Black));
        let white_pawn = pool.push(Unit::new(Pawn, Some(Bronze), White));

        let mut board = empty_board();
        board[0].add(black_pawn, &mut pool).unwrap();
        assert_eq!(recorder.record(&board, &pool), 0);

        let mut other = empty_board();
        other[0].add(white_pawn, &mut pool).unwrap();
        // Same front in the same square: counted as the same position.
        assert_eq!(recorder.record(&other, &pool), 1);
    }

    #[test]
    fn test_snapshots_distinguish_tier_order() {
        let mut recorder = BoardRecorder::new();
        let mut pool = UnitPool::new();
        let pawn = pool.push(Unit::new(Pawn, Some(Bronze), Black));
        let bow = pool.push(Unit::new(Bow, Some(Arrow), Black));

        let mut board = empty_board();
        board[0].add(pawn, &mut pool).unwrap();
        board[0].add(bow, &mut pool).unwrap();
        assert_eq!(recorder.record(&board, &pool), 0);

        let mut other = empty_board();
        other[0].add(bow, &mut pool).unwrap();
        other[0].add(pawn, &mut pool).unwrap();
        assert_eq!(recorder.record(&other, &pool), 0);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut recorder = BoardRecorder::new();
        let pool = UnitPool::new();
        let board = empty_board();
        recorder.record(&board, &pool);
        recorder.record(&board, &pool);
        recorder.reset();
        assert_eq!(recorder.record(&board, &pool), 0);
    }
}
