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

use super::decode::{apply_move, decode_header, Scanner};
use super::metadata::GnMetadata;
use super::moves::{GnMove, RecoverSink};
use super::GnError;
use crate::board::{Colour, Controller, Error, Exchange, Piece, Posn, Turn};

/// A game together with its GN transcription.  Every action goes through
/// the rules controller; accepted actions append their canonical movetext
/// token, so the record can be emitted at any point and replayed later.
///
/// Movetext blocks are numbered per half-move, `N.` for Black and `N...`
/// for White.
#[derive(Debug)]
pub struct GameRecord {
    controller: Controller,
    metadata: GnMetadata,
    movetext: Vec<String>,
    move_no: usize,
}

impl Default for GameRecord {
    fn default() -> Self {
        Self::new(GnMetadata::new())
    }
}

impl GameRecord {
    pub fn new(metadata: GnMetadata) -> Self {
        Self {
            controller: Controller::new(),
            metadata,
            movetext: Vec::new(),
            move_no: 1,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn metadata(&self) -> &GnMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut GnMetadata {
        &mut self.metadata
    }

    pub fn movetext(&self) -> &[String] {
        &self.movetext
    }

    pub fn into_parts(self) -> (GnMetadata, Controller) {
        (self.metadata, self.controller)
    }

    /// Apply a parsed token and record its canonical form.
    pub fn apply(&mut self, mv: &GnMove) -> Result<(), GnError> {
        if !mv.on_board() {
            return Err(GnError::BoardMismatch);
        }
        let colour = self.controller.turn();
        let canonical = self.canonicalize(mv);
        apply_move(&canonical, &mut self.controller)?;
        self.push(colour, canonical.to_string());
        Ok(())
    }

    /// Rewrite a token so the strike glyph and the recovery sink reflect
    /// the board rather than the caller's choice of spelling.
    fn canonicalize(&self, mv: &GnMove) -> GnMove {
        match *mv {
            GnMove::Move {
                front,
                back,
                from,
                from_tier,
                to,
                to_tier,
                ..
            } => {
                let strike = self
                    .controller
                    .tower(to)
                    .top()
                    .is_some_and(|top| self.controller.unit(top).colour() != self.controller.turn());
                GnMove::Move {
                    front,
                    back,
                    from,
                    from_tier,
                    to,
                    to_tier,
                    strike,
                }
            }
            GnMove::Recover {
                front,
                back,
                posn,
                tier,
                sink,
            } if sink != RecoverSink::Decline => {
                let sink = match self.controller.forced_recovery() {
                    Some(recovery) if recovery.destination == self.controller.turn() => {
                        RecoverSink::ToSelf
                    }
                    Some(_) => RecoverSink::ToOpponent,
                    // Leave an orphan token alone; verification rejects it.
                    None => sink,
                };
                GnMove::Recover {
                    front,
                    back,
                    posn,
                    tier,
                    sink,
                }
            }
            ref mv => mv.clone(),
        }
    }

    fn push(&mut self, colour: Colour, token: String) {
        let dots = match colour {
            Colour::Black => ".",
            Colour::White => "...",
        };
        self.movetext.push(format!("{}{} {}", self.move_no, dots, token));
        self.move_no += 1;
    }

    // ---- recorded actions, mirroring the controller API ----

    pub fn drop_unit(
        &mut self,
        front: Piece,
        back: Option<Piece>,
        to: Posn,
    ) -> Result<(), GnError> {
        if !to.is_valid() {
            return Err(GnError::Rejected(Error::OutOfRange));
        }
        let tier = self.controller.tower(to).height();
        self.apply(&GnMove::Drop {
            front,
            back,
            to,
            tier,
        })
    }

    pub fn move_unit(&mut self, from: Posn, tier: usize, to: Posn) -> Result<(), GnError> {
        if !from.is_valid() || !to.is_valid() {
            return Err(GnError::Rejected(Error::OutOfRange));
        }
        let unit = self
            .controller
            .unit_at(from, tier)
            .ok_or(GnError::Rejected(Error::OutOfRange))?;
        let (front, back) = (unit.front(), unit.back());
        let strike = self
            .controller
            .tower(to)
            .top()
            .is_some_and(|top| self.controller.unit(top).colour() != self.controller.turn());
        let height = self.controller.tower(to).height();
        let to_tier = if strike { height - 1 } else { height };
        self.apply(&GnMove::Move {
            front,
            back,
            from,
            from_tier: tier,
            to,
            to_tier,
            strike,
        })
    }

    pub fn immobile_strike(
        &mut self,
        posn: Posn,
        tier: usize,
        target_tier: usize,
    ) -> Result<(), GnError> {
        if !posn.is_valid() {
            return Err(GnError::Rejected(Error::OutOfRange));
        }
        let unit = self
            .controller
            .unit_at(posn, tier)
            .ok_or(GnError::Rejected(Error::OutOfRange))?;
        let (front, back) = (unit.front(), unit.back());
        self.apply(&GnMove::ImmobileStrike {
            front,
            back,
            posn,
            tier,
            target_tier,
        })
    }

    pub fn exchange_units(
        &mut self,
        kind: Exchange,
        from: Posn,
        from_tier: usize,
        to: Posn,
        to_tier: usize,
    ) -> Result<(), GnError> {
        if !from.is_valid() || !to.is_valid() {
            return Err(GnError::Rejected(Error::OutOfRange));
        }
        let unit = self
            .controller
            .unit_at(from, from_tier)
            .ok_or(GnError::Rejected(Error::OutOfRange))?;
        let (front, back) = (unit.front(), unit.back());
        let mv = match kind {
            Exchange::Substitution => GnMove::Substitution {
                front,
                back,
                from,
                from_tier,
                to,
                to_tier,
            },
            Exchange::Tier13 => GnMove::TierExchange {
                front,
                back,
                posn: from,
                tier: from_tier,
                target_tier: to_tier,
            },
        };
        self.apply(&mv)
    }

    pub fn force_recover(&mut self, recover: bool) -> Result<(), GnError> {
        let recovery = *self
            .controller
            .forced_recovery()
            .ok_or(GnError::Rejected(Error::InvalidState))?;
        let unit = self.controller.unit(recovery.unit);
        let (front, back) = (unit.front(), unit.back());
        let posn = recovery.posn;
        let tier = self
            .controller
            .tower(posn)
            .tier_of(recovery.unit)
            .map_err(GnError::Rejected)?;
        let sink = if !recover {
            RecoverSink::Decline
        } else if recovery.destination == self.controller.turn() {
            RecoverSink::ToSelf
        } else {
            RecoverSink::ToOpponent
        };
        self.apply(&GnMove::Recover {
            front,
            back,
            posn,
            tier,
            sink,
        })
    }

    // ---- text form ----

    /// The full GN document: header (with the live result) and movetext.
    pub fn to_gn(&self) -> String {
        let mut gn = self.metadata.header(&self.controller);
        if !self.movetext.is_empty() {
            gn.push_str(&self.movetext.join(" "));
            gn.push('\n');
        }
        gn
    }

    /// Rebuild a record by replaying a GN document from a fresh game.
    pub fn from_gn(gn: &str) -> Result<Self, GnError> {
        let mut record = GameRecord::default();
        let mut scanner = Scanner::new(gn);
        decode_header(&mut scanner, &mut record.metadata)?;

        let mut block_no = 1u32;
        loop {
            scanner.skip_trivia()?;
            if scanner.is_eof() {
                break;
            }
            let Some(number) = scanner.number() else {
                return Err(GnError::MalformedMove(scanner.word().to_string()));
            };
            if number != block_no {
                return Err(GnError::OutOfSequence);
            }
            block_no += 1;
            let side = match scanner.dots() {
                1 => Colour::Black,
                3 => Colour::White,
                _ => return Err(GnError::WrongTurn),
            };
            if !record.controller.is_players_turn(side) {
                return Err(GnError::WrongTurn);
            }
            let token = scanner.word();
            let mv: GnMove = token.parse()?;
            record.apply(&mv)?;

            scanner.skip_trivia()?;
            if scanner.is_eof() {
                break;
            }
            if scanner.peek().is_some_and(|b| b.is_ascii_digit()) {
                continue;
            }
            // A bare follow-up move without its own number.
            let token = scanner.word();
            let mv: GnMove = token.parse()?;
            record.apply(&mv)?;
        }
        Ok(record)
    }
}
