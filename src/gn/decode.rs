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

use super::metadata::GnMetadata;
use super::moves::{GnMove, RecoverSink};
use super::record::GameRecord;
use super::GnError;
use crate::board::{Controller, Exchange, Turn};

/// Decode a whole GN document against a fresh controller, returning the
/// header metadata and the replayed game.
pub fn decode(gn: &str) -> Result<(GnMetadata, Controller), GnError> {
    let record = GameRecord::from_gn(gn)?;
    Ok(record.into_parts())
}

/// Decode a single move token and dispatch it to the controller.
pub fn decode_move(token: &str, controller: &mut Controller) -> Result<(), GnError> {
    let mv: GnMove = token.parse()?;
    apply_move(&mv, controller)
}

/// Verify a parsed token against the board, then dispatch it.
pub fn apply_move(mv: &GnMove, controller: &mut Controller) -> Result<(), GnError> {
    if !mv.on_board() {
        return Err(GnError::BoardMismatch);
    }
    verify(mv, controller)?;
    match *mv {
        GnMove::Drop {
            front, back, to, ..
        } => controller.drop_unit(front, back, to)?,
        GnMove::Move {
            from,
            from_tier,
            to,
            ..
        } => controller.move_unit(from, from_tier, to)?,
        GnMove::ImmobileStrike {
            posn,
            tier,
            target_tier,
            ..
        } => controller.immobile_strike(posn, tier, target_tier)?,
        GnMove::Recover { sink, .. } => {
            // The glyph records where the unit went; either recovery glyph
            // dispatches as "recover", the destination is the controller's.
            controller.force_recover(sink != RecoverSink::Decline)?
        }
        GnMove::Substitution {
            from,
            from_tier,
            to,
            to_tier,
            ..
        } => controller.exchange_units(Exchange::Substitution, from, from_tier, to, to_tier)?,
        GnMove::TierExchange {
            posn,
            tier,
            target_tier,
            ..
        } => {
            // A 1-3 exchange stays within one tower.
            controller.exchange_units(Exchange::Tier13, posn, tier, posn, target_tier)?
        }
    }
    Ok(())
}

/// The token must name the unit that actually sits at the stated tier for
/// the side to move, and destination tiers must match the pre-action height
/// of the target tower.
fn verify(mv: &GnMove, controller: &Controller) -> Result<(), GnError> {
    let colour = controller.turn();
    match *mv {
        GnMove::Drop { to, tier, .. } => {
            if controller.tower(to).height() != tier {
                return Err(GnError::BoardMismatch);
            }
        }
        GnMove::Move {
            front,
            back,
            from,
            from_tier,
            to,
            to_tier,
            strike,
        } => {
            verify_unit(controller, from, from_tier, front, back)?;
            let height = controller.tower(to).height();
            let landing = if strike {
                height == to_tier + 1
            } else {
                height == to_tier || height == to_tier + 1
            };
            if !landing {
                return Err(GnError::BoardMismatch);
            }
        }
        GnMove::ImmobileStrike {
            front,
            back,
            posn,
            tier,
            ..
        } => verify_unit(controller, posn, tier, front, back)?,
        GnMove::Recover {
            front,
            back,
            posn,
            tier,
            ..
        } => {
            let Some(recovery) = controller.forced_recovery() else {
                return Err(GnError::BoardMismatch);
            };
            let unit = controller.unit(recovery.unit);
            if unit.front() != front || unit.back() != back || unit.colour() != colour {
                return Err(GnError::BoardMismatch);
            }
            if recovery.posn != posn {
                return Err(GnError::BoardMismatch);
            }
            let stands_at = controller
                .tower(posn)
                .tier_of(recovery.unit)
                .map_err(|_| GnError::BoardMismatch)?;
            if stands_at != tier {
                return Err(GnError::BoardMismatch);
            }
        }
        GnMove::Substitution {
            front,
            back,
            from,
            from_tier,
            ..
        } => verify_unit(controller, from, from_tier, front, back)?,
        GnMove::TierExchange {
            front,
            back,
            posn,
            tier,
            ..
        } => verify_unit(controller, posn, tier, front, back)?,
    }
    Ok(())
}

fn verify_unit(
    controller: &Controller,
    posn: crate::board::Posn,
    tier: usize,
    front: crate::board::Piece,
    back: Option<crate::board::Piece>,
) -> Result<(), GnError> {
    let unit = controller
        .unit_at(posn, tier)
        .ok_or(GnError::BoardMismatch)?;
    if unit.front() != front || unit.back() != back || unit.colour() != controller.turn() {
        return Err(GnError::BoardMismatch);
    }
    Ok(())
}

/// A byte cursor over a GN document: whitespace, comments, words, numbers.
pub(super) struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(super) fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub(super) fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub(super) fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    pub(super) fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Skip whitespace and any number of `# …` and `( … )` comments.
    pub(super) fn skip_trivia(&mut self) -> Result<(), GnError> {
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'#') => {
                    while self.peek().is_some_and(|b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b'(') => {
                    self.pos += 1;
                    while self.peek().is_some_and(|b| b != b')') {
                        self.pos += 1;
                    }
                    if self.bump() != Some(b')') {
                        return Err(GnError::UnterminatedComment);
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub(super) fn number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    /// Consume a run of `.` characters.
    pub(super) fn dots(&mut self) -> usize {
        let start = self.pos;
        while self.peek() == Some(b'.') {
            self.pos += 1;
        }
        self.pos - start
    }

    /// The next whitespace-delimited word.
    pub(super) fn word(&mut self) -> &'a str {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(|b| !b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("")
    }

    fn take_until(&mut self, stop: u8) -> Option<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b != stop) {
            self.pos += 1;
        }
        if self.is_eof() {
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.pos]).ok()
    }
}

/// Decode the `[Name "value"]` header entries, stopping at the first
/// non-header content.  Names are case-insensitive; `Result` is accepted
/// and ignored; anything else unknown is a failure.
pub(super) fn decode_header(scanner: &mut Scanner, md: &mut GnMetadata) -> Result<(), GnError> {
    loop {
        scanner.skip_trivia()?;
        match scanner.peek() {
            Some(b'[') => {
                scanner.bump();
                scanner.skip_ws();
                let start = scanner.pos;
                while scanner
                    .peek()
                    .is_some_and(|b| !b.is_ascii_whitespace() && b != b'"')
                {
                    scanner.pos += 1;
                }
                let name = std::str::from_utf8(&scanner.bytes[start..scanner.pos])
                    .map_err(|_| GnError::MalformedHeader)?
                    .to_ascii_lowercase();
                scanner.skip_ws();
                if scanner.bump() != Some(b'"') {
                    return Err(GnError::MalformedHeader);
                }
                let value = scanner
                    .take_until(b'"')
                    .ok_or(GnError::MalformedHeader)?
                    .to_string();
                scanner.bump();
                scanner.skip_ws();
                if scanner.bump() != Some(b']') {
                    return Err(GnError::MalformedHeader);
                }
                match name.as_str() {
                    "event" => md.set_event(&value),
                    "date" => md.set_date(&value)?,
                    "location" => md.set_location(&value),
                    "white" => md.set_white(&value),
                    "black" => md.set_black(&value),
                    "result" => {}
                    _ => return Err(GnError::UnknownHeader(name)),
                }
            }
            _ => return Ok(()),
        }
    }
}
