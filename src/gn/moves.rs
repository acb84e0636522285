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

//! The GN move-token grammar.
//!
//! | action               | syntax                          | example          |
//! |----------------------|---------------------------------|------------------|
//! | drop                 | `FB*c-r-t`                      | `PZ*0-8-0`       |
//! | move                 | `FB<c1-r1-t1>c2-r2-t2`          | `PZ<0-8-0>0-7-0` |
//! | mobile strike        | `FB<c1-r1-t1xc2-r2-t2`          | `PZ<0-8-0x0-7-0` |
//! | immobile strike      | `FB<c-r-t1xt2`                  | `SP<0-8-1x0`     |
//! | recover (to self)    | `FB+c-r-t`                      | `PZ+0-7-0`       |
//! | recover (to foe)     | `FB^c-r-t`                      | `PZ^0-7-0`       |
//! | decline recovery     | `FB=c-r-t`                      | `PZ=0-7-0`       |
//! | substitution         | `FB<c1-r1-t1&c2-r2-t2`          | `SP<0-8-1&0-7-0` |
//! | 1-3 tier exchange    | `FB<c1-r1-t1&t2`                | `CP<0-8-0&2`     |
//!
//! `F` and `B` are the unit's front and back letters (`-` for no back);
//! columns, rows and tiers are decimal digits.

use std::fmt;
use std::str::FromStr;

use super::GnError;
use crate::board::{Piece, Posn, BOARD_LENGTH, MAX_TOWER_SIZE};

/// Where a recovered unit goes, or that recovery was declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverSink {
    ToSelf,
    ToOpponent,
    Decline,
}

/// One parsed movetext token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GnMove {
    Drop {
        front: Piece,
        back: Option<Piece>,
        to: Posn,
        tier: usize,
    },
    Move {
        front: Piece,
        back: Option<Piece>,
        from: Posn,
        from_tier: usize,
        to: Posn,
        to_tier: usize,
        strike: bool,
    },
    ImmobileStrike {
        front: Piece,
        back: Option<Piece>,
        posn: Posn,
        tier: usize,
        target_tier: usize,
    },
    Recover {
        front: Piece,
        back: Option<Piece>,
        posn: Posn,
        tier: usize,
        sink: RecoverSink,
    },
    Substitution {
        front: Piece,
        back: Option<Piece>,
        from: Posn,
        from_tier: usize,
        to: Posn,
        to_tier: usize,
    },
    TierExchange {
        front: Piece,
        back: Option<Piece>,
        posn: Posn,
        tier: usize,
        target_tier: usize,
    },
}

impl GnMove {
    /// All coordinates fall on the board.  Parsed tokens always do; hand
    /// built values are checked before they touch a controller.
    pub fn on_board(&self) -> bool {
        match *self {
            GnMove::Drop { to, .. } => to.is_valid(),
            GnMove::Move { from, to, .. } | GnMove::Substitution { from, to, .. } => {
                from.is_valid() && to.is_valid()
            }
            GnMove::ImmobileStrike { posn, .. }
            | GnMove::Recover { posn, .. }
            | GnMove::TierExchange { posn, .. } => posn.is_valid(),
        }
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        (self.bump()? == byte).then_some(())
    }

    fn number(&mut self) -> Option<usize> {
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

    fn tier(&mut self) -> Option<usize> {
        self.number().filter(|tier| *tier < MAX_TOWER_SIZE)
    }

    /// `c-r-t` with the coordinate and tier bounds of the board.
    fn triple(&mut self) -> Option<(Posn, usize)> {
        let col = self.number().filter(|col| *col < BOARD_LENGTH)?;
        self.expect(b'-')?;
        let row = self.number().filter(|row| *row < BOARD_LENGTH)?;
        self.expect(b'-')?;
        let tier = self.tier()?;
        Some((Posn::new(col as i8, row as i8), tier))
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

impl FromStr for GnMove {
    type Err = GnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).ok_or_else(|| GnError::MalformedMove(s.to_string()))
    }
}

fn parse(s: &str) -> Option<GnMove> {
    let bytes = s.as_bytes();
    if bytes.len() < 3 {
        return None;
    }
    let front = Piece::from_gn_letter(bytes[0] as char)?;
    let back = match bytes[1] {
        b'-' => None,
        byte => Some(Piece::from_gn_letter(byte as char)?),
    };

    let mut cursor = Cursor { bytes, pos: 2 };
    let mv = match cursor.bump()? {
        b'*' => {
            let (to, tier) = cursor.triple()?;
            GnMove::Drop {
                front,
                back,
                to,
                tier,
            }
        }
        sink @ (b'+' | b'^' | b'=') => {
            let (posn, tier) = cursor.triple()?;
            GnMove::Recover {
                front,
                back,
                posn,
                tier,
                sink: match sink {
                    b'+' => RecoverSink::ToSelf,
                    b'^' => RecoverSink::ToOpponent,
                    _ => RecoverSink::Decline,
                },
            }
        }
        b'<' => {
            let (from, from_tier) = cursor.triple()?;
            match cursor.bump()? {
                b'>' => {
                    let (to, to_tier) = cursor.triple()?;
                    GnMove::Move {
                        front,
                        back,
                        from,
                        from_tier,
                        to,
                        to_tier,
                        strike: false,
                    }
                }
                b'x' => {
                    let first = cursor.number()?;
                    if cursor.peek() == Some(b'-') {
                        cursor.expect(b'-')?;
                        let row = cursor.number().filter(|row| *row < BOARD_LENGTH)?;
                        cursor.expect(b'-')?;
                        let to_tier = cursor.tier()?;
                        if first >= BOARD_LENGTH {
                            return None;
                        }
                        GnMove::Move {
                            front,
                            back,
                            from,
                            from_tier,
                            to: Posn::new(first as i8, row as i8),
                            to_tier,
                            strike: true,
                        }
                    } else {
                        if first >= MAX_TOWER_SIZE {
                            return None;
                        }
                        GnMove::ImmobileStrike {
                            front,
                            back,
                            posn: from,
                            tier: from_tier,
                            target_tier: first,
                        }
                    }
                }
                b'&' => {
                    let first = cursor.number()?;
                    if cursor.peek() == Some(b'-') {
                        cursor.expect(b'-')?;
                        let row = cursor.number().filter(|row| *row < BOARD_LENGTH)?;
                        cursor.expect(b'-')?;
                        let to_tier = cursor.tier()?;
                        if first >= BOARD_LENGTH {
                            return None;
                        }
                        GnMove::Substitution {
                            front,
                            back,
                            from,
                            from_tier,
                            to: Posn::new(first as i8, row as i8),
                            to_tier,
                        }
                    } else {
                        if first >= MAX_TOWER_SIZE {
                            return None;
                        }
                        GnMove::TierExchange {
                            front,
                            back,
                            posn: from,
                            tier: from_tier,
                            target_tier: first,
                        }
                    }
                }
                _ => return None,
            }
        }
        _ => return None,
    };
    cursor.at_end().then_some(mv)
}

fn letters(front: Piece, back: Option<Piece>) -> (char, char) {
    (front.gn_letter(), back.map_or('-', Piece::gn_letter))
}

impl fmt::Display for GnMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            GnMove::Drop {
                front,
                back,
                to,
                tier,
            } => {
                let (f1, b1) = letters(front, back);
                write!(f, "{}{}*{}-{}-{}", f1, b1, to.col(), to.row(), tier)
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
                let (f1, b1) = letters(front, back);
                write!(
                    f,
                    "{}{}<{}-{}-{}{}{}-{}-{}",
                    f1,
                    b1,
                    from.col(),
                    from.row(),
                    from_tier,
                    if strike { 'x' } else { '>' },
                    to.col(),
                    to.row(),
                    to_tier
                )
            }
            GnMove::ImmobileStrike {
                front,
                back,
                posn,
                tier,
                target_tier,
            } => {
                let (f1, b1) = letters(front, back);
                write!(
                    f,
                    "{}{}<{}-{}-{}x{}",
                    f1,
                    b1,
                    posn.col(),
                    posn.row(),
                    tier,
                    target_tier
                )
            }
            GnMove::Recover {
                front,
                back,
                posn,
                tier,
                sink,
            } => {
                let (f1, b1) = letters(front, back);
                let glyph = match sink {
                    RecoverSink::ToSelf => '+',
                    RecoverSink::ToOpponent => '^',
                    RecoverSink::Decline => '=',
                };
                write!(f, "{}{}{}{}-{}-{}", f1, b1, glyph, posn.col(), posn.row(), tier)
            }
            GnMove::Substitution {
                front,
                back,
                from,
                from_tier,
                to,
                to_tier,
            } => {
                let (f1, b1) = letters(front, back);
                write!(
                    f,
                    "{}{}<{}-{}-{}&{}-{}-{}",
                    f1,
                    b1,
                    from.col(),
                    from.row(),
                    from_tier,
                    to.col(),
                    to.row(),
                    to_tier
                )
            }
            GnMove::TierExchange {
                front,
                back,
                posn,
                tier,
                target_tier,
            } => {
                let (f1, b1) = letters(front, back);
                write!(
                    f,
                    "{}{}<{}-{}-{}&{}",
                    f1,
                    b1,
                    posn.col(),
                    posn.row(),
                    tier,
                    target_tier
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Piece::*;

    #[test]
    fn test_parse_drop() {
        let mv: GnMove = "PZ*0-8-0".parse().unwrap();
        assert_eq!(
            mv,
            GnMove::Drop {
                front: Pawn,
                back: Some(Bronze),
                to: Posn::new(0, 8),
                tier: 0
            }
        );
    }

    #[test]
    fn test_parse_commander_drop_has_no_back() {
        let mv: GnMove = "O-*4-8-0".parse().unwrap();
        assert_eq!(
            mv,
            GnMove::Drop {
                front: Commander,
                back: None,
                to: Posn::new(4, 8),
                tier: 0
            }
        );
    }

    #[test]
    fn test_parse_move_and_strike() {
        let mv: GnMove = "PZ<0-8-0>0-7-0".parse().unwrap();
        assert!(matches!(mv, GnMove::Move { strike: false, .. }));
        let mv: GnMove = "PZ<0-8-0x0-7-0".parse().unwrap();
        assert!(matches!(mv, GnMove::Move { strike: true, .. }));
    }

    #[test]
    fn test_parse_immobile_strike() {
        let mv: GnMove = "SP<0-8-1x0".parse().unwrap();
        assert_eq!(
            mv,
            GnMove::ImmobileStrike {
                front: Samurai,
                back: Some(Pawn),
                posn: Posn::new(0, 8),
                tier: 1,
                target_tier: 0
            }
        );
    }

    #[test]
    fn test_parse_recovery_glyphs() {
        for (text, sink) in [
            ("PZ+0-7-0", RecoverSink::ToSelf),
            ("PZ^0-7-0", RecoverSink::ToOpponent),
            ("PZ=0-7-0", RecoverSink::Decline),
        ] {
            let mv: GnMove = text.parse().unwrap();
            assert!(matches!(mv, GnMove::Recover { sink: parsed, .. } if parsed == sink));
        }
    }

    #[test]
    fn test_parse_exchanges() {
        let mv: GnMove = "SP<0-8-1&0-7-0".parse().unwrap();
        assert!(matches!(mv, GnMove::Substitution { .. }));
        let mv: GnMove = "CI<0-8-0&2".parse().unwrap();
        assert_eq!(
            mv,
            GnMove::TierExchange {
                front: Captain,
                back: Some(Pistol),
                posn: Posn::new(0, 8),
                tier: 0,
                target_tier: 2
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in [
            "",
            "P",
            "PZ",
            "PZ*",
            "PZ*9-0-0",
            "PZ*0-9-0",
            "PZ*0-0-3",
            "PZ?0-0-0",
            "PZ<0-8-0>0-7",
            "PZ*0-0-0x",
            "QQ*0-0-0",
        ] {
            assert!(text.parse::<GnMove>().is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "PZ*0-8-0",
            "O-*4-8-0",
            "PZ<0-8-0>0-7-0",
            "PZ<0-8-0x0-7-0",
            "SP<0-8-1x0",
            "PZ+0-7-0",
            "PZ^0-7-0",
            "PZ=0-7-0",
            "SP<0-8-1&0-7-0",
            "CI<0-8-0&2",
        ] {
            let mv: GnMove = text.parse().unwrap();
            assert_eq!(mv.to_string(), text);
        }
    }
}
