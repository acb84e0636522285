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

//! Gungi Notation (GN).
//!
//! GN is a textual game record: a header of `[Name "value"]` entries
//! followed by movetext grouped by move number, with `# …` and `( … )`
//! comments permitted between entries and between moves.
//!
//! ```text
//! [Event "Selection"]
//! [Date "2013.10.30"]
//! [Location "NGL, Mitene Union"]
//! [White "Komugi"]
//! [Black "Meruem"]
//! [Result "*"]
//! # King's Selection match between Komugi and Meruem
//! 1. PZ*0-8-0 2... PZ*0-0-0 3. PZ*8-8-0 4... PZ*1-1-0
//! ```
//!
//! The decoder replays a record against a controller, verifying each token
//! against the board before dispatching it; the [`GameRecord`] wrapper
//! produces the inverse, appending the canonical token for every action it
//! applies.

use thiserror::Error;

use crate::board;

pub mod decode;
pub mod metadata;
pub mod moves;
pub mod record;

pub use decode::{apply_move, decode, decode_move};
pub use metadata::GnMetadata;
pub use moves::{GnMove, RecoverSink};
pub use record::GameRecord;

/// Reasons a GN document or token fails to decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GnError {
    #[error("malformed header entry")]
    MalformedHeader,
    #[error("unknown header name `{0}`")]
    UnknownHeader(String),
    #[error("malformed date `{0}`")]
    BadDate(String),
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("malformed move token `{0}`")]
    MalformedMove(String),
    #[error("move number out of sequence")]
    OutOfSequence,
    #[error("turn indicator does not match the side to move")]
    WrongTurn,
    #[error("movetext does not match the board")]
    BoardMismatch,
    #[error("rejected by the rules: {0}")]
    Rejected(#[from] board::Error),
}
