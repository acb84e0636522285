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

//! Rule engine and notation codec for Gungi, the 9x9 stacking board game.
//!
//! The [`board`] module is the rules core: the towers, the piece catalogue,
//! legality of every action, check, checkmate and draw detection.  The
//! [`gn`] module encodes and decodes Gungi Notation game records.  The
//! [`game`] module holds session-level plumbing: identifiers, results, and
//! a registry for embedding many games behind numeric handles.

pub mod board;
pub mod game;
pub mod gn;

pub use board::*;
pub use game::{DrawReason, GameId, GameResult, Registry, WinReason};
pub use gn::{GameRecord, GnError, GnMetadata, GnMove};
