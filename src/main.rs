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

//! Line-oriented demo front-end over the rules engine.
//!
//! Commands: `d <FfBb> <c-r>` drop, `m <c-r-t> <c-r>` move,
//! `i <c-r-t> <t>` immobile strike, `fr`/`nfr` answer a forced recovery,
//! `s <c-r-t> <c-r-t>` substitution, `t <c-r-t> <t>` 1-3 tier exchange,
//! `q`/`quit` leave.

use anyhow::{bail, Context, Result};
use clap::Parser;
use flexi_logger::Logger;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;

use gungi::board::{Colour, Exchange, Piece, Posn, Turn};
use gungi::game::GameResult;
use gungi::gn::{GameRecord, GnMetadata};

const EXIT_UNREADABLE_INPUT: i32 = 3;
const EXIT_MALFORMED_INPUT: i32 = 4;

#[derive(Parser, Debug)]
#[command(name = "gungi", version, about = "Play Gungi in the terminal")]
struct Options {
    /// Write the GN record of the session to this file on exit.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Replay a GN record before interactive play starts.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Location header for the record.
    #[arg(short, long)]
    location: Option<String>,

    /// Event header for the record.
    #[arg(short, long)]
    event: Option<String>,

    /// White player's name.
    #[arg(short, long)]
    white: Option<String>,

    /// Black player's name.
    #[arg(short, long)]
    black: Option<String>,

    /// Log level filter.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let options = Options::parse();
    let _logger = Logger::try_with_env_or_str(&options.log_level)
        .and_then(|logger| logger.log_to_stderr().start());

    let mut record = match load(&options) {
        Ok(record) => record,
        Err(code) => process::exit(code),
    };

    if let Err(err) = run(&mut record) {
        log::error!("fatal: {err}");
        process::exit(1);
    }

    if let Some(path) = &options.output {
        if let Err(err) = std::fs::write(path, record.to_gn()) {
            log::error!("cannot write {}: {err}", path.display());
            process::exit(EXIT_UNREADABLE_INPUT);
        }
        log::info!("record written to {}", path.display());
    }
}

fn load(options: &Options) -> std::result::Result<GameRecord, i32> {
    let mut record = if let Some(path) = &options.input {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                log::error!("cannot read {}: {err}", path.display());
                return Err(EXIT_UNREADABLE_INPUT);
            }
        };
        match GameRecord::from_gn(&text) {
            Ok(record) => record,
            Err(err) => {
                log::error!("malformed GN in {}: {err}", path.display());
                return Err(EXIT_MALFORMED_INPUT);
            }
        }
    } else {
        GameRecord::new(GnMetadata::new())
    };

    let md = record.metadata_mut();
    if let Some(event) = &options.event {
        md.set_event(event);
    }
    if let Some(location) = &options.location {
        md.set_location(location);
    }
    if let Some(white) = &options.white {
        md.set_white(white);
    }
    if let Some(black) = &options.black {
        md.set_black(black);
    }
    Ok(record)
}

fn run(record: &mut GameRecord) -> Result<()> {
    print_board(record);
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "q" || line == "quit" {
            break;
        }
        match dispatch(record, line) {
            Ok(()) => print_board(record),
            Err(err) => println!("{err}"),
        }
        if record.controller().is_over() {
            match GameResult::of(record.controller()) {
                Some(GameResult::Win(colour, _)) => println!("{colour} wins by checkmate."),
                Some(GameResult::Draw(_)) => println!("Drawn by repetition."),
                None => {}
            }
            break;
        }
    }
    Ok(())
}

fn dispatch(record: &mut GameRecord, line: &str) -> Result<()> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let mut arg = || parts.next().context("missing argument");
    match command {
        "d" => {
            let (front, back) = parse_code(arg()?)?;
            let to = parse_square(arg()?)?;
            record.drop_unit(front, back, to)?;
        }
        "m" => {
            let (from, tier) = parse_cell(arg()?)?;
            let to = parse_square(arg()?)?;
            record.move_unit(from, tier, to)?;
        }
        "i" => {
            let (posn, tier) = parse_cell(arg()?)?;
            let target: usize = arg()?.parse().context("bad tier")?;
            record.immobile_strike(posn, tier, target)?;
        }
        "fr" => record.force_recover(true)?,
        "nfr" => record.force_recover(false)?,
        "s" => {
            let (from, from_tier) = parse_cell(arg()?)?;
            let (to, to_tier) = parse_cell(arg()?)?;
            record.exchange_units(Exchange::Substitution, from, from_tier, to, to_tier)?;
        }
        "t" => {
            let (from, from_tier) = parse_cell(arg()?)?;
            let target: usize = arg()?.parse().context("bad tier")?;
            record.exchange_units(Exchange::Tier13, from, from_tier, from, target)?;
        }
        _ => bail!("unknown command `{command}`"),
    }
    Ok(())
}

/// `<Ff><Bb>` unit code, `-` standing in for no back.
fn parse_code(code: &str) -> Result<(Piece, Option<Piece>)> {
    let mut chars = code.chars();
    let (Some(front), Some(back), None) = (chars.next(), chars.next(), chars.next()) else {
        bail!("bad unit code `{code}`");
    };
    let front = Piece::from_gn_letter(front).with_context(|| format!("bad unit code `{code}`"))?;
    let back = match back {
        '-' => None,
        ch => Some(Piece::from_gn_letter(ch).with_context(|| format!("bad unit code `{code}`"))?),
    };
    Ok((front, back))
}

/// `c-r` board square.
fn parse_square(text: &str) -> Result<Posn> {
    let mut parts = text.split('-');
    let (Some(col), Some(row), None) = (parts.next(), parts.next(), parts.next()) else {
        bail!("bad square `{text}`");
    };
    let posn = Posn::new(
        col.parse().with_context(|| format!("bad square `{text}`"))?,
        row.parse().with_context(|| format!("bad square `{text}`"))?,
    );
    if !posn.is_valid() {
        bail!("square `{text}` is off the board");
    }
    Ok(posn)
}

/// `c-r-t` board cell.
fn parse_cell(text: &str) -> Result<(Posn, usize)> {
    let mut parts = text.split('-');
    let (Some(col), Some(row), Some(tier), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("bad cell `{text}`");
    };
    let posn = Posn::new(
        col.parse().with_context(|| format!("bad cell `{text}`"))?,
        row.parse().with_context(|| format!("bad cell `{text}`"))?,
    );
    if !posn.is_valid() {
        bail!("cell `{text}` is off the board");
    }
    Ok((posn, tier.parse().with_context(|| format!("bad cell `{text}`"))?))
}

fn print_board(record: &GameRecord) {
    let controller = record.controller();
    println!("{controller}");
    for colour in [Colour::Black, Colour::White] {
        println!("{colour}'s Hand:");
        let hand = controller.player(colour).inactive_units(controller.units());
        for (index, id) in hand.iter().enumerate() {
            if index > 0 && index % 5 == 0 {
                println!();
            }
            print!("{:<18}", controller.unit(*id).code());
        }
        println!();
        println!();
    }
    let turn = controller.turn();
    if controller.is_forced_recovery() {
        println!("{turn} must answer the forced recovery (fr/nfr).");
    } else if controller.is_in_check() {
        println!("{turn} to move, in check.");
    } else {
        println!("{turn} to move.");
    }
}
