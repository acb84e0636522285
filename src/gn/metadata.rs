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
use std::fmt::Write;

use super::GnError;
use crate::board::{Colour, Controller};

/// Header metadata of a GN record.  None of it affects play; the `Result`
/// entry is never stored because the encoder derives it from the live game.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GnMetadata {
    event: String,
    date: String,
    location: String,
    white: String,
    black: String,
}

impl GnMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn white(&self) -> &str {
        &self.white
    }

    pub fn black(&self) -> &str {
        &self.black
    }

    pub fn set_event(&mut self, event: &str) {
        self.event = event.to_string();
    }

    /// The date must read `YYYY.MM.DD` with `month <= 12` and `day <= 31`;
    /// no further calendar validation is applied.  An empty date stands for
    /// "not recorded".
    pub fn set_date(&mut self, date: &str) -> Result<(), GnError> {
        if date.is_empty() {
            self.date.clear();
            return Ok(());
        }
        let bad = || GnError::BadDate(date.to_string());
        let mut parts = date.split('.');
        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };
        let year: u32 = year.parse().map_err(|_| bad())?;
        let month: u32 = month.parse().map_err(|_| bad())?;
        let day: u32 = day.parse().map_err(|_| bad())?;
        let _ = year;
        if month > 12 || day > 31 {
            return Err(bad());
        }
        self.date = date.to_string();
        Ok(())
    }

    pub fn set_location(&mut self, location: &str) {
        self.location = location.to_string();
    }

    pub fn set_white(&mut self, name: &str) {
        self.white = name.to_string();
    }

    pub fn set_black(&mut self, name: &str) {
        self.black = name.to_string();
    }

    /// The header block, with the result taken from the game itself: `*`
    /// in progress, `1/2 - 1/2` drawn, `1 - 0` a Black win, `0 - 1` a White
    /// win.
    pub fn header(&self, controller: &Controller) -> String {
        let mut header = String::new();
        let pairs = [
            ("Event", &self.event),
            ("Date", &self.date),
            ("Location", &self.location),
            ("White", &self.white),
            ("Black", &self.black),
        ];
        for (name, value) in pairs {
            let _ = writeln!(header, "[{} \"{}\"]", name, value);
        }
        let result = if !controller.is_over() {
            "*"
        } else if controller.is_draw() {
            "1/2 - 1/2"
        } else if controller.winner() == Some(Colour::Black) {
            "1 - 0"
        } else {
            "0 - 1"
        };
        let _ = writeln!(header, "[Result \"{}\"]", result);
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_validation() {
        let mut md = GnMetadata::new();
        md.set_date("2013.10.30").unwrap();
        assert_eq!(md.date(), "2013.10.30");
        assert!(md.set_date("2013.13.01").is_err());
        assert!(md.set_date("2013.01.32").is_err());
        assert!(md.set_date("yesterday").is_err());
        assert!(md.set_date("2013.10").is_err());
        // Rejected dates leave the stored value alone.
        assert_eq!(md.date(), "2013.10.30");
    }

    #[test]
    fn test_header_reports_live_result() {
        let controller = Controller::new();
        let mut md = GnMetadata::new();
        md.set_event("Selection");
        md.set_white("Komugi");
        md.set_black("Meruem");
        let header = md.header(&controller);
        assert!(header.contains("[Event \"Selection\"]"));
        assert!(header.contains("[White \"Komugi\"]"));
        assert!(header.contains("[Black \"Meruem\"]"));
        assert!(header.contains("[Result \"*\"]"));
    }
}
