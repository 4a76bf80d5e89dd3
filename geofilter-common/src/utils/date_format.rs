// Copyright 2025 The GeoFilter Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Date formats written with moment.js style tokens (`DD.MM.YYYY`, `YYYY-MM-DDTHH:mm:ss`).
//!
//! Layer configurations describe date attributes with these tokens; this module translates them
//! into chrono format strings once and parses values with the result.

use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Ordered so that longer tokens win over their prefixes.
const TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%m"),
    ("DD", "%d"),
    ("D", "%d"),
    ("HH", "%H"),
    ("H", "%H"),
    ("hh", "%I"),
    ("h", "%I"),
    ("mm", "%M"),
    ("m", "%M"),
    ("ss", "%S"),
    ("s", "%S"),
    ("SSS", "%3f"),
    ("A", "%p"),
    ("a", "%p"),
    ("ZZ", "%z"),
    ("Z", "%:z"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    moment: String,
    pattern: String,
    has_year: bool,
    has_month: bool,
    has_day: bool,
    has_time: bool,
}

impl DateFormat {
    pub fn new(moment_format: &str) -> Self {
        let mut pattern = String::with_capacity(moment_format.len() * 2);
        let (mut has_year, mut has_month, mut has_day, mut has_time) = (false, false, false, false);
        let mut rest = moment_format;

        'outer: while !rest.is_empty() {
            if let Some(stripped) = rest.strip_prefix('[') {
                // [literal] escapes
                let end = stripped.find(']').unwrap_or(stripped.len());
                push_literal(&mut pattern, &stripped[..end]);
                rest = stripped.get(end + 1..).unwrap_or("");
                continue;
            }
            for (token, replacement) in TOKENS {
                if let Some(stripped) = rest.strip_prefix(token) {
                    pattern.push_str(replacement);
                    match token.as_bytes()[0] {
                        b'Y' => has_year = true,
                        b'M' => has_month = true,
                        b'D' => has_day = true,
                        b'H' | b'h' | b'm' | b's' | b'S' => has_time = true,
                        _ => {}
                    }
                    rest = stripped;
                    continue 'outer;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                push_literal(&mut pattern, c.encode_utf8(&mut [0u8; 4]));
            }
            rest = chars.as_str();
        }

        DateFormat {
            moment: moment_format.to_string(),
            pattern,
            has_year,
            has_month,
            has_day,
            has_time,
        }
    }

    /// The original moment style format.
    pub fn as_str(&self) -> &str {
        &self.moment
    }

    /// The chrono format string equivalent.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn has_time(&self) -> bool {
        self.has_time
    }

    /// Whether values in this format are already ISO-8601 (`YYYY-MM-DD` with an optional time).
    pub fn is_iso8601(&self) -> bool {
        match self.moment.strip_prefix("YYYY-MM-DD") {
            Some("") => true,
            Some(rest) => rest.starts_with('T') || rest.starts_with(' '),
            None => false,
        }
    }

    /// Parses a value, filling absent calendar fields with their first value.
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let mut pattern = self.pattern.clone();
        let mut input = value.trim().to_string();
        if !self.has_year {
            pattern.push_str(" %Y");
            input.push_str(" 1970");
        }
        if !self.has_month {
            pattern.push_str(" %m");
            input.push_str(" 01");
        }
        if !self.has_day {
            pattern.push_str(" %d");
            input.push_str(" 01");
        }
        if self.has_time {
            NaiveDateTime::parse_from_str(&input, &pattern).ok()
        } else {
            NaiveDate::parse_from_str(&input, &pattern)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        }
    }

    /// Rewrites a value into ISO-8601, `None` when it does not match this format.
    pub fn to_iso(&self, value: &str) -> Option<String> {
        let parsed = self.parse(value)?;
        let iso = if self.has_time {
            parsed.format("%Y-%m-%dT%H:%M:%S").to_string()
        } else {
            parsed.format("%Y-%m-%d").to_string()
        };
        Some(iso)
    }
}

fn push_literal(pattern: &mut String, literal: &str) {
    for c in literal.chars() {
        if c == '%' {
            pattern.push_str("%%");
        } else {
            pattern.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_german_date_format() {
        let format = DateFormat::new("DD.MM.YYYY");
        assert_eq!(format.pattern(), "%d.%m.%Y");
        assert!(!format.has_time());
        assert!(!format.is_iso8601());
    }

    #[test]
    fn parses_date_only_values() {
        let format = DateFormat::new("DD.MM.YYYY");
        let parsed = format.parse("01.02.2022").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2022-02-01");
        assert!(format.parse("2022-02-01").is_none());
    }

    #[test]
    fn parses_values_with_time() {
        let format = DateFormat::new("YYYY-MM-DDTHH:mm:ss");
        assert!(format.is_iso8601());
        let parsed = format.parse("2021-06-15T08:30:00").unwrap();
        assert_eq!(parsed.format("%H:%M").to_string(), "08:30");
    }

    #[test]
    fn fills_missing_calendar_fields() {
        let format = DateFormat::new("YYYY");
        let parsed = format.parse("1999").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "1999-01-01");
    }

    #[test]
    fn bracket_literals_are_kept() {
        let format = DateFormat::new("YYYY-MM-DD[T]HH:mm");
        assert_eq!(format.pattern(), "%Y-%m-%dT%H:%M");
    }

    #[test]
    fn converts_to_iso() {
        let format = DateFormat::new("DD.MM.YYYY");
        assert_eq!(format.to_iso("24.12.2020").as_deref(), Some("2020-12-24"));
        assert_eq!(format.to_iso("garbage"), None);
    }
}
