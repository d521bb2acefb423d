//! Strict date validation for values read back from the spreadsheet
//!
//! A candidate is accepted only when it matches the configured pattern
//! exactly (anchored, two-digit day and month, four-digit year) AND the
//! three components name a real calendar day. `31/02/2024` matches the
//! pattern but is rejected.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Order of the day, month and year fields in a textual date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    /// `DD/MM/YYYY`
    #[default]
    DayMonthYear,
    /// `MM/DD/YYYY`
    MonthDayYear,
    /// `YYYY-MM-DD`
    YearMonthDay,
}

/// A calendar-valid date extracted from a clipboard sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateToken {
    date: NaiveDate,
}

impl DateToken {
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn as_naive_date(&self) -> NaiveDate {
        self.date
    }
}

impl From<NaiveDate> for DateToken {
    fn from(date: NaiveDate) -> Self {
        Self { date }
    }
}

/// Textual date format, e.g. `DD/MM/YYYY`
///
/// The spreadsheet renders dates according to its locale, so the format is
/// configuration rather than a constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateFormat {
    order: DateOrder,
    separator: char,
    pattern: Regex,
}

impl DateFormat {
    pub fn new(order: DateOrder, separator: char) -> Result<Self> {
        if separator.is_ascii_alphanumeric() || separator.is_whitespace() {
            return Err(Error::InvalidDateFormat(format!(
                "separator {:?} is not a punctuation character",
                separator
            )));
        }

        let sep = regex::escape(&separator.to_string());
        let (first, second, third) = match order {
            DateOrder::DayMonthYear | DateOrder::MonthDayYear => (2, 2, 4),
            DateOrder::YearMonthDay => (4, 2, 2),
        };
        let pattern = Regex::new(&format!(
            r"^([0-9]{{{first}}}){sep}([0-9]{{{second}}}){sep}([0-9]{{{third}}})$"
        ))
        .map_err(|e| Error::InvalidDateFormat(e.to_string()))?;

        Ok(Self {
            order,
            separator,
            pattern,
        })
    }

    pub fn order(&self) -> DateOrder {
        self.order
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Returns true when `candidate` is a well-formed, real calendar date.
    ///
    /// The caller is expected to have trimmed surrounding whitespace.
    pub fn validate(&self, candidate: &str) -> bool {
        self.parse(candidate).is_some()
    }

    /// Parse `candidate` into a [`DateToken`], or `None` if it is malformed
    /// or names a day that does not exist.
    pub fn parse(&self, candidate: &str) -> Option<DateToken> {
        let caps = self.pattern.captures(candidate)?;
        let field = |i: usize| caps.get(i).map(|m| m.as_str());

        let (day, month, year) = match self.order {
            DateOrder::DayMonthYear => (field(1)?, field(2)?, field(3)?),
            DateOrder::MonthDayYear => (field(2)?, field(1)?, field(3)?),
            DateOrder::YearMonthDay => (field(3)?, field(2)?, field(1)?),
        };

        let day: u32 = day.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        let year: i32 = year.parse().ok()?;

        // There is no year zero in the civil calendar.
        if year < 1 {
            return None;
        }

        // from_ymd_opt refuses day 0, month 13, Feb 29 outside leap years etc.
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(DateToken { date })
    }

    /// Render a date the way this format expects to read it back.
    pub fn format_date(&self, date: NaiveDate) -> String {
        let sep = self.separator;
        match self.order {
            DateOrder::DayMonthYear => format!(
                "{:02}{sep}{:02}{sep}{:04}",
                date.day(),
                date.month(),
                date.year()
            ),
            DateOrder::MonthDayYear => format!(
                "{:02}{sep}{:02}{sep}{:04}",
                date.month(),
                date.day(),
                date.year()
            ),
            DateOrder::YearMonthDay => format!(
                "{:04}{sep}{:02}{sep}{:02}",
                date.year(),
                date.month(),
                date.day()
            ),
        }
    }

    pub fn format_token(&self, token: &DateToken) -> String {
        self.format_date(token.as_naive_date())
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            order: DateOrder::DayMonthYear,
            separator: '/',
            pattern: Regex::new(r"^([0-9]{2})/([0-9]{2})/([0-9]{4})$")
                .expect("static date pattern compiles"),
        }
    }
}

impl PartialEq for DateFormat {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.separator == other.separator
    }
}

impl Eq for DateFormat {}

impl FromStr for DateFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let separator = upper
            .chars()
            .find(|c| !c.is_ascii_alphanumeric())
            .ok_or_else(|| Error::InvalidDateFormat(s.to_string()))?;

        let fields: Vec<&str> = upper.split(separator).collect();
        let order = match fields.as_slice() {
            ["DD", "MM", "YYYY"] => DateOrder::DayMonthYear,
            ["MM", "DD", "YYYY"] => DateOrder::MonthDayYear,
            ["YYYY", "MM", "DD"] => DateOrder::YearMonthDay,
            _ => return Err(Error::InvalidDateFormat(s.to_string())),
        };

        Self::new(order, separator)
    }
}

impl TryFrom<String> for DateFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DateFormat> for String {
    fn from(format: DateFormat) -> Self {
        format.to_string()
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = self.separator;
        match self.order {
            DateOrder::DayMonthYear => write!(f, "DD{sep}MM{sep}YYYY"),
            DateOrder::MonthDayYear => write!(f, "MM{sep}DD{sep}YYYY"),
            DateOrder::YearMonthDay => write!(f, "YYYY{sep}MM{sep}DD"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("05/03/2025" ; "ordinary date")]
    #[test_case("29/02/2024" ; "leap day in leap year")]
    #[test_case("29/02/2000" ; "leap day in 400 year")]
    #[test_case("31/12/1999" ; "last day of year")]
    #[test_case("01/01/2025" ; "first day of year")]
    #[test_case("30/04/2025" ; "last day of april")]
    fn accepts_real_dates(candidate: &str) {
        assert!(DateFormat::default().validate(candidate));
    }

    #[test_case("31/02/2024" ; "february has 29 days in 2024")]
    #[test_case("29/02/2023" ; "february 29 in common year 2023")]
    #[test_case("29/02/1900" ; "february 29 in century year 1900")]
    #[test_case("00/01/2024" ; "day zero")]
    #[test_case("13/13/2024" ; "month thirteen")]
    #[test_case("12/00/2025" ; "month zero")]
    #[test_case("31/04/2025" ; "april has 30 days")]
    #[test_case("01/01/0000" ; "year zero")]
    fn rejects_impossible_dates(candidate: &str) {
        assert!(!DateFormat::default().validate(candidate));
    }

    #[test_case("" ; "empty")]
    #[test_case("5/3/2025" ; "single digit fields")]
    #[test_case("05/03/25" ; "two digit year")]
    #[test_case("05-03-2025" ; "wrong separator")]
    #[test_case("x05/03/2025" ; "leading garbage")]
    #[test_case("05/03/2025 " ; "trailing space")]
    #[test_case("Date: 05/03/2025" ; "embedded in longer text")]
    #[test_case("05/03/20251" ; "five digit year")]
    #[test_case("=TODAY()" ; "formula text")]
    #[test_case("٠٥/٠٣/٢٠٢٥" ; "non ascii digits")]
    fn rejects_malformed_text(candidate: &str) {
        assert!(!DateFormat::default().validate(candidate));
    }

    #[test]
    fn parse_extracts_components() {
        let token = DateFormat::default().parse("05/03/2025").unwrap();
        assert_eq!(token.day(), 5);
        assert_eq!(token.month(), 3);
        assert_eq!(token.year(), 2025);
    }

    #[test]
    fn month_first_format_swaps_fields() {
        let format: DateFormat = "MM/DD/YYYY".parse().unwrap();
        assert!(format.validate("02/29/2024"));
        assert!(!format.validate("29/02/2024"));
        assert_eq!(format.parse("03/05/2025").unwrap().day(), 5);
    }

    #[test]
    fn iso_format_uses_dash_separator() {
        let format: DateFormat = "yyyy-mm-dd".parse().unwrap();
        assert_eq!(format.separator(), '-');
        assert!(format.validate("2024-02-29"));
        assert!(!format.validate("2023-02-29"));
        assert!(!format.validate("29-02-2024"));
    }

    #[test]
    fn rejects_unknown_patterns() {
        assert!("DD/MM/YY".parse::<DateFormat>().is_err());
        assert!("DDMMYYYY".parse::<DateFormat>().is_err());
        assert!("DD/MM-YYYY".parse::<DateFormat>().is_err());
    }

    #[test]
    fn formatting_pads_fields() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(DateFormat::default().format_date(date), "05/03/2025");

        let iso: DateFormat = "YYYY-MM-DD".parse().unwrap();
        assert_eq!(iso.format_date(date), "2025-03-05");
    }

    #[test]
    fn token_from_date_formats_like_the_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let token = DateToken::from(date);
        let format = DateFormat::default();

        assert_eq!(token.as_naive_date(), date);
        assert_eq!(format.format_token(&token), format.format_date(date));
        assert_eq!(format.parse("29/02/2024"), Some(token));
    }

    #[test]
    fn formatted_today_is_always_valid() {
        let today = chrono::Local::now().date_naive();
        let format = DateFormat::default();
        assert!(format.validate(&format.format_date(today)));
    }

    #[test]
    fn display_matches_parsed_pattern() {
        let format: DateFormat = "mm.dd.yyyy".parse().unwrap();
        assert_eq!(format.to_string(), "MM.DD.YYYY");
        assert_eq!(DateFormat::default().to_string(), "DD/MM/YYYY");
    }
}
