use crate::domain::NormalizedInstant;
use chrono::{Datelike, Duration, Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

const MONTHS_EN: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const MONTHS_RU: [&str; 12] = [
    "янв", "фев", "мар", "апр", "май", "июн", "июл", "авг", "сен", "окт", "ноя", "дек",
];

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)([0-9]+)\s([a-zа-я]{3}),?\s*([0-9]+:[0-9]+)?")
            .expect("date pattern is a valid regex")
    })
}

/// Zero-based month index for an English or Russian three-letter abbreviation
pub fn month_index(token: &str) -> Option<u32> {
    let token = token.to_lowercase();
    MONTHS_EN
        .iter()
        .position(|m| *m == token)
        .or_else(|| MONTHS_RU.iter().position(|m| *m == token))
        .map(|i| i as u32)
}

/// Parses post timestamps such as "5 Jan, 10:30" or "12 окт" into instants.
///
/// The text never carries a year; every instant is placed in `year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTextParser {
    year: i32,
}

impl DateTextParser {
    pub fn with_year(year: i32) -> Self {
        Self { year }
    }

    /// Parser for the current local calendar year
    pub fn current_year() -> Self {
        Self::with_year(Local::now().year())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Finds the first `<day> <month>[,] [<hh>:<mm>]` in `text`.
    /// Returns `None` when nothing matches or the month is unknown.
    ///
    /// Day, hour and minute overflow into the following units the way a
    /// calendar normalizes them: "29 feb" in a non-leap year is 1 March,
    /// "0 mar" is the last day of February and "25:00" is 01:00 next day.
    pub fn parse(&self, text: &str) -> Option<NormalizedInstant> {
        let caps = date_pattern().captures(text)?;

        let day: i64 = caps[1].parse().ok()?;
        let month = match month_index(&caps[2]) {
            Some(month) => month,
            None => {
                tracing::warn!(text, month = &caps[2], "unknown month in date text");
                return None;
            }
        };

        let (hour, minute) = match caps.get(3) {
            Some(time) => {
                let (h, m) = time.as_str().split_once(':')?;
                (h.parse::<i64>().ok()?, m.parse::<i64>().ok()?)
            }
            None => (0, 0),
        };

        let offset = Duration::try_days(day - 1)?
            .checked_add(&Duration::try_hours(hour)?)?
            .checked_add(&Duration::try_minutes(minute)?)?;
        NaiveDate::from_ymd_opt(self.year, month + 1, 1)?
            .and_hms_opt(0, 0, 0)?
            .checked_add_signed(offset)
    }

    /// Parses every text, dropping the ones that yield no instant
    pub fn parse_all<'a, I>(&self, texts: I) -> Vec<NormalizedInstant>
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts
            .into_iter()
            .filter_map(|text| match self.parse(text) {
                Some(instant) => {
                    tracing::debug!(text, %instant, "parsed post date");
                    Some(instant)
                }
                None => {
                    tracing::warn!(text, "could not parse post date");
                    None
                }
            })
            .collect()
    }
}
