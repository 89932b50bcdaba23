//! Dates, cycles, and forecast hours as the archive names them.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::ArchiveErr;

/// Format used for a processing date (PDY).
pub const PDY_FORMAT: &str = "%Y%m%d";

/// Parse an 8 digit YYYYMMDD date.
pub fn parse_pdy(value: &str) -> Result<NaiveDate, ArchiveErr> {
    let bad = || ArchiveErr::InvalidDate {
        value: value.to_owned(),
        expected: "8 digits, YYYYMMDD",
    };

    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    NaiveDate::parse_from_str(value, PDY_FORMAT).map_err(|_| bad())
}

/// Format a date as YYYYMMDD.
pub fn pdy(date: NaiveDate) -> String {
    date.format(PDY_FORMAT).to_string()
}

/// Format a date as YYYYjjj, the year and day of year.
pub fn julian(date: NaiveDate) -> String {
    date.format("%Y%j").to_string()
}

/// Two digit, zero padded forecast hour. Hours past 99 keep all their digits.
pub fn fhr2(fhr: u32) -> String {
    format!("{:02}", fhr)
}

/// Three digit, zero padded forecast hour.
pub fn fhr3(fhr: u32) -> String {
    format!("{:03}", fhr)
}

/// Parse a cycle hour like `00` or `6`.
pub fn parse_cycle(value: &str) -> Result<u32, ArchiveErr> {
    value
        .parse::<u32>()
        .ok()
        .filter(|hour| *hour < 24)
        .ok_or_else(|| ArchiveErr::InvalidNumber {
            flag: "cycle",
            value: value.to_owned(),
        })
}

/// The anchor date and the seven days before it.
///
/// Every fetch run walks this window, so data that shows up late is picked up by the next
/// scheduled run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    anchor: NaiveDate,
}

impl DateWindow {
    /// Number of days looked back past the anchor.
    pub const DAYS_BACK: i64 = 7;

    /// Create a window ending on `anchor`.
    pub fn new(anchor: NaiveDate) -> Self {
        DateWindow { anchor }
    }

    /// Create a window from a YYYYMMDD string.
    pub fn parse(anchor: &str) -> Result<Self, ArchiveErr> {
        parse_pdy(anchor).map(DateWindow::new)
    }

    /// The anchor date.
    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// The date `days` before the anchor.
    pub fn days_back(&self, days: i64) -> NaiveDate {
        self.anchor - Duration::days(days)
    }

    /// The anchor first, then each earlier day.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let anchor = self.anchor;
        (0..=Self::DAYS_BACK).map(move |days| anchor - Duration::days(days))
    }
}

/// A model initialization: a processing date and a cycle hour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleDate {
    date: NaiveDate,
    cycle: u32,
}

impl CycleDate {
    /// Create a cycle date. The cycle must be an hour of the day.
    pub fn new(date: NaiveDate, cycle: u32) -> Result<Self, ArchiveErr> {
        if cycle >= 24 {
            return Err(ArchiveErr::InvalidNumber {
                flag: "cycle",
                value: cycle.to_string(),
            });
        }
        Ok(CycleDate { date, cycle })
    }

    /// The processing date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The cycle hour.
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// YYYYMMDD
    pub fn pdy(&self) -> String {
        pdy(self.date)
    }

    /// HH
    pub fn cyc(&self) -> String {
        format!("{:02}", self.cycle)
    }

    /// YYYYMMDDHH
    pub fn cdate(&self) -> String {
        format!("{}{:02}", pdy(self.date), self.cycle)
    }

    /// Initialization time.
    pub fn init_time(&self) -> NaiveDateTime {
        self.date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.cycle))
    }

    /// Valid time of forecast hour `fhr`.
    pub fn valid_time(&self, fhr: u32) -> NaiveDateTime {
        self.init_time() + Duration::hours(i64::from(fhr))
    }

    /// Valid time of forecast hour `fhr` as YYYYMMDDHH.
    pub fn valid_cdate(&self, fhr: u32) -> String {
        self.valid_time(fhr).format("%Y%m%d%H").to_string()
    }
}

impl fmt::Display for CycleDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.cdate())
    }
}

/// A calendar month, displayed as YYYYMM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    /// Parse a 6 digit YYYYMM string.
    pub fn parse(value: &str) -> Result<Self, ArchiveErr> {
        let bad = || ArchiveErr::InvalidDate {
            value: value.to_owned(),
            expected: "6 digits, YYYYMM",
        };

        if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        NaiveDate::parse_from_str(&format!("{}01", value), PDY_FORMAT)
            .map(|first| YearMonth { first })
            .map_err(|_| bad())
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        YearMonth {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    /// Year
    pub fn year(&self) -> i32 {
        self.first.year()
    }

    /// Every day of the month in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let first = self.first;
        first
            .iter_days()
            .take_while(move |day| day.month() == first.month())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.first.format("%Y%m"))
    }
}

/// Parse a 4 digit year.
pub fn parse_year(value: &str) -> Result<i32, ArchiveErr> {
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ArchiveErr::InvalidDate {
            value: value.to_owned(),
            expected: "4 digits, YYYY",
        });
    }
    value.parse().map_err(|_| ArchiveErr::InvalidDate {
        value: value.to_owned(),
        expected: "4 digits, YYYY",
    })
}

/// A range of forecast hours, both ends inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForecastHours {
    min: u32,
    max: u32,
    inc: u32,
}

impl ForecastHours {
    /// Create a range. The increment must be positive.
    pub fn new(min: u32, max: u32, inc: u32) -> Result<Self, ArchiveErr> {
        if inc == 0 {
            return Err(ArchiveErr::InvalidNumber {
                flag: "fhrinc",
                value: inc.to_string(),
            });
        }
        Ok(ForecastHours { min, max, inc })
    }

    /// First hour.
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Last hour.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Step between hours.
    pub fn inc(&self) -> u32 {
        self.inc
    }

    /// Same range with a different last hour.
    pub fn with_max(self, max: u32) -> Self {
        ForecastHours { max, ..self }
    }

    /// Hours from `min` to `max` stepping by `inc`.
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        let inc = self.inc;
        self.iter_with(move |_| inc)
    }

    /// Hours from `min` to `max` where `step` gives the distance to the next hour.
    pub fn iter_with(&self, step: impl Fn(u32) -> u32) -> impl Iterator<Item = u32> {
        let max = self.max;
        std::iter::successors(Some(self.min), move |fhr| fhr.checked_add(step(*fhr).max(1)))
            .take_while(move |fhr| *fhr <= max)
    }
}
