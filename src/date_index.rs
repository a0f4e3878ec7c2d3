//! Calendar arithmetic for the cache window.
//!
//! Days in the window are addressed by their offset from the first day, which is also their
//! index along the day axis of the rainfall grid.

use crate::error::Arc2Error;

use chrono::{Days, NaiveDate};
use std::ops::Range;

/// Date format used by the archive file names, the API and the text output.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Parse an 8-digit `YYYYMMDD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
}

/// Format a date as `YYYYMMDD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Maps calendar dates in `[start, end]` to contiguous offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DateIndex {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateIndex {
    /// Returns a new DateIndex covering `start` to `end` inclusive.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, Arc2Error> {
        if end < start {
            return Err(Arc2Error::InvalidWindow {
                reason: format!(
                    "end {} is before start {}",
                    format_date(end),
                    format_date(start)
                ),
            });
        }
        Ok(Self { start, end })
    }

    /// First day of the window.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the window.
    pub fn len(&self) -> usize {
        self.distance(self.end) + 1
    }

    /// A window always holds at least one day.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the offset of `date` from the start of the window.
    pub fn offset_of(&self, date: NaiveDate) -> Result<usize, Arc2Error> {
        if date < self.start || date > self.end {
            return Err(Arc2Error::OutOfWindow {
                date,
                start: self.start,
                end: self.end,
            });
        }
        Ok(self.distance(date))
    }

    /// Returns the date at `offset`. Offsets past the end of the window are not checked.
    pub fn date_at(&self, offset: usize) -> NaiveDate {
        self.start + Days::new(offset as u64)
    }

    /// Returns the offsets of the `days` days starting at `start`.
    ///
    /// The range is clamped to the end of the window and, if given, stops before `limit`.
    /// `start` itself must lie inside the window.
    ///
    /// # Arguments
    ///
    /// * `start`: First requested day
    /// * `days`: Number of requested days
    /// * `limit`: Optional first day that must not be included
    pub fn span(
        &self,
        start: NaiveDate,
        days: u32,
        limit: Option<NaiveDate>,
    ) -> Result<Range<usize>, Arc2Error> {
        let first = self.offset_of(start)?;
        let mut last = std::cmp::min(first.saturating_add(days as usize), self.len());
        if let Some(limit) = limit {
            let limit = if limit <= self.start {
                0
            } else {
                self.distance(limit)
            };
            last = std::cmp::min(last, limit);
        }
        Ok(first..std::cmp::max(first, last))
    }

    fn distance(&self, date: NaiveDate) -> usize {
        (date - self.start).num_days() as usize
    }
}
