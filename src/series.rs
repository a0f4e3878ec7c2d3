//! Text rendering of rainfall series and cache status listings.

use crate::date_index::format_date;

use chrono::NaiveDate;
use std::fmt::{Display, Write};

/// Rainfall samples in ascending date order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RainfallSeries {
    samples: Vec<(NaiveDate, f32)>,
}

impl RainfallSeries {
    /// Returns a series of the given samples.
    pub fn new(samples: Vec<(NaiveDate, f32)>) -> Self {
        Self { samples }
    }

    /// The (date, value) samples.
    pub fn samples(&self) -> &[(NaiveDate, f32)] {
        &self.samples
    }

    /// The values, without dates.
    pub fn values(&self) -> Vec<f32> {
        self.samples.iter().map(|(_, value)| *value).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Render as one `YYYYMMDD value` line per sample.
    pub fn render(&self) -> String {
        render_lines(
            self.samples
                .iter()
                .map(|(date, value)| (*date, format_value(*value))),
        )
    }
}

/// Format a value so that it always carries a decimal point, e.g. `999.0`.
pub fn format_value(value: f32) -> String {
    let mut text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Render `YYYYMMDD <item>` lines, each terminated by a newline.
pub fn render_lines<T, I>(entries: I) -> String
where
    T: Display,
    I: IntoIterator<Item = (NaiveDate, T)>,
{
    let mut text = String::new();
    for (date, item) in entries {
        // Writing to a String cannot fail.
        let _ = writeln!(text, "{} {}", format_date(date), item);
    }
    text
}
