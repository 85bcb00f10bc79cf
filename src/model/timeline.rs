use chrono::NaiveDate;

use crate::date::{add_days, days_between};

use super::task::Task;

/// Controls how the visible date window is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeMode {
    /// Fit the dated rows, padded 3 days before and 7 after.
    #[default]
    Auto,
    /// A fixed span anchored a quarter of the way behind `today`.
    Days(i64),
}

impl RangeMode {
    /// Parse a range-selector value: a day count, or `Auto` for anything
    /// else.
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) if n > 0 => RangeMode::Days(n),
            _ => RangeMode::Auto,
        }
    }
}

/// The contiguous date range mapped onto the timeline, as a start date
/// plus an inclusive day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineWindow {
    pub start: NaiveDate,
    pub total_days: i64,
}

impl TimelineWindow {
    /// Compute the window for the rows currently on screen (the visit
    /// order, rollups included). With nothing dated the window centers
    /// on `today`. `total_days` is never below 1.
    pub fn compute<'a, I>(rows: I, mode: RangeMode, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut min: Option<NaiveDate> = None;
        let mut max: Option<NaiveDate> = None;
        for t in rows {
            let (Some(s), Some(e)) = (t.start, t.end) else { continue };
            min = Some(min.map_or(s, |m| m.min(s)));
            max = Some(max.map_or(e, |m| m.max(e)));
        }
        let (mut min, mut max) = (min.unwrap_or(today), max.unwrap_or(today));

        match mode {
            RangeMode::Auto => {
                min = add_days(min, -3);
                max = add_days(max, 7);
            }
            RangeMode::Days(days) => {
                min = add_days(today, -(days / 4));
                max = add_days(min, days);
            }
        }

        TimelineWindow {
            start: min,
            total_days: (days_between(min, max) + 1).max(1),
        }
    }

    /// Signed day offset of `date` from the window start.
    pub fn day_offset(&self, date: NaiveDate) -> i64 {
        days_between(self.start, date)
    }

    /// Day offset clamped into the window, so bars that poke out of the
    /// visible range truncate at the edge instead of vanishing.
    pub fn clamped_offset(&self, date: NaiveDate) -> i64 {
        self.day_offset(date).clamp(0, self.total_days - 1)
    }

    /// Last visible date.
    pub fn end(&self) -> NaiveDate {
        add_days(self.start, self.total_days - 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let off = self.day_offset(date);
        off >= 0 && off < self.total_days
    }
}

/// Maps window day offsets onto horizontal pixels for rendering
/// consumers. `day_width` is the zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub window: TimelineWindow,
    pub day_width: f32,
}

impl Viewport {
    pub fn new(window: TimelineWindow) -> Self {
        Self {
            window,
            day_width: 18.0,
        }
    }

    /// Convert a date to an x-pixel offset from the window start.
    pub fn date_to_x(&self, date: NaiveDate) -> f32 {
        self.window.day_offset(date) as f32 * self.day_width
    }

    /// Convert an x-pixel offset back to a date.
    pub fn x_to_date(&self, x: f32) -> NaiveDate {
        let days = (x / self.day_width).round() as i64;
        add_days(self.window.start, days)
    }

    /// Total width in pixels of the window.
    pub fn total_width(&self) -> f32 {
        self.window.total_days as f32 * self.day_width
    }

    /// Zoom in (increase pixels per day).
    pub fn zoom_in(&mut self) {
        self.day_width = (self.day_width * 1.2).min(80.0);
    }

    /// Zoom out (decrease pixels per day).
    pub fn zoom_out(&mut self) {
        self.day_width = (self.day_width / 1.2).max(2.0);
    }
}
