//! Moon phase
//!
//! A coarse lunar phase used as the loop parameter for still renders, so the
//! piece drifts through its loop once per lunar month.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Mean synodic month in days
pub const SYNODIC_MONTH: f64 = 29.53;

/// Phase of the moon on `date`, in `[0, 1)` (0 is new moon, 0.5 full)
pub fn moon_phase(date: NaiveDate) -> f64 {
    moon_phase_ymd(date.year(), date.month0(), date.day())
}

/// Phase for a calendar date with a zero-based month (January is 0)
pub fn moon_phase_ymd(year: i32, month0: u32, day: u32) -> f64 {
    let mut year = year as f64;
    let mut month = month0 as f64;
    if month0 < 3 {
        year -= 1.0;
        month += 12.0;
    }
    month += 1.0;

    let days = 365.25 * year + 30.6 * month + day as f64 - 694_039.09;
    wrap_phase(days / SYNODIC_MONTH)
}

/// Fold any value into `[0, 1)`
pub fn wrap_phase(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Named phase of the moon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoonPhaseLabel {
    New,
    WaxingCrescent,
    Quarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhaseLabel {
    /// Label for a phase in `[0, 1)`
    pub fn from_phase(phase: f64) -> Self {
        let octant = ((phase * 8.0).ceil() as i64) & 7;
        match octant {
            0 => Self::New,
            1 => Self::WaxingCrescent,
            2 => Self::Quarter,
            3 => Self::WaxingGibbous,
            4 => Self::Full,
            5 => Self::WaningGibbous,
            6 => Self::LastQuarter,
            _ => Self::WaningCrescent,
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "New Moon",
            Self::WaxingCrescent => "Waxing Crescent Moon",
            Self::Quarter => "Quarter Moon",
            Self::WaxingGibbous => "Waxing Gibbous Moon",
            Self::Full => "Full Moon",
            Self::WaningGibbous => "Waning Gibbous Moon",
            Self::LastQuarter => "Last Quarter Moon",
            Self::WaningCrescent => "Waning Crescent Moon",
        }
    }
}

impl fmt::Display for MoonPhaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
