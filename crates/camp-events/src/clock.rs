//! Campaign Clock Types
//!
//! Handles campaign time as a single absolute hour counter with derived
//! day, week and hour-of-day views. All pacing arithmetic in the engine
//! works off these integers; wall-clock time never enters the picture.
//!
//! # Example
//!
//! ```
//! use camp_events::CampClock;
//!
//! let clock = CampClock::from_day_hour(3, 7);
//! assert_eq!(clock.day(), 3);
//! assert_eq!(clock.hour_of_day(), 7);
//! assert_eq!(clock.to_string(), "day_3.hour_7");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of simulated hours per campaign day.
pub const HOURS_PER_DAY: u64 = 24;

/// Number of campaign days per week.
pub const DAYS_PER_WEEK: u64 = 7;

/// A point in campaign time.
///
/// Wraps an absolute hour count since campaign start. Day and week numbers
/// derive from it, so two clocks at the same hour always agree on every
/// derived value.
///
/// Serializes to strings like "day_12.hour_7".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CampClock {
    hour: u64,
}

impl CampClock {
    /// Creates a clock at the given absolute hour.
    pub fn new(hour: u64) -> Self {
        Self { hour }
    }

    /// Creates a clock at campaign start (day 0, hour 0).
    pub fn start() -> Self {
        Self { hour: 0 }
    }

    /// Creates a clock from a day number and an hour within that day.
    pub fn from_day_hour(day: u64, hour_of_day: u8) -> Self {
        Self {
            hour: day * HOURS_PER_DAY + hour_of_day as u64,
        }
    }

    /// Absolute hour since campaign start.
    pub fn hour(&self) -> u64 {
        self.hour
    }

    /// Absolute day number since campaign start.
    pub fn day(&self) -> u64 {
        self.hour / HOURS_PER_DAY
    }

    /// Absolute week number since campaign start.
    pub fn week(&self) -> u64 {
        self.day() / DAYS_PER_WEEK
    }

    /// Hour within the current day (0-23).
    pub fn hour_of_day(&self) -> u8 {
        (self.hour % HOURS_PER_DAY) as u8
    }

    /// Day within the current week (0-6).
    pub fn day_of_week(&self) -> u8 {
        (self.day() % DAYS_PER_WEEK) as u8
    }

    /// Advances the clock by one hour.
    pub fn advance_hour(&mut self) {
        self.hour += 1;
    }

    /// Advances the clock by the given number of hours.
    pub fn advance_hours(&mut self, hours: u64) {
        self.hour += hours;
    }

    /// Advances the clock by one full day.
    pub fn advance_day(&mut self) {
        self.hour += HOURS_PER_DAY;
    }

    /// Phase of the day the clock currently sits in.
    pub fn phase(&self) -> DayPhase {
        DayPhase::from_hour(self.hour_of_day())
    }
}

impl fmt::Display for CampClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day_{}.hour_{}", self.day(), self.hour_of_day())
    }
}

/// Error type for parsing CampClock from strings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseClockError {
    #[error("invalid clock format: '{0}', expected 'day_N.hour_M'")]
    InvalidFormat(String),
    #[error("invalid day: '{0}'")]
    InvalidDay(String),
    #[error("invalid hour: '{0}'")]
    InvalidHour(String),
}

impl FromStr for CampClock {
    type Err = ParseClockError;

    /// Parses a CampClock from a string like "day_12.hour_7".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 2 {
            return Err(ParseClockError::InvalidFormat(s.to_string()));
        }

        let day_part = parts[0];
        let day = day_part
            .strip_prefix("day_")
            .ok_or_else(|| ParseClockError::InvalidFormat(s.to_string()))?
            .parse::<u64>()
            .map_err(|_| ParseClockError::InvalidDay(day_part.to_string()))?;

        let hour_part = parts[1];
        let hour_of_day = hour_part
            .strip_prefix("hour_")
            .ok_or_else(|| ParseClockError::InvalidFormat(s.to_string()))?
            .parse::<u8>()
            .map_err(|_| ParseClockError::InvalidHour(hour_part.to_string()))?;
        if hour_of_day as u64 >= HOURS_PER_DAY {
            return Err(ParseClockError::InvalidHour(hour_part.to_string()));
        }

        Ok(CampClock::from_day_hour(day, hour_of_day))
    }
}

// Serialize as the display string, not a bare integer, so saves and logs
// stay readable.
impl Serialize for CampClock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CampClock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Phase of the campaign day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPhase {
    Night,
    Morning,
    Midday,
    Evening,
}

impl DayPhase {
    /// Maps an hour of day (0-23) to its phase.
    pub fn from_hour(hour_of_day: u8) -> Self {
        match hour_of_day {
            6..=11 => DayPhase::Morning,
            12..=16 => DayPhase::Midday,
            17..=21 => DayPhase::Evening,
            _ => DayPhase::Night,
        }
    }
}

impl fmt::Display for DayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayPhase::Night => write!(f, "night"),
            DayPhase::Morning => write!(f, "morning"),
            DayPhase::Midday => write!(f, "midday"),
            DayPhase::Evening => write!(f, "evening"),
        }
    }
}

/// Time-of-day window a deferred decision is allowed to execute in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowClass {
    /// Open at any hour.
    Unrestricted,
    /// Duty hours, 06:00 to 18:00.
    Training,
    /// Off-duty evening hours, 18:00 to 23:00.
    Social,
}

impl WindowClass {
    /// Stable snake_case key, used when windows round-trip through saves.
    pub fn as_key(&self) -> &'static str {
        match self {
            WindowClass::Unrestricted => "unrestricted",
            WindowClass::Training => "training",
            WindowClass::Social => "social",
        }
    }

    /// Inverse of [`WindowClass::as_key`].
    pub fn from_key(key: &str) -> Option<WindowClass> {
        match key {
            "unrestricted" => Some(WindowClass::Unrestricted),
            "training" => Some(WindowClass::Training),
            "social" => Some(WindowClass::Social),
            _ => None,
        }
    }

    /// Returns true if the window is open at the given hour of day.
    pub fn is_open_at(&self, hour_of_day: u8) -> bool {
        match self {
            WindowClass::Unrestricted => true,
            WindowClass::Training => (6..18).contains(&hour_of_day),
            WindowClass::Social => (18..23).contains(&hour_of_day),
        }
    }

    /// Absolute hour at which the window next opens.
    ///
    /// Returns the current hour if the window is already open. Every window
    /// opens at least once per day, so this never scans further than one day
    /// ahead.
    pub fn next_open_hour(&self, clock: &CampClock) -> u64 {
        let mut hour = clock.hour();
        while !self.is_open_at((hour % HOURS_PER_DAY) as u8) {
            hour += 1;
        }
        hour
    }
}

impl fmt::Display for WindowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}
