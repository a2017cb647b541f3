use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::{Duration, Instant};

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
pub const NANOS_PER_MILLI: u64 = 1_000_000;

pub type UnitType = u64;
pub const UNITS_PER_SECOND: UnitType = NANOS_PER_SECOND as UnitType;
pub const UNITS_PER_MILLI: UnitType = NANOS_PER_MILLI as UnitType;

///! High resolution time
#[derive(Debug, PartialOrd, Ord, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ClockTime(UnitType);

impl ClockTime {
  pub fn zero() -> ClockTime {
    ClockTime(0)
  }

  pub fn new(units: UnitType) -> ClockTime {
    ClockTime(units)
  }

  pub fn from_millis(millis: u64) -> ClockTime {
    ClockTime(millis.saturating_mul(UNITS_PER_MILLI))
  }

  /// Negative and NaN values saturate to zero, too large values to the maximum.
  pub fn from_millis_f64(millis: f64) -> ClockTime {
    ClockTime((millis * UNITS_PER_MILLI as f64).round().max(0.0) as UnitType)
  }

  pub fn from_duration(duration: Duration) -> ClockTime {
    ClockTime(
      duration
        .as_secs()
        .saturating_mul(UNITS_PER_SECOND)
        .saturating_add(UnitType::from(duration.subsec_nanos())),
    )
  }

  pub fn units(&self) -> UnitType {
    self.0
  }

  pub fn to_millis(&self) -> u64 {
    self.0 / UNITS_PER_MILLI
  }

  pub fn to_millis_f64(&self) -> f64 {
    self.0 as f64 / UNITS_PER_MILLI as f64
  }

  pub fn to_seconds(&self) -> f64 {
    self.0 as f64 / UNITS_PER_SECOND as f64
  }

  pub fn to_duration(&self) -> Duration {
    Duration::from_nanos(self.0)
  }

  pub fn max_value() -> ClockTime {
    ClockTime(UnitType::max_value())
  }

  pub fn saturating_sub(self, rhs: ClockTime) -> ClockTime {
    ClockTime(self.0.saturating_sub(rhs.0))
  }
}

impl Add for ClockTime {
  type Output = ClockTime;

  /// Saturates at the maximum.
  fn add(self, rhs: ClockTime) -> ClockTime {
    ClockTime(self.0.saturating_add(rhs.0))
  }
}

impl AddAssign for ClockTime {
  fn add_assign(&mut self, rhs: ClockTime) {
    *self = *self + rhs;
  }
}

impl Sub for ClockTime {
  type Output = ClockTime;

  /// Saturates at zero.
  fn sub(self, rhs: ClockTime) -> ClockTime {
    self.saturating_sub(rhs)
  }
}

impl SubAssign for ClockTime {
  fn sub_assign(&mut self, rhs: ClockTime) {
    *self = *self - rhs;
  }
}

///! Monotonic clock counting from the moment it was created
#[derive(Debug, Clone, Copy)]
pub struct Clock {
  origin: Instant,
}

impl Clock {
  pub fn new() -> Clock {
    Clock {
      origin: Instant::now(),
    }
  }

  pub fn now(&self) -> ClockTime {
    ClockTime::from_duration(self.origin.elapsed())
  }
}

impl Default for Clock {
  fn default() -> Clock {
    Clock::new()
  }
}
