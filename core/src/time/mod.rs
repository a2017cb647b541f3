pub mod clock;

pub use self::clock::{Clock, ClockTime};
