//! Real time playback of a timeline as key combos.
//!
//! [`Scheduler`] is the state machine, driven by explicit times. [`Player`]
//! runs it on its own thread, where the single pending timer is the wait for
//! the next protocol message.

pub mod dispatch;
pub mod player;
pub mod scheduler;

pub use self::dispatch::{ChannelDispatcher, DispatchError, KeyCombo, KeyDispatcher, LogDispatcher};
pub use self::player::{Notification, Player, PlayerError};
pub use self::scheduler::{Phase, PlaybackError, Scheduler, Status};
