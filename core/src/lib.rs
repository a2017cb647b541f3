pub mod config;
pub mod keymap;
pub mod notes;
pub mod playback;
pub mod sheet;
pub mod time;
pub mod timeline;

pub use crate::keymap::KeySymbol;
pub use crate::timeline::{ChordEvent, Note, Timeline};
