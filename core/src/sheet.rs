//! Flattens a timeline into a key sheet.
//!
//! Each event becomes one token: a single mapped key is written as is, two or
//! more keys pressed together are written between brackets (`[80]`), and an
//! event without any mapped key writes nothing. Tokens are concatenated without
//! separators, so `C4+E4` followed by `G4` reads `[80]w`.

use crate::timeline::{ChordEvent, Timeline};

pub const CHORD_OPEN: char = '[';
pub const CHORD_CLOSE: char = ']';

pub fn token(event: &ChordEvent) -> Option<String> {
  let keys = event.keys();
  match keys.len() {
    0 => None,
    1 => Some(keys.into_iter().collect()),
    _ => {
      let mut token = String::with_capacity(keys.len() + 2);
      token.push(CHORD_OPEN);
      token.extend(keys);
      token.push(CHORD_CLOSE);
      Some(token)
    }
  }
}

pub fn serialize(timeline: &Timeline) -> String {
  timeline.iter().filter_map(token).collect()
}
