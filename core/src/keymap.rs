//! Pitch to key symbol mapping.
//!
//! The table covers every pitch from `C3` up to `C8`. Pitches are identified by
//! their note letter, an optional sharp and the octave number (`C#4`), the same
//! naming produced by [`note_name`] for MIDI note numbers.

use std::collections::HashMap;

use once_cell::sync::Lazy;

pub type KeySymbol = char;

const NOTE_NAMES: [&str; 12] = [
  "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[rustfmt::skip]
const KEY_TABLE: [(&str, KeySymbol); 61] = [
  ("C3", '1'), ("C#3", '!'), ("D3", '2'), ("D#3", '@'), ("E3", '3'), ("F3", '4'),
  ("F#3", '$'), ("G3", '5'), ("G#3", '%'), ("A3", '6'), ("A#3", '^'), ("B3", '7'),

  ("C4", '8'), ("C#4", '*'), ("D4", '9'), ("D#4", '('), ("E4", '0'), ("F4", 'q'),
  ("F#4", 'Q'), ("G4", 'w'), ("G#4", 'W'), ("A4", 'e'), ("A#4", 'E'), ("B4", 'r'),

  ("C5", 't'), ("C#5", 'T'), ("D5", 'y'), ("D#5", 'Y'), ("E5", 'u'), ("F5", 'i'),
  ("F#5", 'I'), ("G5", 'o'), ("G#5", 'O'), ("A5", 'p'), ("A#5", 'P'), ("B5", 'a'),

  ("C6", 's'), ("C#6", 'S'), ("D6", 'd'), ("D#6", 'D'), ("E6", 'f'), ("F6", 'g'),
  ("F#6", 'G'), ("G6", 'h'), ("G#6", 'H'), ("A6", 'j'), ("A#6", 'J'), ("B6", 'k'),

  ("C7", 'l'), ("C#7", 'L'), ("D7", 'z'), ("D#7", 'Z'), ("E7", 'x'), ("F7", 'c'),
  ("F#7", 'C'), ("G7", 'v'), ("G#7", 'V'), ("A7", 'b'), ("A#7", 'B'), ("B7", 'n'),

  ("C8", 'm'),
];

static KEY_MAP: Lazy<HashMap<&'static str, KeySymbol>> =
  Lazy::new(|| KEY_TABLE.iter().cloned().collect());

/// Key symbol for a pitch, or `None` when the pitch is unmapped.
pub fn key_for(pitch: &str) -> Option<KeySymbol> {
  KEY_MAP.get(pitch).cloned()
}

pub fn key_for_midi(midi_note: u8) -> Option<KeySymbol> {
  key_for(&note_name(midi_note))
}

/// Pitch identifier for a MIDI note number, using sharps (60 is `C4`).
pub fn note_name(midi_note: u8) -> String {
  let octave = i16::from(midi_note / 12) - 1;
  format!("{}{}", NOTE_NAMES[usize::from(midi_note % 12)], octave)
}

/// The whole table in ascending pitch order.
pub fn table() -> &'static [(&'static str, KeySymbol)] {
  &KEY_TABLE
}
