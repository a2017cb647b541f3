use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::slice::Iter;

use log::{debug, warn};

use crate::keymap::{self, KeySymbol};

pub type Seconds = f64;

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
  pitch: String,
  onset: Seconds,
}

impl Note {
  pub fn new<T>(pitch: T, onset: Seconds) -> Note
  where
    T: Into<String>,
  {
    Note {
      pitch: pitch.into(),
      onset,
    }
  }

  pub fn from_midi(midi_note: u8, onset: Seconds) -> Note {
    Note::new(keymap::note_name(midi_note), onset)
  }

  pub fn pitch(&self) -> &str {
    &self.pitch
  }

  pub fn onset(&self) -> Seconds {
    self.onset
  }

  pub fn key(&self) -> Option<KeySymbol> {
    keymap::key_for(&self.pitch)
  }
}

///! Notes sharing exactly the same onset, in the order they were received
#[derive(Debug, Clone, PartialEq)]
pub struct ChordEvent {
  onset: Seconds,
  notes: Vec<Note>,
}

impl ChordEvent {
  pub fn onset(&self) -> Seconds {
    self.onset
  }

  pub fn notes(&self) -> &[Note] {
    &self.notes
  }

  /// Mapped key symbols in note order. Unmapped notes are skipped.
  pub fn keys(&self) -> Vec<KeySymbol> {
    self.notes.iter().filter_map(Note::key).collect()
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
  events: Vec<ChordEvent>,
}

impl Timeline {
  pub fn new() -> Timeline {
    Timeline { events: Vec::new() }
  }

  /// Groups the notes by exact onset and orders the groups by ascending onset.
  ///
  /// Onsets are compared bit for bit, there is no tolerance window. Notes
  /// with a non finite onset can not be placed and are dropped.
  pub fn build<I>(notes: I) -> Timeline
  where
    I: IntoIterator<Item = Note>,
  {
    let mut groups: HashMap<u64, usize> = HashMap::new();
    let mut events: Vec<ChordEvent> = Vec::new();
    let mut num_notes = 0usize;

    for note in notes {
      if !note.onset.is_finite() {
        warn!("Dropping note {} with onset {}", note.pitch, note.onset);
        continue;
      }

      // folds -0.0 into 0.0
      let onset = note.onset + 0.0;
      let note = Note { onset, ..note };
      num_notes += 1;

      match groups.entry(onset.to_bits()) {
        Entry::Occupied(entry) => events[*entry.get()].notes.push(note),
        Entry::Vacant(entry) => {
          entry.insert(events.len());
          events.push(ChordEvent {
            onset,
            notes: vec![note],
          });
        }
      }
    }

    events.sort_by(|a, b| a.onset.partial_cmp(&b.onset).unwrap_or(Ordering::Equal));

    debug!(
      "Built timeline with {} events from {} notes",
      events.len(),
      num_notes
    );

    Timeline { events }
  }

  pub fn from_midi_notes<I>(notes: I) -> Timeline
  where
    I: IntoIterator<Item = (u8, Seconds)>,
  {
    Self::build(
      notes
        .into_iter()
        .map(|(midi_note, onset)| Note::from_midi(midi_note, onset)),
    )
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&ChordEvent> {
    self.events.get(index)
  }

  pub fn events(&self) -> &[ChordEvent] {
    &self.events
  }

  pub fn iter(&self) -> Iter<ChordEvent> {
    self.events.iter()
  }

  /// Time between the first and the last onsets.
  pub fn duration(&self) -> Seconds {
    match (self.events.first(), self.events.last()) {
      (Some(first), Some(last)) => last.onset - first.onset,
      _ => 0.0,
    }
  }

  /// Whole milliseconds from the event at `index` to the next one.
  pub fn interval_ms(&self, index: usize) -> Option<u64> {
    let current = self.events.get(index)?;
    let next = self.events.get(index + 1)?;
    Some(((next.onset - current.onset) * 1000.0) as u64)
  }
}

impl<'a> IntoIterator for &'a Timeline {
  type Item = &'a ChordEvent;
  type IntoIter = Iter<'a, ChordEvent>;

  fn into_iter(self) -> Self::IntoIter {
    self.events.iter()
  }
}
