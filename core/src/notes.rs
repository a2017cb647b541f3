//! Note lists stored as TOML.
//!
//! ```toml
//! [[notes]]
//! pitch = "C4"
//! onset = 0.0
//!
//! [[notes]]
//! midi = 64
//! onset = 0.0
//! ```

use std::fs;
use std::path::Path;

use failure::{Error, Fail};
use serde_derive::Deserialize;

use crate::timeline::{Note, Seconds};

#[derive(Debug, Fail)]
pub enum NotesError {
  #[fail(display = "Note {} has no pitch, expected one of 'pitch' or 'midi'", index)]
  MissingPitch { index: usize },

  #[fail(display = "Note {} has both 'pitch' and 'midi'", index)]
  AmbiguousPitch { index: usize },
}

#[derive(Deserialize, Debug)]
struct NoteEntry {
  pitch: Option<String>,
  midi: Option<u8>,
  onset: Seconds,
}

#[derive(Deserialize, Debug, Default)]
struct NoteList {
  #[serde(default)]
  notes: Vec<NoteEntry>,
}

pub fn from_file<P>(path: P) -> Result<Vec<Note>, Error>
where
  P: AsRef<Path>,
{
  let content = fs::read_to_string(path)?;
  from_str(content.as_str())
}

pub fn from_str<'a, T>(content: T) -> Result<Vec<Note>, Error>
where
  T: Into<&'a str>,
{
  let list: NoteList = toml::from_str(content.into())?;

  let notes = list
    .notes
    .into_iter()
    .enumerate()
    .map(|(index, entry)| match (entry.pitch, entry.midi) {
      (Some(pitch), None) => Ok(Note::new(pitch, entry.onset)),
      (None, Some(midi)) => Ok(Note::from_midi(midi, entry.onset)),
      (None, None) => Err(NotesError::MissingPitch { index }),
      (Some(_), Some(_)) => Err(NotesError::AmbiguousPitch { index }),
    })
    .collect::<Result<Vec<Note>, NotesError>>()?;

  Ok(notes)
}
