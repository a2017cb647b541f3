use std::fmt;

use crossbeam_channel::Sender;
use failure::{Error, Fail};
use log::info;

use crate::keymap::KeySymbol;
use crate::timeline::ChordEvent;

#[derive(Debug, Fail)]
pub enum DispatchError {
  #[fail(display = "The key combo receiver is gone")]
  Disconnected,
}

///! Keys to be pressed together, without duplicates and in note order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyCombo(Vec<KeySymbol>);

impl KeyCombo {
  pub fn new(keys: Vec<KeySymbol>) -> KeyCombo {
    let mut combo = KeyCombo(Vec::with_capacity(keys.len()));
    for key in keys {
      if !combo.0.contains(&key) {
        combo.0.push(key);
      }
    }
    combo
  }

  pub fn from_event(event: &ChordEvent) -> KeyCombo {
    KeyCombo::new(event.keys())
  }

  pub fn keys(&self) -> &[KeySymbol] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Display for KeyCombo {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for (i, key) in self.0.iter().enumerate() {
      if i > 0 {
        write!(f, "+")?;
      }
      write!(f, "{}", key)?;
    }
    Ok(())
  }
}

///! Presses key combos on the host. Calls block until the keys have been sent.
pub trait KeyDispatcher: Send {
  fn dispatch(&mut self, combo: &KeyCombo) -> Result<(), Error>;
}

pub struct LogDispatcher;

impl KeyDispatcher for LogDispatcher {
  fn dispatch(&mut self, combo: &KeyCombo) -> Result<(), Error> {
    info!("Keys: {}", combo);
    Ok(())
  }
}

pub struct ChannelDispatcher {
  tx: Sender<KeyCombo>,
}

impl ChannelDispatcher {
  pub fn new(tx: Sender<KeyCombo>) -> ChannelDispatcher {
    ChannelDispatcher { tx }
  }
}

impl KeyDispatcher for ChannelDispatcher {
  fn dispatch(&mut self, combo: &KeyCombo) -> Result<(), Error> {
    self
      .tx
      .send(combo.clone())
      .map_err(|_| DispatchError::Disconnected.into())
  }
}
