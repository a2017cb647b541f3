//! Commands typed on stdin while playing.

use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::Receiver;
use failure::Error;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
  Faster,
  Slower,
  Speed(f64),
  Stop,
}

pub fn parse(line: &str) -> Option<Input> {
  match line.trim() {
    "+" | "f" | "faster" => Some(Input::Faster),
    "-" | "l" | "slower" => Some(Input::Slower),
    "s" | "q" | "stop" | "quit" => Some(Input::Stop),
    other => other
      .trim_end_matches('x')
      .parse::<f64>()
      .ok()
      .map(Input::Speed),
  }
}

pub fn spawn() -> Result<Receiver<Input>, Error> {
  let (input_tx, input_rx) = crossbeam_channel::unbounded::<Input>();

  thread::Builder::new().name("input".into()).spawn(move || {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
      let line = match line {
        Ok(line) => line,
        Err(err) => {
          warn!("Failed to read from stdin: {}", err);
          break;
        }
      };

      match parse(&line) {
        Some(input) => {
          if input_tx.send(input).is_err() {
            break;
          }
        }
        None if line.trim().is_empty() => {}
        None => warn!("Unknown command: {}", line.trim()),
      }
    }
    debug!("Input closed");
  })?;

  Ok(input_rx)
}
