use failure::{Error, Fail};

use serde_derive::Deserialize;

use std::fs::File;
use std::io::Read;

#[derive(Debug, Fail)]
pub enum ConfigError {
  #[fail(display = "Invalid playback speed {}: it must be greater than zero", speed)]
  InvalidSpeed { speed: f64 },

  #[fail(display = "Invalid speed range [{}, {}]", min, max)]
  InvalidSpeedRange { min: f64, max: f64 },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Playback {
  pub lead_in_ms: u64,
  pub min_delay_ms: u64,
  pub speed: f64,
}

impl Default for Playback {
  fn default() -> Playback {
    Playback {
      lead_in_ms: 5000,
      min_delay_ms: 1,
      speed: 1.0,
    }
  }
}

///! Speed bounds offered to the user. The scheduler itself accepts any positive speed.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Speed {
  pub min: f64,
  pub max: f64,
  pub step: f64,
}

impl Default for Speed {
  fn default() -> Speed {
    Speed {
      min: 0.5,
      max: 2.0,
      step: 0.1,
    }
  }
}

impl Speed {
  pub fn contains(&self, speed: f64) -> bool {
    self.min <= speed && speed <= self.max
  }

  pub fn clamp(&self, speed: f64) -> f64 {
    speed.max(self.min).min(self.max)
  }

  pub fn faster(&self, speed: f64) -> f64 {
    self.clamp(speed + self.step)
  }

  pub fn slower(&self, speed: f64) -> f64 {
    self.clamp(speed - self.step)
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
  pub playback: Playback,
  pub speed: Speed,
}

impl Default for Config {
  fn default() -> Config {
    Config {
      playback: Playback::default(),
      speed: Speed::default(),
    }
  }
}

impl Config {
  pub fn from_file<'a, T>(path: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let mut content = String::new();
    let path_str = path.into();
    let mut file = File::open(path_str)?;
    file.read_to_string(&mut content)?;
    Self::from_str(content.as_str())
  }

  pub fn from_str<'a, T>(content: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let config: Config = toml::from_str(content.into())?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let speed = self.playback.speed;
    if !(speed.is_finite() && speed > 0.0) {
      return Err(ConfigError::InvalidSpeed { speed });
    }

    let Speed { min, max, .. } = self.speed;
    if !(min.is_finite() && max.is_finite() && 0.0 < min && min <= max) {
      return Err(ConfigError::InvalidSpeedRange { min, max });
    }

    Ok(())
  }
}
