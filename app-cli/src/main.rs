use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use crossbeam_channel::select;
use failure::{Error, Fail};
use log::{debug, info, warn, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

use midikeys_core::config::Config;
use midikeys_core::keymap;
use midikeys_core::notes;
use midikeys_core::playback::{LogDispatcher, Notification, Player};
use midikeys_core::sheet;
use midikeys_core::timeline::Timeline;

mod input;
use crate::input::Input;

const MIDIKEYS_CONFIG: &str = "MIDIKEYS_CONFIG";
const DEFAULT_MIDIKEYS_CONFIG: &str = "midikeys.toml";

const MIDIKEYS_LOG_CONFIG: &str = "MIDIKEYS_LOG_CONFIG";
const DEFAULT_MIDIKEYS_LOG_CONFIG: &str = "log4rs.yaml";

const DEFAULT_LOG_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:5})} [{T}] {m}{n}";

#[derive(Debug, Fail)]
enum MainError {
  #[fail(display = "Failed to init logging: {}", cause)]
  LoggingInit { cause: String },

  #[fail(
    display = "Speed {} is out of the allowed range [{}, {}]",
    speed, min, max
  )]
  SpeedOutOfRange { speed: f64, min: f64, max: f64 },
}

#[derive(Parser)]
#[command(name = "midikeys", about = "Plays note lists as keystrokes")]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the key sheet of a note list
  Sheet {
    /// Path to a TOML note list
    file: PathBuf,
  },

  /// Press the keys of a note list in real time
  Play {
    /// Path to a TOML note list
    file: PathBuf,

    /// Initial speed multiplier
    #[arg(long)]
    speed: Option<f64>,

    /// Milliseconds to wait before the first keys
    #[arg(long)]
    lead_in: Option<u64>,
  },

  /// Print the pitch to key table
  Keys,
}

fn main() -> Result<(), Error> {
  let cli = Cli::parse();

  init_logging()?;

  let config = init_config()?;

  match cli.command {
    Command::Sheet { file } => {
      let timeline = load_timeline(&file)?;
      println!("{}", sheet::serialize(&timeline));
    }

    Command::Play {
      file,
      speed,
      lead_in,
    } => play(&config, &file, speed, lead_in)?,

    Command::Keys => {
      for (pitch, key) in keymap::table() {
        println!("{:<4} {}", pitch, key);
      }
    }
  }

  Ok(())
}

fn init_logging() -> Result<(), Error> {
  let log_config_path = std::env::var(MIDIKEYS_LOG_CONFIG).ok();

  match log_config_path {
    Some(path) => init_logging_from_file(path.as_str()),
    None if Path::new(DEFAULT_MIDIKEYS_LOG_CONFIG).exists() => {
      init_logging_from_file(DEFAULT_MIDIKEYS_LOG_CONFIG)
    }
    None => init_default_logging(),
  }
}

fn init_logging_from_file(path: &str) -> Result<(), Error> {
  log4rs::init_file(path, Default::default()).map_err(|err| MainError::LoggingInit {
    cause: err.to_string(),
  })?;

  Ok(())
}

fn init_default_logging() -> Result<(), Error> {
  let stderr = ConsoleAppender::builder()
    .target(Target::Stderr)
    .encoder(Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN)))
    .build();

  let config = LogConfig::builder()
    .appender(Appender::builder().build("stderr", Box::new(stderr)))
    .build(Root::builder().appender("stderr").build(LevelFilter::Info))
    .map_err(|err| MainError::LoggingInit {
      cause: err.to_string(),
    })?;

  log4rs::init_config(config).map_err(|err| MainError::LoggingInit {
    cause: err.to_string(),
  })?;

  Ok(())
}

fn init_config() -> Result<Config, Error> {
  let config_path = std::env::var(MIDIKEYS_CONFIG).ok();

  let config = match config_path {
    Some(path) => {
      info!("Loading configuration from {} ...", path);
      Config::from_file(path.as_str())?
    }
    None if Path::new(DEFAULT_MIDIKEYS_CONFIG).exists() => {
      info!("Loading configuration from {} ...", DEFAULT_MIDIKEYS_CONFIG);
      Config::from_file(DEFAULT_MIDIKEYS_CONFIG)?
    }
    None => {
      info!("No configuration found, using defaults");
      Config::default()
    }
  };
  debug!("{:#?}", config);

  Ok(config)
}

fn load_timeline(file: &Path) -> Result<Timeline, Error> {
  info!("Loading notes from {} ...", file.display());
  let notes = notes::from_file(file)?;
  Ok(Timeline::build(notes))
}

fn play(
  config: &Config,
  file: &Path,
  speed: Option<f64>,
  lead_in: Option<u64>,
) -> Result<(), Error> {
  let timeline = load_timeline(file)?;
  if timeline.is_empty() {
    warn!("Nothing to play in {}", file.display());
    return Ok(());
  }

  let mut playback_config = config.playback.clone();
  if let Some(lead_in_ms) = lead_in {
    playback_config.lead_in_ms = lead_in_ms;
  }
  if let Some(speed) = speed {
    check_speed(config, speed)?;
    playback_config.speed = speed;
  }
  let mut speed = playback_config.speed;

  println!(
    "Playing {} events over {:.1} s. Type +/- or a speed to adjust, s to stop.",
    timeline.len(),
    timeline.duration()
  );

  let player = Player::new(&playback_config, LogDispatcher)?;
  let notifications = player.notifications();
  let input_rx = input::spawn()?;
  let mut input_closed = false;

  player.load(timeline)?;
  player.start()?;

  let mut playing = true;
  while playing {
    let input = if input_closed {
      crossbeam_channel::never()
    } else {
      input_rx.clone()
    };

    playing = select! {
      recv(notifications) -> notification => match notification {
        Ok(Notification::LeadIn { lead_in }) => {
          println!("Switch to the target window, starting in {:.1} s ...", lead_in.to_seconds());
          true
        }
        Ok(Notification::Fired { index, combo }) => {
          println!("{:>6}  {}", index, combo);
          true
        }
        Ok(Notification::Finished) => {
          println!("Finished");
          false
        }
        Ok(Notification::Stopped) | Err(_) => {
          println!("Stopped");
          false
        }
      },

      recv(input) -> received => match received {
        Ok(Input::Faster) => {
          speed = change_speed(&player, config.speed.faster(speed))?;
          true
        }
        Ok(Input::Slower) => {
          speed = change_speed(&player, config.speed.slower(speed))?;
          true
        }
        Ok(Input::Speed(value)) => {
          match check_speed(config, value) {
            Ok(()) => speed = change_speed(&player, value)?,
            Err(err) => warn!("{}", err),
          }
          true
        }
        Ok(Input::Stop) => {
          player.stop()?;
          println!("Stopped");
          false
        }
        Err(_) => {
          input_closed = true;
          true
        }
      },
    };
  }

  player.close()?;

  Ok(())
}

fn check_speed(config: &Config, speed: f64) -> Result<(), MainError> {
  if config.speed.contains(speed) {
    Ok(())
  } else {
    Err(MainError::SpeedOutOfRange {
      speed,
      min: config.speed.min,
      max: config.speed.max,
    })
  }
}

fn change_speed(player: &Player, speed: f64) -> Result<f64, Error> {
  player.set_speed(speed)?;
  println!("Speed {:.0}%", speed * 100.0);
  Ok(speed)
}
