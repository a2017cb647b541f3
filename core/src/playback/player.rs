use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use failure::Fail;
use log::{debug, error, info, trace};

use crate::config::Playback as PlaybackConfig;
use crate::time::{Clock, ClockTime};
use crate::timeline::Timeline;

use super::dispatch::{KeyCombo, KeyDispatcher};
use super::scheduler::{Phase, PlaybackError, Scheduler, Status};

#[derive(Debug, Fail)]
pub enum PlayerError {
  #[fail(display = "Failed to create the playback thread: {}", cause)]
  Start { cause: String },

  #[fail(display = "Failed to join the playback thread")]
  Stop,

  #[fail(display = "The playback thread is not running")]
  Closed,

  #[fail(display = "{}", cause)]
  Playback { cause: PlaybackError },
}

pub enum Protocol {
  Load(Arc<Timeline>),

  Start(Sender<bool>),

  Stop(Sender<bool>),

  SetSpeed(f64, Sender<Result<(), PlaybackError>>),

  Status(Sender<Status>),

  Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
  LeadIn { lead_in: ClockTime },

  Fired { index: usize, combo: KeyCombo },

  Finished,

  Stopped,
}

struct PlayerThread<D> {
  scheduler: Scheduler,
  dispatcher: D,
  clock: Clock,
  lead_in: ClockTime,
  notifications_tx: Sender<Notification>,
}

impl<D> PlayerThread<D>
where
  D: KeyDispatcher,
{
  fn new(
    scheduler: Scheduler,
    dispatcher: D,
    lead_in: ClockTime,
    notifications_tx: Sender<Notification>,
  ) -> PlayerThread<D> {
    PlayerThread {
      scheduler,
      dispatcher,
      clock: Clock::new(),
      lead_in,
      notifications_tx,
    }
  }

  fn handle_messages(&mut self, protocol_rx: Receiver<Protocol>) {
    info!("Handling playback messages ...");

    loop {
      // Overdue fires go before any pending message.
      let received = match self.scheduler.timeout(self.clock.now()) {
        Some(timeout) if timeout == ClockTime::zero() => {
          self.fire();
          continue;
        }
        Some(timeout) => protocol_rx.recv_timeout(timeout.to_duration()),
        None => protocol_rx
          .recv()
          .map_err(|_| RecvTimeoutError::Disconnected),
      };

      match received {
        Ok(Protocol::Close) | Err(RecvTimeoutError::Disconnected) => {
          if self.scheduler.stop() {
            self.notify(Notification::Stopped);
          }
          break;
        }

        Ok(message) => self.handle_message(message),

        Err(RecvTimeoutError::Timeout) => self.fire(),
      }
    }

    info!("Playback thread stopped ...");
  }

  fn handle_message(&mut self, message: Protocol) {
    let now = self.clock.now();

    match message {
      Protocol::Load(timeline) => {
        if self.scheduler.is_playing() {
          self.notify(Notification::Stopped);
        }
        self.scheduler.load(timeline);
      }

      Protocol::Start(reply_tx) => {
        let started = self.scheduler.start(now);
        if started {
          self.notify(Notification::LeadIn {
            lead_in: self.lead_in,
          });
        }
        drop(reply_tx.send(started));
      }

      Protocol::Stop(reply_tx) => {
        let stopped = self.scheduler.stop();
        if stopped {
          self.notify(Notification::Stopped);
        }
        drop(reply_tx.send(stopped));
      }

      Protocol::SetSpeed(speed, reply_tx) => {
        drop(reply_tx.send(self.scheduler.set_speed(speed, now)));
      }

      Protocol::Status(reply_tx) => {
        drop(reply_tx.send(self.scheduler.status()));
      }

      Protocol::Close => {}
    }
  }

  fn fire(&mut self) {
    let now = self.clock.now();
    let clock = &self.clock;
    let dispatcher = &mut self.dispatcher;
    let notifications_tx = &self.notifications_tx;

    let fired = self.scheduler.fire(now, |index, event| {
      let combo = KeyCombo::from_event(event);

      if combo.is_empty() {
        trace!("Event {} has no mapped keys", index);
      } else if let Err(err) = dispatcher.dispatch(&combo) {
        error!("Failed to dispatch keys {} for event {}: {}", combo, index, err);
      }

      drop(notifications_tx.send(Notification::Fired { index, combo }));
      clock.now()
    });

    if fired.is_some() && self.scheduler.phase() == Phase::Idle {
      self.notify(Notification::Finished);
    }
  }

  fn notify(&self, notification: Notification) {
    debug!("Notify {:?}", notification);
    drop(self.notifications_tx.send(notification));
  }
}

///! Plays timelines from a dedicated thread.
///!
///! The thread owns the scheduler; every call here is a message to it.
pub struct Player {
  handler: JoinHandle<()>,
  protocol_tx: Sender<Protocol>,
  notifications_rx: Receiver<Notification>,
}

impl Player {
  pub fn new<D>(config: &PlaybackConfig, dispatcher: D) -> Result<Player, PlayerError>
  where
    D: KeyDispatcher + 'static,
  {
    let scheduler = Scheduler::new(config).map_err(|cause| PlayerError::Playback { cause })?;
    let lead_in = ClockTime::from_millis(config.lead_in_ms);

    let (protocol_tx, protocol_rx) = crossbeam_channel::unbounded::<Protocol>();
    let (notifications_tx, notifications_rx) = crossbeam_channel::unbounded::<Notification>();

    info!("Spawning playback thread ...");

    thread::Builder::new()
      .name("playback".into())
      .spawn(move || {
        PlayerThread::new(scheduler, dispatcher, lead_in, notifications_tx)
          .handle_messages(protocol_rx)
      })
      .map_err(|err| PlayerError::Start {
        cause: err.to_string(),
      })
      .map(|handler| Player {
        handler,
        protocol_tx,
        notifications_rx,
      })
  }

  pub fn notifications(&self) -> Receiver<Notification> {
    self.notifications_rx.clone()
  }

  pub fn load(&self, timeline: Timeline) -> Result<(), PlayerError> {
    self
      .protocol_tx
      .send(Protocol::Load(Arc::new(timeline)))
      .map_err(|_| PlayerError::Closed)
  }

  /// Returns false when already playing or the timeline is empty.
  pub fn start(&self) -> Result<bool, PlayerError> {
    self.request(Protocol::Start)
  }

  /// Once this returns no more keys will be dispatched.
  pub fn stop(&self) -> Result<bool, PlayerError> {
    self.request(Protocol::Stop)
  }

  pub fn set_speed(&self, speed: f64) -> Result<(), PlayerError> {
    self
      .request(|reply_tx| Protocol::SetSpeed(speed, reply_tx))?
      .map_err(|cause| PlayerError::Playback { cause })
  }

  pub fn status(&self) -> Result<Status, PlayerError> {
    self.request(Protocol::Status)
  }

  pub fn close(self) -> Result<(), PlayerError> {
    info!("Closing playback thread ...");

    self
      .protocol_tx
      .send(Protocol::Close)
      .map_err(|_| PlayerError::Stop)
      .and_then(|()| self.handler.join().map_err(|_| PlayerError::Stop))
  }

  fn request<T, F>(&self, message: F) -> Result<T, PlayerError>
  where
    F: FnOnce(Sender<T>) -> Protocol,
  {
    let (reply_tx, reply_rx) = crossbeam_channel::bounded::<T>(1);
    self
      .protocol_tx
      .send(message(reply_tx))
      .map_err(|_| PlayerError::Closed)?;
    reply_rx.recv().map_err(|_| PlayerError::Closed)
  }
}
