use std::sync::Arc;

use failure::Fail;
use log::{debug, info, trace, warn};

use crate::config::Playback as PlaybackConfig;
use crate::time::ClockTime;
use crate::timeline::{ChordEvent, Timeline};

#[derive(Debug, Fail, Clone, PartialEq)]
pub enum PlaybackError {
  #[fail(
    display = "Invalid speed multiplier {}: it must be a finite value greater than zero",
    speed
  )]
  InvalidSpeed { speed: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  LeadIn,
  Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
  pub phase: Phase,
  pub current_index: usize,
  pub len: usize,
  pub speed: f64,
}

impl Status {
  pub fn is_playing(&self) -> bool {
    self.phase != Phase::Idle
  }
}

fn check_speed(speed: f64) -> Result<f64, PlaybackError> {
  if speed.is_finite() && speed > 0.0 {
    Ok(speed)
  } else {
    Err(PlaybackError::InvalidSpeed { speed })
  }
}

///! Playback state machine around a single pending timer.
///!
///! It never reads a clock: every operation receives the current time and the
///! owner is expected to call `fire` once `deadline` is reached.
pub struct Scheduler {
  timeline: Arc<Timeline>,

  lead_in: ClockTime,
  min_delay: ClockTime,

  phase: Phase,
  current_index: usize,
  speed: f64,
  original_interval_ms: u64,

  deadline: Option<ClockTime>,
}

impl Scheduler {
  pub fn new(config: &PlaybackConfig) -> Result<Scheduler, PlaybackError> {
    let speed = check_speed(config.speed)?;
    Ok(Scheduler {
      timeline: Arc::new(Timeline::new()),

      lead_in: ClockTime::from_millis(config.lead_in_ms),
      min_delay: ClockTime::from_millis(config.min_delay_ms),

      phase: Phase::Idle,
      current_index: 0,
      speed,
      original_interval_ms: 0,

      deadline: None,
    })
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn is_playing(&self) -> bool {
    self.phase != Phase::Idle
  }

  pub fn current_index(&self) -> usize {
    self.current_index
  }

  pub fn speed(&self) -> f64 {
    self.speed
  }

  pub fn original_interval_ms(&self) -> u64 {
    self.original_interval_ms
  }

  pub fn deadline(&self) -> Option<ClockTime> {
    self.deadline
  }

  /// Time left until the pending fire, zero when it is overdue.
  pub fn timeout(&self, now: ClockTime) -> Option<ClockTime> {
    self.deadline.map(|deadline| deadline.saturating_sub(now))
  }

  pub fn status(&self) -> Status {
    Status {
      phase: self.phase,
      current_index: self.current_index,
      len: self.timeline.len(),
      speed: self.speed,
    }
  }

  /// Replaces the timeline, stopping any playback in progress.
  pub fn load(&mut self, timeline: Arc<Timeline>) {
    self.stop();
    info!("Loaded timeline with {} events", timeline.len());
    self.timeline = timeline;
  }

  /// Arms the lead-in. Returns false when already playing or there is nothing to play.
  pub fn start(&mut self, now: ClockTime) -> bool {
    if self.is_playing() {
      debug!("Start ignored, already playing");
      return false;
    }

    if self.timeline.is_empty() {
      debug!("Start ignored, the timeline is empty");
      return false;
    }

    self.current_index = 0;
    self.original_interval_ms = 0;
    self.phase = Phase::LeadIn;
    self.deadline = Some(now + self.lead_in);

    info!(
      "Playback starts in {} ms at speed {}",
      self.lead_in.to_millis(),
      self.speed
    );

    true
  }

  /// Cancels the pending fire and rewinds. Returns whether playback was active.
  pub fn stop(&mut self) -> bool {
    let was_playing = self.is_playing();

    self.phase = Phase::Idle;
    self.deadline = None;
    self.current_index = 0;

    if was_playing {
      info!("Playback stopped");
    }

    was_playing
  }

  /// Changes the speed multiplier.
  ///
  /// A wait already in progress is re-armed keeping the elapsed part of the
  /// original interval: `remaining = max(original - elapsed / speed, 0)`.
  pub fn set_speed(&mut self, speed: f64, now: ClockTime) -> Result<(), PlaybackError> {
    let speed = check_speed(speed).map_err(|err| {
      warn!("{}", err);
      err
    })?;

    self.speed = speed;

    if self.phase != Phase::Running {
      debug!("Speed set to {}", speed);
      return Ok(());
    }

    if let Some(deadline) = self.deadline {
      let original = self.original_interval_ms as f64;
      let remaining = deadline.saturating_sub(now).to_millis_f64();
      let elapsed = original - remaining;
      let adjusted_elapsed = elapsed / speed;
      let remaining = (original - adjusted_elapsed).max(0.0);
      let delay = self.clamp_delay(ClockTime::from_millis_f64(remaining));
      self.deadline = Some(now + delay);

      debug!(
        "Speed set to {}, next event in {:.3} ms",
        speed,
        delay.to_millis_f64()
      );
    }

    Ok(())
  }

  /// Fires the pending event if its deadline has been reached.
  ///
  /// `dispatch` receives the event and returns the time at which it finished,
  /// the next interval counts from there. Returns the index of the fired event.
  pub fn fire<D>(&mut self, now: ClockTime, dispatch: D) -> Option<usize>
  where
    D: FnOnce(usize, &ChordEvent) -> ClockTime,
  {
    match self.deadline {
      Some(deadline) if deadline <= now => {}
      _ => return None,
    }

    self.deadline = None;

    if self.phase == Phase::LeadIn {
      debug!("Lead-in elapsed");
      self.phase = Phase::Running;
    }

    let timeline = Arc::clone(&self.timeline);
    let index = self.current_index;

    let event = match timeline.get(index) {
      Some(event) => event,
      None => {
        self.finish();
        return None;
      }
    };

    trace!("Firing event {} at {:.3} s", index, event.onset());
    let completed = dispatch(index, event);

    self.current_index += 1;

    match timeline.interval_ms(index) {
      Some(interval_ms) => {
        self.original_interval_ms = interval_ms;
        let delay = self.scaled_delay(interval_ms);
        self.deadline = Some(completed + delay);
        trace!(
          "Next event in {:.3} ms ({} ms at speed {})",
          delay.to_millis_f64(),
          interval_ms,
          self.speed
        );
      }
      None => self.finish(),
    }

    Some(index)
  }

  fn finish(&mut self) {
    info!("Playback finished after {} events", self.current_index);
    self.phase = Phase::Idle;
    self.deadline = None;
  }

  fn scaled_delay(&self, interval_ms: u64) -> ClockTime {
    self.clamp_delay(ClockTime::from_millis_f64(interval_ms as f64 / self.speed))
  }

  fn clamp_delay(&self, delay: ClockTime) -> ClockTime {
    delay.max(self.min_delay)
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use super::{Phase, PlaybackError, Scheduler};
  use crate::config::Playback as PlaybackConfig;
  use crate::time::ClockTime;
  use crate::timeline::{Note, Timeline};

  fn ms(millis: u64) -> ClockTime {
    ClockTime::from_millis(millis)
  }

  fn config() -> PlaybackConfig {
    PlaybackConfig {
      lead_in_ms: 5000,
      min_delay_ms: 1,
      speed: 1.0,
    }
  }

  fn example_timeline() -> Arc<Timeline> {
    Arc::new(Timeline::build(vec![
      Note::new("C4", 0.0),
      Note::new("E4", 0.0),
      Note::new("G4", 0.5),
      Note::new("C5", 1.5),
    ]))
  }

  fn scheduler() -> Scheduler {
    let mut scheduler = Scheduler::new(&config()).unwrap();
    scheduler.load(example_timeline());
    scheduler
  }

  /// Fires at `now`, with a dispatch that takes no time.
  fn fire_at(scheduler: &mut Scheduler, now: ClockTime) -> Option<usize> {
    scheduler.fire(now, |_, _| now)
  }

  #[test]
  pub fn new_rejects_invalid_speed() {
    let mut config = config();
    config.speed = 0.0;
    assert!(Scheduler::new(&config).is_err());
  }

  #[test]
  pub fn start_with_empty_timeline() {
    let mut scheduler = Scheduler::new(&config()).unwrap();
    assert!(!scheduler.start(ms(0)));
    assert_eq!(scheduler.phase(), Phase::Idle);
    assert_eq!(scheduler.deadline(), None);
  }

  #[test]
  pub fn start_arms_lead_in() {
    let mut scheduler = scheduler();
    assert!(scheduler.start(ms(100)));
    assert_eq!(scheduler.phase(), Phase::LeadIn);
    assert_eq!(scheduler.deadline(), Some(ms(5100)));
    assert_eq!(scheduler.timeout(ms(1100)), Some(ms(4000)));
    assert_eq!(scheduler.timeout(ms(9000)), Some(ms(0)));
  }

  #[test]
  pub fn start_while_playing_is_ignored() {
    let mut scheduler = scheduler();
    assert!(scheduler.start(ms(0)));
    assert!(!scheduler.start(ms(1000)));
    assert_eq!(scheduler.deadline(), Some(ms(5000)));
  }

  #[test]
  pub fn fire_before_deadline_does_nothing() {
    let mut scheduler = scheduler();
    assert_eq!(fire_at(&mut scheduler, ms(0)), None);
    scheduler.start(ms(0));
    assert_eq!(fire_at(&mut scheduler, ms(4999)), None);
    assert_eq!(scheduler.phase(), Phase::LeadIn);
    assert_eq!(scheduler.current_index(), 0);
  }

  #[test]
  pub fn fire_runs_the_timeline_in_order() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));

    let mut fired = Vec::new();
    let first = scheduler.fire(ms(5000), |index, event| {
      fired.push((index, event.keys()));
      ms(5000)
    });
    assert_eq!(first, Some(0));
    assert_eq!(scheduler.phase(), Phase::Running);
    assert_eq!(scheduler.original_interval_ms(), 500);
    assert_eq!(scheduler.deadline(), Some(ms(5500)));

    let second = scheduler.fire(ms(5500), |index, event| {
      fired.push((index, event.keys()));
      ms(5500)
    });
    assert_eq!(second, Some(1));
    assert_eq!(scheduler.original_interval_ms(), 1000);
    assert_eq!(scheduler.deadline(), Some(ms(6500)));

    let third = scheduler.fire(ms(6500), |index, event| {
      fired.push((index, event.keys()));
      ms(6500)
    });
    assert_eq!(third, Some(2));
    assert_eq!(scheduler.phase(), Phase::Idle);
    assert_eq!(scheduler.deadline(), None);
    assert_eq!(scheduler.current_index(), 3);

    assert_eq!(
      fired,
      vec![(0, vec!['8', '0']), (1, vec!['w']), (2, vec!['t'])]
    );
  }

  #[test]
  pub fn fire_counts_interval_after_dispatch() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));
    scheduler.fire(ms(5000), |_, _| ms(5020));
    assert_eq!(scheduler.deadline(), Some(ms(5520)));
  }

  #[test]
  pub fn fire_scales_interval_by_speed() {
    let mut scheduler = scheduler();
    scheduler.set_speed(2.0, ms(0)).unwrap();
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));
    assert_eq!(scheduler.deadline(), Some(ms(5250)));

    fire_at(&mut scheduler, ms(5250));
    assert_eq!(scheduler.deadline(), Some(ms(5750)));
  }

  #[test]
  pub fn fire_unmapped_event_still_advances() {
    let mut scheduler = Scheduler::new(&config()).unwrap();
    scheduler.load(Arc::new(Timeline::build(vec![
      Note::new("C1", 0.0),
      Note::new("C4", 0.25),
    ])));
    scheduler.start(ms(0));

    let mut keys = Vec::new();
    scheduler.fire(ms(5000), |_, event| {
      keys.push(event.keys());
      ms(5000)
    });
    assert_eq!(scheduler.current_index(), 1);
    assert_eq!(scheduler.deadline(), Some(ms(5250)));
    assert_eq!(keys, vec![Vec::<char>::new()]);
  }

  #[test]
  pub fn stop_cancels_and_rewinds() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));
    assert_eq!(scheduler.current_index(), 1);

    assert!(scheduler.stop());
    assert_eq!(scheduler.phase(), Phase::Idle);
    assert_eq!(scheduler.deadline(), None);
    assert_eq!(scheduler.current_index(), 0);
    assert_eq!(fire_at(&mut scheduler, ms(10_000)), None);

    assert!(!scheduler.stop());
  }

  #[test]
  pub fn start_after_finish_rewinds() {
    let mut scheduler = Scheduler::new(&config()).unwrap();
    scheduler.load(Arc::new(Timeline::build(vec![Note::new("C4", 0.0)])));
    scheduler.start(ms(0));
    assert_eq!(fire_at(&mut scheduler, ms(5000)), Some(0));
    assert_eq!(scheduler.phase(), Phase::Idle);
    assert_eq!(scheduler.current_index(), 1);

    assert!(scheduler.start(ms(6000)));
    assert_eq!(scheduler.current_index(), 0);
  }

  #[test]
  pub fn load_stops_playback() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));

    scheduler.load(Arc::new(Timeline::build(vec![Note::new("D4", 0.0)])));
    assert_eq!(scheduler.phase(), Phase::Idle);
    assert_eq!(scheduler.current_index(), 0);
    assert_eq!(scheduler.status().len, 1);
  }

  #[test]
  pub fn set_speed_rejects_invalid_values() {
    let mut scheduler = scheduler();
    for speed in &[0.0, -1.0, std::f64::NAN, std::f64::INFINITY] {
      match scheduler.set_speed(*speed, ms(0)) {
        Err(PlaybackError::InvalidSpeed { .. }) => {}
        other => panic!("unexpected result {:?}", other),
      }
    }
    assert_eq!(scheduler.speed(), 1.0);
  }

  #[test]
  pub fn set_speed_while_idle_is_stored() {
    let mut scheduler = scheduler();
    scheduler.set_speed(1.5, ms(0)).unwrap();
    assert_eq!(scheduler.speed(), 1.5);
    assert_eq!(scheduler.deadline(), None);
    assert_eq!(scheduler.status().speed, 1.5);
  }

  #[test]
  pub fn set_speed_during_lead_in_keeps_lead_in() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));
    scheduler.set_speed(2.0, ms(1000)).unwrap();
    assert_eq!(scheduler.deadline(), Some(ms(5000)));
    assert_eq!(scheduler.speed(), 2.0);
  }

  #[test]
  pub fn set_speed_rescales_the_pending_wait() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));
    assert_eq!(scheduler.deadline(), Some(ms(5500)));

    // 200 ms elapsed of 500: 500 - 200 / 0.5 = 100 ms left
    scheduler.set_speed(0.5, ms(5200)).unwrap();
    assert_eq!(scheduler.deadline(), Some(ms(5300)));
    assert_eq!(scheduler.original_interval_ms(), 500);
    assert_eq!(scheduler.current_index(), 1);
  }

  #[test]
  pub fn set_speed_same_value_keeps_the_deadline() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));

    scheduler.set_speed(1.0, ms(5200)).unwrap();
    assert_eq!(scheduler.deadline(), Some(ms(5500)));
  }

  #[test]
  pub fn set_speed_same_value_rescales_against_the_unscaled_interval() {
    let mut scheduler = scheduler();
    scheduler.set_speed(2.0, ms(0)).unwrap();
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));
    assert_eq!(scheduler.deadline(), Some(ms(5250)));

    // 150 ms left of an unscaled 500: 500 - (500 - 150) / 2 = 325 ms left
    scheduler.set_speed(2.0, ms(5100)).unwrap();
    assert_eq!(scheduler.deadline(), Some(ms(5425)));
    assert_eq!(scheduler.original_interval_ms(), 500);
  }

  #[test]
  pub fn set_speed_clamps_to_min_delay() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));

    // 400 ms elapsed of 500: 500 - 400 / 0.5 < 0
    scheduler.set_speed(0.5, ms(5400)).unwrap();
    assert_eq!(scheduler.deadline(), Some(ms(5401)));
  }

  #[test]
  pub fn set_speed_never_fires_twice() {
    let mut scheduler = scheduler();
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));

    scheduler.set_speed(0.5, ms(5100)).unwrap();
    scheduler.set_speed(2.0, ms(5150)).unwrap();
    scheduler.set_speed(1.0, ms(5200)).unwrap();

    let deadline = scheduler.deadline().unwrap();
    assert_eq!(fire_at(&mut scheduler, deadline), Some(1));
    assert_eq!(fire_at(&mut scheduler, deadline), None);
    assert_eq!(scheduler.current_index(), 2);
  }

  #[test]
  pub fn tiny_speed_saturates_the_deadline() {
    let mut scheduler = scheduler();
    scheduler.set_speed(1e-12, ms(0)).unwrap();
    scheduler.start(ms(0));

    assert_eq!(fire_at(&mut scheduler, ms(5000)), Some(0));
    assert_eq!(scheduler.phase(), Phase::Running);
    assert_eq!(scheduler.deadline(), Some(ClockTime::max_value()));
    assert_eq!(fire_at(&mut scheduler, ms(6000)), None);

    scheduler.set_speed(1e-12, ms(6000)).unwrap();
    assert_eq!(scheduler.deadline(), Some(ClockTime::max_value()));
    assert_eq!(scheduler.current_index(), 1);
  }

  #[test]
  pub fn far_apart_onsets_saturate_the_deadline() {
    let mut scheduler = Scheduler::new(&config()).unwrap();
    scheduler.load(Arc::new(Timeline::build(vec![
      Note::new("C4", 0.0),
      Note::new("E4", 1e11),
    ])));
    scheduler.start(ms(0));

    assert_eq!(fire_at(&mut scheduler, ms(5000)), Some(0));
    assert_eq!(scheduler.deadline(), Some(ClockTime::max_value()));
    assert!(scheduler.stop());
  }

  #[test]
  pub fn zero_intervals_are_clamped() {
    let mut scheduler = Scheduler::new(&config()).unwrap();
    scheduler.load(Arc::new(Timeline::build(vec![
      Note::new("C4", 0.0),
      Note::new("E4", 0.0004),
    ])));
    scheduler.start(ms(0));
    fire_at(&mut scheduler, ms(5000));
    assert_eq!(scheduler.original_interval_ms(), 0);
    assert_eq!(scheduler.deadline(), Some(ms(5001)));
  }
}
