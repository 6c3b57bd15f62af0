//! Alarm scheduler.
//!
//! The scheduler is a wall-clock-driven state machine with no internal
//! thread. The host calls [`AlarmScheduler::on_tick`] once per second and
//! forwards user actions; every transition is queued as an [`Event`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Ringing -> Escalated -> Idle   (solved)
//!           |            |
//!           +------------+------> Idle   (disabled / removed)
//! ```
//!
//! A puzzle session is open for as long as an alarm is Ringing or
//! Escalated. Solving it is the only way back to Idle besides cancelling
//! the alarm outright.
//!
//! The siren is a single shared device. Per-alarm sound handles and the
//! siren flag are kept apart so dismissing one alarm never silences another
//! alarm's own sound.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::puzzle::{Challenge, Outcome, PuzzleGate, PuzzleSession};
use super::ramp::VolumeRamp;
use super::record::{AlarmId, AlarmRecord, AlarmSnapshot, AlarmState, AlarmTime, SoundRef};
use crate::error::{AlarmError, ValidationError};
use crate::events::Event;
use crate::ports::{ChallengeSource, Clock, Player, SoundHandle};

pub const DEFAULT_MIN_VOLUME: f32 = 0.1;
pub const DEFAULT_MAX_VOLUME: f32 = 1.0;
pub const DEFAULT_SOUND: &str = "default_sound.mp3";
pub const DEFAULT_SIREN_SOUND: &str = "nuclear_sound.mp3";

/// Tunables for the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSettings {
    /// Volume every alarm starts at and returns to when idle.
    pub min_volume: f32,
    /// Ramp ceiling, also the siren volume.
    pub max_volume: f32,
    pub ramp: VolumeRamp,
    pub puzzle: PuzzleGate,
    pub default_sound: SoundRef,
    pub siren_sound: SoundRef,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            min_volume: DEFAULT_MIN_VOLUME,
            max_volume: DEFAULT_MAX_VOLUME,
            ramp: VolumeRamp::default(),
            puzzle: PuzzleGate::default(),
            default_sound: SoundRef::new(DEFAULT_SOUND),
            siren_sound: SoundRef::new(DEFAULT_SIREN_SOUND),
        }
    }
}

impl AlarmSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |field: &str, message: &str| ValidationError::InvalidValue {
            field: field.into(),
            message: message.into(),
        };
        if !(self.max_volume > 0.0) {
            return Err(invalid("max_volume", "must be greater than 0"));
        }
        if !(self.min_volume >= 0.0 && self.min_volume <= self.max_volume) {
            return Err(invalid("min_volume", "must be between 0 and max_volume"));
        }
        if !(self.ramp.step_fraction > 0.0) {
            return Err(invalid("ramp_step_fraction", "must be greater than 0"));
        }
        if self.puzzle.operand_min > self.puzzle.operand_max {
            return Err(invalid("operand_min", "must not exceed operand_max"));
        }
        if self.puzzle.required_streak == 0 {
            return Err(invalid("required_streak", "must be at least 1"));
        }
        Ok(())
    }
}

/// Shared siren state. One device for the whole process, owned by the
/// single escalated alarm while active.
#[derive(Debug, Default)]
struct Siren {
    active: bool,
    handle: Option<SoundHandle>,
}

pub struct AlarmScheduler<C, P, R> {
    clock: C,
    player: P,
    source: R,
    settings: AlarmSettings,
    alarms: Vec<AlarmRecord>,
    next_id: u64,
    siren: Siren,
    /// Whether the per-second ramp is doing anything. Only true while at
    /// least one alarm is Ringing or Escalated.
    ramp_running: bool,
    events: Vec<Event>,
}

impl<C: Clock, P: Player, R: ChallengeSource> AlarmScheduler<C, P, R> {
    pub fn new(clock: C, player: P, source: R, settings: AlarmSettings) -> Self {
        Self {
            clock,
            player,
            source,
            settings,
            alarms: Vec::new(),
            next_id: 1,
            siren: Siren::default(),
            ramp_running: false,
            events: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    pub fn siren_active(&self) -> bool {
        self.siren.active
    }

    pub fn ramp_running(&self) -> bool {
        self.ramp_running
    }

    pub fn alarms(&self) -> &[AlarmRecord] {
        &self.alarms
    }

    pub fn alarm(&self, id: AlarmId) -> Option<&AlarmRecord> {
        self.alarms.iter().find(|a| a.id == id)
    }

    pub fn snapshot(&self) -> Vec<AlarmSnapshot> {
        self.alarms.iter().map(AlarmRecord::snapshot).collect()
    }

    pub fn default_sound(&self) -> &SoundRef {
        &self.settings.default_sound
    }

    /// Open puzzle session for a ringing alarm.
    pub fn session(&self, id: AlarmId) -> Option<&PuzzleSession> {
        self.alarm(id)?.session.as_ref()
    }

    pub fn current_challenge(&self, id: AlarmId) -> Option<Challenge> {
        self.session(id).map(PuzzleSession::challenge)
    }

    /// Take every event queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the sound used by alarms without their own sound and as the
    /// fallback when an alarm's sound fails to load.
    pub fn set_default_sound(&mut self, sound: SoundRef) {
        tracing::info!("Default alarm sound set to {}", sound);
        self.settings.default_sound = sound;
    }

    /// New alarms start idle, enabled and at the volume floor.
    pub fn add_alarm(&mut self, time: AlarmTime, sound: Option<SoundRef>) -> AlarmId {
        let id = AlarmId(self.next_id);
        self.next_id += 1;
        self.alarms
            .push(AlarmRecord::new(id, time, sound, self.settings.min_volume));
        tracing::info!("Alarm {} set for {}", id, time);
        self.events.push(Event::AlarmAdded {
            id,
            time,
            at: Utc::now(),
        });
        id
    }

    /// Change time and/or sound. Ring progress of a ringing alarm is left
    /// alone; the new values take effect on the next trigger.
    ///
    /// Returns `false` for an unknown id.
    pub fn edit_alarm(
        &mut self,
        id: AlarmId,
        time: Option<AlarmTime>,
        sound: Option<SoundRef>,
    ) -> bool {
        let Some(alarm) = self.alarms.iter_mut().find(|a| a.id == id) else {
            tracing::debug!("Edit ignored for unknown alarm {}", id);
            return false;
        };
        if let Some(time) = time {
            alarm.time = time;
        }
        if let Some(sound) = sound {
            alarm.sound = Some(sound);
        }
        self.events.push(Event::AlarmEdited {
            id,
            time: alarm.time,
            sound: alarm.sound.clone(),
            at: Utc::now(),
        });
        true
    }

    /// Delete an alarm, silencing it first if it is ringing.
    ///
    /// Unknown ids are ignored; returns whether anything was removed.
    pub fn remove_alarm(&mut self, id: AlarmId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        if self.alarms[idx].state.is_active() {
            self.cancel(idx);
        }
        self.alarms.remove(idx);
        tracing::info!("Alarm {} removed", id);
        self.events.push(Event::AlarmRemoved { id, at: Utc::now() });
        true
    }

    /// Toggle whether an alarm may fire. Disabling a ringing alarm cancels
    /// it immediately.
    ///
    /// Unknown ids are ignored; returns whether the alarm exists.
    pub fn set_enabled(&mut self, id: AlarmId, enabled: bool) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        if self.alarms[idx].enabled == enabled {
            return true;
        }
        self.alarms[idx].enabled = enabled;
        if enabled {
            self.events.push(Event::AlarmEnabled { id, at: Utc::now() });
        } else {
            if self.alarms[idx].state.is_active() {
                self.cancel(idx);
            }
            self.events.push(Event::AlarmDisabled { id, at: Utc::now() });
        }
        true
    }

    /// Check an answer for a ringing alarm's puzzle.
    ///
    /// `Solved` dismisses the alarm. Any other outcome issues a fresh
    /// challenge.
    pub fn submit_answer(&mut self, id: AlarmId, value: i64) -> Result<Outcome, AlarmError> {
        let idx = self.index_of(id).ok_or(AlarmError::UnknownAlarm(id))?;
        let gate = self.settings.puzzle;
        let alarm = &mut self.alarms[idx];
        let session = alarm
            .session
            .as_mut()
            .ok_or(AlarmError::NoActiveSession(id))?;

        let outcome = session.submit(value);
        match outcome {
            Outcome::Solved => self.dismiss(idx),
            Outcome::Correct | Outcome::Incorrect => {
                if outcome == Outcome::Incorrect {
                    tracing::debug!("Wrong answer for alarm {}, streak reset", id);
                    self.events.push(Event::AnswerRejected { id, at: Utc::now() });
                }
                session.next_challenge(gate.new_challenge(&mut self.source));
                let challenge = session.challenge();
                let correct_streak = session.correct_streak();
                self.events.push(Event::ChallengeIssued {
                    id,
                    a: challenge.a,
                    b: challenge.b,
                    correct_streak,
                    at: Utc::now(),
                });
            }
        }
        Ok(outcome)
    }

    /// Call once per second. Advances ringing alarms, then checks the clock
    /// for alarms due this minute.
    pub fn on_tick(&mut self) {
        self.ramp_tick();
        self.match_tick();
    }

    /// Fire every enabled idle alarm whose hour and minute match the clock.
    pub fn match_tick(&mut self) {
        let now = self.clock.now();
        for idx in 0..self.alarms.len() {
            let alarm = &mut self.alarms[idx];
            if alarm.fired_in.is_some_and(|t| t != now) {
                alarm.fired_in = None;
            }
            if alarm.matches(now) {
                self.trigger(idx, now);
            }
        }
    }

    /// Raise volume and ring time of every Ringing/Escalated alarm by one
    /// second, escalating those that crossed the timeout.
    pub fn ramp_tick(&mut self) {
        if !self.ramp_running {
            return;
        }
        let ramp = self.settings.ramp;
        let max = self.settings.max_volume;
        for idx in 0..self.alarms.len() {
            let alarm = &mut self.alarms[idx];
            if !alarm.state.is_active() {
                continue;
            }
            alarm.current_volume = ramp.next_volume(alarm.current_volume, max);
            alarm.ring_elapsed_secs = alarm.ring_elapsed_secs.saturating_add(1);
            if let Some(handle) = alarm.handle {
                self.player.set_volume(handle, alarm.current_volume);
            }
            tracing::trace!(
                "Alarm {} volume {:.2} after {}s",
                alarm.id,
                alarm.current_volume,
                alarm.ring_elapsed_secs
            );
            // A second overdue alarm keeps its own sound until the siren is
            // free, then escalates on the next tick.
            if alarm.state == AlarmState::Ringing
                && ramp.should_escalate(alarm.ring_elapsed_secs)
                && !self.siren.active
            {
                self.escalate(idx);
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn index_of(&self, id: AlarmId) -> Option<usize> {
        self.alarms.iter().position(|a| a.id == id)
    }

    fn trigger(&mut self, idx: usize, now: AlarmTime) {
        let floor = self.settings.min_volume;
        let session = self.settings.puzzle.open(&mut self.source);
        let challenge = session.challenge();

        let alarm = &mut self.alarms[idx];
        let id = alarm.id;
        let sound = alarm.sound.clone();
        alarm.state = AlarmState::Ringing;
        alarm.fired_in = Some(now);
        alarm.current_volume = floor;
        alarm.ring_elapsed_secs = 0;
        alarm.session = Some(session);

        tracing::info!("Alarm {} triggered at {}", id, now);
        self.events.push(Event::AlarmTriggered {
            id,
            time: now,
            at: Utc::now(),
        });

        let handle = self.start_alarm_sound(id, sound);
        self.alarms[idx].handle = handle;
        self.ramp_running = true;

        self.events.push(Event::ChallengeIssued {
            id,
            a: challenge.a,
            b: challenge.b,
            correct_streak: 0,
            at: Utc::now(),
        });
    }

    /// Load and loop an alarm's sound at the floor volume, falling back to
    /// the default sound. `None` means the alarm rings silently.
    fn start_alarm_sound(&mut self, id: AlarmId, sound: Option<SoundRef>) -> Option<SoundHandle> {
        let default = self.settings.default_sound.clone();
        let wanted = sound.unwrap_or_else(|| default.clone());

        let loaded = match self.player.load(&wanted) {
            Ok(handle) => Ok((handle, wanted.clone())),
            Err(err) if wanted != default => {
                tracing::warn!("{}; substituting default sound {}", err, default);
                self.player
                    .load(&default)
                    .map(|handle| (handle, default.clone()))
            }
            Err(err) => Err(err),
        };

        let (handle, sound) = match loaded {
            Ok(pair) => pair,
            Err(err) => {
                self.degraded(Some(id), wanted, err.to_string());
                return None;
            }
        };

        self.player.set_volume(handle, self.settings.min_volume);
        if let Err(err) = self.player.play(handle, true) {
            self.player.stop(handle);
            self.degraded(Some(id), sound, err.to_string());
            return None;
        }
        if !self.player.is_playing(handle) {
            self.degraded(Some(id), sound, "player reports nothing playing".into());
        }
        Some(handle)
    }

    fn escalate(&mut self, idx: usize) {
        let alarm = &mut self.alarms[idx];
        let id = alarm.id;
        let elapsed = alarm.ring_elapsed_secs;
        alarm.state = AlarmState::Escalated;
        if let Some(handle) = alarm.handle.take() {
            self.player.stop(handle);
        }
        tracing::info!("Alarm {} escalated after {}s", id, elapsed);
        self.events.push(Event::AlarmEscalated {
            id,
            ring_elapsed_secs: elapsed,
            at: Utc::now(),
        });
        self.start_siren();
    }

    fn start_siren(&mut self) {
        self.siren.active = true;
        let sound = self.settings.siren_sound.clone();
        let started = self.player.load(&sound).and_then(|handle| {
            self.player.set_volume(handle, self.settings.max_volume);
            match self.player.play(handle, true) {
                Ok(()) => Ok(handle),
                Err(err) => {
                    self.player.stop(handle);
                    Err(err)
                }
            }
        });
        match started {
            Ok(handle) => self.siren.handle = Some(handle),
            Err(err) => self.degraded(None, sound, err.to_string()),
        }
        tracing::info!("Siren started");
        self.events.push(Event::SirenStarted { at: Utc::now() });
    }

    /// No-op when the siren is already off.
    fn stop_siren(&mut self) {
        if !self.siren.active {
            return;
        }
        if let Some(handle) = self.siren.handle.take() {
            self.player.stop(handle);
        }
        self.siren.active = false;
        tracing::info!("Siren stopped");
        self.events.push(Event::SirenStopped { at: Utc::now() });
    }

    fn dismiss(&mut self, idx: usize) {
        let was_escalated = self.silence(idx);
        let id = self.alarms[idx].id;
        tracing::info!("Alarm {} dismissed", id);
        self.events.push(Event::AlarmDismissed { id, at: Utc::now() });
        if was_escalated {
            self.stop_siren();
        }
        self.refresh_ramp();
    }

    fn cancel(&mut self, idx: usize) {
        let was_escalated = self.silence(idx);
        let id = self.alarms[idx].id;
        tracing::info!("Alarm {} cancelled while ringing", id);
        self.events.push(Event::AlarmCancelled { id, at: Utc::now() });
        if was_escalated {
            self.stop_siren();
        }
        self.refresh_ramp();
    }

    /// Stop an alarm's own sound and reset it to idle. Returns whether it
    /// was escalated.
    fn silence(&mut self, idx: usize) -> bool {
        let floor = self.settings.min_volume;
        let alarm = &mut self.alarms[idx];
        let was_escalated = alarm.state == AlarmState::Escalated;
        if let Some(handle) = alarm.handle {
            self.player.stop(handle);
        }
        alarm.reset_to_idle(floor);
        was_escalated
    }

    fn refresh_ramp(&mut self) {
        self.ramp_running = self.alarms.iter().any(|a| a.state.is_active());
    }

    fn degraded(&mut self, id: Option<AlarmId>, sound: SoundRef, reason: String) {
        tracing::warn!("Sound {} unavailable, continuing silently: {}", sound, reason);
        self.events.push(Event::SoundDegraded {
            id,
            sound,
            reason,
            at: Utc::now(),
        });
    }
}
