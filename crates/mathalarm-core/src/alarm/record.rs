//! Alarm records and the small value types they are built from.

use std::fmt;
use std::str::FromStr;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use super::puzzle::PuzzleSession;
use crate::error::ValidationError;
use crate::ports::SoundHandle;

/// Stable alarm identifier. Issued by the scheduler, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub u64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlarmId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(AlarmId)
    }
}

/// Wall-clock hour and minute. Seconds are deliberately not represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlarmTime {
    hour: u8,
    minute: u8,
}

impl AlarmTime {
    /// Build a time, rejecting anything outside `00:00..=23:59`.
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTime {
                input: format!("{hour}:{minute}"),
                message: "hour must be 0-23 and minute 0-59".into(),
            });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Truncate any chrono time value to hour:minute.
    pub fn from_timelike<T: Timelike>(t: &T) -> Self {
        Self {
            hour: t.hour() as u8,
            minute: t.minute() as u8,
        }
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for AlarmTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ValidationError::InvalidTime {
            input: s.to_string(),
            message: message.to_string(),
        };
        let (h, m) = s.trim().split_once(':').ok_or_else(|| invalid("expected HH:MM"))?;
        let hour = h.parse::<u8>().map_err(|_| invalid("hour is not a number"))?;
        let minute = m.parse::<u8>().map_err(|_| invalid("minute is not a number"))?;
        AlarmTime::new(hour, minute).map_err(|_| invalid("hour must be 0-23 and minute 0-59"))
    }
}

impl TryFrom<String> for AlarmTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlarmTime> for String {
    fn from(value: AlarmTime) -> Self {
        value.to_string()
    }
}

/// Opaque reference to a loadable sound asset (usually a file path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundRef(pub String);

impl SoundRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ring state of a single alarm.
///
/// Whether a puzzle session is open is tracked separately; an alarm can be
/// `Ringing` or `Escalated` while also solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    Idle,
    Ringing,
    Escalated,
}

impl AlarmState {
    pub fn is_active(self) -> bool {
        matches!(self, AlarmState::Ringing | AlarmState::Escalated)
    }
}

/// One configured alarm.
///
/// Only the scheduler mutates ring state; edits from the UI go through
/// [`AlarmScheduler`](super::AlarmScheduler) so they can respect an alarm
/// that is currently ringing.
#[derive(Debug, Clone)]
pub struct AlarmRecord {
    pub(crate) id: AlarmId,
    pub(crate) time: AlarmTime,
    /// `None` means "use the process-wide default sound".
    pub(crate) sound: Option<SoundRef>,
    pub(crate) enabled: bool,
    pub(crate) state: AlarmState,
    pub(crate) current_volume: f32,
    pub(crate) ring_elapsed_secs: u32,
    /// Handle of this alarm's own sound while it is audible.
    pub(crate) handle: Option<SoundHandle>,
    pub(crate) session: Option<PuzzleSession>,
    /// Minute in which the alarm last fired. Blocks a re-trigger inside the
    /// same minute after the alarm went back to idle.
    pub(crate) fired_in: Option<AlarmTime>,
}

impl AlarmRecord {
    pub(crate) fn new(id: AlarmId, time: AlarmTime, sound: Option<SoundRef>, floor: f32) -> Self {
        Self {
            id,
            time,
            sound,
            enabled: true,
            state: AlarmState::Idle,
            current_volume: floor,
            ring_elapsed_secs: 0,
            handle: None,
            session: None,
            fired_in: None,
        }
    }

    pub fn id(&self) -> AlarmId {
        self.id
    }

    pub fn time(&self) -> AlarmTime {
        self.time
    }

    pub fn sound(&self) -> Option<&SoundRef> {
        self.sound.as_ref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn ring_elapsed_secs(&self) -> u32 {
        self.ring_elapsed_secs
    }

    pub fn is_solving(&self) -> bool {
        self.session.is_some()
    }

    /// Should this alarm fire at `now`?
    pub(crate) fn matches(&self, now: AlarmTime) -> bool {
        self.enabled
            && self.state == AlarmState::Idle
            && self.time == now
            && self.fired_in != Some(now)
    }

    /// Drop ring progress and return to idle. Audio is the caller's job.
    pub(crate) fn reset_to_idle(&mut self, floor: f32) {
        self.state = AlarmState::Idle;
        self.current_volume = floor;
        self.ring_elapsed_secs = 0;
        self.handle = None;
        self.session = None;
    }

    pub fn snapshot(&self) -> AlarmSnapshot {
        AlarmSnapshot {
            id: self.id,
            time: self.time,
            enabled: self.enabled,
            state: self.state,
            solving: self.is_solving(),
            current_volume: self.current_volume,
            ring_elapsed_secs: self.ring_elapsed_secs,
            sound: self.sound.clone(),
        }
    }
}

/// Render-ready view of one alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSnapshot {
    pub id: AlarmId,
    pub time: AlarmTime,
    pub enabled: bool,
    pub state: AlarmState,
    pub solving: bool,
    pub current_volume: f32,
    pub ring_elapsed_secs: u32,
    pub sound: Option<SoundRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_alarm_time() {
        let t: AlarmTime = "07:05".parse().unwrap();
        assert_eq!(t.hour(), 7);
        assert_eq!(t.minute(), 5);
        assert_eq!(t.to_string(), "07:05");

        let t: AlarmTime = " 23:59 ".parse().unwrap();
        assert_eq!(t, AlarmTime::new(23, 59).unwrap());
    }

    #[test]
    fn reject_invalid_alarm_time() {
        for input in ["24:00", "12:60", "noon", "12", "-1:30", "7:xx", ""] {
            assert!(
                input.parse::<AlarmTime>().is_err(),
                "expected '{input}' to be rejected"
            );
        }
        assert!(AlarmTime::new(24, 0).is_err());
    }

    #[test]
    fn alarm_time_serializes_as_string() {
        let t = AlarmTime::new(6, 30).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"06:30\"");
        let back: AlarmTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<AlarmTime>("\"25:00\"").is_err());
    }

    #[test]
    fn from_timelike_drops_seconds() {
        let naive = chrono::NaiveTime::from_hms_opt(8, 15, 42).unwrap();
        assert_eq!(AlarmTime::from_timelike(&naive), AlarmTime::new(8, 15).unwrap());
    }

    #[test]
    fn disabled_alarm_never_matches() {
        let t = AlarmTime::new(7, 0).unwrap();
        let mut rec = AlarmRecord::new(AlarmId(1), t, None, 0.1);
        assert!(rec.matches(t));
        rec.enabled = false;
        assert!(!rec.matches(t));
    }

    #[test]
    fn ringing_alarm_does_not_match_again() {
        let t = AlarmTime::new(7, 0).unwrap();
        let mut rec = AlarmRecord::new(AlarmId(1), t, None, 0.1);
        rec.state = AlarmState::Ringing;
        assert!(!rec.matches(t));
    }

    #[test]
    fn fired_latch_blocks_same_minute() {
        let t = AlarmTime::new(7, 0).unwrap();
        let mut rec = AlarmRecord::new(AlarmId(1), t, None, 0.1);
        rec.fired_in = Some(t);
        assert!(!rec.matches(t));
    }

    #[test]
    fn reset_to_idle_clears_progress() {
        let t = AlarmTime::new(7, 0).unwrap();
        let mut rec = AlarmRecord::new(AlarmId(1), t, None, 0.1);
        rec.state = AlarmState::Escalated;
        rec.current_volume = 0.9;
        rec.ring_elapsed_secs = 301;
        rec.handle = Some(SoundHandle(4));
        rec.reset_to_idle(0.1);
        assert_eq!(rec.state(), AlarmState::Idle);
        assert_eq!(rec.current_volume(), 0.1);
        assert_eq!(rec.ring_elapsed_secs(), 0);
        assert!(rec.handle.is_none());
        assert!(!rec.is_solving());
    }
}
