use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmId, AlarmTime, SoundRef};

/// Every state change in the scheduler produces an Event.
/// The host drains them after each tick or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    AlarmAdded {
        id: AlarmId,
        time: AlarmTime,
        at: DateTime<Utc>,
    },
    AlarmEdited {
        id: AlarmId,
        time: AlarmTime,
        sound: Option<SoundRef>,
        at: DateTime<Utc>,
    },
    AlarmRemoved {
        id: AlarmId,
        at: DateTime<Utc>,
    },
    AlarmEnabled {
        id: AlarmId,
        at: DateTime<Utc>,
    },
    AlarmDisabled {
        id: AlarmId,
        at: DateTime<Utc>,
    },
    /// Alarm matched the wall clock and started ringing.
    AlarmTriggered {
        id: AlarmId,
        time: AlarmTime,
        at: DateTime<Utc>,
    },
    /// A new problem is waiting for an answer.
    ChallengeIssued {
        id: AlarmId,
        a: u32,
        b: u32,
        correct_streak: u32,
        at: DateTime<Utc>,
    },
    AnswerRejected {
        id: AlarmId,
        at: DateTime<Utc>,
    },
    /// Alarm rang past the timeout; its own sound was replaced by the siren.
    AlarmEscalated {
        id: AlarmId,
        ring_elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    SirenStarted {
        at: DateTime<Utc>,
    },
    SirenStopped {
        at: DateTime<Utc>,
    },
    /// Puzzle solved, alarm back to idle.
    AlarmDismissed {
        id: AlarmId,
        at: DateTime<Utc>,
    },
    /// Ringing alarm was disabled or removed before being solved.
    AlarmCancelled {
        id: AlarmId,
        at: DateTime<Utc>,
    },
    /// Audio could not be started. The alarm keeps going without sound.
    SoundDegraded {
        id: Option<AlarmId>,
        sound: SoundRef,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Alarm the event is about, if any.
    pub fn alarm_id(&self) -> Option<AlarmId> {
        match self {
            Event::AlarmAdded { id, .. }
            | Event::AlarmEdited { id, .. }
            | Event::AlarmRemoved { id, .. }
            | Event::AlarmEnabled { id, .. }
            | Event::AlarmDisabled { id, .. }
            | Event::AlarmTriggered { id, .. }
            | Event::ChallengeIssued { id, .. }
            | Event::AnswerRejected { id, .. }
            | Event::AlarmEscalated { id, .. }
            | Event::AlarmDismissed { id, .. }
            | Event::AlarmCancelled { id, .. } => Some(*id),
            Event::SoundDegraded { id, .. } => *id,
            Event::SirenStarted { .. } | Event::SirenStopped { .. } => None,
        }
    }
}
