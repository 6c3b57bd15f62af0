//! # MathAlarm Core Library
//!
//! The alarm engine behind MathAlarm: an alarm that cannot be silenced with
//! a single action. A ringing alarm ramps its volume every second, escalates
//! to a shared siren after five minutes, and is only dismissed once the user
//! answers a streak of multiplication problems in a row.
//!
//! ## Architecture
//!
//! - **Scheduler**: A wall-clock-based state machine that requires the host
//!   to invoke `on_tick()` once per second
//! - **Ports**: Clock, audio player and random source are traits, so the
//!   same engine runs behind a terminal, a GUI or a test harness
//! - **Storage**: TOML-based configuration. Alarms live only as long as the
//!   process
//!
//! ## Key Components
//!
//! - [`AlarmScheduler`]: Core alarm state machine
//! - [`VolumeRamp`]: Linear volume growth and escalation timeout
//! - [`PuzzleGate`]: Arithmetic challenges and the dismissal streak
//! - [`Config`]: Application configuration management

pub mod alarm;
pub mod error;
pub mod events;
pub mod ports;
pub mod storage;

pub use alarm::{
    AlarmId, AlarmRecord, AlarmScheduler, AlarmSettings, AlarmSnapshot, AlarmState, AlarmTime,
    Challenge, Outcome, PuzzleGate, PuzzleSession, SoundRef, VolumeRamp,
};
pub use error::{AlarmError, ConfigError, CoreError, PlayerError, ValidationError};
pub use events::Event;
pub use ports::{
    ChallengeSource, Clock, ManualClock, MemoryPlayer, Player, RngChallengeSource,
    ScriptedSource, SoundHandle, SystemClock,
};
pub use storage::Config;
