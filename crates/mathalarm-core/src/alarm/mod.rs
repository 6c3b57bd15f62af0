mod puzzle;
mod ramp;
mod record;
mod scheduler;

pub use puzzle::{
    Challenge, Outcome, PuzzleGate, PuzzleSession, DEFAULT_OPERAND_MAX, DEFAULT_OPERAND_MIN,
    DEFAULT_REQUIRED_STREAK,
};
pub use ramp::{VolumeRamp, DEFAULT_ESCALATE_AFTER_SECS, DEFAULT_STEP_FRACTION};
pub use record::{AlarmId, AlarmRecord, AlarmSnapshot, AlarmState, AlarmTime, SoundRef};
pub use scheduler::{
    AlarmScheduler, AlarmSettings, DEFAULT_MAX_VOLUME, DEFAULT_MIN_VOLUME, DEFAULT_SIREN_SOUND,
    DEFAULT_SOUND,
};
