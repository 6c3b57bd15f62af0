//! Capabilities the core consumes: a wall clock, an audio player and a
//! random source for challenges.
//!
//! The scheduler is generic over these so hosts can plug in real devices
//! and tests can drive time and inspect audio deterministically.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Local;
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use crate::alarm::{AlarmTime, SoundRef};
use crate::error::PlayerError;

/// Source of the current wall-clock hour and minute.
pub trait Clock {
    fn now(&self) -> AlarmTime;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> AlarmTime {
        AlarmTime::from_timelike(&Local::now())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    now: AlarmTime,
}

impl ManualClock {
    pub fn new(now: AlarmTime) -> Self {
        Self { now }
    }

    pub fn set(&mut self, now: AlarmTime) {
        self.now = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> AlarmTime {
        self.now
    }
}

/// Handle to a sound loaded by a [`Player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u64);

/// Audio playback device.
///
/// Calls are fire-and-forget; the scheduler never waits on playback.
pub trait Player {
    fn load(&mut self, sound: &SoundRef) -> Result<SoundHandle, PlayerError>;

    fn play(&mut self, handle: SoundHandle, looping: bool) -> Result<(), PlayerError>;

    /// Stopping a handle that is not playing is a no-op.
    fn stop(&mut self, handle: SoundHandle);

    fn set_volume(&mut self, handle: SoundHandle, volume: f32);

    fn is_playing(&self, handle: SoundHandle) -> bool;
}

/// In-process player that only tracks state.
///
/// Used by headless hosts and by tests to observe what the scheduler asked
/// the audio device to do.
#[derive(Debug, Default)]
pub struct MemoryPlayer {
    next_handle: u64,
    loaded: HashMap<SoundHandle, SoundRef>,
    playing: HashSet<SoundHandle>,
    looping: HashSet<SoundHandle>,
    volumes: HashMap<SoundHandle, f32>,
    unavailable: HashSet<SoundRef>,
    refused: HashSet<SoundRef>,
    play_calls: Vec<SoundRef>,
}

impl MemoryPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future `load` of `sound` fail.
    pub fn mark_unavailable(&mut self, sound: SoundRef) {
        self.unavailable.insert(sound);
    }

    /// Make every future `play` of `sound` fail after a successful load.
    pub fn refuse_playback(&mut self, sound: SoundRef) {
        self.refused.insert(sound);
    }

    /// Handles loaded and not yet stopped.
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn sound_of(&self, handle: SoundHandle) -> Option<&SoundRef> {
        self.loaded.get(&handle)
    }

    pub fn volume(&self, handle: SoundHandle) -> Option<f32> {
        self.volumes.get(&handle).copied()
    }

    pub fn is_looping(&self, handle: SoundHandle) -> bool {
        self.looping.contains(&handle)
    }

    /// Sound refs of everything currently audible.
    pub fn playing_sounds(&self) -> Vec<&SoundRef> {
        self.playing
            .iter()
            .filter_map(|h| self.loaded.get(h))
            .collect()
    }

    /// How many times playback of `sound` was started.
    pub fn play_count(&self, sound: &SoundRef) -> usize {
        self.play_calls.iter().filter(|s| *s == sound).count()
    }
}

impl Player for MemoryPlayer {
    fn load(&mut self, sound: &SoundRef) -> Result<SoundHandle, PlayerError> {
        if self.unavailable.contains(sound) {
            return Err(PlayerError::LoadFailed {
                sound: sound.to_string(),
                message: "sound marked unavailable".into(),
            });
        }
        self.next_handle += 1;
        let handle = SoundHandle(self.next_handle);
        self.loaded.insert(handle, sound.clone());
        Ok(handle)
    }

    fn play(&mut self, handle: SoundHandle, looping: bool) -> Result<(), PlayerError> {
        let sound = self
            .loaded
            .get(&handle)
            .ok_or_else(|| PlayerError::PlaybackFailed(format!("unknown handle {}", handle.0)))?;
        if self.refused.contains(sound) {
            return Err(PlayerError::PlaybackFailed(format!("{sound} refused to play")));
        }
        self.play_calls.push(sound.clone());
        self.playing.insert(handle);
        if looping {
            self.looping.insert(handle);
        }
        Ok(())
    }

    fn stop(&mut self, handle: SoundHandle) {
        self.playing.remove(&handle);
        self.looping.remove(&handle);
        self.loaded.remove(&handle);
    }

    fn set_volume(&mut self, handle: SoundHandle, volume: f32) {
        self.volumes.insert(handle, volume);
    }

    fn is_playing(&self, handle: SoundHandle) -> bool {
        self.playing.contains(&handle)
    }
}

/// Uniform integer draws for challenge operands.
pub trait ChallengeSource {
    /// Uniform draw from `low..=high`.
    fn draw(&mut self, low: u32, high: u32) -> u32;
}

/// PCG-backed source. Seeded for reproducible drills, entropy otherwise.
#[derive(Debug, Clone)]
pub struct RngChallengeSource {
    rng: Mcg128Xsl64,
}

impl RngChallengeSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => Mcg128Xsl64::seed_from_u64(s),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }
}

impl Default for RngChallengeSource {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ChallengeSource for RngChallengeSource {
    fn draw(&mut self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
///
/// Values are clamped into the requested range.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: VecDeque<u32>,
}

impl ScriptedSource {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl ChallengeSource for ScriptedSource {
    fn draw(&mut self, low: u32, high: u32) -> u32 {
        let v = match self.values.pop_front() {
            Some(v) => {
                self.values.push_back(v);
                v
            }
            None => low,
        };
        v.clamp(low, high.max(low))
    }
}
