//! Terminal "audio" for the CLI host.
//!
//! Decoding audio files is not this binary's job. A sound loads if it is
//! the built-in `bell` or an existing file, and anything audible is
//! rendered as a terminal bell once per tick.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use mathalarm_core::{Player, PlayerError, SoundHandle, SoundRef};

/// Sound ref that always loads and needs no file.
pub const BUILTIN_BELL: &str = "bell";

#[derive(Debug)]
struct Loaded {
    sound: SoundRef,
    volume: f32,
    playing: bool,
}

#[derive(Debug, Default)]
pub struct TerminalPlayer {
    next_handle: u64,
    sounds: HashMap<SoundHandle, Loaded>,
}

impl TerminalPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one bell if anything is playing. Called by the host after each
    /// tick.
    pub fn render(&self) -> std::io::Result<()> {
        let loudest = self
            .sounds
            .values()
            .filter(|l| l.playing)
            .map(|l| l.volume)
            .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.max(v))));
        if let Some(volume) = loudest {
            let mut err = std::io::stderr().lock();
            write!(err, "\x07")?;
            err.flush()?;
            tracing::trace!("Bell at volume {:.2}", volume);
        }
        Ok(())
    }
}

impl Player for TerminalPlayer {
    fn load(&mut self, sound: &SoundRef) -> Result<SoundHandle, PlayerError> {
        if sound.as_str() != BUILTIN_BELL && !Path::new(sound.as_str()).is_file() {
            return Err(PlayerError::LoadFailed {
                sound: sound.to_string(),
                message: "no such file".into(),
            });
        }
        self.next_handle += 1;
        let handle = SoundHandle(self.next_handle);
        self.sounds.insert(
            handle,
            Loaded {
                sound: sound.clone(),
                volume: 1.0,
                playing: false,
            },
        );
        Ok(handle)
    }

    fn play(&mut self, handle: SoundHandle, looping: bool) -> Result<(), PlayerError> {
        let loaded = self
            .sounds
            .get_mut(&handle)
            .ok_or_else(|| PlayerError::PlaybackFailed(format!("unknown handle {}", handle.0)))?;
        loaded.playing = true;
        tracing::debug!("Playing {} (loop: {})", loaded.sound, looping);
        Ok(())
    }

    fn stop(&mut self, handle: SoundHandle) {
        // Handles are single-use; drop them once stopped.
        self.sounds.remove(&handle);
    }

    fn set_volume(&mut self, handle: SoundHandle, volume: f32) {
        if let Some(loaded) = self.sounds.get_mut(&handle) {
            loaded.volume = volume;
        }
    }

    fn is_playing(&self, handle: SoundHandle) -> bool {
        self.sounds.get(&handle).is_some_and(|l| l.playing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bell_always_loads() {
        let mut player = TerminalPlayer::new();
        let h = player.load(&SoundRef::new(BUILTIN_BELL)).unwrap();
        player.play(h, true).unwrap();
        assert!(player.is_playing(h));
        player.stop(h);
        assert!(!player.is_playing(h));
    }

    #[test]
    fn missing_file_fails_to_load() {
        let mut player = TerminalPlayer::new();
        let err = player
            .load(&SoundRef::new("/definitely/not/here.mp3"))
            .unwrap_err();
        assert!(matches!(err, PlayerError::LoadFailed { .. }));
    }
}
