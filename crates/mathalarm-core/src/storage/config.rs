//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Volume floor, ceiling and ramp step
//! - Escalation timeout and puzzle difficulty
//! - Default alarm sound and siren sound
//! - Log filter
//!
//! Alarms themselves are never written here; they only exist while the
//! process runs.
//!
//! Configuration is stored at `~/.config/mathalarm/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::alarm::{
    AlarmSettings, PuzzleGate, SoundRef, VolumeRamp, DEFAULT_ESCALATE_AFTER_SECS,
    DEFAULT_OPERAND_MAX, DEFAULT_OPERAND_MIN, DEFAULT_REQUIRED_STREAK, DEFAULT_SIREN_SOUND,
    DEFAULT_SOUND,
};
use crate::error::{ConfigError, ValidationError};

/// Alarm behaviour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_min_volume")]
    pub min_volume: f64,
    #[serde(default = "default_max_volume")]
    pub max_volume: f64,
    /// Fraction of `max_volume` added every second while ringing.
    #[serde(default = "default_step_fraction")]
    pub ramp_step_fraction: f64,
    #[serde(default = "default_escalate_after_secs")]
    pub escalate_after_secs: u32,
    #[serde(default = "default_required_streak")]
    pub required_streak: u32,
    #[serde(default = "default_operand_min")]
    pub operand_min: u32,
    #[serde(default = "default_operand_max")]
    pub operand_max: u32,
}

/// Sound asset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundsConfig {
    /// Played by alarms without their own sound, and as the fallback when
    /// an alarm's sound cannot be loaded.
    #[serde(default = "default_sound")]
    pub default_sound: String,
    #[serde(default = "default_siren_sound")]
    pub siren_sound: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mathalarm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub sounds: SoundsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_min_volume() -> f64 {
    0.1
}
fn default_max_volume() -> f64 {
    1.0
}
fn default_step_fraction() -> f64 {
    0.1
}
fn default_escalate_after_secs() -> u32 {
    DEFAULT_ESCALATE_AFTER_SECS
}
fn default_required_streak() -> u32 {
    DEFAULT_REQUIRED_STREAK
}
fn default_operand_min() -> u32 {
    DEFAULT_OPERAND_MIN
}
fn default_operand_max() -> u32 {
    DEFAULT_OPERAND_MAX
}
fn default_sound() -> String {
    DEFAULT_SOUND.into()
}
fn default_siren_sound() -> String {
    DEFAULT_SIREN_SOUND.into()
}
fn default_log_filter() -> String {
    "info".into()
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            min_volume: default_min_volume(),
            max_volume: default_max_volume(),
            ramp_step_fraction: default_step_fraction(),
            escalate_after_secs: default_escalate_after_secs(),
            required_streak: default_required_streak(),
            operand_min: default_operand_min(),
            operand_max: default_operand_max(),
        }
    }
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            default_sound: default_sound(),
            siren_sound: default_siren_sound(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alarm: AlarmConfig::default(),
            sounds: SoundsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/mathalarm"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value in memory by dot-separated key. The existing value's
    /// type decides how `value` is parsed, and the result must still form
    /// valid alarm settings.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated
            .alarm_settings()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Scheduler settings described by this config.
    pub fn alarm_settings(&self) -> Result<AlarmSettings, ValidationError> {
        let a = &self.alarm;
        let settings = AlarmSettings {
            min_volume: a.min_volume as f32,
            max_volume: a.max_volume as f32,
            ramp: VolumeRamp::new(a.ramp_step_fraction as f32, a.escalate_after_secs),
            puzzle: PuzzleGate {
                operand_min: a.operand_min,
                operand_max: a.operand_max,
                required_streak: a.required_streak,
            },
            default_sound: SoundRef::new(&self.sounds.default_sound),
            siren_sound: SoundRef::new(&self.sounds.siren_sound),
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.alarm.escalate_after_secs, 300);
        assert_eq!(parsed.sounds.siren_sound, "nuclear_sound.mp3");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[alarm]\nrequired_streak = 5\n").unwrap();
        assert_eq!(parsed.alarm.required_streak, 5);
        assert_eq!(parsed.alarm.operand_max, 20);
        assert_eq!(parsed.logging.filter, "info");
    }

    #[test]
    fn default_settings_match_engine_defaults() {
        let settings = Config::default().alarm_settings().unwrap();
        assert_eq!(settings, AlarmSettings::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("alarm.required_streak").as_deref(), Some("3"));
        assert_eq!(cfg.get("alarm.max_volume").as_deref(), Some("1.0"));
        assert_eq!(
            cfg.get("sounds.default_sound").as_deref(),
            Some("default_sound.mp3")
        );
        assert!(cfg.get("alarm.missing_key").is_none());
        assert!(cfg.get("alarm").is_none());
    }

    #[test]
    fn set_value_updates_number_and_string() {
        let mut cfg = Config::default();
        cfg.set_value("alarm.escalate_after_secs", "120").unwrap();
        cfg.set_value("alarm.max_volume", "2.5").unwrap();
        cfg.set_value("sounds.siren_sound", "klaxon.wav").unwrap();
        assert_eq!(cfg.alarm.escalate_after_secs, 120);
        assert_eq!(cfg.alarm.max_volume, 2.5);
        assert_eq!(cfg.sounds.siren_sound, "klaxon.wav");
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("alarm.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set_value("alarm", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set_value("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_value_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("alarm.required_streak", "three").is_err());
        assert!(cfg.set_value("alarm.required_streak", "2.5").is_err());
        assert_eq!(cfg.alarm.required_streak, 3);
    }

    #[test]
    fn set_value_rejects_inconsistent_settings() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("alarm.min_volume", "5").is_err());
        assert!(cfg.set_value("alarm.required_streak", "0").is_err());
        assert!(cfg.set_value("alarm.operand_min", "50").is_err());
        assert_eq!(cfg.alarm.min_volume, 0.1);
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.alarm.required_streak, 3);
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set_value("alarm.operand_max", "12").unwrap();
        cfg.set_value("logging.filter", "debug").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.alarm.operand_max, 12);
        assert_eq!(loaded.logging.filter, "debug");
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "alarm = [not toml").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }
}
