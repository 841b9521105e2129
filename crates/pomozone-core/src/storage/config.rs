//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default work length and preferred break kind
//! - Focus-zone defaults and the monitored-region cap
//! - Which region transitions notify
//!
//! Configuration is stored at `~/.config/pomozone/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::session::{
    clamp_work_minutes, BreakKind, DEFAULT_WORK_MINUTES, LONG_BREAK_MINUTES, SHORT_BREAK_MINUTES,
};
use crate::zone::{
    NotificationPolicy, DEFAULT_NOTIFICATION_MESSAGE, DEFAULT_RADIUS_METERS, DEFAULT_REGION_LIMIT,
};

/// Focus-session preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default)]
    pub break_kind: BreakKind,
    /// Informational; the break policy is fixed.
    #[serde(default = "default_short_break")]
    pub short_break_minutes: u32,
    /// Informational; the break policy is fixed.
    #[serde(default = "default_long_break")]
    pub long_break_minutes: u32,
}

/// Focus-zone defaults and notification policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonesConfig {
    #[serde(default = "default_radius")]
    pub default_radius_meters: f64,
    #[serde(default = "default_message")]
    pub default_message: String,
    #[serde(default = "default_region_limit")]
    pub region_limit: usize,
    #[serde(default)]
    pub notify_on_exit: bool,
    #[serde(default)]
    pub notify_on_dwell: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pomozone/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub zones: ZonesConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_work_minutes() -> u32 {
    DEFAULT_WORK_MINUTES
}
fn default_short_break() -> u32 {
    SHORT_BREAK_MINUTES
}
fn default_long_break() -> u32 {
    LONG_BREAK_MINUTES
}
fn default_radius() -> f64 {
    DEFAULT_RADIUS_METERS
}
fn default_message() -> String {
    DEFAULT_NOTIFICATION_MESSAGE.into()
}
fn default_region_limit() -> usize {
    DEFAULT_REGION_LIMIT
}
fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_kind: BreakKind::default(),
            short_break_minutes: default_short_break(),
            long_break_minutes: default_long_break(),
        }
    }
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: default_radius(),
            default_message: default_message(),
            region_limit: default_region_limit(),
            notify_on_exit: false,
            notify_on_dwell: false,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ZonesConfig {
    pub fn policy(&self) -> NotificationPolicy {
        NotificationPolicy {
            on_enter: true,
            on_exit: self.notify_on_exit,
            on_dwell: self.notify_on_dwell,
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
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
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
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
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

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
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

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the field.
    /// `session.work_minutes` takes any number and is clamped; the break
    /// lengths are read-only.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        match key {
            "session.work_minutes" => {
                let minutes: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                if minutes.is_nan() {
                    return Err(invalid(format!("cannot parse '{value}' as number")));
                }
                // Saturating cast, then the same clamp the engine applies.
                self.session.work_minutes = clamp_work_minutes(minutes.trunc() as i64);
                return Ok(());
            }
            "session.short_break_minutes" | "session.long_break_minutes" => {
                return Err(invalid(format!(
                    "break lengths are fixed at {SHORT_BREAK_MINUTES}/{LONG_BREAK_MINUTES} minutes"
                )));
            }
            _ => {}
        }
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let mut updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.session.work_minutes = clamp_work_minutes(updated.session.work_minutes as i64);
        if !(updated.zones.default_radius_meters.is_finite()
            && updated.zones.default_radius_meters > 0.0)
        {
            return Err(invalid("radius must be positive".into()));
        }
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
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
        assert_eq!(parsed.session.work_minutes, 25);
        assert_eq!(parsed.session.break_kind, BreakKind::Short);
        assert_eq!(parsed.zones.default_message, "Vamos pôr as mãos ao trabalho!");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[zones]\nregion_limit = 3\n").unwrap();
        assert_eq!(parsed.zones.region_limit, 3);
        assert_eq!(parsed.zones.default_radius_meters, 100.0);
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.work_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("session.break_kind").as_deref(), Some("short"));
        assert_eq!(cfg.get("zones.notify_on_exit").as_deref(), Some("false"));
        assert!(cfg.get("zones.missing_key").is_none());
    }

    #[test]
    fn apply_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.apply("zones.notify_on_dwell", "true").unwrap();
        cfg.apply("zones.default_radius_meters", "250.5").unwrap();
        cfg.apply("session.break_kind", "long").unwrap();
        assert!(cfg.zones.notify_on_dwell);
        assert_eq!(cfg.zones.default_radius_meters, 250.5);
        assert_eq!(cfg.session.break_kind, BreakKind::Long);
    }

    #[test]
    fn apply_clamps_work_minutes() {
        let mut cfg = Config::default();
        cfg.apply("session.work_minutes", "999").unwrap();
        assert_eq!(cfg.session.work_minutes, 120);
        cfg.apply("session.work_minutes", "0").unwrap();
        assert_eq!(cfg.session.work_minutes, 1);
    }

    #[test]
    fn apply_clamps_work_minutes_outside_u32() {
        let mut cfg = Config::default();
        cfg.apply("session.work_minutes", "-5").unwrap();
        assert_eq!(cfg.session.work_minutes, 1);
        cfg.apply("session.work_minutes", "5000000000").unwrap();
        assert_eq!(cfg.session.work_minutes, 120);
        cfg.apply("session.work_minutes", "30.5").unwrap();
        assert_eq!(cfg.session.work_minutes, 30);
        assert!(matches!(
            cfg.apply("session.work_minutes", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.session.work_minutes, 30);
    }

    #[test]
    fn apply_rejects_fixed_break_lengths() {
        let mut cfg = Config::default();
        for key in ["session.short_break_minutes", "session.long_break_minutes"] {
            assert!(matches!(
                cfg.apply(key, "30"),
                Err(ConfigError::InvalidValue { .. })
            ));
        }
        assert_eq!(cfg.session.short_break_minutes, SHORT_BREAK_MINUTES);
        assert_eq!(cfg.session.long_break_minutes, LONG_BREAK_MINUTES);
    }

    #[test]
    fn apply_rejects_unknown_and_mistyped() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("zones.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.apply("zones.notify_on_exit", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.apply("session.break_kind", "medium"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.apply("zones.default_radius_meters", "0").is_err());
        assert_eq!(cfg.session.break_kind, BreakKind::Short);
    }

    #[test]
    fn policy_follows_flags() {
        let mut cfg = Config::default();
        assert_eq!(cfg.zones.policy(), NotificationPolicy::default());
        cfg.zones.notify_on_exit = true;
        assert!(cfg.zones.policy().on_exit);
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.zones.region_limit, DEFAULT_REGION_LIMIT);

        let mut edited = cfg.clone();
        edited.apply("zones.region_limit", "5").unwrap();
        edited.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().zones.region_limit, 5);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session = 7").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
