//! Configuration and its validation
//!
//! [`Settings`] is the raw, deserialized form. It becomes a [`Config`] only
//! through [`Config::try_from`], which rejects every out-of-range value with
//! an error naming the offending field.

use std::fmt;
use std::time::Duration;

use plug_client::{Credentials, PlugAddress, PlugClient};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MAX_VOLUME: f32 = 0.25;
pub const DEFAULT_COOLDOWN_SECS: i64 = 5;
pub const DEFAULT_TIMEOUT_SECS: i64 = 10;

/// Invalid configuration value
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} = {value} is not in {range}")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: &'static str,
    },

    #[error("{field} = {value:?} is not a valid network address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Raw configuration as read from the config file
#[derive(Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Name of the output device that powers the amplifier on
    pub target_device: String,
    /// `ip` or `ip:port` of the plug
    pub plug_address: String,
    pub plug_username: String,
    pub plug_password: String,
    /// Volume cap applied when the target device becomes active, in `[0, 1]`
    #[serde(default = "default_max_volume")]
    pub max_volume: f32,
    /// Cooldown between two plug commands, in `[0, 60]` seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
    /// Plug request timeout, in `[1, 60]` seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: i64,
}

fn default_max_volume() -> f32 {
    DEFAULT_MAX_VOLUME
}

fn default_cooldown_secs() -> i64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_timeout_secs() -> i64 {
    DEFAULT_TIMEOUT_SECS
}

impl Settings {
    /// Settings with default volume cap, cooldown and timeout
    pub fn new(
        target_device: impl Into<String>,
        plug_address: impl Into<String>,
        plug_username: impl Into<String>,
        plug_password: impl Into<String>,
    ) -> Self {
        Self {
            target_device: target_device.into(),
            plug_address: plug_address.into(),
            plug_username: plug_username.into(),
            plug_password: plug_password.into(),
            max_volume: DEFAULT_MAX_VOLUME,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("target_device", &self.target_device)
            .field("plug_address", &self.plug_address)
            .field("plug_username", &self.plug_username)
            .field("plug_password", &"********")
            .field("max_volume", &self.max_volume)
            .field("cooldown_secs", &self.cooldown_secs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Validated, immutable configuration
#[derive(Debug, Clone)]
pub struct Config {
    target_device: String,
    plug_address: PlugAddress,
    credentials: Credentials,
    max_volume: f32,
    cooldown: Duration,
    timeout: Duration,
}

impl Config {
    pub fn target_device(&self) -> &str {
        &self.target_device
    }

    pub fn plug_address(&self) -> PlugAddress {
        self.plug_address
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn max_volume(&self) -> f32 {
        self.max_volume
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Client for the configured plug
    pub fn plug_client(&self) -> PlugClient {
        PlugClient::new(self.plug_address, self.credentials.clone(), self.timeout)
    }
}

fn seconds_in(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
    range: &'static str,
) -> Result<Duration, ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            range,
        });
    }
    Ok(Duration::from_secs(value as u64))
}

impl TryFrom<Settings> for Config {
    type Error = ConfigError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let target_device = settings.target_device.trim().to_string();
        if target_device.is_empty() {
            return Err(ConfigError::Empty {
                field: "target_device",
            });
        }

        // NaN fails both comparisons, so check containment instead.
        if !(0.0..=1.0).contains(&settings.max_volume) {
            return Err(ConfigError::OutOfRange {
                field: "max_volume",
                value: settings.max_volume.to_string(),
                range: "[0, 1]",
            });
        }

        let cooldown = seconds_in("cooldown_secs", settings.cooldown_secs, 0, 60, "[0, 60]")?;
        let timeout = seconds_in("timeout_secs", settings.timeout_secs, 1, 60, "[1, 60]")?;

        let plug_address = settings
            .plug_address
            .parse::<PlugAddress>()
            .map_err(|_| ConfigError::InvalidAddress {
                field: "plug_address",
                value: settings.plug_address.clone(),
            })?;

        Ok(Self {
            target_device,
            plug_address,
            credentials: Credentials::new(settings.plug_username, settings.plug_password),
            max_volume: settings.max_volume,
            cooldown,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn settings() -> Settings {
        Settings::new("Speakers", "192.168.1.40", "admin", "secret")
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::try_from(settings()).unwrap();

        assert_eq!(config.target_device(), "Speakers");
        assert_eq!(config.max_volume(), 0.25);
        assert_eq!(config.cooldown(), Duration::from_secs(5));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.plug_address().to_string(), "192.168.1.40");
        assert_eq!(config.credentials().username(), "admin");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "target_device": "Speakers",
                "plug_address": "192.168.1.40:8080",
                "plug_username": "admin",
                "plug_password": "secret",
                "cooldown_secs": 0
            }"#,
        )
        .unwrap();

        assert_eq!(settings.max_volume, DEFAULT_MAX_VOLUME);
        assert_eq!(settings.cooldown_secs, 0);
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<Settings>(
            r#"{
                "target_device": "Speakers",
                "plug_address": "192.168.1.40",
                "plug_username": "admin",
                "plug_password": "secret",
                "cooldown": 5
            }"#,
        );
        assert!(result.is_err());
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.25)]
    #[case(1.0)]
    fn test_max_volume_bounds_accepted(#[case] max_volume: f32) {
        let config = Config::try_from(Settings {
            max_volume,
            ..settings()
        })
        .unwrap();
        assert_eq!(config.max_volume(), max_volume);
    }

    #[rstest]
    #[case(-0.01)]
    #[case(1.01)]
    #[case(f32::NAN)]
    fn test_max_volume_out_of_range(#[case] max_volume: f32) {
        let err = Config::try_from(Settings {
            max_volume,
            ..settings()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "max_volume", .. }));
    }

    #[rstest]
    #[case(-1, false)]
    #[case(0, true)]
    #[case(60, true)]
    #[case(61, false)]
    fn test_cooldown_range(#[case] cooldown_secs: i64, #[case] valid: bool) {
        let result = Config::try_from(Settings {
            cooldown_secs,
            ..settings()
        });
        match result {
            Ok(config) => {
                assert!(valid);
                assert_eq!(config.cooldown(), Duration::from_secs(cooldown_secs as u64));
            }
            Err(err) => {
                assert!(!valid);
                assert!(matches!(err, ConfigError::OutOfRange { field: "cooldown_secs", .. }));
            }
        }
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(60, true)]
    #[case(61, false)]
    fn test_timeout_range(#[case] timeout_secs: i64, #[case] valid: bool) {
        let result = Config::try_from(Settings {
            timeout_secs,
            ..settings()
        });
        assert_eq!(result.is_ok(), valid);
        if let Err(err) = result {
            assert!(err.to_string().starts_with("timeout_secs = "));
        }
    }

    #[rstest]
    #[case("")]
    #[case("plug.local")]
    #[case("300.1.1.1")]
    fn test_invalid_address(#[case] plug_address: &str) {
        let err = Config::try_from(Settings {
            plug_address: plug_address.to_string(),
            ..settings()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress { field: "plug_address", .. }));
    }

    #[test]
    fn test_blank_target_rejected() {
        let err = Config::try_from(Settings {
            target_device: "  ".to_string(),
            ..settings()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::Empty { field: "target_device" });
        assert_eq!(err.to_string(), "target_device must not be empty");
    }

    #[test]
    fn test_settings_debug_hides_password() {
        let debug = format!("{:?}", settings());
        assert!(!debug.contains("secret"));
    }
}
