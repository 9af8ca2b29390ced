//! Feature flags.
//!
//! Flags live in an external settings table of `{key, value}` rows, where `value` is a JSON
//! object. The request gate reads a fresh [`FeatureFlags`] snapshot on every request; nothing is
//! cached between requests.
//!
//! Missing rows take defaults (maintenance off; registration, appointments and notifications
//! on). Rows with unknown keys are ignored. A row with a known key but a malformed value is an
//! error, so a broken row never silently turns into an enforced default.

mod file;
mod memory;
mod rest;

pub use file::FileFlagStore;
pub use memory::InMemoryFlagStore;
pub use rest::RestFlagStore;

use crate::constants::{DEFAULT_APPOINTMENT_MINUTES, DEFAULT_MAX_DAILY_APPOINTMENTS};
use crate::error::{FlagStoreError, FlagStoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

const APPOINTMENT_MINUTES_RANGE: RangeInclusive<u32> = 5..=240;
const MAX_DAILY_RANGE: RangeInclusive<u32> = 1..=200;

/// The closed set of feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKey {
    Maintenance,
    Registration,
    Appointments,
    Notifications,
}

impl FlagKey {
    pub const ALL: [FlagKey; 4] = [
        FlagKey::Maintenance,
        FlagKey::Registration,
        FlagKey::Appointments,
        FlagKey::Notifications,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            FlagKey::Maintenance => "maintenance",
            FlagKey::Registration => "registration",
            FlagKey::Appointments => "appointments",
            FlagKey::Notifications => "notifications",
        }
    }
}

impl fmt::Display for FlagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagKey {
    type Err = FlagStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlagKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| FlagStoreError::UnknownFlag(s.to_owned()))
    }
}

/// Settings object for a plain on/off flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub enabled: bool,
}

impl Toggle {
    pub const ON: Toggle = Toggle { enabled: true };
    pub const OFF: Toggle = Toggle { enabled: false };
}

/// Settings object for the appointments flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSettings {
    pub enabled: bool,
    /// Default appointment length in minutes.
    #[serde(default = "default_appointment_minutes")]
    pub default_duration: u32,
    #[serde(default = "default_max_daily")]
    pub max_daily: u32,
}

fn default_appointment_minutes() -> u32 {
    DEFAULT_APPOINTMENT_MINUTES
}

fn default_max_daily() -> u32 {
    DEFAULT_MAX_DAILY_APPOINTMENTS
}

impl Default for AppointmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_duration: DEFAULT_APPOINTMENT_MINUTES,
            max_daily: DEFAULT_MAX_DAILY_APPOINTMENTS,
        }
    }
}

/// One row of the settings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRow {
    pub key: String,
    pub value: serde_json::Value,
}

/// A point-in-time view of every feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub maintenance: Toggle,
    pub registration: Toggle,
    pub appointments: AppointmentSettings,
    pub notifications: Toggle,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            maintenance: Toggle::OFF,
            registration: Toggle::ON,
            appointments: AppointmentSettings::default(),
            notifications: Toggle::ON,
        }
    }
}

impl FeatureFlags {
    /// Builds a snapshot from settings rows.
    ///
    /// # Errors
    ///
    /// Returns `FlagStoreError::InvalidValue` if a row for a known flag cannot be decoded or is
    /// out of range.
    pub fn from_rows(rows: &[SettingRow]) -> FlagStoreResult<Self> {
        let mut flags = FeatureFlags::default();
        for row in rows {
            match row.key.parse::<FlagKey>() {
                Ok(key) => flags.apply(key, &row.value)?,
                Err(_) => tracing::debug!(key = %row.key, "ignoring unknown settings row"),
            }
        }
        Ok(flags)
    }

    /// Renders the snapshot as one row per flag.
    pub fn to_rows(&self) -> Vec<SettingRow> {
        FlagKey::ALL
            .into_iter()
            .map(|key| SettingRow {
                key: key.as_str().to_owned(),
                value: self.value_of(key),
            })
            .collect()
    }

    /// Returns the settings object for `key` as stored in the table.
    pub fn value_of(&self, key: FlagKey) -> serde_json::Value {
        let value = match key {
            FlagKey::Maintenance => serde_json::to_value(self.maintenance),
            FlagKey::Registration => serde_json::to_value(self.registration),
            FlagKey::Appointments => serde_json::to_value(self.appointments),
            FlagKey::Notifications => serde_json::to_value(self.notifications),
        };
        // Plain structs of bools and integers always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Replaces the settings for `key` with a decoded and range-checked `value`.
    ///
    /// # Errors
    ///
    /// Returns `FlagStoreError::InvalidValue` if `value` does not decode for `key` or is out of
    /// range. `self` is left unchanged on error.
    pub fn apply(&mut self, key: FlagKey, value: &serde_json::Value) -> FlagStoreResult<()> {
        let invalid = |reason: String| FlagStoreError::InvalidValue {
            key: key.as_str().to_owned(),
            reason,
        };

        match key {
            FlagKey::Appointments => {
                let settings: AppointmentSettings =
                    serde_json::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?;
                if !APPOINTMENT_MINUTES_RANGE.contains(&settings.default_duration) {
                    return Err(invalid(format!(
                        "default_duration must be between {} and {} minutes",
                        APPOINTMENT_MINUTES_RANGE.start(),
                        APPOINTMENT_MINUTES_RANGE.end()
                    )));
                }
                if !MAX_DAILY_RANGE.contains(&settings.max_daily) {
                    return Err(invalid(format!(
                        "max_daily must be between {} and {}",
                        MAX_DAILY_RANGE.start(),
                        MAX_DAILY_RANGE.end()
                    )));
                }
                self.appointments = settings;
            }
            FlagKey::Maintenance => self.maintenance = decode_toggle(value).map_err(invalid)?,
            FlagKey::Registration => self.registration = decode_toggle(value).map_err(invalid)?,
            FlagKey::Notifications => {
                self.notifications = decode_toggle(value).map_err(invalid)?;
            }
        }
        Ok(())
    }
}

fn decode_toggle(value: &serde_json::Value) -> Result<Toggle, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

/// Source of feature flags.
///
/// Implementations read the whole settings table on every [`FlagStore::snapshot`] call.
#[async_trait::async_trait]
pub trait FlagStore: Send + Sync {
    /// Reads the current flags.
    async fn snapshot(&self) -> FlagStoreResult<FeatureFlags>;

    /// Validates and persists a new settings object for `key`, returning the updated flags.
    async fn update(&self, key: FlagKey, value: serde_json::Value)
        -> FlagStoreResult<FeatureFlags>;
}
