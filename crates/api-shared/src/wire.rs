//! JSON bodies exchanged over the REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message safe to show to the user.
    pub error: String,
    /// Stable machine-readable code, e.g. `FILE_TOO_LARGE`.
    pub code: String,
    /// Whether the client may retry the same request shortly.
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRes {
    pub title: String,
    pub content: String,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAnalysisRes {
    /// One of `low`, `medium`, `high`, `urgent`.
    pub priority: String,
    pub recommended_specialties: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ToggleSetting {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentSetting {
    pub enabled: bool,
    /// Minutes.
    pub default_duration: u32,
    pub max_daily: u32,
}

/// Snapshot of every feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SettingsRes {
    pub maintenance: ToggleSetting,
    pub registration: ToggleSetting,
    pub appointments: AppointmentSetting,
    pub notifications: ToggleSetting,
}

/// New settings object for one flag. Replaces the stored object; `default_duration` and
/// `max_daily` only apply to `appointments` and take their defaults when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SettingUpdateReq {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily: Option<u32>,
}

/// The identity carried by the caller's session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionRes {
    pub subject: String,
    pub name: String,
    pub is_doctor: bool,
    pub is_admin: bool,
}

/// Placeholder answer for page paths; rendering happens outside this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageRes {
    pub page: String,
    pub identity: Option<SessionRes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_camel_case_key_points() {
        let json = serde_json::to_value(SummaryRes {
            title: "t".into(),
            content: "c".into(),
            key_points: vec!["k".into()],
        })
        .unwrap();
        assert_eq!(json["keyPoints"][0], "k");
    }

    #[test]
    fn symptom_analysis_uses_camel_case_specialties() {
        let json = serde_json::to_value(SymptomAnalysisRes {
            priority: "low".into(),
            recommended_specialties: vec!["Dermatology".into()],
            description: String::new(),
        })
        .unwrap();
        assert_eq!(json["recommendedSpecialties"][0], "Dermatology");
    }
}
