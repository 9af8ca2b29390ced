//! Feature-flag settings.

use crate::error::{flag_store_error, internal_error, json_error, ApiError};
use crate::AppState;
use api_shared::{AppointmentSetting, ErrorBody, SettingUpdateReq, SettingsRes, ToggleSetting};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use telecare_core::{FeatureFlags, FlagKey, IdentityClaim};

pub(crate) fn settings_res(flags: &FeatureFlags) -> SettingsRes {
    SettingsRes {
        maintenance: ToggleSetting {
            enabled: flags.maintenance.enabled,
        },
        registration: ToggleSetting {
            enabled: flags.registration.enabled,
        },
        appointments: AppointmentSetting {
            enabled: flags.appointments.enabled,
            default_duration: flags.appointments.default_duration,
            max_daily: flags.appointments.max_daily,
        },
        notifications: ToggleSetting {
            enabled: flags.notifications.enabled,
        },
    }
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Current feature flags", body = SettingsRes),
        (status = 503, description = "Settings store unavailable", body = ErrorBody)
    )
)]
/// Read the current feature flags.
pub(crate) async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsRes>, ApiError> {
    let flags = state
        .flags
        .snapshot()
        .await
        .map_err(|e| flag_store_error(&e))?;
    Ok(Json(settings_res(&flags)))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings/{key}",
    params(("key" = String, Path, description = "maintenance, registration, appointments or notifications")),
    request_body = SettingUpdateReq,
    responses(
        (status = 200, description = "Feature flags after the update", body = SettingsRes),
        (status = 400, description = "Invalid settings value", body = ErrorBody),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "Unknown setting", body = ErrorBody)
    )
)]
/// Update one feature flag. Admins only.
///
/// The gate lets API paths through, so the admin check happens here.
pub(crate) async fn update_setting(
    State(state): State<AppState>,
    identity: Option<Extension<IdentityClaim>>,
    Path(key): Path<String>,
    Json(update): Json<SettingUpdateReq>,
) -> Result<Json<SettingsRes>, ApiError> {
    let Some(Extension(identity)) = identity else {
        return Err(json_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Sign in required",
            false,
        ));
    };
    if !identity.is_admin {
        tracing::warn!(subject = %identity.subject, %key, "non-admin settings update refused");
        return Err(json_error(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Only administrators can change settings",
            false,
        ));
    }

    let key: FlagKey = key.parse().map_err(|e| flag_store_error(&e))?;
    let value = serde_json::to_value(update).map_err(|_| internal_error("encode settings"))?;
    let flags = state
        .flags
        .update(key, value)
        .await
        .map_err(|e| flag_store_error(&e))?;

    tracing::info!(subject = %identity.subject, %key, "setting updated");
    Ok(Json(settings_res(&flags)))
}
