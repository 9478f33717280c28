use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::handlers::AppState,
    api::models::settings::validate_update,
    error::{AppError, Result},
    store::{AlertSettings, AlertSettingsUpdate},
};

/// GET /api/devices/{device_id}/alert-settings
///
/// First read for a device creates the permissive defaults
/// (temperature 0–50, humidity 20–80, oxygen 18–25, notifications off).
pub async fn get_settings(
    State(state): State<AppState>,
    Path(device_id): Path<i32>,
) -> Result<Json<AlertSettings>> {
    ensure_device_exists(&state, device_id).await?;
    let settings = state.store.get_or_create_alert_settings(device_id).await?;

    Ok(Json(settings))
}

/// PUT /api/devices/{device_id}/alert-settings
///
/// Full-document upsert. This is the authoritative guard for the
/// min < max invariants the threshold evaluator trusts.
pub async fn update_settings(
    State(state): State<AppState>,
    Path(device_id): Path<i32>,
    Json(update): Json<AlertSettingsUpdate>,
) -> Result<Json<AlertSettings>> {
    ensure_device_exists(&state, device_id).await?;
    validate_update(&update)?;
    let settings = state.store.upsert_alert_settings(device_id, update).await?;

    Ok(Json(settings))
}

async fn ensure_device_exists(state: &AppState, device_id: i32) -> Result<()> {
    state
        .store
        .find_device_by_id(device_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Device {} not found", device_id)))
}
