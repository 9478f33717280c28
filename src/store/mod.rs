pub mod postgres;

pub use postgres::{connect, PgStore};

use crate::error::Result;
use crate::thresholds::AlertLevel;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Device {
    pub id: i32,
    pub device_uuid: String,
    pub name: Option<String>,
    pub user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DeviceWithSettings {
    pub device: Device,
    pub settings: Option<AlertSettings>,
}

#[derive(Debug, Clone)]
pub struct Sensor {
    pub id: i32,
    pub device_id: i32,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Reading {
    pub id: i32,
    pub sensor_id: i32,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    pub id: i32,
    pub device_id: i32,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub min_oxygen: Option<f64>,
    pub max_oxygen: Option<f64>,
    pub email_notifications: bool,
    pub notification_email: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Full-document settings update, applied as an upsert. Absent bounds are
/// stored as NULL, which disables that side of the threshold check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettingsUpdate {
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub min_oxygen: Option<f64>,
    pub max_oxygen: Option<f64>,
    #[serde(default)]
    pub email_notifications: bool,
    pub notification_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i32,
    pub device_id: i32,
    pub sensor_id: i32,
    pub level: String,
    pub message: String,
    pub is_read: bool,
    pub email_sent: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub device_id: i32,
    pub sensor_id: i32,
    pub level: AlertLevel,
    pub message: String,
}

/// Persistence operations consumed by the ingestion pipeline and the
/// alert-settings API. The Postgres implementation is the real store; tests
/// substitute an in-memory fake.
#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Look up a registered device by its external identifier, together
    /// with its alert settings if any exist.
    async fn find_device_by_uuid(&self, device_uuid: &str)
        -> Result<Option<DeviceWithSettings>>;

    async fn find_device_by_id(&self, device_id: i32) -> Result<Option<Device>>;

    /// Sensor identity is driven by observed traffic: the first reading for
    /// a (device, type) pair creates the sensor row.
    async fn find_or_create_sensor(&self, device_id: i32, sensor_type: &str) -> Result<Sensor>;

    async fn insert_reading(&self, sensor_id: i32, value: f64) -> Result<Reading>;

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert>;

    async fn mark_alert_email_sent(&self, alert_id: i32) -> Result<()>;

    /// Settings-read path: creates the permissive defaults on first request.
    async fn get_or_create_alert_settings(&self, device_id: i32) -> Result<AlertSettings>;

    async fn upsert_alert_settings(
        &self,
        device_id: i32,
        update: AlertSettingsUpdate,
    ) -> Result<AlertSettings>;
}
