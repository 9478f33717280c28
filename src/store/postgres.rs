use super::{
    Alert, AlertSettings, AlertSettingsUpdate, Device, DeviceWithSettings, NewAlert, Reading,
    Sensor, SensorStore,
};
use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, Pool, Postgres, Row};

pub type DbPool = Pool<Postgres>;

pub async fn connect(cfg: &DatabaseConfig) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect(&cfg.url)
        .await?;
    Ok(pool)
}

impl<'r> FromRow<'r, PgRow> for Device {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            device_uuid: row.try_get("device_uuid")?,
            name: row.try_get("name")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Sensor {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            kind: row.try_get("type")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Reading {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sensor_id: row.try_get("sensor_id")?,
            value: row.try_get("value")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for AlertSettings {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            min_temperature: row.try_get("min_temperature")?,
            max_temperature: row.try_get("max_temperature")?,
            min_humidity: row.try_get("min_humidity")?,
            max_humidity: row.try_get("max_humidity")?,
            min_oxygen: row.try_get("min_oxygen")?,
            max_oxygen: row.try_get("max_oxygen")?,
            email_notifications: row.try_get("email_notifications")?,
            notification_email: row.try_get("notification_email")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Alert {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            sensor_id: row.try_get("sensor_id")?,
            level: row.try_get("level")?,
            message: row.try_get("message")?,
            is_read: row.try_get("is_read")?,
            email_sent: row.try_get("email_sent")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn get_alert_settings(&self, device_id: i32) -> Result<Option<AlertSettings>> {
        let settings = sqlx::query_as::<_, AlertSettings>(
            r#"
            SELECT id, device_id, min_temperature, max_temperature,
                   min_humidity, max_humidity, min_oxygen, max_oxygen,
                   email_notifications, notification_email, updated_at
            FROM alert_settings
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings)
    }
}

#[async_trait]
impl SensorStore for PgStore {
    async fn find_device_by_uuid(
        &self,
        device_uuid: &str,
    ) -> Result<Option<DeviceWithSettings>> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            SELECT id, device_uuid, name, user_id, created_at
            FROM devices
            WHERE device_uuid = $1
            "#,
        )
        .bind(device_uuid)
        .fetch_optional(&self.pool)
        .await?;

        let Some(device) = device else {
            return Ok(None);
        };
        let settings = self.get_alert_settings(device.id).await?;

        Ok(Some(DeviceWithSettings { device, settings }))
    }

    async fn find_device_by_id(&self, device_id: i32) -> Result<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            SELECT id, device_uuid, name, user_id, created_at
            FROM devices
            WHERE id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(device)
    }

    async fn find_or_create_sensor(&self, device_id: i32, sensor_type: &str) -> Result<Sensor> {
        // Upsert so that two concurrent first readings for the same pair
        // cannot race into duplicate rows.
        let sensor = sqlx::query_as::<_, Sensor>(
            r#"
            INSERT INTO sensors (device_id, type)
            VALUES ($1, $2)
            ON CONFLICT (device_id, type) DO UPDATE SET type = EXCLUDED.type
            RETURNING id, device_id, type, created_at
            "#,
        )
        .bind(device_id)
        .bind(sensor_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(sensor)
    }

    async fn insert_reading(&self, sensor_id: i32, value: f64) -> Result<Reading> {
        let reading = sqlx::query_as::<_, Reading>(
            r#"
            INSERT INTO readings (sensor_id, value)
            VALUES ($1, $2)
            RETURNING id, sensor_id, value, created_at
            "#,
        )
        .bind(sensor_id)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        Ok(reading)
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert> {
        let alert = sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (device_id, sensor_id, level, message, is_read, email_sent)
            VALUES ($1, $2, $3, $4, FALSE, FALSE)
            RETURNING id, device_id, sensor_id, level, message, is_read, email_sent, created_at
            "#,
        )
        .bind(alert.device_id)
        .bind(alert.sensor_id)
        .bind(alert.level.as_str())
        .bind(&alert.message)
        .fetch_one(&self.pool)
        .await?;

        Ok(alert)
    }

    async fn mark_alert_email_sent(&self, alert_id: i32) -> Result<()> {
        sqlx::query("UPDATE alerts SET email_sent = TRUE WHERE id = $1")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_or_create_alert_settings(&self, device_id: i32) -> Result<AlertSettings> {
        if let Some(settings) = self.get_alert_settings(device_id).await? {
            return Ok(settings);
        }

        // Permissive defaults, notifications off. DO NOTHING keeps a
        // concurrent first read from failing; re-read on conflict.
        let inserted = sqlx::query_as::<_, AlertSettings>(
            r#"
            INSERT INTO alert_settings (
                device_id, min_temperature, max_temperature,
                min_humidity, max_humidity, min_oxygen, max_oxygen,
                email_notifications, notification_email
            ) VALUES ($1, 0, 50, 20, 80, 18, 25, FALSE, NULL)
            ON CONFLICT (device_id) DO NOTHING
            RETURNING id, device_id, min_temperature, max_temperature,
                      min_humidity, max_humidity, min_oxygen, max_oxygen,
                      email_notifications, notification_email, updated_at
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(settings) => Ok(settings),
            None => self
                .get_alert_settings(device_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Device {} not found", device_id))),
        }
    }

    async fn upsert_alert_settings(
        &self,
        device_id: i32,
        update: AlertSettingsUpdate,
    ) -> Result<AlertSettings> {
        let settings = sqlx::query_as::<_, AlertSettings>(
            r#"
            INSERT INTO alert_settings (
                device_id, min_temperature, max_temperature,
                min_humidity, max_humidity, min_oxygen, max_oxygen,
                email_notifications, notification_email, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (device_id) DO UPDATE SET
                min_temperature = EXCLUDED.min_temperature,
                max_temperature = EXCLUDED.max_temperature,
                min_humidity = EXCLUDED.min_humidity,
                max_humidity = EXCLUDED.max_humidity,
                min_oxygen = EXCLUDED.min_oxygen,
                max_oxygen = EXCLUDED.max_oxygen,
                email_notifications = EXCLUDED.email_notifications,
                notification_email = EXCLUDED.notification_email,
                updated_at = NOW()
            RETURNING id, device_id, min_temperature, max_temperature,
                      min_humidity, max_humidity, min_oxygen, max_oxygen,
                      email_notifications, notification_email, updated_at
            "#,
        )
        .bind(device_id)
        .bind(update.min_temperature)
        .bind(update.max_temperature)
        .bind(update.min_humidity)
        .bind(update.max_humidity)
        .bind(update.min_oxygen)
        .bind(update.max_oxygen)
        .bind(update.email_notifications)
        .bind(&update.notification_email)
        .fetch_one(&self.pool)
        .await?;

        Ok(settings)
    }
}
