use crate::error::Result;
use crate::events::{Event, EventSink};
use crate::mailer::{AlertEmail, AlertMailer};
use crate::rate_limiter::EmailRateLimiter;
use crate::store::{NewAlert, SensorStore};
use crate::thresholds::{self, SensorKind};
use std::sync::Arc;
use tracing::{debug, info};

/// Extract (deviceUuid, sensorType) from a sensor topic. Readings arrive on
/// `devices/{deviceUuid}/sensors/{sensorType}`; anything else is not ours.
pub fn parse_topic(topic: &str) -> Option<(&str, &str)> {
    let mut segments = topic.split('/');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some("devices"), Some(uuid), Some("sensors"), Some(kind), None)
            if !uuid.is_empty() && !kind.is_empty() =>
        {
            Some((uuid, kind))
        }
        _ => None,
    }
}

/// The ingestion pipeline: one inbound sensor message in, persisted reading
/// plus any alert, email, and dashboard events out.
///
/// Steps are cumulative, not transactional. A mail outage or a failure late
/// in the pipeline never rolls back the reading or alert already persisted.
pub struct Ingestor {
    store: Arc<dyn SensorStore>,
    mailer: Arc<dyn AlertMailer>,
    rate_limiter: Arc<EmailRateLimiter>,
    events: EventSink,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn SensorStore>,
        mailer: Arc<dyn AlertMailer>,
        rate_limiter: Arc<EmailRateLimiter>,
        events: EventSink,
    ) -> Self {
        Self {
            store,
            mailer,
            rate_limiter,
            events,
        }
    }

    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let Some((device_uuid, sensor_type)) = parse_topic(topic) else {
            debug!(topic = %topic, "topic does not match sensor pattern; ignoring");
            return Ok(());
        };

        // Non-numeric payloads become NaN readings on purpose: they are
        // persisted like any other value and fail every threshold
        // comparison, so they never alert.
        let text = String::from_utf8_lossy(payload);
        let value = text.trim().parse::<f64>().unwrap_or(f64::NAN);

        let Some(found) = self.store.find_device_by_uuid(device_uuid).await? else {
            debug!(device_uuid = %device_uuid, "reading from unregistered device; dropped");
            return Ok(());
        };
        let (device, settings) = (found.device, found.settings);

        let sensor = self.store.find_or_create_sensor(device.id, sensor_type).await?;
        let reading = self.store.insert_reading(sensor.id, value).await?;

        self.events.publish(Event::SensorReading {
            device_uuid: device.device_uuid.clone(),
            sensor_type: sensor_type.to_string(),
            value,
            timestamp: reading.created_at,
        });

        let Some(settings) = settings else {
            return Ok(());
        };

        let kind = SensorKind::from(sensor_type);
        let Some(violation) = thresholds::evaluate(&kind, value, &settings) else {
            return Ok(());
        };

        // Always record the alert, whether or not an email goes out.
        let message = format!("{} value {} {}", sensor_type, value, violation.threshold);
        let alert = self
            .store
            .insert_alert(NewAlert {
                device_id: device.id,
                sensor_id: sensor.id,
                level: violation.level,
                message,
            })
            .await?;

        self.events.publish(Event::NewAlert {
            alert: alert.clone(),
            device: (&device).into(),
            sensor: (&sensor).into(),
        });

        if !settings.email_notifications {
            return Ok(());
        }
        let Some(to) = settings
            .notification_email
            .as_deref()
            .filter(|address| !address.is_empty())
        else {
            return Ok(());
        };

        if self.rate_limiter.can_send(device.id, sensor_type) {
            let email = AlertEmail {
                to: to.to_string(),
                device_name: device
                    .name
                    .clone()
                    .unwrap_or_else(|| device.device_uuid.clone()),
                sensor_type: sensor_type.to_string(),
                value,
                threshold: violation.threshold,
                level: violation.level,
                timestamp: alert.created_at,
            };
            if self.mailer.send_alert_email(&email).await {
                self.store.mark_alert_email_sent(alert.id).await?;
                self.rate_limiter.record_sent(device.id, sensor_type);
                info!(device = %email.device_name, sensor = %sensor_type, "alert email sent");
            }
        } else {
            let minutes = self.rate_limiter.minutes_until_next(device.id, sensor_type);
            info!(
                device_id = device.id,
                sensor = %sensor_type,
                minutes_remaining = minutes,
                "alert email rate limited"
            );
        }

        Ok(())
    }
}
