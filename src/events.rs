use crate::store::{Alert, Device, Sensor};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Real-time events pushed to connected dashboards.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    SensorReading {
        device_uuid: String,
        sensor_type: String,
        value: f64,
        timestamp: DateTime<Utc>,
    },
    NewAlert {
        #[serde(flatten)]
        alert: Alert,
        device: DeviceSummary,
        sensor: SensorSummary,
    },
}

/// Denormalized device fields shipped with a `new-alert` event so the
/// dashboard can render it without an extra lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub id: i32,
    pub name: Option<String>,
    pub device_uuid: String,
}

impl From<&Device> for DeviceSummary {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id,
            name: device.name.clone(),
            device_uuid: device.device_uuid.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorSummary {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&Sensor> for SensorSummary {
    fn from(sensor: &Sensor) -> Self {
        Self {
            id: sensor.id,
            kind: sensor.kind.clone(),
        }
    }
}

/// Fire-and-forget fanout to every connected dashboard client. Publishing
/// never fails from the caller's point of view; with no subscribers the
/// event is simply dropped.
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<Event>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, event: Event) {
        if self.tx.receiver_count() == 0 {
            debug!("no dashboard clients connected, skipping broadcast");
            return;
        }
        if let Err(e) = self.tx.send(event) {
            warn!("failed to broadcast event: {}", e);
        }
    }
}
