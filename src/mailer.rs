use crate::config::SmtpConfig;
use crate::error::{AppError, Result};
use crate::thresholds::AlertLevel;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AlertEmail {
    pub to: String,
    pub device_name: String,
    pub sensor_type: String,
    pub value: f64,
    pub threshold: String,
    pub level: AlertLevel,
    pub timestamp: DateTime<Utc>,
}

/// Outbound notification delivery. Implementations report success with a
/// boolean; a failed delivery is routine (the alert stays recorded with
/// `email_sent = false`) and must never propagate as an error.
#[async_trait]
pub trait AlertMailer: Send + Sync {
    async fn send_alert_email(&self, email: &AlertEmail) -> bool;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .map_err(|e| AppError::Mail(e.to_string()))?
            .port(cfg.port);
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = cfg
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(format!("invalid smtp.from address: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn subject(email: &AlertEmail) -> String {
        format!(
            "[{}] Farm alert: {} on {}",
            email.level, email.sensor_type, email.device_name
        )
    }

    fn body(email: &AlertEmail) -> String {
        format!(
            "Threshold violation on {device}\n\n\
             Sensor:    {sensor}\n\
             Value:     {value}\n\
             Threshold: {threshold}\n\
             Severity:  {level}\n\
             Time:      {time}\n\n\
             Repeat notifications for this sensor are paused for 15 minutes.\n",
            device = email.device_name,
            sensor = email.sensor_type,
            value = email.value,
            threshold = email.threshold,
            level = email.level,
            time = email.timestamp.to_rfc3339(),
        )
    }
}

#[async_trait]
impl AlertMailer for SmtpMailer {
    async fn send_alert_email(&self, email: &AlertEmail) -> bool {
        let to = match email.to.parse::<Mailbox>() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!(to = %email.to, error = %e, "invalid notification address");
                return false;
            }
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(Self::subject(email))
            .header(ContentType::TEXT_PLAIN)
            .body(Self::body(email))
        {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "failed to build alert email");
                return false;
            }
        };

        match self.transport.send(message).await {
            Ok(_) => {
                info!(to = %email.to, device = %email.device_name, "alert email delivered");
                true
            }
            Err(e) => {
                warn!(to = %email.to, error = %e, "failed to send alert email");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> AlertEmail {
        AlertEmail {
            to: "a@b.com".into(),
            device_name: "Greenhouse".into(),
            sensor_type: "temperature".into(),
            value: 55.0,
            threshold: "above maximum (50°C)".into(),
            level: AlertLevel::Danger,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn subject_names_level_sensor_and_device() {
        assert_eq!(
            SmtpMailer::subject(&email()),
            "[danger] Farm alert: temperature on Greenhouse"
        );
    }

    #[test]
    fn body_carries_value_and_threshold() {
        let body = SmtpMailer::body(&email());
        assert!(body.contains("Greenhouse"));
        assert!(body.contains("55"));
        assert!(body.contains("above maximum (50°C)"));
        assert!(body.contains("danger"));
    }
}
