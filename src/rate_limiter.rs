use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Minimum gap between notification emails for the same device + sensor type.
const RATE_LIMIT_MINUTES: i64 = 15;

/// Tracks the last notification email sent per (device, sensor type) pair.
///
/// State is in-memory only and lives for the process lifetime; a restart
/// resets every key to "may send immediately". Constructed once and injected
/// into the ingestion pipeline rather than held as process-wide state.
#[derive(Debug, Default)]
pub struct EmailRateLimiter {
    last_sent: Mutex<HashMap<(i32, String), DateTime<Utc>>>,
}

impl EmailRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn window() -> Duration {
        Duration::minutes(RATE_LIMIT_MINUTES)
    }

    pub fn can_send(&self, device_id: i32, sensor_type: &str) -> bool {
        self.can_send_at(device_id, sensor_type, Utc::now())
    }

    pub fn can_send_at(&self, device_id: i32, sensor_type: &str, now: DateTime<Utc>) -> bool {
        let last_sent = self.last_sent.lock().unwrap();
        match last_sent.get(&(device_id, sensor_type.to_string())) {
            Some(last) => now - *last >= Self::window(),
            None => true,
        }
    }

    pub fn record_sent(&self, device_id: i32, sensor_type: &str) {
        self.record_sent_at(device_id, sensor_type, Utc::now());
    }

    pub fn record_sent_at(&self, device_id: i32, sensor_type: &str, now: DateTime<Utc>) {
        let mut last_sent = self.last_sent.lock().unwrap();
        last_sent.insert((device_id, sensor_type.to_string()), now);
    }

    /// Whole minutes (rounded up) until the next email may be sent, or 0 if
    /// one may be sent now. Diagnostics only.
    pub fn minutes_until_next(&self, device_id: i32, sensor_type: &str) -> i64 {
        self.minutes_until_next_at(device_id, sensor_type, Utc::now())
    }

    pub fn minutes_until_next_at(
        &self,
        device_id: i32,
        sensor_type: &str,
        now: DateTime<Utc>,
    ) -> i64 {
        let last_sent = self.last_sent.lock().unwrap();
        let Some(last) = last_sent.get(&(device_id, sensor_type.to_string())) else {
            return 0;
        };
        let remaining_ms = (Self::window() - (now - *last)).num_milliseconds();
        if remaining_ms <= 0 {
            0
        } else {
            (remaining_ms + 59_999) / 60_000
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_key_can_send() {
        let limiter = EmailRateLimiter::new();
        assert!(limiter.can_send(1, "temperature"));
        assert_eq!(limiter.minutes_until_next(1, "temperature"), 0);
    }

    #[test]
    fn blocked_immediately_after_send() {
        let limiter = EmailRateLimiter::new();
        let now = Utc::now();
        limiter.record_sent_at(1, "temperature", now);
        assert!(!limiter.can_send_at(1, "temperature", now));
        assert_eq!(limiter.minutes_until_next_at(1, "temperature", now), 15);
    }

    #[test]
    fn sendable_again_after_window_elapses() {
        let limiter = EmailRateLimiter::new();
        let now = Utc::now();
        limiter.record_sent_at(1, "temperature", now);

        let later = now + Duration::minutes(15);
        assert!(limiter.can_send_at(1, "temperature", later));
        assert_eq!(limiter.minutes_until_next_at(1, "temperature", later), 0);
    }

    #[test]
    fn still_blocked_just_before_window_elapses() {
        let limiter = EmailRateLimiter::new();
        let now = Utc::now();
        limiter.record_sent_at(1, "temperature", now);

        let almost = now + Duration::minutes(14) + Duration::seconds(59);
        assert!(!limiter.can_send_at(1, "temperature", almost));
        // One second left rounds up to a whole minute.
        assert_eq!(limiter.minutes_until_next_at(1, "temperature", almost), 1);
    }

    #[test]
    fn minutes_remaining_rounds_up() {
        let limiter = EmailRateLimiter::new();
        let now = Utc::now();
        limiter.record_sent_at(1, "temperature", now);

        let five_in = now + Duration::minutes(5);
        assert_eq!(limiter.minutes_until_next_at(1, "temperature", five_in), 10);

        let half_minute_in = now + Duration::seconds(30);
        assert_eq!(
            limiter.minutes_until_next_at(1, "temperature", half_minute_in),
            15
        );
    }

    #[test]
    fn keys_are_independent() {
        let limiter = EmailRateLimiter::new();
        let now = Utc::now();
        limiter.record_sent_at(1, "temperature", now);

        assert!(limiter.can_send_at(1, "humidity", now));
        assert!(limiter.can_send_at(2, "temperature", now));
        assert!(!limiter.can_send_at(1, "temperature", now));
    }

    #[test]
    fn record_overwrites_previous_timestamp() {
        let limiter = EmailRateLimiter::new();
        let now = Utc::now();
        limiter.record_sent_at(1, "temperature", now);
        limiter.record_sent_at(1, "temperature", now + Duration::minutes(20));

        // The second send restarted the window.
        assert!(!limiter.can_send_at(1, "temperature", now + Duration::minutes(30)));
        assert!(limiter.can_send_at(1, "temperature", now + Duration::minutes(35)));
    }
}
