use crate::store::AlertSettings;
use std::fmt;

/// Sensor types that carry threshold rules, plus an open variant for
/// anything else a device may publish (the type segment of the topic is
/// not a closed set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    Humidity,
    Oxygen,
    Other(String),
}

impl SensorKind {
    pub fn as_str(&self) -> &str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Oxygen => "oxygen",
            SensorKind::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for SensorKind {
    fn from(raw: &str) -> Self {
        match raw {
            "temperature" => SensorKind::Temperature,
            "humidity" => SensorKind::Humidity,
            "oxygen" => SensorKind::Oxygen,
            other => SensorKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Danger,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold violation: the severity plus a human-readable description
/// of which bound was crossed, e.g. "above maximum (50°C)".
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub level: AlertLevel,
    pub threshold: String,
}

/// Evaluate a reading against per-device bounds. Min checks run before max
/// checks and the first match wins. An unset bound disables its comparison.
///
/// Severity is asymmetric on purpose: low oxygen is the dangerous direction
/// for livestock, so oxygen inverts the warning/danger mapping used by
/// temperature and humidity.
///
/// NaN fails every comparison and therefore never produces a violation.
pub fn evaluate(kind: &SensorKind, value: f64, settings: &AlertSettings) -> Option<Violation> {
    match kind {
        SensorKind::Temperature => {
            if let Some(min) = settings.min_temperature {
                if value < min {
                    return Some(Violation {
                        level: AlertLevel::Warning,
                        threshold: format!("below minimum ({}°C)", min),
                    });
                }
            }
            if let Some(max) = settings.max_temperature {
                if value > max {
                    return Some(Violation {
                        level: AlertLevel::Danger,
                        threshold: format!("above maximum ({}°C)", max),
                    });
                }
            }
            None
        }
        SensorKind::Humidity => {
            if let Some(min) = settings.min_humidity {
                if value < min {
                    return Some(Violation {
                        level: AlertLevel::Warning,
                        threshold: format!("below minimum ({}%)", min),
                    });
                }
            }
            if let Some(max) = settings.max_humidity {
                if value > max {
                    return Some(Violation {
                        level: AlertLevel::Danger,
                        threshold: format!("above maximum ({}%)", max),
                    });
                }
            }
            None
        }
        SensorKind::Oxygen => {
            if let Some(min) = settings.min_oxygen {
                if value < min {
                    return Some(Violation {
                        level: AlertLevel::Danger,
                        threshold: format!("below minimum ({}%)", min),
                    });
                }
            }
            if let Some(max) = settings.max_oxygen {
                if value > max {
                    return Some(Violation {
                        level: AlertLevel::Warning,
                        threshold: format!("above maximum ({}%)", max),
                    });
                }
            }
            None
        }
        SensorKind::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn settings() -> AlertSettings {
        AlertSettings {
            id: 1,
            device_id: 1,
            min_temperature: Some(0.0),
            max_temperature: Some(50.0),
            min_humidity: Some(20.0),
            max_humidity: Some(80.0),
            min_oxygen: Some(18.0),
            max_oxygen: Some(25.0),
            email_notifications: false,
            notification_email: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn in_range_values_pass() {
        let s = settings();
        assert_eq!(evaluate(&SensorKind::Temperature, 23.5, &s), None);
        assert_eq!(evaluate(&SensorKind::Humidity, 55.0, &s), None);
        assert_eq!(evaluate(&SensorKind::Oxygen, 21.0, &s), None);
    }

    #[test]
    fn temperature_low_is_warning_high_is_danger() {
        let s = settings();
        let low = evaluate(&SensorKind::Temperature, -0.1, &s).unwrap();
        assert_eq!(low.level, AlertLevel::Warning);
        assert_eq!(low.threshold, "below minimum (0°C)");

        let high = evaluate(&SensorKind::Temperature, 50.1, &s).unwrap();
        assert_eq!(high.level, AlertLevel::Danger);
        assert_eq!(high.threshold, "above maximum (50°C)");
    }

    #[test]
    fn humidity_low_is_warning_high_is_danger() {
        let s = settings();
        assert_eq!(
            evaluate(&SensorKind::Humidity, 19.9, &s).unwrap().level,
            AlertLevel::Warning
        );
        assert_eq!(
            evaluate(&SensorKind::Humidity, 80.1, &s).unwrap().level,
            AlertLevel::Danger
        );
    }

    #[test]
    fn oxygen_severity_is_inverted() {
        // Low oxygen is the dangerous direction; high oxygen only warns.
        let s = settings();
        assert_eq!(
            evaluate(&SensorKind::Oxygen, 17.9, &s).unwrap().level,
            AlertLevel::Danger
        );
        assert_eq!(
            evaluate(&SensorKind::Oxygen, 25.1, &s).unwrap().level,
            AlertLevel::Warning
        );
    }

    #[test]
    fn boundary_values_do_not_alert() {
        // Comparisons are strict: exactly-at-bound readings pass.
        let s = settings();
        assert_eq!(evaluate(&SensorKind::Temperature, 0.0, &s), None);
        assert_eq!(evaluate(&SensorKind::Temperature, 50.0, &s), None);
        assert_eq!(evaluate(&SensorKind::Oxygen, 18.0, &s), None);
    }

    #[test]
    fn unknown_kinds_never_alert() {
        let s = settings();
        let gas = SensorKind::from("gas");
        assert_eq!(evaluate(&gas, -1000.0, &s), None);
        assert_eq!(evaluate(&gas, f64::NAN, &s), None);
    }

    #[test]
    fn nan_never_alerts() {
        let s = settings();
        assert_eq!(evaluate(&SensorKind::Temperature, f64::NAN, &s), None);
        assert_eq!(evaluate(&SensorKind::Humidity, f64::NAN, &s), None);
        assert_eq!(evaluate(&SensorKind::Oxygen, f64::NAN, &s), None);
    }

    #[test]
    fn unset_bound_disables_that_side() {
        let mut s = settings();
        s.min_temperature = None;
        assert_eq!(evaluate(&SensorKind::Temperature, -40.0, &s), None);

        s.max_temperature = None;
        assert_eq!(evaluate(&SensorKind::Temperature, 120.0, &s), None);
    }

    #[test]
    fn min_check_wins_when_both_would_match() {
        // Degenerate min > max settings: the min comparison runs first.
        let mut s = settings();
        s.min_temperature = Some(30.0);
        s.max_temperature = Some(10.0);
        let v = evaluate(&SensorKind::Temperature, 20.0, &s).unwrap();
        assert_eq!(v.level, AlertLevel::Warning);
        assert_eq!(v.threshold, "below minimum (30°C)");
    }

    #[test]
    fn message_formats_trim_trailing_zeroes() {
        let mut s = settings();
        s.max_temperature = Some(37.5);
        let v = evaluate(&SensorKind::Temperature, 40.0, &s).unwrap();
        assert_eq!(v.threshold, "above maximum (37.5°C)");
    }
}
