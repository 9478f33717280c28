use crate::error::{AppError, Result};
use crate::store::AlertSettingsUpdate;

/// Validate a settings update before it reaches storage. The threshold
/// evaluator trusts these invariants; this is the only place they are
/// enforced.
pub fn validate_update(update: &AlertSettingsUpdate) -> Result<()> {
    check_bounds(
        "minTemperature",
        "maxTemperature",
        update.min_temperature,
        update.max_temperature,
    )?;
    check_bounds(
        "minHumidity",
        "maxHumidity",
        update.min_humidity,
        update.max_humidity,
    )?;
    check_bounds("minOxygen", "maxOxygen", update.min_oxygen, update.max_oxygen)?;

    check_percentage("minHumidity", update.min_humidity)?;
    check_percentage("maxHumidity", update.max_humidity)?;
    check_percentage("minOxygen", update.min_oxygen)?;
    check_percentage("maxOxygen", update.max_oxygen)?;

    if update.email_notifications
        && update
            .notification_email
            .as_deref()
            .map_or(true, |email| email.trim().is_empty())
    {
        return Err(AppError::InvalidInput(
            "notificationEmail is required when emailNotifications is enabled".into(),
        ));
    }

    Ok(())
}

fn check_bounds(
    min_name: &str,
    max_name: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<()> {
    if let (Some(min), Some(max)) = (min, max) {
        if min >= max {
            return Err(AppError::InvalidInput(format!(
                "{} must be less than {}",
                min_name, max_name
            )));
        }
    }
    Ok(())
}

fn check_percentage(name: &str, value: Option<f64>) -> Result<()> {
    if let Some(value) = value {
        if !(0.0..=100.0).contains(&value) {
            return Err(AppError::InvalidInput(format!(
                "{} must be between 0 and 100",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_update() -> AlertSettingsUpdate {
        AlertSettingsUpdate {
            min_temperature: Some(0.0),
            max_temperature: Some(50.0),
            min_humidity: Some(20.0),
            max_humidity: Some(80.0),
            min_oxygen: Some(18.0),
            max_oxygen: Some(25.0),
            email_notifications: false,
            notification_email: None,
        }
    }

    #[test]
    fn accepts_well_formed_settings() {
        assert!(validate_update(&valid_update()).is_ok());
    }

    #[test]
    fn rejects_min_not_below_max() {
        let mut update = valid_update();
        update.min_temperature = Some(50.0);
        update.max_temperature = Some(50.0);
        let err = validate_update(&update).unwrap_err();
        assert!(err
            .to_string()
            .contains("minTemperature must be less than maxTemperature"));

        let mut update = valid_update();
        update.min_oxygen = Some(30.0);
        update.max_oxygen = Some(20.0);
        assert!(validate_update(&update).is_err());
    }

    #[test]
    fn one_sided_bounds_are_allowed() {
        let mut update = valid_update();
        update.min_temperature = None;
        update.max_humidity = None;
        assert!(validate_update(&update).is_ok());
    }

    #[test]
    fn humidity_and_oxygen_must_be_percentages() {
        let mut update = valid_update();
        update.max_humidity = Some(120.0);
        assert!(validate_update(&update).is_err());

        let mut update = valid_update();
        update.min_oxygen = Some(-1.0);
        assert!(validate_update(&update).is_err());
    }

    #[test]
    fn temperature_is_not_bounded_to_a_percentage() {
        let mut update = valid_update();
        update.min_temperature = Some(-40.0);
        update.max_temperature = Some(150.0);
        assert!(validate_update(&update).is_ok());
    }

    #[test]
    fn notifications_require_an_address() {
        let mut update = valid_update();
        update.email_notifications = true;
        update.notification_email = None;
        assert!(validate_update(&update).is_err());

        update.notification_email = Some("  ".into());
        assert!(validate_update(&update).is_err());

        update.notification_email = Some("a@b.com".into());
        assert!(validate_update(&update).is_ok());
    }
}
