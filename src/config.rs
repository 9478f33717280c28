use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topic filter for inbound sensor readings.
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_qos")]
    pub qos: u8,
    pub keep_alive_secs: Option<u64>,
    pub clean_start: Option<bool>,
}

fn default_topic() -> String {
    "devices/+/sensors/+".into()
}

fn default_qos() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender mailbox, e.g. "Farm Monitor <alerts@example.com>".
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

impl Config {
    /// Load YAML from disk, substitute $(VAR)/${VAR} with env vars, then parse.
    /// Afterwards, if DATABASE_URL env is set, override `database.url`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        let expanded = expand_env_placeholders(&raw)?;
        let mut cfg: Self = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(e.to_string()))?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            cfg.database.url = url;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.mqtt.host.is_empty() {
            return Err(AppError::Config("mqtt.host cannot be empty".into()));
        }
        if self.mqtt.topic.is_empty() {
            return Err(AppError::Config("mqtt.topic cannot be empty".into()));
        }
        if self.database.url.is_empty() {
            return Err(AppError::Config("database.url cannot be empty".into()));
        }
        if self.server.port == 0 {
            return Err(AppError::Config("server.port cannot be 0".into()));
        }
        if self.smtp.from.is_empty() {
            return Err(AppError::Config("smtp.from cannot be empty".into()));
        }
        Ok(())
    }
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
/// "$$" escapes a literal "$"; a bare "$" is kept as-is.
fn expand_env_placeholders(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let close = match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
                continue;
            }
            Some('(') => ')',
            Some('{') => '}',
            _ => {
                out.push('$');
                continue;
            }
        };
        chars.next();
        let mut name = String::new();
        loop {
            match chars.next() {
                Some(ch) if ch == close => break,
                Some(ch) => name.push(ch),
                None => {
                    return Err(AppError::Config(format!(
                        "unterminated env placeholder: missing '{}'",
                        close
                    )))
                }
            }
        }
        let value = std::env::var(&name)
            .map_err(|_| AppError::Config(format!("missing environment variable: {}", name)))?;
        out.push_str(&value);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_both_placeholder_styles() {
        std::env::set_var("FM_TEST_USER", "farmer");
        std::env::set_var("FM_TEST_PASS", "secret");

        let out = expand_env_placeholders("user: $(FM_TEST_USER)\npass: ${FM_TEST_PASS}").unwrap();
        assert_eq!(out, "user: farmer\npass: secret");

        std::env::remove_var("FM_TEST_USER");
        std::env::remove_var("FM_TEST_PASS");
    }

    #[test]
    fn double_dollar_escapes() {
        let out = expand_env_placeholders("cost: $$5").unwrap();
        assert_eq!(out, "cost: $5");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let err = expand_env_placeholders("x: $(FM_TEST_DOES_NOT_EXIST)").unwrap_err();
        assert!(err.to_string().contains("FM_TEST_DOES_NOT_EXIST"));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        assert!(expand_env_placeholders("x: $(OOPS").is_err());
    }

    #[test]
    fn plain_dollar_is_kept() {
        let out = expand_env_placeholders("price in $ or $5").unwrap();
        assert_eq!(out, "price in $ or $5");
    }
}
