//! Credential loading.
//!
//! Keys are read once from the environment (optionally seeded from a `.env`
//! file) and validated at construction. Clients receive an `ApiKey` value and
//! never look at the environment themselves.

use std::env;
use std::fmt;

pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_PLACES_API_KEY";
pub const KAKAO_API_KEY_ENV: &str = "KAKAO_REST_API_KEY";

const GOOGLE_API_KEY_PLACEHOLDER: &str = "your_google_places_api_key_here";
const KAKAO_API_KEY_PLACEHOLDER: &str = "your_rest_api_key_here";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing { var: &'static str },
    /// The value is still the template placeholder.
    Placeholder { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing { var } => write!(f, "{} is not set", var),
            ConfigError::Placeholder { var } => {
                write!(f, "{} still holds the placeholder value", var)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A validated API credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validates a raw value. Empty and placeholder values are rejected.
    pub fn parse(
        var: &'static str,
        value: Option<String>,
        placeholder: &str,
    ) -> Result<Self, ConfigError> {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing { var })?;

        if value == placeholder {
            return Err(ConfigError::Placeholder { var });
        }

        Ok(Self(value))
    }

    pub fn google_from_env() -> Result<Self, ConfigError> {
        Self::from_env(GOOGLE_API_KEY_ENV, GOOGLE_API_KEY_PLACEHOLDER)
    }

    pub fn kakao_from_env() -> Result<Self, ConfigError> {
        Self::from_env(KAKAO_API_KEY_ENV, KAKAO_API_KEY_PLACEHOLDER)
    }

    fn from_env(var: &'static str, placeholder: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::parse(var, env::var(var).ok(), placeholder)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}
