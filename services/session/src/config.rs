use speakprep_core::avatar::AvatarConfig;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// The two avatar credentials are required; the session cannot start without
/// them and there is no in-process recovery, only reconfiguration.
#[derive(Clone, Debug)]
pub struct Config {
    pub avatar_api_key: String,
    pub avatar_character_id: String,
    pub avatar_audio_enabled: bool,
    /// Base URL of the backend session API. When unset, the offline
    /// recording backend is used instead.
    pub backend_url: Option<String>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let avatar_api_key = std::env::var("AVATAR_API_KEY")
            .map_err(|_| ConfigError::MissingVar("AVATAR_API_KEY".to_string()))?;

        let avatar_character_id = std::env::var("AVATAR_CHARACTER_ID")
            .map_err(|_| ConfigError::MissingVar("AVATAR_CHARACTER_ID".to_string()))?;

        let audio_str = std::env::var("AVATAR_AUDIO").unwrap_or_else(|_| "true".to_string());
        let avatar_audio_enabled = match audio_str.to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "AVATAR_AUDIO".to_string(),
                    format!("'{}' is not a boolean", other),
                ));
            }
        };

        let backend_url = std::env::var("BACKEND_URL").ok();

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            avatar_api_key,
            avatar_character_id,
            avatar_audio_enabled,
            backend_url,
            log_level,
        })
    }

    /// The avatar SDK construction parameters carried by this configuration.
    pub fn avatar_config(&self) -> AvatarConfig {
        AvatarConfig {
            api_key: self.avatar_api_key.clone(),
            character_id: self.avatar_character_id.clone(),
            audio_enabled: self.avatar_audio_enabled,
        }
    }
}
