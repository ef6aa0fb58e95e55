//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// OpenAI-compatible endpoint of the Gemini API.
pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub sheets_path: PathBuf,
    pub llm_api_key: String,
    pub llm_api_base: Option<String>,
    pub generation_model: String,
    pub pdf_renderer: String,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Storage ---
        let sheets_path = lookup("SHEETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/edu_sheets.json"));

        // --- Generation Provider ---
        // An OpenAI key wins; a Gemini key alone targets Gemini's OpenAI endpoint.
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());
        let (llm_api_key, default_base, default_model) = match (openai_api_key, gemini_api_key) {
            (Some(key), _) => (key, None, "gpt-4o"),
            (None, Some(key)) => (key, Some(GEMINI_OPENAI_BASE.to_string()), "gemini-2.5-pro"),
            (None, None) => {
                return Err(ConfigError::MissingVar(
                    "OPENAI_API_KEY or GEMINI_API_KEY".to_string(),
                ))
            }
        };
        let llm_api_base = lookup("LLM_API_BASE").or(default_base);
        let generation_model =
            lookup("GENERATION_MODEL").unwrap_or_else(|| default_model.to_string());

        // --- Export ---
        let pdf_renderer = lookup("PDF_RENDERER").unwrap_or_else(|| "wkhtmltopdf".to_string());

        Ok(Self {
            bind_address,
            log_level,
            sheets_path,
            llm_api_key,
            llm_api_base,
            generation_model,
            pdf_renderer,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_an_openai_key() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.sheets_path, PathBuf::from("./data/edu_sheets.json"));
        assert_eq!(config.generation_model, "gpt-4o");
        assert!(config.llm_api_base.is_none());
        assert_eq!(config.pdf_renderer, "wkhtmltopdf");
    }

    #[test]
    fn gemini_key_alone_targets_the_gemini_endpoint() {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "g-test")])).unwrap();
        assert_eq!(config.llm_api_key, "g-test");
        assert_eq!(config.llm_api_base.as_deref(), Some(GEMINI_OPENAI_BASE));
        assert!(config.generation_model.starts_with("gemini"));
    }

    #[test]
    fn missing_keys_and_bad_values_are_reported() {
        assert!(matches!(
            Config::from_lookup(lookup_from(&[])),
            Err(ConfigError::MissingVar(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[
                ("OPENAI_API_KEY", "sk"),
                ("BIND_ADDRESS", "nowhere")
            ])),
            Err(ConfigError::InvalidValue(var, _)) if var == "BIND_ADDRESS"
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk"), ("RUST_LOG", "loud")])),
            Err(ConfigError::InvalidValue(var, _)) if var == "RUST_LOG"
        ));
    }
}
