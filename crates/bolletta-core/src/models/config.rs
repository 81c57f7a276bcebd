//! Configuration structures for bill extraction.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BollettaError, Result};
use crate::models::bill::{EnergyType, DEFAULT_MIN_TEXT_LENGTH};

/// Main configuration for bolletta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BollettaConfig {
    /// Rule-engine extraction configuration.
    pub extraction: ExtractionConfig,

    /// Completion service configuration for the model-based strategy.
    pub model: ModelConfig,
}

/// Rule-engine extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum trimmed text length accepted as a bill.
    pub min_text_length: usize,

    /// Characters of input kept in a failure preview.
    pub preview_chars: usize,

    /// Energy type used when the caller gives none.
    pub default_energy: EnergyType,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            preview_chars: 500,
            default_energy: EnergyType::Electricity,
        }
    }
}

/// Completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Responses API endpoint.
    pub endpoint: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum bill characters embedded in a prompt.
    pub max_input_chars: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/responses".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_input_chars: 15_000,
        }
    }
}

impl BollettaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.extraction.preview_chars == 0 {
            return Err(BollettaError::Config(
                "extraction.preview_chars must be positive".to_string(),
            ));
        }
        if self.model.max_input_chars == 0 {
            return Err(BollettaError::Config(
                "model.max_input_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
