use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::alias::{AliasBinding, ExpectedValue};
use crate::error::ConfigError;
use crate::sound::SoundName;

/// Config file used when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "soundboard.json";

/// Placeholder in `play_cmd` that is replaced by the audio file path
pub const PLAY_CMD_PLACEHOLDER: &str = "%s";

fn default_loglevel() -> String {
    "warn".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "mqtt-soundboard".to_string()
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_alias_value() -> Option<String> {
    Some(ExpectedValue::WILDCARD.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname or address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundsConfig {
    /// Root directory holding `<sound>.mp3|.wav` files and `<sound>/` directories
    pub directory: String,

    /// Main topic; payloads are sound names
    pub topic: String,

    /// Shell command template, `%s` is replaced by the file path
    pub play_cmd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasEntry {
    pub sound: String,
    pub topic: String,

    /// Expected payload, `*` (or `null`) matches anything
    #[serde(default = "default_alias_value")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log filter directive, e.g. `info` or `mqtt_soundboard=debug`
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    pub mqtt: MqttConfig,

    pub sounds: SoundsConfig,

    /// Extra topics mapped to fixed sounds
    #[serde(default, deserialize_with = "null_as_empty")]
    pub aliases: Vec<AliasEntry>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<AliasEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<AliasEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Config {
    /// Load and validate configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_failed = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source,
        };

        let content = fs::read_to_string(path).map_err(|e| load_failed(Box::new(e)))?;
        let config = Self::from_json(&content).map_err(|e| match e {
            ConfigError::LoadFailed { source, .. } => load_failed(source),
            other => other,
        })?;

        tracing::info!("✓ Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content).map_err(|e| ConfigError::LoadFailed {
            path: "<inline>".to_string(),
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the fields the dispatcher relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt.host must not be empty".to_string()));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::Invalid("mqtt.client_id must not be empty".to_string()));
        }
        if self.sounds.topic.is_empty() {
            return Err(ConfigError::Invalid("sounds.topic must not be empty".to_string()));
        }
        if self.sounds.directory.is_empty() {
            return Err(ConfigError::Invalid("sounds.directory must not be empty".to_string()));
        }
        if !self.sounds.play_cmd.contains(PLAY_CMD_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "sounds.play_cmd must contain the {} placeholder",
                PLAY_CMD_PLACEHOLDER
            )));
        }

        for (index, alias) in self.aliases.iter().enumerate() {
            if alias.topic.is_empty() {
                return Err(ConfigError::Invalid(format!("aliases[{}].topic must not be empty", index)));
            }
            if alias.sound.is_empty() {
                return Err(ConfigError::Invalid(format!("aliases[{}].sound must not be empty", index)));
            }
        }

        Ok(())
    }

    /// Build the immutable alias bindings, in configuration order.
    pub fn alias_bindings(&self) -> Vec<AliasBinding> {
        self.aliases
            .iter()
            .map(|alias| AliasBinding {
                sound: SoundName::trusted(alias.sound.clone()),
                topic: alias.topic.clone(),
                expected: ExpectedValue::from_config(alias.value.as_deref()),
            })
            .collect()
    }
}
