//! Agent configuration and generation presets.
//!
//! Both live as JSON files in the config directory:
//!
//! ```text
//! configs/config.json   model, persona, preset, weather and memory switches
//! configs/presets.json  {"presets": {"<name>": {system_message, max_tokens, ...}}}
//! ```
//!
//! Any failure here is fatal for session start and reported as
//! [`ConfigError`].
//!
//! # Examples
//!
//! ```ignore
//! let config = AgentConfig::new("meta-llama/llama-3.2-3b-instruct", 40.71, -74.0)
//!     .with_persona("generic")
//!     .with_memory(true)
//!     .with_weather("OPENWEATHER_KEY");
//! ```

use crate::agent::backend::GenerationParams;
use crate::error::ConfigError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;

/// Top-level agent settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Generation model id.
    pub model: String,
    /// Summarization model id. Falls back to `model`.
    pub summary_model: Option<String>,
    /// Directory name under the persona root. Default: `"generic"`.
    pub persona_name: String,
    /// Preset used when none is given at session start. Default: `"default"`.
    pub preset: String,
    pub weather_api_key: Option<String>,
    pub weather_lat: f64,
    pub weather_lon: f64,
    /// Run the memory recorder on every message. Default: off.
    pub use_memory: bool,
    /// Include current weather in the user info message. Default: off.
    pub get_weather: bool,
}

/// On-disk shape of `config.json`. Everything optional so missing fields
/// can be reported by name.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(alias = "llama_small_model")]
    model: Option<String>,
    summary_model: Option<String>,
    persona_name: Option<String>,
    preset: Option<String>,
    weather_api_key: Option<String>,
    weather_lat: Option<f64>,
    weather_lon: Option<f64>,
    use_memory: Option<bool>,
    get_weather: Option<bool>,
}

impl AgentConfig {
    pub fn new(model: impl Into<String>, weather_lat: f64, weather_lon: f64) -> Self {
        Self {
            model: model.into(),
            summary_model: None,
            persona_name: "generic".into(),
            preset: "default".into(),
            weather_api_key: None,
            weather_lat,
            weather_lon,
            use_memory: false,
            get_weather: false,
        }
    }

    /// Load `config.json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw: RawConfig = read_json(path.as_ref())?;
        let model = raw.model.ok_or(ConfigError::MissingField("model"))?;
        let (Some(lat), Some(lon)) = (raw.weather_lat, raw.weather_lon) else {
            return Err(ConfigError::MissingField("weather_lat/weather_lon"));
        };

        let mut config = Self::new(model, lat, lon);
        config.summary_model = raw.summary_model;
        if let Some(persona) = raw.persona_name {
            config.persona_name = persona;
        }
        if let Some(preset) = raw.preset {
            config.preset = preset;
        }
        config.weather_api_key = raw.weather_api_key;
        config.use_memory = raw.use_memory.unwrap_or(false);
        config.get_weather = raw.get_weather.unwrap_or(false);
        Ok(config)
    }

    pub fn with_summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = Some(model.into());
        self
    }

    pub fn with_persona(mut self, name: impl Into<String>) -> Self {
        self.persona_name = name.into();
        self
    }

    pub fn with_preset(mut self, name: impl Into<String>) -> Self {
        self.preset = name.into();
        self
    }

    pub fn with_memory(mut self, enabled: bool) -> Self {
        self.use_memory = enabled;
        self
    }

    /// Enable weather lookup with the given OpenWeather API key.
    pub fn with_weather(mut self, api_key: impl Into<String>) -> Self {
        self.weather_api_key = Some(api_key.into());
        self.get_weather = true;
        self
    }

    /// The model used for summarization calls.
    pub fn summary_model(&self) -> &str {
        self.summary_model.as_deref().unwrap_or(&self.model)
    }
}

// ── Presets ────────────────────────────────────────────────────────

/// A named set of generation parameters plus a system message suffix.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GenerationPreset {
    #[serde(default)]
    pub system_message: String,
    #[serde(flatten)]
    pub params: GenerationParams,
}

#[derive(Deserialize)]
struct PresetsFile {
    presets: Option<HashMap<String, GenerationPreset>>,
}

/// Load preset `name` from `presets.json`.
pub fn load_preset(path: impl AsRef<Path>, name: &str) -> Result<GenerationPreset, ConfigError> {
    let file: PresetsFile = read_json(path.as_ref())?;
    let mut presets = file.presets.ok_or(ConfigError::MissingField("presets"))?;
    presets
        .remove(name)
        .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))
}

/// Read and parse a JSON file, mapping failures to [`ConfigError`].
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
