//! Persona text and user profile rendering for the session preamble.
//!
//! A persona lives at `<persona_root>/<name>/<name>.json`. Its object tree is
//! flattened into a single line of `path: value` entries, with nested keys
//! written as `parent(child)`:
//!
//! ```text
//! {"name": "Ada", "likes": ["tea", "chess"], "job": {"title": "engineer"}}
//! → Persona Information: name: Ada, likes: tea, chess, job(title): engineer End of persona data.
//! ```

use crate::agent::config::read_json;
use crate::error::ConfigError;
use crate::weather::WeatherReport;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Fixed assistant message that closes the session preamble.
pub const LLM_INTRO: &str = "Okay, got it! I'll remember that for reference later! \
Let's get started! I'll wait for you to greet me.";

const PERSONA_PREFIX: &str = "Persona Information: ";
const PERSONA_SUFFIX: &str = " End of persona data.";
const USER_PREFIX: &str = "User Information: ";
const USER_SUFFIX: &str = "End of user information.";

/// Timestamp format used in the user info message and chat log names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

// ── Persona ────────────────────────────────────────────────────────

/// Path of the persona file for `name` under `persona_root`.
pub fn persona_path(persona_root: &Path, name: &str) -> PathBuf {
    persona_root.join(name).join(format!("{name}.json"))
}

/// Load and render the persona `name` as preamble text.
pub fn load_persona(persona_root: &Path, name: &str) -> Result<String, ConfigError> {
    let data: Map<String, Value> = read_json(&persona_path(persona_root, name))?;
    Ok(format!(
        "{PERSONA_PREFIX}{}{PERSONA_SUFFIX}",
        flatten_persona(&data, "")
    ))
}

/// Flatten a persona object into `path: value` entries joined by `", "`.
pub fn flatten_persona(data: &Map<String, Value>, path: &str) -> String {
    data.iter()
        .map(|(key, value)| {
            let current = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}({key})")
            };
            match value {
                Value::Object(nested) => flatten_persona(nested, &current),
                Value::Array(items) if items.is_empty() => format!("{current}: None"),
                Value::Array(items) => {
                    let joined: Vec<String> = items.iter().map(scalar_text).collect();
                    format!("{current}: {}", joined.join(", "))
                }
                other => format!("{current}: {}", scalar_text(other)),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".into(),
        other => other.to_string(),
    }
}

// ── User profile ───────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    #[serde(rename = "Non-binary")]
    NonBinary,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::NonBinary => "Non-binary",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Male, Self::Female, Self::NonBinary]
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                ConfigError::InvalidProfile(format!(
                    "invalid sex: {s}. Must be one of Male, Female, Non-binary"
                ))
            })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race {
    Caucasian,
    Asian,
    #[serde(rename = "Black or African American")]
    Black,
    #[serde(rename = "Hispanic or Latino")]
    Hispanic,
    Other,
}

impl Race {
    const ALL: [Race; 5] = [
        Race::Caucasian,
        Race::Asian,
        Race::Black,
        Race::Hispanic,
        Race::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Caucasian => "Caucasian",
            Self::Asian => "Asian",
            Self::Black => "Black or African American",
            Self::Hispanic => "Hispanic or Latino",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Race {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidProfile(format!("invalid race: {s}")))
    }
}

/// The user the persona is talking to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub birthday: String,
    pub sex: Sex,
    pub race: Race,
    #[serde(default = "default_details")]
    pub details: String,
}

fn default_details() -> String {
    "No additional details provided.".into()
}

impl UserProfile {
    pub fn new(name: impl Into<String>, birthday: impl Into<String>, sex: Sex, race: Race) -> Self {
        Self {
            name: name.into(),
            birthday: birthday.into(),
            sex,
            race,
            details: default_details(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// The profile as stored in the chat log's `session_info.user_data`.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Serialize)]
struct UserInfo<'a> {
    name: &'a str,
    race: Race,
    sex: Sex,
    birthday: &'a str,
    details: &'a str,
    current_time: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    weather: Option<&'a WeatherReport>,
}

/// Render the user info preamble message.
pub fn build_user_info(
    profile: &UserProfile,
    current_time: &str,
    weather: Option<&WeatherReport>,
) -> String {
    let info = UserInfo {
        name: &profile.name,
        race: profile.race,
        sex: profile.sex,
        birthday: &profile.birthday,
        details: &profile.details,
        current_time,
        weather,
    };
    let body = serde_json::to_string(&info).unwrap_or_default();
    format!("{USER_PREFIX}{body}{USER_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn flattens_nested_objects_and_lists() {
        let data = as_map(json!({
            "name": "Ada",
            "likes": ["tea", "chess"],
            "dislikes": [],
            "job": {"title": "engineer", "years": 12, "team": {"size": 4}}
        }));
        assert_eq!(
            flatten_persona(&data, ""),
            "name: Ada, likes: tea, chess, dislikes: None, job(title): engineer, \
             job(years): 12, job(team)(size): 4"
        );
    }

    #[test]
    fn load_persona_wraps_text() {
        let dir = tempfile::tempdir().unwrap();
        let persona_dir = dir.path().join("ada");
        std::fs::create_dir_all(&persona_dir).unwrap();
        std::fs::write(persona_dir.join("ada.json"), r#"{"name": "Ada", "age": 30}"#).unwrap();

        let text = load_persona(dir.path(), "ada").unwrap();
        assert_eq!(
            text,
            "Persona Information: name: Ada, age: 30 End of persona data."
        );
    }

    #[test]
    fn missing_persona_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_persona(dir.path(), "ghost").unwrap_err(),
            ConfigError::NotFound(_)
        ));
    }

    #[test]
    fn profile_enums_parse_and_reject() {
        assert_eq!("Non-binary".parse::<Sex>().unwrap(), Sex::NonBinary);
        assert!("Robot".parse::<Sex>().is_err());
        assert_eq!(
            "Hispanic or Latino".parse::<Race>().unwrap(),
            Race::Hispanic
        );
        assert!("Martian".parse::<Race>().is_err());

        let bad: Result<UserProfile, _> = serde_json::from_value(json!({
            "name": "x", "birthday": "y", "sex": "Robot", "race": "Other"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn user_info_message_layout() {
        let profile = UserProfile::new("John Doe", "1970-01-01", Sex::Male, Race::Caucasian);
        let text = build_user_info(&profile, "2026-10-18_09-00-00", None);
        assert!(text.starts_with("User Information: {\"name\":\"John Doe\""));
        assert!(text.ends_with("}End of user information."));
        assert!(text.contains("\"details\":\"No additional details provided.\""));
        assert!(text.contains("\"current_time\":\"2026-10-18_09-00-00\""));
        assert!(!text.contains("weather"));

        let weather = WeatherReport::default();
        let text = build_user_info(&profile, "t", Some(&weather));
        assert!(text.contains("\"weather\":{\"city\":\"N/A\""));
    }
}
