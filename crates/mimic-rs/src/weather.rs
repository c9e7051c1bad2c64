//! Current-weather lookup for the user info message.
//!
//! Weather is decoration: a failed lookup yields a report full of `"N/A"`
//! rather than an error, so session start never depends on it.

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

pub const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

const NOT_AVAILABLE: &str = "N/A";

/// Current conditions at the configured location. Temperatures are in
/// degrees Fahrenheit.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WeatherReport {
    pub city: String,
    pub country: String,
    pub weather_main: String,
    pub description: String,
    pub temperature: String,
    pub feels_like: String,
}

impl Default for WeatherReport {
    fn default() -> Self {
        Self {
            city: NOT_AVAILABLE.into(),
            country: NOT_AVAILABLE.into(),
            weather_main: NOT_AVAILABLE.into(),
            description: NOT_AVAILABLE.into(),
            temperature: NOT_AVAILABLE.into(),
            feels_like: NOT_AVAILABLE.into(),
        }
    }
}

impl WeatherReport {
    /// Extract a report from an OpenWeather "current weather" response.
    ///
    /// A body missing any of `weather`, `main` or `sys` yields the default.
    pub fn from_openweather(body: &Value) -> Self {
        if body.get("weather").is_none() || body.get("main").is_none() || body.get("sys").is_none()
        {
            return Self::default();
        }
        let weather = body.pointer("/weather/0");
        let text = |v: Option<&Value>, lower: bool| -> String {
            match v {
                Some(Value::String(s)) if lower => s.to_lowercase(),
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => NOT_AVAILABLE.into(),
            }
        };
        Self {
            city: text(body.get("name"), false),
            country: text(body.pointer("/sys/country"), false),
            weather_main: text(weather.and_then(|w| w.get("main")), true),
            description: text(weather.and_then(|w| w.get("description")), true),
            temperature: text(body.pointer("/main/temp"), false),
            feels_like: text(body.pointer("/main/feels_like"), false),
        }
    }
}

/// Boxed future returned by [`WeatherProvider::current`].
pub type WeatherFuture<'a> = Pin<Box<dyn Future<Output = WeatherReport> + Send + 'a>>;

/// Looks up current weather. Never fails; unknown values are `"N/A"`.
pub trait WeatherProvider: Send + Sync {
    fn current(&self, lat: f64, lon: f64) -> WeatherFuture<'_>;
}

/// OpenWeather "current weather" API client (imperial units).
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("mimic-rs/0.1")
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<Value, String> {
        let url = reqwest::Url::parse_with_params(
            OPENWEATHER_URL,
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "imperial".to_string()),
            ],
        )
        .map_err(|e| format!("invalid weather URL: {e}"))?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("weather request failed: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("weather API HTTP {status}"));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| format!("failed to parse weather response: {e}"))
    }
}

impl WeatherProvider for OpenWeatherClient {
    fn current(&self, lat: f64, lon: f64) -> WeatherFuture<'_> {
        Box::pin(async move {
            match self.fetch(lat, lon).await {
                Ok(body) => {
                    let report = WeatherReport::from_openweather(&body);
                    debug!("Weather for {}: {}", report.city, report.description);
                    report
                }
                Err(e) => {
                    warn!("Weather lookup failed: {e}");
                    WeatherReport::default()
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_response() {
        let body = json!({
            "weather": [{"main": "Clouds", "description": "Overcast Clouds"}],
            "main": {"temp": 54.3, "feels_like": 52.1},
            "wind": {"speed": 5.0},
            "sys": {"country": "US"},
            "name": "Springfield"
        });
        let report = WeatherReport::from_openweather(&body);
        assert_eq!(report.city, "Springfield");
        assert_eq!(report.country, "US");
        assert_eq!(report.weather_main, "clouds");
        assert_eq!(report.description, "overcast clouds");
        assert_eq!(report.temperature, "54.3");
        assert_eq!(report.feels_like, "52.1");
    }

    #[test]
    fn missing_sections_yield_default() {
        let body = json!({"weather": [], "main": {"temp": 1}});
        assert_eq!(WeatherReport::from_openweather(&body), WeatherReport::default());
    }

    #[test]
    fn missing_fields_are_not_available() {
        let body = json!({"weather": [], "main": {}, "sys": {}});
        let report = WeatherReport::from_openweather(&body);
        assert_eq!(report.city, "N/A");
        assert_eq!(report.temperature, "N/A");
        assert_eq!(report.weather_main, "N/A");
    }
}
