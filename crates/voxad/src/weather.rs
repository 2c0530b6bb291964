//! Current-conditions lookup against an OpenWeatherMap-compatible API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather lookups are not configured")]
    NotConfigured,

    /// Provider answered with a non-success status
    #[error("provider returned {code}: {message}")]
    Provider { code: String, message: String },

    /// Success status but required fields were missing
    #[error("incomplete weather payload")]
    Incomplete,

    #[error("{0}")]
    Transport(String),
}

impl WeatherError {
    /// User-facing reply for this failure
    pub fn apology(&self, city: &str) -> String {
        match self {
            Self::NotConfigured => "Sorry, weather lookups are not configured right now.".to_string(),
            Self::Provider { message, .. } => format!(
                "Sorry, I couldn't fetch the weather for {}. Error: {}",
                city, message
            ),
            Self::Incomplete => format!(
                "Sorry, I couldn't get detailed weather information for {}.",
                city
            ),
            Self::Transport(reason) => format!(
                "Sorry, an error occurred while fetching weather: {}",
                reason
            ),
        }
    }
}

/// Current conditions in metric units
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub temp_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: f64,
    pub description: String,
    pub wind_speed_ms: Option<f64>,
    pub visibility_m: Option<f64>,
}

impl WeatherReport {
    /// Multi-line human-readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Weather in {}:", self.city),
            format!(
                "Temperature: {}°C (feels like {}°C)",
                fmt_number(self.temp_c),
                fmt_number(self.feels_like_c)
            ),
            format!("Conditions: {}", self.description),
            format!("Humidity: {}%", fmt_number(self.humidity_pct)),
        ];
        if let Some(wind) = self.wind_speed_ms {
            lines.push(format!("Wind: {} m/s", fmt_number(wind)));
        }
        if let Some(visibility) = self.visibility_m {
            lines.push(format!("Visibility: {} km", fmt_number(visibility / 1000.0)));
        }
        lines.join("\n")
    }
}

/// One decimal at most, no trailing ".0"
fn fmt_number(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherError>;
}

#[derive(Deserialize)]
struct OwmPayload {
    main: Option<OwmMain>,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    wind: Option<OwmWind>,
    visibility: Option<f64>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Deserialize)]
struct OwmFailure {
    cod: Option<Value>,
    message: Option<String>,
}

/// Parse a success payload. Falls back to the requested city when the
/// provider does not echo a name.
pub fn report_from_payload(requested_city: &str, body: &str) -> Result<WeatherReport, WeatherError> {
    let payload: OwmPayload = serde_json::from_str(body).map_err(|e| {
        debug!("Weather payload did not parse: {}", e);
        WeatherError::Incomplete
    })?;

    let main = payload.main.ok_or(WeatherError::Incomplete)?;
    let description = payload
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .ok_or(WeatherError::Incomplete)?;

    let city = payload
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| requested_city.to_string());

    Ok(WeatherReport {
        city,
        temp_c: main.temp,
        feels_like_c: main.feels_like,
        humidity_pct: main.humidity,
        description,
        wind_speed_ms: payload.wind.map(|w| w.speed),
        visibility_m: payload.visibility,
    })
}

/// Parse a failure payload. `cod` may be a number or a string.
pub fn error_from_payload(status: u16, reason: Option<&str>, body: &str) -> WeatherError {
    let failure: Option<OwmFailure> = serde_json::from_str(body).ok();
    let code = failure
        .as_ref()
        .and_then(|f| f.cod.as_ref())
        .map(|cod| match cod {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| status.to_string());
    let message = failure
        .and_then(|f| f.message)
        .filter(|m| !m.trim().is_empty())
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| "Unknown error".to_string());

    WeatherError::Provider { code, message }
}

/// HTTP client for OpenWeatherMap
pub struct OpenWeatherClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_url: api_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::NotConfigured)?;

        debug!("Fetching weather for {}", city);
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(error_from_payload(status.as_u16(), status.canonical_reason(), &body));
        }
        report_from_payload(city, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: &str = r#"{
        "main": {"temp": 20, "feels_like": 19, "humidity": 50},
        "weather": [{"description": "clear sky"}],
        "wind": {"speed": 3},
        "name": "Paris"
    }"#;

    #[test]
    fn test_report_from_payload() {
        let report = report_from_payload("paris", PARIS).unwrap();
        assert_eq!(report.city, "Paris");
        assert_eq!(report.temp_c, 20.0);
        assert_eq!(report.description, "clear sky");
        assert_eq!(report.visibility_m, None);
    }

    #[test]
    fn test_summary_format() {
        let summary = report_from_payload("paris", PARIS).unwrap().summary();
        assert_eq!(
            summary,
            "Weather in Paris:\n\
             Temperature: 20°C (feels like 19°C)\n\
             Conditions: clear sky\n\
             Humidity: 50%\n\
             Wind: 3 m/s"
        );
    }

    #[test]
    fn test_summary_with_visibility_and_decimals() {
        let body = r#"{
            "main": {"temp": 4.26, "feels_like": -0.04, "humidity": 81},
            "weather": [{"description": "light rain"}],
            "wind": {"speed": 5.14},
            "visibility": 8500
        }"#;
        let summary = report_from_payload("Bergen", body).unwrap().summary();
        assert!(summary.starts_with("Weather in Bergen:"));
        assert!(summary.contains("Temperature: 4.3°C (feels like 0°C)"));
        assert!(summary.contains("Wind: 5.1 m/s"));
        assert!(summary.contains("Visibility: 8.5 km"));
    }

    #[test]
    fn test_incomplete_payload() {
        let body = r#"{"weather": [], "name": "Nowhere"}"#;
        assert!(matches!(
            report_from_payload("Nowhere", body),
            Err(WeatherError::Incomplete)
        ));
        assert!(matches!(
            report_from_payload("Nowhere", "not json"),
            Err(WeatherError::Incomplete)
        ));
    }

    #[test]
    fn test_error_payload_string_code() {
        let err = error_from_payload(404, Some("Not Found"), r#"{"cod":"404","message":"city not found"}"#);
        match &err {
            WeatherError::Provider { code, message } => {
                assert_eq!(code, "404");
                assert_eq!(message, "city not found");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            err.apology("Atlantis"),
            "Sorry, I couldn't fetch the weather for Atlantis. Error: city not found"
        );
    }

    #[test]
    fn test_error_payload_numeric_code_and_fallback_message() {
        let err = error_from_payload(401, Some("Unauthorized"), r#"{"cod":401}"#);
        match err {
            WeatherError::Provider { code, message } => {
                assert_eq!(code, "401");
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = error_from_payload(502, None, "<html>bad gateway</html>");
        assert!(err.apology("Oslo").ends_with("Error: Unknown error"));
    }

    #[tokio::test]
    async fn test_client_without_key_is_not_configured() {
        let client = OpenWeatherClient::new(DEFAULT_WEATHER_URL, Some("  ".to_string()), Duration::from_secs(1));
        assert!(!client.is_configured());
        assert!(matches!(
            client.current("Paris").await,
            Err(WeatherError::NotConfigured)
        ));
    }
}
