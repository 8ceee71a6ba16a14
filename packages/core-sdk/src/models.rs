use std::fmt;

use serde::{Deserialize, Serialize};

/**
 * \brief Chat message, aligned with the OpenAI chat message format.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /** \brief Role: system/user/assistant */
    pub role: String,
    /** \brief Content */
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/**
 * \brief Weather alert category. Anything outside rain/storm/heat is kept verbatim in `Other`.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertKind {
    Rain,
    Storm,
    Heat,
    Other(String),
}

impl AlertKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "rain" => AlertKind::Rain,
            "storm" => AlertKind::Storm,
            "heat" => AlertKind::Heat,
            other => AlertKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AlertKind::Rain => "rain",
            AlertKind::Storm => "storm",
            AlertKind::Heat => "heat",
            AlertKind::Other(raw) => raw.as_str(),
        }
    }

    /** \brief True for the three kinds that have a dedicated prompt template. */
    pub fn is_recognized(&self) -> bool {
        !matches!(self, AlertKind::Other(_))
    }
}

impl From<String> for AlertKind {
    fn from(raw: String) -> Self {
        AlertKind::parse(&raw)
    }
}

impl From<AlertKind> for String {
    fn from(kind: AlertKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
 * \brief Weather snapshot handed to alert generation. Every field is optional.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    /** \brief City name, e.g. "Lahore" */
    #[serde(default)]
    pub city: Option<String>,
    /** \brief Free-text condition, e.g. "light rain" */
    #[serde(default)]
    pub description: Option<String>,
    /** \brief Temperature in °C */
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl WeatherData {
    pub fn city_or_default(&self) -> &str {
        self.city.as_deref().unwrap_or("your area")
    }

    pub fn description_or(&self, fallback: &'static str) -> &str {
        self.description.as_deref().unwrap_or(fallback)
    }

    pub fn temperature_or_default(&self) -> f64 {
        self.temperature.unwrap_or(35.0)
    }
}

/**
 * \brief Per-call alert request: kind, plant and current weather.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertContext {
    pub kind: AlertKind,
    pub plant_name: String,
    #[serde(default)]
    pub weather: WeatherData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_kind_parse_keeps_unknown_verbatim() {
        assert_eq!(AlertKind::parse("rain"), AlertKind::Rain);
        assert_eq!(AlertKind::parse("storm"), AlertKind::Storm);
        assert_eq!(AlertKind::parse("heat"), AlertKind::Heat);
        let other = AlertKind::parse("Rain");
        assert_eq!(other, AlertKind::Other("Rain".to_string()));
        assert!(!other.is_recognized());
        assert_eq!(other.to_string(), "Rain");
    }

    #[test]
    fn test_weather_defaults() {
        let empty = WeatherData::default();
        assert_eq!(empty.city_or_default(), "your area");
        assert_eq!(empty.description_or("rainy conditions"), "rainy conditions");
        assert_eq!(empty.temperature_or_default(), 35.0);
    }

    #[test]
    fn test_alert_context_from_json() {
        let ctx: AlertContext = serde_json::from_str(
            r#"{"kind":"storm","plant_name":"Basil","weather":{"city":"Lahore"}}"#,
        )
        .expect("parse alert context");
        assert_eq!(ctx.kind, AlertKind::Storm);
        assert_eq!(ctx.weather.city.as_deref(), Some("Lahore"));
        assert_eq!(ctx.weather.temperature, None);
    }
}
