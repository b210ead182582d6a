//! Weather collaborator
//!
//! Fetches current conditions from Open-Meteo and derives the snapshot the
//! advisory engine reads: condition, alerts, forecast text and seasonal
//! farming advice. An unknown location yields `None`, not an error.

use crate::config::Config;
use crate::error::{VoiceError, VoiceResult};
use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Stormy,
    Foggy,
}

impl WeatherCondition {
    /// Map a WMO weather code to a condition
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => WeatherCondition::Sunny,
            1..=3 => WeatherCondition::Cloudy,
            45..=48 => WeatherCondition::Foggy,
            51..=67 => WeatherCondition::Rainy,
            71..=77 => WeatherCondition::Snowy,
            95.. => WeatherCondition::Stormy,
            _ => WeatherCondition::Cloudy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "sunny",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rainy => "rainy",
            WeatherCondition::Snowy => "snowy",
            WeatherCondition::Stormy => "stormy",
            WeatherCondition::Foggy => "foggy",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Danger,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub id: String,
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl WeatherAlert {
    pub fn new(id: &str, kind: AlertKind, title: &str, message: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            timestamp: Local::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    /// Northern-hemisphere season for a month numbered 1..=12
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn current() -> Self {
        Self::from_month(Local::now().month())
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Season::Spring => "Plant warm-season crops like tomatoes, peppers, beans, and squash. Start preparing soil with compost.",
            Season::Summer => "Focus on heat-tolerant crops. Maintain consistent watering. Plant succession crops for continuous harvest.",
            Season::Fall => "Plant cool-season crops like broccoli, cauliflower, and root vegetables. Prepare for winter storage crops.",
            Season::Winter => "Grow cold-hardy greens like kale and collards. Plan crop rotation for next season. Maintain greenhouse crops.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmingAdvice {
    pub id: String,
    pub title: String,
    pub description: String,
    pub crop: String,
    pub season: String,
}

/// One immutable weather reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: String,
    /// °C, rounded
    pub temperature: f64,
    pub condition: WeatherCondition,
    /// Relative humidity, percent
    pub humidity: f64,
    /// km/h, rounded
    pub wind_speed: f64,
    pub forecast: String,
    pub alerts: Vec<WeatherAlert>,
    pub farming_advice: Vec<FarmingAdvice>,
}

/// Threshold alerts for the current reading
pub fn generate_alerts(temperature: f64, wind_speed: f64, precipitation_today: Option<f64>) -> Vec<WeatherAlert> {
    let mut alerts = Vec::new();

    if temperature > 35.0 {
        alerts.push(WeatherAlert::new(
            "1",
            AlertKind::Warning,
            "Extreme Heat Warning",
            "Temperature exceeds 35°C. Ensure adequate irrigation and shade for crops.",
        ));
    }
    if temperature < 0.0 {
        alerts.push(WeatherAlert::new(
            "2",
            AlertKind::Danger,
            "Frost Warning",
            "Freezing temperatures detected. Protect sensitive crops immediately.",
        ));
    }
    if wind_speed > 50.0 {
        alerts.push(WeatherAlert::new(
            "3",
            AlertKind::Danger,
            "High Wind Alert",
            "Strong winds detected. Secure loose structures and protect tall crops.",
        ));
    }
    if precipitation_today.is_some_and(|mm| mm > 50.0) {
        alerts.push(WeatherAlert::new(
            "4",
            AlertKind::Warning,
            "Heavy Rainfall Expected",
            "Significant rainfall expected. Ensure proper drainage to prevent waterlogging.",
        ));
    }

    alerts
}

/// Round to the nearest integer, halves toward positive infinity (-2.5 -> -2)
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// "High: X°C, Low: Y°C. " followed by a rainfall phrase
pub fn forecast_description(max_temp: f64, min_temp: f64, precipitation: f64) -> String {
    let rain = if precipitation > 10.0 {
        "Significant rainfall expected."
    } else if precipitation > 0.0 {
        "Light precipitation possible."
    } else {
        "No precipitation expected."
    };
    format!(
        "High: {}°C, Low: {}°C. {}",
        round_half_up(max_temp),
        round_half_up(min_temp),
        rain
    )
}

pub fn farming_advice(condition: WeatherCondition, temperature: f64, season: Season) -> Vec<FarmingAdvice> {
    let advice = |id: &str, title: &str, description: &str, crop: &str| FarmingAdvice {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        crop: crop.to_string(),
        season: season.name().to_string(),
    };

    let planting = if temperature > 15.0 && temperature < 30.0 {
        "Temperature is ideal for planting most crops. Consider tomatoes, peppers, and cucumbers."
    } else if temperature > 30.0 {
        "Temperature is high. Focus on heat-resistant crops like okra, eggplant, and melons."
    } else {
        "Temperature is low. Consider cool-season crops like lettuce, spinach, and peas."
    };

    let mut list = vec![advice("1", "Optimal Planting Time", planting, "Various")];
    match condition {
        WeatherCondition::Rainy => list.push(advice(
            "2",
            "Moisture Management",
            "Rainy conditions detected. Avoid excessive watering and ensure proper drainage. Good time for transplanting.",
            "All crops",
        )),
        WeatherCondition::Sunny => list.push(advice(
            "3",
            "Irrigation Schedule",
            "Sunny weather requires regular watering. Water early morning or late evening to minimize evaporation.",
            "All crops",
        )),
        _ => {}
    }
    list.push(advice(
        "4",
        "Seasonal Crop Recommendations",
        season.recommendation(),
        "Seasonal",
    ));
    list
}

/// Spoken once a snapshot has loaded
pub fn loaded_announcement(snapshot: &WeatherSnapshot) -> String {
    format!(
        "Weather data loaded. Current temperature is {} degrees Celsius. Condition: {}",
        snapshot.temperature, snapshot.condition
    )
}

pub fn fetching_announcement(location: &str) -> String {
    format!("Fetching weather data for {}", location)
}

pub const UNAVAILABLE_ANNOUNCEMENT: &str =
    "Unable to fetch weather data. Please check the location and try again.";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    current: CurrentWeather,
    daily: DailyWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    weather_code: u16,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct DailyWeather {
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    precipitation_sum: Vec<f64>,
}

impl ForecastResponse {
    /// Build a snapshot for `location` from a decoded forecast
    pub fn into_snapshot(self, location: &str, season: Season) -> VoiceResult<WeatherSnapshot> {
        let current = self.current;
        let daily = self.daily;

        let (Some(&max_temp), Some(&min_temp)) = (
            daily.temperature_2m_max.first(),
            daily.temperature_2m_min.first(),
        ) else {
            return Err(VoiceError::Weather("forecast has no daily values".to_string()));
        };
        let precipitation_today = daily.precipitation_sum.first().copied();

        let condition = WeatherCondition::from_code(current.weather_code);
        let alerts = generate_alerts(
            current.temperature_2m,
            current.wind_speed_10m,
            precipitation_today,
        );
        let farming_advice = farming_advice(condition, current.temperature_2m, season);

        Ok(WeatherSnapshot {
            location: location.to_string(),
            temperature: round_half_up(current.temperature_2m),
            condition,
            humidity: current.relative_humidity_2m,
            wind_speed: round_half_up(current.wind_speed_10m),
            forecast: forecast_description(max_temp, min_temp, precipitation_today.unwrap_or(0.0)),
            alerts,
            farming_advice,
        })
    }
}

/// Open-Meteo client
pub struct WeatherClient {
    http: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
}

impl WeatherClient {
    pub fn new(config: &Config) -> VoiceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
        })
    }

    async fn coordinates(&self, location: &str) -> VoiceResult<Option<(f64, f64)>> {
        let url = format!(
            "{}?name={}&count=1&language=en&format=json",
            self.geocoding_url,
            urlencoding::encode(location)
        );
        let response: GeocodingResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .results
            .and_then(|results| results.into_iter().next())
            .map(|r| (r.latitude, r.longitude)))
    }

    /// Current snapshot for `location`, `None` when the place is unknown
    pub async fn fetch(&self, location: &str) -> VoiceResult<Option<WeatherSnapshot>> {
        let Some((latitude, longitude)) = self.coordinates(location).await? else {
            info!("📍 Location not found: {}", location);
            return Ok(None);
        };
        debug!("📍 {} -> ({}, {})", location, latitude, longitude);

        let url = format!(
            "{}?latitude={}&longitude={}&current=temperature_2m,relative_humidity_2m,precipitation,weather_code,wind_speed_10m&daily=temperature_2m_max,temperature_2m_min,precipitation_sum,weather_code&timezone=auto",
            self.forecast_url, latitude, longitude
        );
        let forecast: ForecastResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        forecast.into_snapshot(location, Season::current()).map(Some)
    }

    /// Like [`fetch`](Self::fetch), but any failure is reported as no data
    pub async fn lookup(&self, location: &str) -> Option<WeatherSnapshot> {
        match self.fetch(location).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("⚠️ Weather lookup for '{}' failed: {}", location, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST_JSON: &str = r#"{
        "current": {
            "temperature_2m": 36.4,
            "relative_humidity_2m": 22,
            "precipitation": 0.0,
            "weather_code": 0,
            "wind_speed_10m": 14.6
        },
        "daily": {
            "temperature_2m_max": [38.2, 37.0],
            "temperature_2m_min": [24.6, 23.1],
            "precipitation_sum": [0.0, 1.2],
            "weather_code": [0, 1]
        }
    }"#;

    #[test]
    fn test_condition_codes() {
        assert_eq!(WeatherCondition::from_code(0), WeatherCondition::Sunny);
        assert_eq!(WeatherCondition::from_code(2), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::from_code(45), WeatherCondition::Foggy);
        assert_eq!(WeatherCondition::from_code(61), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_code(75), WeatherCondition::Snowy);
        assert_eq!(WeatherCondition::from_code(99), WeatherCondition::Stormy);
        assert_eq!(WeatherCondition::from_code(80), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::Rainy.to_string(), "rainy");
    }

    #[test]
    fn test_alert_thresholds() {
        assert!(generate_alerts(20.0, 10.0, Some(5.0)).is_empty());

        let titles: Vec<String> = generate_alerts(-2.0, 60.0, Some(80.0))
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(
            titles,
            vec!["Frost Warning", "High Wind Alert", "Heavy Rainfall Expected"]
        );

        let heat = generate_alerts(35.5, 0.0, None);
        assert_eq!(heat.len(), 1);
        assert_eq!(heat[0].kind, AlertKind::Warning);
    }

    #[test]
    fn test_forecast_description() {
        assert_eq!(
            forecast_description(30.4, 18.6, 12.0),
            "High: 30°C, Low: 19°C. Significant rainfall expected."
        );
        assert_eq!(
            forecast_description(10.0, 2.0, 0.3),
            "High: 10°C, Low: 2°C. Light precipitation possible."
        );
        assert_eq!(
            forecast_description(10.0, 2.0, 0.0),
            "High: 10°C, Low: 2°C. No precipitation expected."
        );
    }

    #[test]
    fn test_halves_round_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(
            forecast_description(-0.5, -2.5, 0.0),
            "High: 0°C, Low: -2°C. No precipitation expected."
        );
    }

    #[test]
    fn test_seasons() {
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(4), Season::Spring);
        assert_eq!(Season::from_month(7), Season::Summer);
        assert_eq!(Season::from_month(10), Season::Fall);
        assert_eq!(Season::from_month(12), Season::Winter);
    }

    #[test]
    fn test_farming_advice_by_condition() {
        let rainy = farming_advice(WeatherCondition::Rainy, 20.0, Season::Spring);
        let titles: Vec<&str> = rainy.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Optimal Planting Time",
                "Moisture Management",
                "Seasonal Crop Recommendations"
            ]
        );
        assert!(rainy[0].description.contains("ideal"));
        assert_eq!(rainy[2].season, "Spring");

        let foggy = farming_advice(WeatherCondition::Foggy, 5.0, Season::Winter);
        assert_eq!(foggy.len(), 2);
        assert!(foggy[0].description.contains("cool-season"));
    }

    #[test]
    fn test_forecast_into_snapshot() {
        let forecast: ForecastResponse =
            serde_json::from_str(FORECAST_JSON).expect("Failed to parse fixture");
        let snapshot = forecast
            .into_snapshot("Austin", Season::Summer)
            .expect("Failed to build snapshot");

        assert_eq!(snapshot.location, "Austin");
        assert_eq!(snapshot.temperature, 36.0);
        assert_eq!(snapshot.wind_speed, 15.0);
        assert_eq!(snapshot.humidity, 22.0);
        assert_eq!(snapshot.condition, WeatherCondition::Sunny);
        assert_eq!(
            snapshot.forecast,
            "High: 38°C, Low: 25°C. No precipitation expected."
        );
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0].title, "Extreme Heat Warning");
        assert!(snapshot
            .farming_advice
            .iter()
            .any(|a| a.title == "Irrigation Schedule"));

        assert_eq!(
            loaded_announcement(&snapshot),
            "Weather data loaded. Current temperature is 36 degrees Celsius. Condition: sunny"
        );
    }

    #[test]
    fn test_empty_daily_forecast_is_an_error() {
        let json = r#"{
            "current": {"temperature_2m": 10, "relative_humidity_2m": 50, "weather_code": 3, "wind_speed_10m": 4},
            "daily": {"temperature_2m_max": [], "temperature_2m_min": []}
        }"#;
        let forecast: ForecastResponse = serde_json::from_str(json).expect("Failed to parse");
        assert!(forecast.into_snapshot("Nowhere", Season::Fall).is_err());
    }
}
