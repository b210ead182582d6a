//! Farming advisory engine
//!
//! Maps a free-text question plus the current weather snapshot to one answer.
//! Categories are scanned in a fixed order and the first whose keywords
//! appear in the lowercased question wins, so "pest control for my crop"
//! is answered as a planting question.

use crate::weather::{WeatherCondition, WeatherSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Temperature assumed when no snapshot is available (°C)
pub const DEFAULT_TEMPERATURE: f64 = 20.0;
/// Condition assumed when no snapshot is available
pub const DEFAULT_CONDITION: WeatherCondition = WeatherCondition::Sunny;

pub const NO_LOCATION_RESPONSE: &str = "Please search for a location to get weather information.";

pub const PLANTING_WINDOW_RESPONSE: &str = "The best planting time depends on your crop and climate. Generally: Spring (March-May) for warm-season crops like tomatoes, peppers, and squash. Fall (September-October) for cool-season crops like lettuce, broccoli, and peas. Always check your local frost dates!";

pub const WARM_CROPS_RESPONSE: &str = "For warm weather, I recommend heat-tolerant crops: Tomatoes, peppers, eggplant, okra, melons, and beans. These thrive in temperatures above 25°C.";

pub const COOL_CROPS_RESPONSE: &str = "For cool weather, consider: Lettuce, spinach, kale, broccoli, peas, and root vegetables like carrots and radishes. These prefer temperatures below 15°C.";

pub const MODERATE_CROPS_RESPONSE: &str = "Your temperature is ideal for most crops! Consider: Tomatoes, cucumbers, zucchini, lettuce, and herbs like basil and cilantro.";

pub const PLANTING_PROMPT_RESPONSE: &str = "I can help with planting advice! Ask me: \"When should I plant?\" or \"What should I plant in this weather?\"";

pub const RAINY_WATERING_RESPONSE: &str = "With rainy conditions, reduce watering frequency. Ensure proper drainage to prevent waterlogging. Check soil moisture before watering.";

pub const SUNNY_WATERING_RESPONSE: &str = "In sunny weather, water early morning (6-10 AM) or evening (4-7 PM) to minimize evaporation. Most crops need 1-2 inches of water per week. Deep, infrequent watering is better than shallow, frequent watering.";

pub const GENERAL_WATERING_RESPONSE: &str = "Water your plants when the top inch of soil is dry. Most vegetables need consistent moisture, about 1-2 inches per week including rainfall.";

pub const PEST_RESPONSE: &str = "For natural pest control: 1) Companion planting (marigolds deter many pests), 2) Neem oil spray for soft-bodied insects, 3) Hand-picking larger pests, 4) Encourage beneficial insects like ladybugs, 5) Use row covers for vulnerable crops. For severe infestations, consult local agricultural extension services.";

pub const SOIL_RESPONSE: &str = "Healthy soil is crucial! Tips: 1) Add compost regularly (2-3 inches annually), 2) Test soil pH (most crops prefer 6.0-7.0), 3) Rotate crops to prevent nutrient depletion, 4) Use mulch to retain moisture and prevent weeds, 5) Consider cover crops in off-season to improve soil structure.";

pub const HARVEST_RESPONSE: &str = "Harvest timing varies by crop. General signs: Tomatoes - firm with full color, Lettuce - before it bolts, Carrots - when tops are 1 inch diameter, Peppers - when they reach full size and desired color. Most vegetables taste best when harvested in the morning after dew dries.";

pub const NO_ALERTS_RESPONSE: &str =
    "No active weather alerts at this time. I'll notify you if any severe weather is detected.";

/// Answers for questions no category recognizes
pub const FALLBACK_RESPONSES: [&str; 3] = [
    "I can help you with planting advice, watering schedules, pest control, soil health, and weather-related farming questions. What would you like to know?",
    "Great question! I specialize in weather-based farming advice. You can ask me about what to plant, when to water, how to prepare for weather changes, and more.",
    "I'm here to help with your farming needs! Try asking about crop recommendations, planting schedules, or current weather conditions.",
];

/// Question topic, in match priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Weather,
    Planting,
    Watering,
    Pests,
    Soil,
    Harvest,
    Alerts,
}

/// Keyword table scanned top to bottom
const CATEGORIES: &[(Category, &[&str])] = &[
    (Category::Weather, &["weather", "temperature", "forecast"]),
    (Category::Planting, &["plant", "crop", "grow"]),
    (Category::Watering, &["water", "irrigation"]),
    (Category::Pests, &["pest", "bug", "insect"]),
    (Category::Soil, &["soil", "compost", "fertilizer"]),
    (Category::Harvest, &["harvest", "pick", "ready"]),
    (Category::Alerts, &["alert", "warning", "danger"]),
];

/// First category whose keywords occur in the question
pub fn classify(query: &str) -> Option<Category> {
    let query = query.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| query.contains(keyword)))
        .map(|(category, _)| *category)
}

/// Rule-based responder; `R` picks among fallback answers
pub struct AdvisoryEngine<R = StdRng> {
    rng: R,
}

impl AdvisoryEngine<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for AdvisoryEngine<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> AdvisoryEngine<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Answer one question; `snapshot` is `None` when no weather is loaded
    pub fn respond(&mut self, query: &str, snapshot: Option<&WeatherSnapshot>) -> String {
        let lower = query.to_lowercase();
        let category = classify(&lower);
        debug!("Advisory query '{}' -> {:?}", query, category);

        match category {
            Some(Category::Weather) => match snapshot {
                Some(weather) => format!(
                    "Current weather in {}: {}°C with {} conditions. Humidity is {}% and wind speed is {} km/h. {}",
                    weather.location,
                    weather.temperature,
                    weather.condition,
                    weather.humidity,
                    weather.wind_speed,
                    weather.forecast
                ),
                None => NO_LOCATION_RESPONSE.to_string(),
            },
            Some(Category::Planting) => {
                if lower.contains("when") {
                    PLANTING_WINDOW_RESPONSE.to_string()
                } else if lower.contains("what") {
                    let temperature = snapshot.map_or(DEFAULT_TEMPERATURE, |w| w.temperature);
                    if temperature > 25.0 {
                        WARM_CROPS_RESPONSE.to_string()
                    } else if temperature < 15.0 {
                        COOL_CROPS_RESPONSE.to_string()
                    } else {
                        MODERATE_CROPS_RESPONSE.to_string()
                    }
                } else {
                    PLANTING_PROMPT_RESPONSE.to_string()
                }
            }
            Some(Category::Watering) => {
                match snapshot.map_or(DEFAULT_CONDITION, |w| w.condition) {
                    WeatherCondition::Rainy => RAINY_WATERING_RESPONSE.to_string(),
                    WeatherCondition::Sunny => SUNNY_WATERING_RESPONSE.to_string(),
                    _ => GENERAL_WATERING_RESPONSE.to_string(),
                }
            }
            Some(Category::Pests) => PEST_RESPONSE.to_string(),
            Some(Category::Soil) => SOIL_RESPONSE.to_string(),
            Some(Category::Harvest) => HARVEST_RESPONSE.to_string(),
            Some(Category::Alerts) => match snapshot.and_then(|w| w.alerts.first()) {
                Some(alert) => format!("Active alert: {} - {}", alert.title, alert.message),
                None => NO_ALERTS_RESPONSE.to_string(),
            },
            None => {
                let index = self.rng.gen_range(0..FALLBACK_RESPONSES.len());
                FALLBACK_RESPONSES[index].to_string()
            }
        }
    }
}
