//! Weather widget
//!
//! Fetches current conditions and a short forecast for a city or coordinate
//! pair and normalizes them into a [`WeatherReport`].

mod openweather;

use serde::Serialize;

pub use openweather::{DEFAULT_BASE_URL, WeatherClient};

/// What to look up
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    City(String),
    Coordinates { lat: f64, lon: f64 },
}

/// Icon names used by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherIcon {
    CloudLightning,
    CloudRain,
    Cloud,
    Sun,
}

impl WeatherIcon {
    /// Map an `OpenWeather` condition id
    #[must_use]
    pub const fn from_condition(id: u32) -> Self {
        match id {
            200..=299 => Self::CloudLightning,
            300..=699 => Self::CloudRain,
            800 => Self::Sun,
            _ => Self::Cloud,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CloudLightning => "cloud-lightning",
            Self::CloudRain => "cloud-rain",
            Self::Cloud => "cloud",
            Self::Sun => "sun",
        }
    }
}

/// Current conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    /// Degrees Celsius, rounded
    pub temp: i32,
    pub feels_like: i32,
    /// Percent
    pub humidity: u32,
    /// Miles per hour, rounded
    pub wind_speed: i32,
    /// Hectopascal, rounded
    pub pressure: i32,
    /// Miles, rounded
    pub visibility: i32,
    pub description: String,
    pub icon: WeatherIcon,
}

/// One 3-hour forecast slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyForecast {
    /// Local hour, e.g. `3 PM`
    pub time: String,
    pub temp: i32,
    pub icon: WeatherIcon,
    pub description: String,
}

/// One day of the forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    /// Short weekday, or `Today`
    pub day: String,
    pub high: i32,
    pub low: i32,
    pub icon: WeatherIcon,
    pub description: String,
    /// Chance of precipitation, percent
    pub precipitation: u32,
}

/// Normalized weather for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    /// `City, CC`
    pub location: String,
    pub current: CurrentConditions,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
}

/// Expand common city names into `City, CC` for better lookups
#[must_use]
pub fn improve_city_name(city: &str) -> String {
    let alias = match city.trim().to_lowercase().as_str() {
        "new york" | "nyc" => "New York, US",
        "london" => "London, GB",
        "tokyo" => "Tokyo, JP",
        "mumbai" | "bombay" => "Mumbai, IN",
        "paris" => "Paris, FR",
        "sydney" => "Sydney, AU",
        "delhi" => "Delhi, IN",
        "bangalore" => "Bangalore, IN",
        "chennai" => "Chennai, IN",
        "kolkata" => "Kolkata, IN",
        "hyderabad" => "Hyderabad, IN",
        "pune" => "Pune, IN",
        "ahmedabad" => "Ahmedabad, IN",
        "jaipur" => "Jaipur, IN",
        "lucknow" => "Lucknow, IN",
        "kanpur" => "Kanpur, IN",
        "nagpur" => "Nagpur, IN",
        "indore" => "Indore, IN",
        _ => return city.to_string(),
    };
    alias.to_string()
}
