//! `OpenWeather` client
//!
//! Fetches `/weather` and `/forecast` in metric units and folds them into a
//! [`WeatherReport`].

use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{
    CurrentConditions, DailyForecast, HourlyForecast, WeatherIcon, WeatherQuery, WeatherReport,
    improve_city_name,
};
use crate::{Error, Result};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const MPS_TO_MPH: f64 = 2.237;
const METERS_TO_MILES: f64 = 0.000_621_371;
const HOURLY_SLOTS: usize = 8;
const SLOTS_PER_DAY: usize = 8;
const MAX_DAYS: usize = 7;

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sys: Sys,
    main: Main,
    #[serde(default)]
    wind: Wind,
    visibility: Option<f64>,
    #[serde(default)]
    weather: Vec<Condition>,
    /// Shift from UTC in seconds
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Default, Deserialize)]
struct Sys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: u32,
    #[serde(default)]
    pressure: f64,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    id: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForecastResponse {
    #[serde(default)]
    list: Vec<Slot>,
}

#[derive(Debug, Deserialize)]
struct Slot {
    dt: i64,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    pop: f64,
}

/// Client for the `OpenWeather` API
pub struct WeatherClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl WeatherClient {
    /// Create a client; a missing key fails each request, not construction
    #[must_use]
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at another base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Weather for a city name (common names are expanded first)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] without a key, [`Error::CityNotFound`] if the
    /// provider does not know the city, or [`Error::Weather`] on other failures
    pub async fn by_city(&self, city: &str) -> Result<WeatherReport> {
        self.fetch(&WeatherQuery::City(city.to_string())).await
    }

    /// Weather for a coordinate pair
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] without a key or [`Error::Weather`] on failure
    pub async fn by_coordinates(&self, lat: f64, lon: f64) -> Result<WeatherReport> {
        self.fetch(&WeatherQuery::Coordinates { lat, lon }).await
    }

    /// Fetch current conditions and forecast concurrently
    ///
    /// # Errors
    ///
    /// See [`Self::by_city`] and [`Self::by_coordinates`]
    pub async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherReport> {
        let key = self
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| Error::Config("OpenWeather API key not configured".to_string()))?;

        let location = location_params(query);
        tracing::debug!(%location, "fetching weather");

        let (current, forecast) = tokio::try_join!(
            self.current(key, query, &location),
            self.forecast(key, &location)
        )?;

        let report = build_report(current, &forecast, Utc::now());
        tracing::info!(location = %report.location, temp = report.current.temp, "weather fetched");
        Ok(report)
    }

    async fn current(
        &self,
        key: &SecretString,
        query: &WeatherQuery,
        location: &str,
    ) -> Result<CurrentResponse> {
        let response = self.get("weather", key, location).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "current weather request failed");
            return Err(match query {
                WeatherQuery::City(city) => Error::CityNotFound(city.clone()),
                WeatherQuery::Coordinates { .. } => Error::Weather(
                    "Failed to fetch weather data for coordinates".to_string(),
                ),
            });
        }
        Ok(response.json().await?)
    }

    async fn forecast(&self, key: &SecretString, location: &str) -> Result<ForecastResponse> {
        let response = self.get("forecast", key, location).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "forecast request failed");
            return Err(Error::Weather("Failed to fetch forecast data".to_string()));
        }
        Ok(response.json().await?)
    }

    async fn get(
        &self,
        endpoint: &str,
        key: &SecretString,
        location: &str,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/{endpoint}?{location}", self.base_url);
        Ok(self
            .client
            .get(url)
            .query(&[("appid", key.expose_secret()), ("units", "metric")])
            .send()
            .await?)
    }
}

fn location_params(query: &WeatherQuery) -> String {
    match query {
        WeatherQuery::City(city) => {
            format!("q={}", urlencoding::encode(&improve_city_name(city)))
        }
        WeatherQuery::Coordinates { lat, lon } => format!("lat={lat}&lon={lon}"),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: f64) -> i32 {
    value.round() as i32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(fraction: f64) -> u32 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u32
}

fn icon_and_description(weather: &[Condition]) -> (WeatherIcon, String) {
    weather.first().map_or((WeatherIcon::Cloud, String::new()), |c| {
        (WeatherIcon::from_condition(c.id), c.description.clone())
    })
}

/// Fold raw responses into a report; times are shown in the location's zone
pub(crate) fn build_report(
    current: CurrentResponse,
    forecast: &ForecastResponse,
    now: DateTime<Utc>,
) -> WeatherReport {
    let zone = FixedOffset::east_opt(current.timezone).unwrap_or_else(|| Utc.fix());
    let local = |dt: i64| DateTime::from_timestamp(dt, 0).map(|t| t.with_timezone(&zone));
    let today = now.with_timezone(&zone).weekday();

    let (icon, description) = icon_and_description(&current.weather);
    let conditions = CurrentConditions {
        temp: round(current.main.temp),
        feels_like: round(current.main.feels_like),
        humidity: current.main.humidity,
        wind_speed: round(current.wind.speed * MPS_TO_MPH),
        pressure: round(current.main.pressure),
        visibility: round(current.visibility.unwrap_or(0.0) * METERS_TO_MILES),
        description,
        icon,
    };

    let hourly = forecast
        .list
        .iter()
        .take(HOURLY_SLOTS)
        .filter_map(|slot| {
            let time = local(slot.dt)?;
            let (icon, description) = icon_and_description(&slot.weather);
            Some(HourlyForecast {
                time: time.format("%-I %p").to_string(),
                temp: round(slot.main.temp),
                icon,
                description,
            })
        })
        .collect();

    let daily = forecast
        .list
        .iter()
        .step_by(SLOTS_PER_DAY)
        .take(MAX_DAYS)
        .filter_map(|slot| {
            let time = local(slot.dt)?;
            let day = if time.weekday() == today {
                "Today".to_string()
            } else {
                time.format("%a").to_string()
            };
            let (icon, description) = icon_and_description(&slot.weather);
            Some(DailyForecast {
                day,
                high: round(slot.main.temp_max.unwrap_or(slot.main.temp)),
                low: round(slot.main.temp_min.unwrap_or(slot.main.temp)),
                icon,
                description,
                precipitation: percent(slot.pop),
            })
        })
        .collect();

    WeatherReport {
        location: format!("{}, {}", current.name, current.sys.country),
        current: conditions,
        hourly,
        daily,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"{
        "name": "London",
        "sys": {"country": "GB"},
        "main": {"temp": 14.6, "feels_like": 13.2, "humidity": 72, "pressure": 1012.4},
        "wind": {"speed": 4.1},
        "visibility": 10000,
        "weather": [{"id": 500, "description": "light rain"}],
        "timezone": 0
    }"#;

    fn forecast_json(slots: usize, start: i64) -> String {
        let list: Vec<String> = (0..slots)
            .map(|i| {
                let dt = start + i64::try_from(i).unwrap() * 3 * 3600;
                format!(
                    r#"{{"dt": {dt}, "main": {{"temp": 15.5, "temp_min": 11.2, "temp_max": 18.7}},
                        "weather": [{{"id": 800, "description": "clear sky"}}], "pop": 0.234}}"#
                )
            })
            .collect();
        format!(r#"{{"list": [{}]}}"#, list.join(","))
    }

    // 2024-05-06 15:00:00 UTC, a Monday
    const START: i64 = 1_715_007_600;

    fn report(slots: usize) -> WeatherReport {
        let current: CurrentResponse = serde_json::from_str(CURRENT).unwrap();
        let forecast: ForecastResponse = serde_json::from_str(&forecast_json(slots, START)).unwrap();
        let now = DateTime::from_timestamp(START, 0).unwrap();
        build_report(current, &forecast, now)
    }

    #[test]
    fn normalizes_current_conditions() {
        let report = report(40);
        assert_eq!(report.location, "London, GB");
        assert_eq!(report.current.temp, 15);
        assert_eq!(report.current.feels_like, 13);
        assert_eq!(report.current.humidity, 72);
        assert_eq!(report.current.wind_speed, 9);
        assert_eq!(report.current.pressure, 1012);
        assert_eq!(report.current.visibility, 6);
        assert_eq!(report.current.icon, WeatherIcon::CloudRain);
        assert_eq!(report.current.description, "light rain");
    }

    #[test]
    fn hourly_takes_first_eight_slots() {
        let report = report(40);
        assert_eq!(report.hourly.len(), 8);
        assert_eq!(report.hourly[0].time, "3 PM");
        assert_eq!(report.hourly[1].time, "6 PM");
        assert_eq!(report.hourly[0].temp, 16);
        assert_eq!(report.hourly[0].icon, WeatherIcon::Sun);
    }

    #[test]
    fn daily_samples_every_eighth_slot() {
        let report = report(40);
        assert_eq!(report.daily.len(), 5);
        assert_eq!(report.daily[0].day, "Today");
        assert_eq!(report.daily[1].day, "Tue");
        assert_eq!(report.daily[0].high, 19);
        assert_eq!(report.daily[0].low, 11);
        assert_eq!(report.daily[0].precipitation, 23);
    }

    #[test]
    fn daily_caps_at_seven_days() {
        assert_eq!(report(80).daily.len(), 7);
    }

    #[test]
    fn city_query_is_expanded_and_encoded() {
        let params = location_params(&WeatherQuery::City("nyc".to_string()));
        assert_eq!(params, "q=New%20York%2C%20US");
        let params = location_params(&WeatherQuery::Coordinates { lat: 51.5, lon: -0.12 });
        assert_eq!(params, "lat=51.5&lon=-0.12");
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let client = WeatherClient::new(None).with_base_url("http://127.0.0.1:9");
        let err = client.by_city("London").await.unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("OpenWeather API key not configured"));
    }
}
