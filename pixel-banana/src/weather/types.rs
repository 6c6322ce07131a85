use pixel_banana_macros::FromResponse;
use serde::{Deserialize, Serialize};

/// A resolved city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

/// Current conditions plus today's range for one [`GeocodeResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub geocode: GeocodeResult,
    pub current_temperature_c: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub weather_code: i32,
    pub daily_max: Option<f64>,
    pub daily_min: Option<f64>,
    /// The hours right after the current observation, oldest first.
    #[serde(default)]
    pub next_hours: Vec<HourlyPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub time: String,
    pub temperature_c: Option<f64>,
    pub precipitation_probability: Option<f64>,
}

#[derive(Deserialize, Serialize, Default, FromResponse, Debug)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeHit>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GeocodeHit {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl GeocodeHit {
    pub fn into_result(self, query: &str) -> GeocodeResult {
        GeocodeResult {
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| query.to_string()),
            country: self.country.unwrap_or_default(),
            latitude: self.latitude,
            longitude: self.longitude,
            timezone: self
                .timezone
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "auto".to_string()),
        }
    }
}

#[derive(Deserialize, Serialize, Default, FromResponse, Debug)]
pub struct ForecastResponse {
    #[serde(default)]
    pub current_weather: Option<CurrentWeather>,
    #[serde(default)]
    pub hourly: Option<HourlyForecast>,
    #[serde(default)]
    pub daily: Option<DailyForecast>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub struct CurrentWeather {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub windspeed: Option<f64>,
    #[serde(default)]
    pub weathercode: Option<f64>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub struct HourlyForecast {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability: Vec<Option<f64>>,
}

impl HourlyForecast {
    /// Up to `hours` entries following `current`. When `current` is not in
    /// the series the count starts from its first entry.
    pub fn following(&self, current: Option<&str>, hours: usize) -> Vec<HourlyPoint> {
        let index = current
            .and_then(|now| self.time.iter().position(|t| t == now))
            .unwrap_or(0);
        let value = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

        self.time
            .iter()
            .enumerate()
            .skip(index + 1)
            .take(hours)
            .map(|(i, time)| HourlyPoint {
                time: time.clone(),
                temperature_c: value(&self.temperature_2m, i),
                precipitation_probability: value(&self.precipitation_probability, i),
            })
            .collect()
    }
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub struct DailyForecast {
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
}

impl ForecastResponse {
    pub fn into_snapshot(self, geocode: GeocodeResult, hours: usize) -> WeatherSnapshot {
        let current = self.current_weather.unwrap_or_default();
        let daily = self.daily.unwrap_or_default();
        let first = |values: &[Option<f64>]| values.first().copied().flatten();
        let next_hours = self
            .hourly
            .map(|h| h.following(current.time.as_deref(), hours))
            .unwrap_or_default();

        WeatherSnapshot {
            next_hours,
            current_temperature_c: current.temperature,
            wind_speed_kmh: current.windspeed,
            weather_code: current.weathercode.map(|c| c as i32).unwrap_or(0),
            daily_max: first(&daily.temperature_2m_max),
            daily_min: first(&daily.temperature_2m_min),
            geocode,
        }
    }
}
