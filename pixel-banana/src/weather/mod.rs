//! City weather for speech bubbles, via Open-Meteo.
//!
//! Lookups go through [`TtlCache`]s: resolved cities are kept for a week,
//! forecasts for ten minutes, warnings for five. Failures are never cached,
//! so the next call simply tries again.

use std::sync::Arc;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

use reqwest::Url;

use crate::cache::TtlCache;
use crate::config::WeatherConfig;
use crate::transport::{ReqwestTransport, RetryPolicy, RetryingTransport, Transport};
use crate::types::HttpRequest;
use crate::{Error, Result};

mod alerts;
mod codes;
mod types;

pub use alerts::{format_alert, AlertLevel, WeatherAlert};
pub use codes::describe;
pub use types::{GeocodeResult, HourlyPoint, WeatherSnapshot};

use alerts::WarningsResponse;
use types::{ForecastResponse, GeocodeResponse};

const MAX_HOURS: usize = 12;
const MAX_DAYS: usize = 3;

pub struct WeatherClient {
    transport: Arc<dyn Transport + Send + Sync>,
    config: WeatherConfig,
    geo_cache: TtlCache<String, GeocodeResult>,
    wx_cache: TtlCache<String, WeatherSnapshot>,
    alert_cache: TtlCache<String, Vec<WeatherAlert>>,
}

impl WeatherClient {
    /// Client over HTTPS that retries transient statuses per
    /// [`RetryPolicy::default`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Client`] when the forecast URL does not parse or
    /// the HTTP client cannot be built.
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let base = Url::parse(&config.forecast_url)
            .map_err(|e| Error::Client(format!("Invalid forecast URL: {}", e)))?;
        let transport = RetryingTransport::new(
            ReqwestTransport::new(base, None)?,
            RetryPolicy::default(),
        );
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport + Send + Sync>,
        config: WeatherConfig,
    ) -> Self {
        Self {
            geo_cache: TtlCache::new(config.geocode_ttl),
            wx_cache: TtlCache::new(config.forecast_ttl),
            alert_cache: TtlCache::new(config.alerts_ttl),
            transport,
            config,
        }
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    /// Resolves `city` to coordinates, or `None` if it is blank, unknown, or
    /// the geocoder could not be reached.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn geocode(&self, city: &str) -> Option<GeocodeResult> {
        let city = city.trim();
        if city.is_empty() {
            return None;
        }

        let key = format!("geo:{}:{}", self.config.lang, city);
        if let Some(hit) = self.geo_cache.get(&key) {
            #[cfg(feature = "metrics")]
            counter!("pixel_banana.weather_cache_hits_total", "cache" => "geocode").increment(1);
            return Some(hit);
        }

        match self.request_geocode(city).await {
            Ok(Some(result)) => {
                self.geo_cache.insert(key, result.clone());
                Some(result)
            }
            Ok(None) => None,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                debug!(error = %_e, "geocoding failed");
                None
            }
        }
    }

    async fn request_geocode(&self, city: &str) -> Result<Option<GeocodeResult>> {
        let request = HttpRequest::new(self.config.geocode_url.as_str())
            .get()
            .query("name", city)
            .query("count", 1)
            .query("language", &self.config.lang)
            .query("format", "json")
            .timeout(self.config.geocode_timeout);

        let response = self.transport.send_http_request(request).await?;
        if !response.is_success() {
            return Err(Error::Status {
                status: response.status,
                body: response.text(),
            });
        }
        let hits = GeocodeResponse::from_response(&response)?.results;
        Ok(hits.into_iter().next().map(|hit| hit.into_result(city)))
    }

    /// Current conditions, the next [`WeatherConfig::bubble_hours`] hours and
    /// today's range for `city`.
    pub async fn fetch(&self, city: &str) -> Option<WeatherSnapshot> {
        self.fetch_range(city, self.config.bubble_hours, 1).await
    }

    /// Like [`fetch`](Self::fetch) with an explicit horizon. `hours` is
    /// clamped to 1..=12 and `days` to 1..=3.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn fetch_range(
        &self,
        city: &str,
        hours: usize,
        days: usize,
    ) -> Option<WeatherSnapshot> {
        let hours = hours.clamp(1, MAX_HOURS);
        let days = days.clamp(1, MAX_DAYS);
        let geocode = self.geocode(city).await?;

        let key = format!(
            "wx:{:.3},{:.3}:{}:{}",
            geocode.latitude, geocode.longitude, hours, days
        );
        if let Some(hit) = self.wx_cache.get(&key) {
            #[cfg(feature = "metrics")]
            counter!("pixel_banana.weather_cache_hits_total", "cache" => "forecast").increment(1);
            return Some(hit);
        }

        match self.request_forecast(geocode, hours, days).await {
            Ok(snapshot) => {
                self.wx_cache.insert(key, snapshot.clone());
                Some(snapshot)
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                debug!(error = %_e, "forecast failed");
                None
            }
        }
    }

    async fn request_forecast(
        &self,
        geocode: GeocodeResult,
        hours: usize,
        days: usize,
    ) -> Result<WeatherSnapshot> {
        let request = HttpRequest::new(self.config.forecast_url.as_str())
            .get()
            .query("latitude", geocode.latitude)
            .query("longitude", geocode.longitude)
            .query("timezone", "auto")
            .query("current_weather", true)
            .query(
                "hourly",
                "temperature_2m,apparent_temperature,precipitation_probability,weathercode",
            )
            .query("daily", "weathercode,temperature_2m_max,temperature_2m_min")
            .query("forecast_days", days)
            .timeout(self.config.forecast_timeout);

        let response = self.transport.send_http_request(request).await?;
        if !response.is_success() {
            return Err(Error::Status {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(ForecastResponse::from_response(&response)?.into_snapshot(geocode, hours))
    }

    /// Active warnings for `city`, most severe first.
    ///
    /// Empty when there are none, when the region is not covered, or when
    /// the lookup failed. Only successful lookups are cached.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn alerts(&self, city: &str) -> Vec<WeatherAlert> {
        let Some(geocode) = self.geocode(city).await else {
            return Vec::new();
        };

        let key = format!("wr:{:.3},{:.3}", geocode.latitude, geocode.longitude);
        if let Some(hit) = self.alert_cache.get(&key) {
            #[cfg(feature = "metrics")]
            counter!("pixel_banana.weather_cache_hits_total", "cache" => "alerts").increment(1);
            return hit;
        }

        match self.request_alerts(&geocode).await {
            Ok(alerts) => {
                self.alert_cache.insert(key, alerts.clone());
                alerts
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                debug!(error = %_e, "weather warnings failed");
                Vec::new()
            }
        }
    }

    async fn request_alerts(&self, geocode: &GeocodeResult) -> Result<Vec<WeatherAlert>> {
        let request = HttpRequest::new(self.config.warnings_url.as_str())
            .get()
            .query("latitude", geocode.latitude)
            .query("longitude", geocode.longitude)
            .query("timezone", "auto")
            .timeout(self.config.alerts_timeout);

        let response = self.transport.send_http_request(request).await?;
        if !response.is_success() {
            return Err(Error::Status {
                status: response.status,
                body: response.text(),
            });
        }
        let default_event = if self.config.lang.starts_with("zh") {
            "天气预警"
        } else {
            "Weather alert"
        };
        Ok(WarningsResponse::from_response(&response)?.into_alerts(default_event))
    }

    /// The most severe warning for `city` as one line, or `None` when there
    /// is nothing to warn about.
    pub async fn alert_summary(&self, city: &str) -> Option<String> {
        let alerts = self.alerts(city).await;
        alerts
            .first()
            .map(|top| format_alert(top, &self.config.lang))
    }

    /// One short line describing the weather in `city`, e.g.
    /// `南京 · 多云 23°，风 11 km/h；接下来3小时：24°、25°、23°（降水10%、20%、40%）；今日 26°/18°`.
    pub async fn bubble_text(&self, city: &str) -> Option<String> {
        let snapshot = self.fetch(city).await?;
        Some(format_bubble(&snapshot, &self.config.lang))
    }
}

/// Renders a snapshot; parts whose values are missing are left out.
pub fn format_bubble(snapshot: &WeatherSnapshot, lang: &str) -> String {
    let zh = lang.starts_with("zh");
    let round = |v: f64| v.round() as i64;

    let mut text = format!(
        "{} · {}",
        snapshot.geocode.name,
        describe(snapshot.weather_code, lang)
    );
    if let Some(temp) = snapshot.current_temperature_c {
        text.push_str(&format!(" {}°", round(temp)));
    }
    if let Some(wind) = snapshot.wind_speed_kmh {
        if zh {
            text.push_str(&format!("，风 {} km/h", round(wind)));
        } else {
            text.push_str(&format!(", wind {} km/h", round(wind)));
        }
    }
    let temps: Vec<String> = snapshot
        .next_hours
        .iter()
        .filter_map(|h| h.temperature_c)
        .map(|t| format!("{}°", round(t)))
        .collect();
    let pops: Vec<String> = snapshot
        .next_hours
        .iter()
        .filter_map(|h| h.precipitation_probability)
        .map(|p| format!("{}%", round(p)))
        .collect();
    if !temps.is_empty() {
        if zh {
            text.push_str(&format!("；接下来{}小时：{}", temps.len(), temps.join("、")));
        } else {
            text.push_str(&format!("; next {}h: {}", temps.len(), temps.join(", ")));
        }
        if !pops.is_empty() {
            if zh {
                text.push_str(&format!("（降水{}）", pops.join("、")));
            } else {
                text.push_str(&format!(" (rain {})", pops.join(", ")));
            }
        }
    }
    if let (Some(max), Some(min)) = (snapshot.daily_max, snapshot.daily_min) {
        if zh {
            text.push_str(&format!("；今日 {}°/{}°", round(max), round(min)));
        } else {
            text.push_str(&format!("; today {}°/{}°", round(max), round(min)));
        }
    }
    text
}
