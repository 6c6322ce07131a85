//! Official weather warnings from the Open-Meteo warnings endpoint.
//!
//! Providers disagree on field names, so each item is read leniently: the
//! first non-empty string among a few known aliases wins.

use pixel_banana_macros::FromResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Warning colour, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Unknown,
    Yellow,
    Orange,
    Red,
}

impl AlertLevel {
    /// Case-insensitive; anything unrecognised is [`AlertLevel::Unknown`].
    pub fn parse(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "red" => Self::Red,
            "orange" => Self::Orange,
            "yellow" => Self::Yellow,
            _ => Self::Unknown,
        }
    }

    pub fn label(self, lang: &str) -> &'static str {
        let zh = lang.starts_with("zh");
        match (self, zh) {
            (Self::Red, true) => "红色",
            (Self::Orange, true) => "橙色",
            (Self::Yellow, true) => "黄色",
            (Self::Unknown, true) => "未知",
            (Self::Red, false) => "Red",
            (Self::Orange, false) => "Orange",
            (Self::Yellow, false) => "Yellow",
            (Self::Unknown, false) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub level: AlertLevel,
    pub start: Option<String>,
    pub end: Option<String>,
    pub description: String,
    pub source: String,
    pub region: String,
}

impl WeatherAlert {
    /// Reads one warning item. `default_event` names alerts that carry no
    /// headline of their own.
    pub fn from_item(item: &Value, default_event: &str) -> Self {
        let level = first_text(item, &["level", "severity"])
            .map(|l| AlertLevel::parse(&l))
            .unwrap_or(AlertLevel::Unknown);
        Self {
            event: first_text(item, &["event", "headline", "title"])
                .unwrap_or_else(|| default_event.to_string()),
            level,
            start: first_text(item, &["start", "effective", "onset"]),
            end: first_text(item, &["end", "expires", "until"]),
            description: first_text(item, &["description", "instruction"]).unwrap_or_default(),
            source: first_text(item, &["source", "provider"]).unwrap_or_default(),
            region: first_text(item, &["region", "region_name"]).unwrap_or_default(),
        }
    }

    /// End time trimmed to minutes, `2025-07-01T20:00:00+08:00` becoming
    /// `2025-07-01 20:00`.
    pub fn until(&self) -> Option<String> {
        let end = self.end.as_deref()?.trim();
        if end.is_empty() {
            return None;
        }
        Some(end.chars().take(16).collect::<String>().replace('T', " "))
    }
}

fn first_text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize, Serialize, Default, FromResponse, Debug)]
pub struct WarningsResponse {
    #[serde(default)]
    pub warnings: Option<Vec<Value>>,
    #[serde(default)]
    pub alerts: Option<Vec<Value>>,
}

impl WarningsResponse {
    /// Normalised alerts, most severe first. Equal levels keep server order.
    pub fn into_alerts(self, default_event: &str) -> Vec<WeatherAlert> {
        let items = self
            .warnings
            .filter(|w| !w.is_empty())
            .or(self.alerts)
            .unwrap_or_default();
        let mut alerts: Vec<WeatherAlert> = items
            .iter()
            .filter(|item| item.is_object())
            .map(|item| WeatherAlert::from_item(item, default_event))
            .collect();
        alerts.sort_by(|a, b| b.level.cmp(&a.level));
        alerts
    }
}

/// One line for the most severe alert, e.g. `⚠️ 红色暴雨预警（至 2025-07-01 20:00）`.
pub fn format_alert(alert: &WeatherAlert, lang: &str) -> String {
    let zh = lang.starts_with("zh");
    let mut text = if zh {
        format!("⚠️ {}{}", alert.level.label(lang), alert.event)
    } else {
        format!("⚠️ {}: {}", alert.level.label(lang), alert.event)
    };
    if let Some(until) = alert.until() {
        if zh {
            text.push_str(&format!("（至 {}）", until));
        } else {
            text.push_str(&format!(" (until {})", until));
        }
    }
    text
}
