//! Configuration values for the pipeline.
//!
//! Everything that drifted between releases of the pet (cooldowns, canned
//! lines, sampling settings) lives here instead of in code.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sanitize::{MAX_OUTPUT_CHARS, SOFT_STOPS};

/// Default local inference server.
pub const DEFAULT_MODEL_URL: &str = "http://127.0.0.1:11434";

/// Default model tag.
pub const DEFAULT_MODEL_NAME: &str = "qwen3:1.7b";

/// User-facing settings the GUI keeps and persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetConfig {
    pub model_url: String,
    pub model_name: String,
    /// City for weather bubbles; empty disables them.
    pub city: String,
    /// Language for geocoding and weather descriptions (`zh` or `en`).
    pub weather_lang: String,
    pub auto_bubble: bool,
    /// Ask the server to drop the model from memory when the pet exits.
    pub unload_on_exit: bool,
    pub user_name: String,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            city: String::new(),
            weather_lang: "zh".to_string(),
            auto_bubble: true,
            unload_on_exit: true,
            user_name: "Barbara".to_string(),
        }
    }
}

impl PetConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let model_url = std::env::var("BANANA_MODEL_URL")
            .or_else(|_| std::env::var("OLLAMA_HOST"))
            .unwrap_or(defaults.model_url);

        let model_name = std::env::var("BANANA_MODEL").unwrap_or(defaults.model_name);

        let city = std::env::var("BANANA_CITY").unwrap_or(defaults.city);

        let weather_lang = std::env::var("BANANA_WEATHER_LANG").unwrap_or(defaults.weather_lang);

        let auto_bubble = std::env::var("BANANA_AUTO_BUBBLE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.auto_bubble);

        Self {
            model_url,
            model_name,
            city: city.trim().to_string(),
            weather_lang,
            auto_bubble,
            ..defaults
        }
    }

    pub fn builder() -> PetConfigBuilder {
        PetConfigBuilder::default()
    }

    pub fn has_city(&self) -> bool {
        !self.city.trim().is_empty()
    }

    /// Weather settings matching this config's language.
    pub fn weather(&self) -> WeatherConfig {
        WeatherConfig {
            lang: self.weather_lang.clone(),
            ..WeatherConfig::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct PetConfigBuilder {
    config: PetConfig,
}

impl PetConfigBuilder {
    pub fn model_url(mut self, url: impl Into<String>) -> Self {
        self.config.model_url = url.into();
        self
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.config.model_name = name.into();
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.config.city = city.into().trim().to_string();
        self
    }

    pub fn weather_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.weather_lang = lang.into();
        self
    }

    pub fn auto_bubble(mut self, enabled: bool) -> Self {
        self.config.auto_bubble = enabled;
        self
    }

    pub fn unload_on_exit(mut self, enabled: bool) -> Self {
        self.config.unload_on_exit = enabled;
        self
    }

    pub fn user_name(mut self, name: impl Into<String>) -> Self {
        self.config.user_name = name.into();
        self
    }

    pub fn build(self) -> PetConfig {
        self.config
    }
}

/// How [`ModelClient::ask`](crate::ModelClient::ask) talks to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct AskPolicy {
    pub temperature: f32,
    pub num_predict: u32,
    /// Context window for the second attempt.
    pub retry_num_ctx: Option<u32>,
    pub keep_alive: Duration,
    /// Appended to the system prompt when reasoning is suppressed.
    pub no_reasoning_instruction: String,
    /// Appended on top of that for the second attempt.
    pub strict_instruction: String,
    pub soft_stops: Vec<String>,
    pub max_output_chars: usize,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub list_timeout: Duration,
    pub unload_timeout: Duration,
    /// Longest a model pull may go without the server sending anything,
    /// including the wait for the first response.
    pub pull_idle_timeout: Duration,
    pub fallback: FallbackReplies,
}

impl Default for AskPolicy {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            num_predict: 512,
            retry_num_ctx: Some(1024),
            keep_alive: Duration::from_secs(200),
            no_reasoning_instruction:
                "不要输出思考、推理、过程或<think>标签；直接给答案，可分 1–3 句。".to_string(),
            strict_instruction: "严禁输出思考或任何标签，仅一句话答案。".to_string(),
            soft_stops: SOFT_STOPS.iter().map(|s| s.to_string()).collect(),
            max_output_chars: MAX_OUTPUT_CHARS,
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(3),
            list_timeout: Duration::from_secs(5),
            unload_timeout: Duration::from_secs(5),
            pull_idle_timeout: Duration::from_secs(60),
            fallback: FallbackReplies::default(),
        }
    }
}

/// Canned lines used when the model produced nothing usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackReplies {
    pub greeting_keywords: Vec<String>,
    pub greeting: String,
    pub weather_keywords: Vec<String>,
    pub weather: String,
    /// Prompts shorter than this many characters get `acknowledge`.
    pub short_prompt_chars: usize,
    pub acknowledge: String,
    pub confused: String,
}

impl Default for FallbackReplies {
    fn default() -> Self {
        Self {
            greeting_keywords: vec!["你好".into(), "hello".into(), "hi".into()],
            greeting: "hi~ 我是你的专属助理不拿拿。今天也要多喝水哦！".to_string(),
            weather_keywords: vec!["天气".into(), "weather".into()],
            weather: "关于天气：我可以试着查一下，但现在先给你一缕想象中的阳光☀️".to_string(),
            short_prompt_chars: 10,
            acknowledge: "收到~".to_string(),
            confused: "我现在脑子不太好使，等会儿再问我一次吧~".to_string(),
        }
    }
}

impl FallbackReplies {
    /// Picks the canned line for `prompt`. Never touches the network.
    pub fn pick(&self, prompt: &str) -> &str {
        let prompt = prompt.trim();
        let lowered = prompt.to_lowercase();
        let mentions = |keywords: &[String]| {
            keywords
                .iter()
                .any(|k| mentions_keyword(&lowered, &k.to_lowercase()))
        };

        if mentions(&self.greeting_keywords) {
            &self.greeting
        } else if mentions(&self.weather_keywords) {
            &self.weather
        } else if prompt.chars().count() < self.short_prompt_chars {
            &self.acknowledge
        } else {
            &self.confused
        }
    }

    /// Every line `pick` can return.
    pub fn all(&self) -> [&str; 4] {
        [
            &self.greeting,
            &self.weather,
            &self.acknowledge,
            &self.confused,
        ]
    }
}

/// ASCII keywords must stand as a whole word; others match anywhere, since
/// CJK text has no word boundaries.
fn mentions_keyword(text: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    if !keyword.is_ascii() {
        return text.contains(keyword);
    }
    text.match_indices(keyword).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + keyword.len()..].chars().next();
        !before.map_or(false, |c| c.is_ascii_alphanumeric())
            && !after.map_or(false, |c| c.is_ascii_alphanumeric())
    })
}

/// Endpoints and cache lifetimes for [`WeatherClient`](crate::weather::WeatherClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub lang: String,
    pub geocode_url: String,
    pub forecast_url: String,
    pub warnings_url: String,
    #[serde(with = "secs")]
    pub geocode_ttl: Duration,
    #[serde(with = "secs")]
    pub forecast_ttl: Duration,
    #[serde(with = "secs")]
    pub alerts_ttl: Duration,
    #[serde(with = "secs")]
    pub geocode_timeout: Duration,
    #[serde(with = "secs")]
    pub forecast_timeout: Duration,
    #[serde(with = "secs")]
    pub alerts_timeout: Duration,
    /// Hourly temperatures shown in a bubble, 1 to 12.
    pub bubble_hours: usize,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            lang: "zh".to_string(),
            geocode_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            warnings_url: "https://api.open-meteo.com/v1/warnings".to_string(),
            geocode_ttl: Duration::from_secs(7 * 24 * 3600),
            forecast_ttl: Duration::from_secs(10 * 60),
            alerts_ttl: Duration::from_secs(5 * 60),
            geocode_timeout: Duration::from_secs(5),
            forecast_timeout: Duration::from_secs(6),
            alerts_timeout: Duration::from_secs(6),
            bubble_hours: 3,
        }
    }
}

/// Timing of unprompted speech bubbles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleSchedule {
    #[serde(with = "secs")]
    pub min_delay: Duration,
    #[serde(with = "secs")]
    pub max_delay: Duration,
    /// Quiet period after the user talks to the pet.
    #[serde(with = "secs")]
    pub silence_after_chat: Duration,
    #[serde(with = "secs")]
    pub weather_cooldown: Duration,
    #[serde(with = "secs")]
    pub tip_cooldown: Duration,
    /// Rolls below this announce the time.
    pub clock_chance: f64,
    /// Rolls below this (and above `clock_chance`) try the weather.
    pub weather_chance: f64,
    /// Said when a tip was due but the model is not reachable.
    pub tip_fallback: String,
}

impl Default for BubbleSchedule {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(120),
            max_delay: Duration::from_secs(300),
            silence_after_chat: Duration::from_secs(120),
            weather_cooldown: Duration::from_secs(600),
            tip_cooldown: Duration::from_secs(120),
            clock_chance: 0.25,
            weather_chance: 0.40,
            tip_fallback: "喝口水，眨眨眼，再继续。".to_string(),
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PetConfig::default();
        assert_eq!(config.model_url, DEFAULT_MODEL_URL);
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
        assert!(!config.has_city());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PetConfig::builder()
            .model_url("http://myserver:11434")
            .model_name("llama3.2:3b")
            .city("  Nanjing ")
            .build();
        assert_eq!(config.model_url, "http://myserver:11434");
        assert_eq!(config.model_name, "llama3.2:3b");
        assert_eq!(config.city, "Nanjing");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: PetConfig = serde_json::from_str(r#"{"city":"Beijing"}"#).unwrap();
        assert_eq!(config.city, "Beijing");
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
        assert!(config.unload_on_exit);
    }

    #[test]
    fn test_fallback_pick() {
        let replies = FallbackReplies::default();
        assert_eq!(replies.pick("Hello there, banana"), replies.greeting);
        assert_eq!(replies.pick("明天天气怎么样呀，要带伞吗"), replies.weather);
        assert_eq!(replies.pick("嗯"), replies.acknowledge);
        assert_eq!(
            replies.pick("please summarise the plot of a long novel"),
            replies.confused
        );
    }

    #[test]
    fn test_ascii_keyword_needs_whole_word() {
        let replies = FallbackReplies::default();
        assert_eq!(replies.pick("What's this weather like?"), replies.weather);
        assert_eq!(replies.pick("Hi there"), replies.greeting);
        assert_eq!(replies.pick("hi!"), replies.greeting);
        assert_eq!(
            replies.pick("I love hiking in the hills"),
            replies.confused
        );
        assert_eq!(replies.pick("你好呀小香蕉"), replies.greeting);
    }
}
