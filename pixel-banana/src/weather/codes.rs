//! WMO weather interpretation codes, as reported by Open-Meteo.

/// Short description of `code` in `lang` (`zh`, anything else is English).
pub fn describe(code: i32, lang: &str) -> &'static str {
    if lang.starts_with("zh") {
        describe_zh(code)
    } else {
        describe_en(code)
    }
}

fn describe_zh(code: i32) -> &'static str {
    match code {
        0 => "晴",
        1 | 2 => "多云",
        3 => "阴",
        45 => "雾",
        48 => "雾凇",
        51 => "毛毛雨",
        53 | 55 => "小雨",
        61 => "小雨",
        63 => "中雨",
        65 => "大雨",
        71 => "小雪",
        73 => "中雪",
        75 => "大雪",
        80 | 81 => "阵雨",
        82 => "强阵雨",
        95 | 96 | 99 => "雷阵雨",
        _ => "天气不明",
    }
}

fn describe_en(code: i32) -> &'static str {
    match code {
        0 => "clear",
        1 | 2 => "partly cloudy",
        3 => "overcast",
        45 => "fog",
        48 => "rime fog",
        51 => "drizzle",
        53 | 55 => "light rain",
        61 => "light rain",
        63 => "rain",
        65 => "heavy rain",
        71 => "light snow",
        73 => "snow",
        75 => "heavy snow",
        80 | 81 => "showers",
        82 => "heavy showers",
        95 | 96 | 99 => "thunderstorm",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_codes_are_unknown() {
        assert_eq!(describe(42, "zh"), "天气不明");
        assert_eq!(describe(42, "en"), "unknown");
    }

    #[test]
    fn language_prefix_selects_table() {
        assert_eq!(describe(0, "zh-CN"), "晴");
        assert_eq!(describe(0, "de"), "clear");
    }
}
