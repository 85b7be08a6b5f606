//! Weather classification.
//!
//! Two schemes are in use:
//! - **Description rules**: ordered, case-insensitive keyword matching on the
//!   free-text description. First matching category wins.
//! - **Numeric rules**: temperature / wind thresholds, applied only when both
//!   fields parse. Malformed text is skipped, never read as zero.

use serde::{Deserialize, Serialize};

use crate::db::models::WeatherRecord;

/// Below this temperature (°F) a game is `Cold`.
pub const COLD_TEMPERATURE_F: i32 = 40;
/// Above this wind speed a game is `Windy`.
pub const WINDY_SPEED: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeatherCondition {
    Rainy,
    Snowy,
    Foggy,
    Cloudy,
    #[serde(rename = "Clear/Sunny")]
    ClearSunny,
    Windy,
    Cold,
    Other,
    Normal,
}

impl WeatherCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Rainy => "Rainy",
            WeatherCondition::Snowy => "Snowy",
            WeatherCondition::Foggy => "Foggy",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::ClearSunny => "Clear/Sunny",
            WeatherCondition::Windy => "Windy",
            WeatherCondition::Cold => "Cold",
            WeatherCondition::Other => "Other",
            WeatherCondition::Normal => "Normal",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "rainy" | "rain" => Some(WeatherCondition::Rainy),
            "snowy" | "snow" => Some(WeatherCondition::Snowy),
            "foggy" | "fog" => Some(WeatherCondition::Foggy),
            "cloudy" => Some(WeatherCondition::Cloudy),
            "clear/sunny" | "clear" | "sunny" => Some(WeatherCondition::ClearSunny),
            "windy" => Some(WeatherCondition::Windy),
            "cold" => Some(WeatherCondition::Cold),
            "other" => Some(WeatherCondition::Other),
            "normal" => Some(WeatherCondition::Normal),
            _ => None,
        }
    }

    pub fn is_adverse(&self) -> bool {
        matches!(
            self,
            WeatherCondition::Rainy
                | WeatherCondition::Snowy
                | WeatherCondition::Foggy
                | WeatherCondition::Windy
                | WeatherCondition::Cold
        )
    }

    /// Can `classify_description` produce this category?
    pub fn is_described(&self) -> bool {
        !matches!(self, WeatherCondition::Cold | WeatherCondition::Normal)
    }

    /// Does this game exhibit the (adverse) condition? Description categories
    /// use the keyword rules; `Cold` and `Windy` also consult the numeric fields.
    pub fn matches_record(&self, record: &WeatherRecord) -> bool {
        let described = classify_description(record.weather_text.as_deref());
        match self {
            WeatherCondition::Cold => record
                .temperature_text
                .as_deref()
                .and_then(parse_temperature)
                .is_some_and(|t| t < COLD_TEMPERATURE_F),
            WeatherCondition::Windy => {
                described == WeatherCondition::Windy
                    || record
                        .wind_text
                        .as_deref()
                        .and_then(parse_wind_speed)
                        .is_some_and(|w| w > WINDY_SPEED)
            }
            other => described == *other,
        }
    }
}

/// Ordered keyword rules for free-text descriptions.
const DESCRIPTION_RULES: &[(WeatherCondition, &[&str])] = &[
    (WeatherCondition::Rainy, &["rain", "shower", "drizzle", "wet"]),
    (
        WeatherCondition::Snowy,
        &["snow", "wintry", "freezing", "blizzard", "flurries"],
    ),
    (WeatherCondition::Foggy, &["fog", "mist", "haze"]),
    (WeatherCondition::Cloudy, &["overcast", "cloud", "humid"]),
    (WeatherCondition::ClearSunny, &["clear", "fair", "sun"]),
    (WeatherCondition::Windy, &["wind", "breezy"]),
];

pub fn classify_description(description: Option<&str>) -> WeatherCondition {
    let text = match description.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_lowercase(),
        _ => return WeatherCondition::Other,
    };
    DESCRIPTION_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(condition, _)| *condition)
        .unwrap_or(WeatherCondition::Other)
}

/// Threshold classification: `Cold`, `Windy` or `Normal`.
pub fn classify_numeric(temp: i32, wind: f64) -> WeatherCondition {
    if temp < COLD_TEMPERATURE_F {
        WeatherCondition::Cold
    } else if wind > WINDY_SPEED {
        WeatherCondition::Windy
    } else {
        WeatherCondition::Normal
    }
}

/// Per-game condition used when comparing team margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GameCondition {
    #[serde(rename = "Rain/Snow")]
    RainSnow,
    Cold,
    Windy,
    Normal,
}

/// Games with a description and well-formed temperature and wind get a real
/// label; everything else falls back to `Normal`.
pub fn classify_game(record: &WeatherRecord) -> GameCondition {
    let description = match record.weather_text.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => d,
        _ => return GameCondition::Normal,
    };
    let temp = record
        .temperature_text
        .as_deref()
        .and_then(parse_game_temperature);
    let wind = record.wind_text.as_deref().and_then(parse_game_wind);
    let numeric = match (temp, wind) {
        (Some(t), Some(w)) => classify_numeric(t, w),
        _ => return GameCondition::Normal,
    };
    if description == "Rain" || description == "Snow" {
        return GameCondition::RainSnow;
    }
    match numeric {
        WeatherCondition::Cold => GameCondition::Cold,
        WeatherCondition::Windy => GameCondition::Windy,
        _ => GameCondition::Normal,
    }
}

/// Parse `"38 F"`, `"38F"`, `"38 °F"` or `"38"` into degrees Fahrenheit.
pub fn parse_temperature(text: &str) -> Option<i32> {
    let text = text.trim();
    let digits_end = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    if digits_end == 0 {
        return None;
    }
    let unit = text[digits_end..].trim();
    if !(unit.is_empty() || unit.eq_ignore_ascii_case("f") || unit.eq_ignore_ascii_case("°f")) {
        return None;
    }
    text[..digits_end].parse().ok()
}

/// Strict form used for game labels: digits, one space, `F`.
pub fn parse_game_temperature(text: &str) -> Option<i32> {
    let digits = text.trim().strip_suffix(" F")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_game_wind(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse `"12"`, `"12.5"` or `"12 mph"`.
pub fn parse_wind_speed(text: &str) -> Option<f64> {
    let mut text = text.trim();
    let split = text.len().saturating_sub(3);
    if text.len() >= 3
        && text.is_char_boundary(split)
        && text[split..].eq_ignore_ascii_case("mph")
    {
        text = text[..text.len() - 3].trim_end();
    }
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(weather: Option<&str>, temp: Option<&str>, wind: Option<&str>) -> WeatherRecord {
        WeatherRecord {
            season: 2021,
            week: 5,
            weather_text: weather.map(String::from),
            temperature_text: temp.map(String::from),
            wind_text: wind.map(String::from),
            home_team: "GB".into(),
            away_team: "CHI".into(),
            home_score: Some(24),
            away_score: Some(17),
        }
    }

    #[test]
    fn drizzle_is_rainy_in_any_case() {
        for text in ["drizzle", "Light DRIZZLE", "Drizzle and fog", "dRiZzLe"] {
            assert_eq!(classify_description(Some(text)), WeatherCondition::Rainy, "{text}");
        }
    }

    #[test]
    fn first_rule_wins() {
        // "Snow showers" hits the Rainy keyword "shower" first.
        assert_eq!(classify_description(Some("Snow showers")), WeatherCondition::Rainy);
        assert_eq!(classify_description(Some("Blizzard")), WeatherCondition::Snowy);
        assert_eq!(classify_description(Some("Patchy fog, cloudy")), WeatherCondition::Foggy);
        assert_eq!(classify_description(Some("Mostly Cloudy")), WeatherCondition::Cloudy);
        assert_eq!(classify_description(Some("Sunny")), WeatherCondition::ClearSunny);
        assert_eq!(classify_description(Some("Breezy")), WeatherCondition::Windy);
        assert_eq!(classify_description(Some("Dome")), WeatherCondition::Other);
    }

    #[test]
    fn missing_description_is_other() {
        assert_eq!(classify_description(None), WeatherCondition::Other);
        assert_eq!(classify_description(Some("   ")), WeatherCondition::Other);
    }

    #[test]
    fn numeric_thresholds() {
        assert_eq!(classify_numeric(39, 5.0), WeatherCondition::Cold);
        assert_eq!(classify_numeric(40, 21.0), WeatherCondition::Windy);
        assert_eq!(classify_numeric(40, 20.0), WeatherCondition::Normal);
    }

    #[test]
    fn malformed_numerics_are_excluded_not_zeroed() {
        assert_eq!(
            classify_game(&record(Some("Clear"), Some("cold-ish"), Some("5"))),
            GameCondition::Normal
        );
        assert_eq!(
            classify_game(&record(Some("Rain"), Some("50 F"), Some("calm"))),
            GameCondition::Normal
        );
        assert_eq!(
            classify_game(&record(Some("Rain"), None, Some("5"))),
            GameCondition::Normal
        );
        assert_eq!(parse_temperature("N/A"), None);
        assert_eq!(parse_temperature("28F/-2C"), None);
        assert_eq!(parse_wind_speed("-5"), None);
        assert_eq!(parse_wind_speed(""), None);
    }

    #[test]
    fn parsers_accept_common_forms() {
        assert_eq!(parse_temperature("38 F"), Some(38));
        assert_eq!(parse_temperature("38°F"), Some(38));
        assert_eq!(parse_temperature(" 72 "), Some(72));
        assert_eq!(parse_wind_speed("12"), Some(12.0));
        assert_eq!(parse_wind_speed("12 MPH"), Some(12.0));
        assert_eq!(parse_wind_speed("7.5mph"), Some(7.5));
    }

    #[test]
    fn game_condition_requires_well_formed_numerics() {
        assert_eq!(
            classify_game(&record(Some("Rain"), Some("50 F"), Some("5"))),
            GameCondition::RainSnow
        );
        // Exact match only: "Light Rain" is not Rain/Snow.
        assert_eq!(
            classify_game(&record(Some("Light Rain"), Some("50 F"), Some("5"))),
            GameCondition::Normal
        );
        assert_eq!(
            classify_game(&record(Some("Rain"), Some("unknown"), Some("5"))),
            GameCondition::Normal
        );
        assert_eq!(
            classify_game(&record(Some("Clear"), Some("20 F"), Some("30"))),
            GameCondition::Cold
        );
        assert_eq!(
            classify_game(&record(Some("Clear"), Some("60 F"), Some("30"))),
            GameCondition::Windy
        );
        assert_eq!(classify_game(&record(None, Some("20 F"), Some("5"))), GameCondition::Normal);
        // Bare or decorated temperatures are not `<digits> F`.
        for temp in ["30", "30°F", "30F", "30 f", "-5 F"] {
            assert_eq!(
                classify_game(&record(Some("Clear"), Some(temp), Some("5"))),
                GameCondition::Normal,
                "{temp}"
            );
        }
    }

    #[test]
    fn game_temperature_is_strict() {
        assert_eq!(parse_game_temperature("30 F"), Some(30));
        assert_eq!(parse_game_temperature(" 8 F "), Some(8));
        assert_eq!(parse_game_temperature("30"), None);
        assert_eq!(parse_game_temperature("30°F"), None);
        assert_eq!(parse_game_temperature(" F"), None);
        assert_eq!(parse_game_wind("25"), Some(25.0));
        assert_eq!(parse_game_wind("25 mph"), None);
        // The lenient parser still reads them.
        assert_eq!(parse_temperature("30"), Some(30));
    }

    #[test]
    fn adverse_matching() {
        let foggy = record(Some("Fog"), None, None);
        assert!(WeatherCondition::Foggy.matches_record(&foggy));
        assert!(!WeatherCondition::Rainy.matches_record(&foggy));

        let cold = record(Some("Clear"), Some("12 F"), None);
        assert!(WeatherCondition::Cold.matches_record(&cold));

        let gusty = record(Some("Clear"), Some("60 F"), Some("25 mph"));
        assert!(WeatherCondition::Windy.matches_record(&gusty));
        assert!(!WeatherCondition::Cold.matches_record(&gusty));

        assert!(WeatherCondition::Foggy.is_adverse());
        assert!(!WeatherCondition::ClearSunny.is_adverse());
        assert!(!WeatherCondition::Normal.is_adverse());
    }

    #[test]
    fn only_keyword_categories_are_described() {
        assert!(WeatherCondition::Windy.is_described());
        assert!(WeatherCondition::Other.is_described());
        assert!(!WeatherCondition::Cold.is_described());
        assert!(!WeatherCondition::Normal.is_described());
    }

    #[test]
    fn labels_round_trip() {
        for c in [
            WeatherCondition::Rainy,
            WeatherCondition::ClearSunny,
            WeatherCondition::Cold,
            WeatherCondition::Normal,
        ] {
            assert_eq!(WeatherCondition::from_label(c.as_str()), Some(c));
        }
    }
}
