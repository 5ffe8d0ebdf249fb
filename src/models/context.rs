use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Error raised when an external label cannot be mapped onto a closed category
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("Unrecognized weather label: {0}")]
    UnknownWeather(String),
    #[error("Unrecognized mood label: {0}")]
    UnknownMood(String),
}

/// Weather category recognized by the context recommender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weather {
    Sunny,
    Rainy,
    Snowy,
    Cloudy,
    Windy,
}

impl Weather {
    pub const COUNT: usize = 5;

    /// Every recognized weather category, in table order
    pub const ALL: [Weather; Self::COUNT] = [
        Weather::Sunny,
        Weather::Rainy,
        Weather::Snowy,
        Weather::Cloudy,
        Weather::Windy,
    ];

    /// Position of this category in [`Weather::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Weather::Sunny => "Sunny",
            Weather::Rainy => "Rainy",
            Weather::Snowy => "Snowy",
            Weather::Cloudy => "Cloudy",
            Weather::Windy => "Windy",
        }
    }
}

impl Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weather {
    type Err = ContextError;

    /// Accepts our own category names as well as the condition names
    /// returned by OpenWeather (`weather[0].main`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sunny" | "clear" | "hot" => Ok(Weather::Sunny),
            "rainy" | "rain" | "drizzle" | "thunderstorm" => Ok(Weather::Rainy),
            "snowy" | "snow" | "sleet" => Ok(Weather::Snowy),
            "cloudy" | "clouds" | "partly cloudy" | "overcast" | "mist" | "fog" | "haze"
            | "smoke" => Ok(Weather::Cloudy),
            "windy" | "wind" | "squall" | "tornado" | "dust" | "sand" => Ok(Weather::Windy),
            _ => Err(ContextError::UnknownWeather(s.to_string())),
        }
    }
}

/// Mood label recognized by the context recommender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Sad,
    Stressed,
    Relaxed,
    Adventurous,
}

/// Keyword lists used to read a mood out of free chat text, checked in order
const MOOD_KEYWORDS: [(Mood, &[&str]); 5] = [
    (
        Mood::Happy,
        &["happy", "joy", "glad", "great", "awesome", "excellent", "good"],
    ),
    (
        Mood::Sad,
        &["sad", "down", "upset", "unhappy", "depressed", "blue", "dull"],
    ),
    (
        Mood::Stressed,
        &["stressed", "anxious", "nervous", "worried", "tense"],
    ),
    (
        Mood::Relaxed,
        &["relaxed", "calm", "peaceful", "chill", "easy"],
    ),
    (
        Mood::Adventurous,
        &["adventurous", "excited", "curious", "wild", "daring"],
    ),
];

impl Mood {
    pub const COUNT: usize = 5;

    /// Every recognized mood, in table order
    pub const ALL: [Mood; Self::COUNT] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Stressed,
        Mood::Relaxed,
        Mood::Adventurous,
    ];

    /// Position of this mood in [`Mood::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Stressed => "Stressed",
            Mood::Relaxed => "Relaxed",
            Mood::Adventurous => "Adventurous",
        }
    }

    /// Detects a mood from chat text using keyword lists
    ///
    /// Words are matched whole, so "downtown" does not count as "down".
    /// Returns `None` when nothing matches.
    pub fn detect(text: &str) -> Option<Mood> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        MOOD_KEYWORDS
            .iter()
            .find(|(_, keywords)| words.iter().any(|w| keywords.contains(w)))
            .map(|(mood, _)| *mood)
    }
}

impl Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ContextError::UnknownMood(s.to_string()))
    }
}

/// The (weather, mood) pair influencing one recommendation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    pub weather: Weather,
    pub mood: Mood,
}

impl Context {
    pub fn new(weather: Weather, mood: Mood) -> Self {
        Self { weather, mood }
    }

    /// Builds a context from raw labels handed over by the caller
    ///
    /// An explicit `mood` label wins over `mood_text`. Labels that are present
    /// but unrecognized are errors; a context missing either half is `None`.
    pub fn resolve(
        weather: Option<&str>,
        mood: Option<&str>,
        mood_text: Option<&str>,
    ) -> Result<Option<Context>, ContextError> {
        let weather = weather
            .filter(|w| !w.trim().is_empty())
            .map(Weather::from_str)
            .transpose()?;

        let mood = match mood.filter(|m| !m.trim().is_empty()) {
            Some(label) => Some(label.parse::<Mood>()?),
            None => mood_text.and_then(Mood::detect),
        };

        Ok(weather.zip(mood).map(|(weather, mood)| Context::new(weather, mood)))
    }
}
