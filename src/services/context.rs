use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::RecommendError;
use crate::db::Snapshot;
use crate::models::{Context, FoodItem, Mood, ScoreVector, Weather};

/// Score given to a cuisine the boost table says nothing about
pub const NEUTRAL_BOOST: f64 = 0.5;

/// Cuisine -> boost weight, keyed by lowercased cuisine
pub type CuisineBoosts = HashMap<String, f64>;

// Per-weather and per-mood cuisine affinities. The default table averages
// the two for every (weather, mood) cell.
const WEATHER_AFFINITY: [(Weather, &[(&str, f64)]); Weather::COUNT] = [
    (
        Weather::Sunny,
        &[
            ("japanese", 0.8),
            ("mexican", 0.8),
            ("thai", 0.7),
            ("italian", 0.6),
            ("american", 0.6),
            ("chinese", 0.5),
            ("indian", 0.4),
        ],
    ),
    (
        Weather::Rainy,
        &[
            ("indian", 0.9),
            ("chinese", 0.8),
            ("japanese", 0.7),
            ("thai", 0.6),
            ("italian", 0.6),
            ("american", 0.5),
            ("mexican", 0.4),
        ],
    ),
    (
        Weather::Snowy,
        &[
            ("indian", 0.9),
            ("italian", 0.8),
            ("american", 0.8),
            ("chinese", 0.7),
            ("japanese", 0.6),
            ("thai", 0.5),
            ("mexican", 0.4),
        ],
    ),
    (
        Weather::Cloudy,
        &[
            ("italian", 0.7),
            ("chinese", 0.6),
            ("american", 0.6),
            ("japanese", 0.6),
            ("indian", 0.6),
            ("thai", 0.5),
            ("mexican", 0.5),
        ],
    ),
    (
        Weather::Windy,
        &[
            ("american", 0.8),
            ("chinese", 0.7),
            ("indian", 0.7),
            ("italian", 0.6),
            ("japanese", 0.5),
            ("mexican", 0.5),
            ("thai", 0.5),
        ],
    ),
];

const MOOD_AFFINITY: [(Mood, &[(&str, f64)]); Mood::COUNT] = [
    (
        Mood::Happy,
        &[
            ("mexican", 0.8),
            ("italian", 0.8),
            ("american", 0.7),
            ("japanese", 0.7),
            ("thai", 0.6),
            ("chinese", 0.6),
            ("indian", 0.6),
        ],
    ),
    (
        Mood::Sad,
        &[
            ("italian", 0.9),
            ("american", 0.9),
            ("chinese", 0.6),
            ("indian", 0.6),
            ("japanese", 0.5),
            ("mexican", 0.5),
            ("thai", 0.4),
        ],
    ),
    (
        Mood::Stressed,
        &[
            ("american", 0.8),
            ("italian", 0.8),
            ("chinese", 0.7),
            ("japanese", 0.6),
            ("indian", 0.5),
            ("mexican", 0.5),
            ("thai", 0.4),
        ],
    ),
    (
        Mood::Relaxed,
        &[
            ("japanese", 0.9),
            ("thai", 0.7),
            ("italian", 0.7),
            ("chinese", 0.6),
            ("indian", 0.5),
            ("american", 0.5),
            ("mexican", 0.5),
        ],
    ),
    (
        Mood::Adventurous,
        &[
            ("thai", 0.9),
            ("indian", 0.9),
            ("mexican", 0.8),
            ("japanese", 0.7),
            ("chinese", 0.7),
            ("italian", 0.4),
            ("american", 0.3),
        ],
    ),
];

/// Fixed (weather, mood) -> cuisine boost lookup
///
/// Cells are stored in an array indexed by [`Weather::index`] and
/// [`Mood::index`], so every recognized pair has a cell. A cell may be empty,
/// in which case every cuisine gets [`NEUTRAL_BOOST`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoostTable {
    cells: [[CuisineBoosts; Mood::COUNT]; Weather::COUNT],
}

impl Default for BoostTable {
    fn default() -> Self {
        let mut table = Self::neutral();
        for (weather, weather_boosts) in WEATHER_AFFINITY {
            for (mood, mood_boosts) in MOOD_AFFINITY {
                let cell = &mut table.cells[weather.index()][mood.index()];
                for (cuisine, w) in weather_boosts {
                    let m = mood_boosts
                        .iter()
                        .find(|(c, _)| c == cuisine)
                        .map(|(_, m)| *m)
                        .unwrap_or(NEUTRAL_BOOST);
                    cell.insert(cuisine.to_string(), (w + m) / 2.0);
                }
            }
        }
        table
    }
}

impl BoostTable {
    /// A table with every cell empty
    pub fn neutral() -> Self {
        Self {
            cells: std::array::from_fn(|_| std::array::from_fn(|_| CuisineBoosts::new())),
        }
    }

    /// Sets one boost weight, which must lie in [0, 1]
    pub fn set(
        &mut self,
        weather: Weather,
        mood: Mood,
        cuisine: &str,
        weight: f64,
    ) -> Result<(), RecommendError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(RecommendError::InvalidConfig(format!(
                "boost for {} in {}/{} must be within [0, 1], got {}",
                cuisine, weather, mood, weight
            )));
        }
        self.cells[weather.index()][mood.index()].insert(cuisine.trim().to_lowercase(), weight);
        Ok(())
    }

    /// Boost for a cuisine under a context, neutral when unmapped
    pub fn boost(&self, weather: Weather, mood: Mood, cuisine: &str) -> f64 {
        self.cell(weather, mood)
            .get(&cuisine.trim().to_lowercase())
            .copied()
            .unwrap_or(NEUTRAL_BOOST)
    }

    pub fn cell(&self, weather: Weather, mood: Mood) -> &CuisineBoosts {
        &self.cells[weather.index()][mood.index()]
    }

    /// Parses a table from JSON shaped as `{weather: {mood: {cuisine: weight}}}`
    ///
    /// Every recognized (weather, mood) pair must appear exactly once. A pair
    /// may map to an empty object.
    pub fn from_json(json: &str) -> Result<Self, RecommendError> {
        let raw: HashMap<String, HashMap<String, HashMap<String, f64>>> =
            serde_json::from_str(json)
                .map_err(|e| RecommendError::InvalidConfig(format!("boost table: {}", e)))?;

        let mut table = Self::neutral();
        let mut seen = [[false; Mood::COUNT]; Weather::COUNT];

        for (weather_label, moods) in &raw {
            let weather: Weather = weather_label
                .parse()
                .map_err(|e| RecommendError::InvalidConfig(format!("boost table: {}", e)))?;
            for (mood_label, cuisines) in moods {
                let mood: Mood = mood_label
                    .parse()
                    .map_err(|e| RecommendError::InvalidConfig(format!("boost table: {}", e)))?;

                let slot = &mut seen[weather.index()][mood.index()];
                if *slot {
                    return Err(RecommendError::InvalidConfig(format!(
                        "boost table: {}/{} is listed more than once",
                        weather, mood
                    )));
                }
                *slot = true;

                for (cuisine, weight) in cuisines {
                    table.set(weather, mood, cuisine, *weight)?;
                }
            }
        }

        let missing: Vec<String> = Weather::ALL
            .iter()
            .flat_map(|w| Mood::ALL.iter().map(move |m| (*w, *m)))
            .filter(|(w, m)| !seen[w.index()][m.index()])
            .map(|(w, m)| format!("{}/{}", w, m))
            .collect();

        if !missing.is_empty() {
            return Err(RecommendError::InvalidConfig(format!(
                "boost table is missing {}",
                missing.join(", ")
            )));
        }

        Ok(table)
    }

    /// Reads a JSON boost table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecommendError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RecommendError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

/// Share of the remaining headroom a full feature match adds by default
pub const DEFAULT_FEATURE_WEIGHT: f64 = 0.5;

// Meal types and flavors that suit each weather and mood
const WEATHER_FEATURES: [(Weather, &[&str]); Weather::COUNT] = [
    (Weather::Sunny, &["Salad", "Appetizer", "Cold Drinks", "Dessert"]),
    (Weather::Rainy, &["Soup", "Hot Coffee", "Main Course", "Stew"]),
    (Weather::Snowy, &["Hot Chocolate", "Stew", "Main Course", "Soup"]),
    (Weather::Cloudy, &["Tea", "Appetizer", "Sandwich", "Dessert"]),
    (Weather::Windy, &["Main Course", "Appetizer", "Wrap", "Soup"]),
];

const MOOD_FEATURES: [(Mood, &[&str]); Mood::COUNT] = [
    (Mood::Happy, &["Dessert", "Appetizer", "Salad", "Beverage"]),
    (Mood::Sad, &["Dessert", "Main Course", "Pasta", "Comfort Food"]),
    (Mood::Stressed, &["Main Course", "Appetizer", "Comfort Food", "Beverage"]),
    (Mood::Relaxed, &["Soup", "Tea", "Appetizer", "Salad"]),
    (Mood::Adventurous, &["Spicy", "Main Course", "Curry", "Exotic"]),
];

/// Meal-type and flavor rules applied on top of the cuisine boost
///
/// An item earns 1 when its category suits the weather, 1 when it suits
/// the mood, and 0.5 when its flavor or one of its tags suits the mood.
/// The match, scaled into [0, 1], lifts the cuisine boost toward 1 by
/// `weight` of the remaining headroom. Items matching nothing keep their
/// cuisine boost, so unmapped items stay neutral.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRules {
    weather: [BTreeSet<String>; Weather::COUNT],
    mood: [BTreeSet<String>; Mood::COUNT],
    weight: f64,
}

impl Default for FeatureRules {
    fn default() -> Self {
        let mut rules = Self::none();
        rules.weight = DEFAULT_FEATURE_WEIGHT;
        for (weather, features) in WEATHER_FEATURES {
            rules.set_weather(weather, features.iter().copied());
        }
        for (mood, features) in MOOD_FEATURES {
            rules.set_mood(mood, features.iter().copied());
        }
        rules
    }
}

#[derive(Deserialize)]
struct FeatureRulesFile {
    #[serde(default)]
    weather: HashMap<String, Vec<String>>,
    #[serde(default)]
    mood: HashMap<String, Vec<String>>,
}

fn normalize(feature: &str) -> String {
    feature.trim().to_lowercase()
}

impl FeatureRules {
    /// Rules that never adjust the cuisine boost
    pub fn none() -> Self {
        Self {
            weather: std::array::from_fn(|_| BTreeSet::new()),
            mood: std::array::from_fn(|_| BTreeSet::new()),
            weight: 0.0,
        }
    }

    /// Sets how far a full match lifts the score, which must lie in [0, 1]
    pub fn with_weight(mut self, weight: f64) -> Result<Self, RecommendError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(RecommendError::InvalidConfig(format!(
                "feature weight must be within [0, 1], got {}",
                weight
            )));
        }
        self.weight = weight;
        Ok(self)
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Replaces the meal types and flavors suited to `weather`
    pub fn set_weather<'s>(&mut self, weather: Weather, features: impl IntoIterator<Item = &'s str>) {
        self.weather[weather.index()] = features.into_iter().map(normalize).collect();
    }

    /// Replaces the meal types and flavors suited to `mood`
    pub fn set_mood<'s>(&mut self, mood: Mood, features: impl IntoIterator<Item = &'s str>) {
        self.mood[mood.index()] = features.into_iter().map(normalize).collect();
    }

    /// Parses rules shaped as `{"weather": {label: [feature]}, "mood": {label: [feature]}}`
    ///
    /// Labels left out have no rules. The weight is kept at its default.
    pub fn from_json(json: &str) -> Result<Self, RecommendError> {
        let raw: FeatureRulesFile = serde_json::from_str(json)
            .map_err(|e| RecommendError::InvalidConfig(format!("feature rules: {}", e)))?;

        let mut rules = Self::none();
        rules.weight = DEFAULT_FEATURE_WEIGHT;

        let mut seen_weather = [false; Weather::COUNT];
        for (label, features) in &raw.weather {
            let weather: Weather = label
                .parse()
                .map_err(|e| RecommendError::InvalidConfig(format!("feature rules: {}", e)))?;
            if std::mem::replace(&mut seen_weather[weather.index()], true) {
                return Err(RecommendError::InvalidConfig(format!(
                    "feature rules: {} is listed more than once",
                    weather
                )));
            }
            rules.set_weather(weather, features.iter().map(String::as_str));
        }

        let mut seen_mood = [false; Mood::COUNT];
        for (label, features) in &raw.mood {
            let mood: Mood = label
                .parse()
                .map_err(|e| RecommendError::InvalidConfig(format!("feature rules: {}", e)))?;
            if std::mem::replace(&mut seen_mood[mood.index()], true) {
                return Err(RecommendError::InvalidConfig(format!(
                    "feature rules: {} is listed more than once",
                    mood
                )));
            }
            rules.set_mood(mood, features.iter().map(String::as_str));
        }

        Ok(rules)
    }

    /// Reads JSON feature rules from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecommendError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RecommendError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// How well an item's meal type and flavor suit the context, in [0, 1]
    pub fn match_score(&self, context: &Context, item: &FoodItem) -> f64 {
        let weather = &self.weather[context.weather.index()];
        let mood = &self.mood[context.mood.index()];
        let category = normalize(&item.category);

        let mut points = 0.0;
        if weather.contains(&category) {
            points += 1.0;
        }
        if mood.contains(&category) {
            points += 1.0;
        }
        let tagged = item
            .flavor
            .iter()
            .chain(item.dietary.iter())
            .any(|tag| mood.contains(&normalize(tag)));
        if tagged {
            points += 0.5;
        }

        points / 2.5
    }

    /// Lifts a cuisine boost by the item's feature match
    pub fn adjust(&self, boost: f64, context: &Context, item: &FoodItem) -> f64 {
        if self.weight <= 0.0 {
            return boost;
        }
        let lifted = boost + (1.0 - boost) * self.weight * self.match_score(context, item);
        lifted.clamp(0.0, 1.0)
    }
}

/// Scores items by their cuisine boost, adjusted by meal type and flavor
pub struct ContextRecommender<'a> {
    snapshot: &'a Snapshot,
    table: &'a BoostTable,
    rules: &'a FeatureRules,
}

impl<'a> ContextRecommender<'a> {
    pub fn new(snapshot: &'a Snapshot, table: &'a BoostTable, rules: &'a FeatureRules) -> Self {
        Self {
            snapshot,
            table,
            rules,
        }
    }

    /// Scores every item in the snapshot under `context`
    pub fn score(&self, context: &Context) -> ScoreVector {
        self.snapshot
            .items()
            .map(|item| {
                let boost = self.table.boost(context.weather, context.mood, &item.cuisine);
                (item.id.clone(), self.rules.adjust(boost, context, item))
            })
            .collect()
    }
}
