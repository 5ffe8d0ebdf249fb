mod context;
mod food_item;
mod order;
mod score;
mod user;

pub use context::{Context, ContextError, Mood, Weather};
pub use food_item::{FoodItem, PriceBands, PriceTier};
pub use order::{parse_timestamp, Order};
pub use score::{ScoreVector, ScoredItem};
pub use user::User;

/// Identifier of a food item (e.g., a UUID string or "f1")
pub type ItemId = String;

/// Identifier of a user
pub type UserId = String;

/// Splits a stored list column into its entries
///
/// Handles both plain comma-separated text (`Vegan, Halal`) and the
/// bracketed, quoted form written by pandas (`['Vegan', 'Halal']`).
/// Empty entries are dropped.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);

    inner
        .split(',')
        .map(|entry| entry.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
