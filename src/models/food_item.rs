use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use super::ItemId;

/// Price tier of a food item, derived from its price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    Low,
    Medium,
    High,
}

impl PriceTier {
    /// Number of tiers between `self` and `other` (0, 1 or 2)
    pub fn distance(self, other: PriceTier) -> u8 {
        (self as i8 - other as i8).unsigned_abs()
    }
}

impl Display for PriceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceTier::Low => write!(f, "low"),
            PriceTier::Medium => write!(f, "medium"),
            PriceTier::High => write!(f, "high"),
        }
    }
}

impl FromStr for PriceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "budget" | "cheap" => Ok(PriceTier::Low),
            "medium" | "mid" | "moderate" => Ok(PriceTier::Medium),
            "high" | "premium" | "expensive" => Ok(PriceTier::High),
            other => Err(format!("unknown price tier '{}'", other)),
        }
    }
}

/// Upper price bounds for the low and medium tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBands {
    pub low_max: f64,
    pub medium_max: f64,
}

impl Default for PriceBands {
    fn default() -> Self {
        Self {
            low_max: 10.0,
            medium_max: 20.0,
        }
    }
}

impl PriceBands {
    /// Classifies a price; bounds are inclusive on the cheaper side
    pub fn tier_for(&self, price: f64) -> PriceTier {
        if price <= self.low_max {
            PriceTier::Low
        } else if price <= self.medium_max {
            PriceTier::Medium
        } else {
            PriceTier::High
        }
    }
}

/// A dish on the menu, with the features the content recommender compares
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub id: ItemId,
    pub name: String,
    /// Cuisine tag (e.g., "Italian")
    pub cuisine: String,
    /// Meal type (e.g., "Main Course", "Dessert")
    pub category: String,
    pub price: f64,
    pub price_tier: PriceTier,
    /// Dietary flags the dish satisfies (e.g., "Vegan", "Halal")
    pub dietary: BTreeSet<String>,
    /// Dominant flavor, such as "Spicy" or "Sweet"
    pub flavor: Option<String>,
}

impl FoodItem {
    /// Creates a food item, deriving its price tier from `bands`
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        cuisine: impl Into<String>,
        category: impl Into<String>,
        price: f64,
        bands: &PriceBands,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cuisine: cuisine.into(),
            category: category.into(),
            price,
            price_tier: bands.tier_for(price),
            dietary: BTreeSet::new(),
            flavor: None,
        }
    }

    pub fn with_dietary<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dietary.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = Some(flavor.into());
        self
    }

    /// Case-insensitive dietary flag check
    pub fn satisfies(&self, restriction: &str) -> bool {
        self.dietary
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(restriction))
    }
}
