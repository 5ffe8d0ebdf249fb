use serde::{Deserialize, Serialize};

use super::{PriceTier, UserId};

/// A diner and their stated preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Preferred cuisines, in the order the user listed them
    pub cuisine_preferences: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub preferred_price_tier: Option<PriceTier>,
    pub location: Option<String>,
}

impl User {
    /// Creates a user with no stated preferences
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cuisine_preferences: Vec::new(),
            dietary_restrictions: Vec::new(),
            preferred_price_tier: None,
            location: None,
        }
    }

    /// Adds a preferred cuisine, ignoring case-insensitive duplicates
    pub fn add_cuisine(&mut self, cuisine: impl Into<String>) {
        let cuisine = cuisine.into();
        if !self
            .cuisine_preferences
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&cuisine))
        {
            self.cuisine_preferences.push(cuisine);
        }
    }

    /// Adds a dietary restriction, ignoring case-insensitive duplicates
    pub fn add_restriction(&mut self, restriction: impl Into<String>) {
        let restriction = restriction.into();
        if !self
            .dietary_restrictions
            .iter()
            .any(|r| r.eq_ignore_ascii_case(&restriction))
        {
            self.dietary_restrictions.push(restriction);
        }
    }
}
