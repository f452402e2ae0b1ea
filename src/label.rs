//! Security labels and the dominance relation.
//!
//! A label pairs a totally ordered [`Level`] with a set of [`Category`]
//! compartments. [`dominates`] is the sole security predicate; the policy
//! engine builds every decision from it or from the level/category
//! primitives below.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Clearance/classification levels ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    /// Rank 0.
    Unclassified,
    /// Rank 1.
    Confidential,
    /// Rank 2.
    Secret,
    /// Rank 3.
    TopSecret,
}

impl Level {
    /// All levels in ascending order.
    pub const ALL: [Level; 4] = [
        Level::Unclassified,
        Level::Confidential,
        Level::Secret,
        Level::TopSecret,
    ];

    /// Numeric rank (0-3).
    pub fn rank(self) -> u8 {
        match self {
            Self::Unclassified => 0,
            Self::Confidential => 1,
            Self::Secret => 2,
            Self::TopSecret => 3,
        }
    }

    /// Resolve a numeric rank.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::LevelOutOfRange`] outside `0..=3`.
    pub fn from_rank(rank: i64) -> Result<Self, ValidationError> {
        match rank {
            0 => Ok(Self::Unclassified),
            1 => Ok(Self::Confidential),
            2 => Ok(Self::Secret),
            3 => Ok(Self::TopSecret),
            other => Err(ValidationError::LevelOutOfRange(other)),
        }
    }

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unclassified => "UNCLASSIFIED",
            Self::Confidential => "CONFIDENTIAL",
            Self::Secret => "SECRET",
            Self::TopSecret => "TOP_SECRET",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ValidationError;

    /// Accepts canonical names case-insensitively (`top-secret` and
    /// `top secret` included) and decimal ranks.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(rank) = trimmed.parse::<i64>() {
            return Self::from_rank(rank);
        }
        let normalized = trimmed.to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownLevel(s.to_owned()))
    }
}

/// Compartment tag from the closed category vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// `CATEGORY1`
    Category1,
    /// `CATEGORY2`
    Category2,
    /// `CATEGORY3`
    Category3,
    /// `CATEGORY4`
    Category4,
}

impl Category {
    /// The full vocabulary.
    pub const ALL: [Category; 4] = [
        Category::Category1,
        Category::Category2,
        Category::Category3,
        Category::Category4,
    ];

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category1 => "CATEGORY1",
            Self::Category2 => "CATEGORY2",
            Self::Category3 => "CATEGORY3",
            Self::Category4 => "CATEGORY4",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_owned()))
    }
}

/// Security label attached to every subject and object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    /// Clearance or classification level.
    pub level: Level,
    /// Compartments held (subject) or required (object).
    #[serde(default)]
    pub categories: BTreeSet<Category>,
}

impl Label {
    /// Build a label from a level and any collection of categories.
    pub fn new(level: Level, categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            level,
            categories: categories.into_iter().collect(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{{{}}}", self.level, format_categories(&self.categories))
    }
}

/// Parse a list of raw category strings into a set.
///
/// Blank strings are skipped, so a split of `""` yields the empty set.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownCategory`] on the first unknown value.
pub fn parse_categories<S: AsRef<str>>(raw: &[S]) -> Result<BTreeSet<Category>, ValidationError> {
    raw.iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// `a` dominates `b` iff `a.level >= b.level` and `b.categories ⊆ a.categories`.
pub fn dominates(a: &Label, b: &Label) -> bool {
    a.level >= b.level && categories_subset(&b.categories, &a.categories)
}

/// Exact level equality.
pub fn level_equals(a: &Label, b: &Label) -> bool {
    a.level == b.level
}

/// `true` iff every category in `sub` is also in `sup`.
pub fn categories_subset(sub: &BTreeSet<Category>, sup: &BTreeSet<Category>) -> bool {
    sub.is_subset(sup)
}

/// Categories in `required` that `held` lacks.
pub fn missing_categories(
    required: &BTreeSet<Category>,
    held: &BTreeSet<Category>,
) -> BTreeSet<Category> {
    required.difference(held).copied().collect()
}

/// Comma-separated category names, in vocabulary order.
pub fn format_categories(categories: &BTreeSet<Category>) -> String {
    categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
