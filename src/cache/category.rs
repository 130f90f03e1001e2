//! Cache Category Module
//!
//! Defines the closed set of data categories and the per-category TTL table.
//!
//! Each category corresponds to one kind of external lookup (terminology
//! codes, symptom data, literature search, drug data, trial registries, and
//! a handful of locally derived data sets). The TTL for a category is fixed
//! at startup and is never mutated per entry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Category ==
/// Classification of cached data. Governs TTL and which fetch function
/// serves prefetch tasks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Terminology code lookups (ICD, SNOMED)
    Codes,
    /// Symptom reference data
    Symptoms,
    /// Literature search results
    Literature,
    /// Drug reference data
    Drugs,
    /// Trial registry lookups
    Trials,
    /// Assessment instruments
    Assessments,
    /// Patient record summaries
    Records,
    /// Clinical rules
    Rules,
    /// Anything that does not fit the above
    General,
}

impl Category {
    /// All categories, in a fixed order.
    pub const ALL: [Category; 9] = [
        Category::Codes,
        Category::Symptoms,
        Category::Literature,
        Category::Drugs,
        Category::Trials,
        Category::Assessments,
        Category::Records,
        Category::Rules,
        Category::General,
    ];

    /// Stable lowercase name, used in cache keys and the durable tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Codes => "codes",
            Category::Symptoms => "symptoms",
            Category::Literature => "literature",
            Category::Drugs => "drugs",
            Category::Trials => "trials",
            Category::Assessments => "assessments",
            Category::Records => "records",
            Category::Rules => "rules",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "codes" => Ok(Category::Codes),
            "symptoms" => Ok(Category::Symptoms),
            "literature" => Ok(Category::Literature),
            "drugs" => Ok(Category::Drugs),
            "trials" => Ok(Category::Trials),
            "assessments" => Ok(Category::Assessments),
            "records" => Ok(Category::Records),
            "rules" => Ok(Category::Rules),
            "general" => Ok(Category::General),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

// == TTL Table ==
/// Per-category time-to-live, fixed at startup.
#[derive(Debug, Clone)]
pub struct TtlTable {
    ttls: HashMap<Category, Duration>,
}

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

impl TtlTable {
    /// Builds a table from explicit category/TTL pairs. Categories not
    /// listed fall back to the default table's value.
    pub fn with_overrides(overrides: &[(Category, Duration)]) -> Self {
        let mut table = Self::default();
        for (category, ttl) in overrides {
            table.ttls.insert(*category, *ttl);
        }
        table
    }

    /// TTL for a category.
    pub fn ttl_for(&self, category: Category) -> Duration {
        // Default covers every variant, so the lookup cannot miss.
        self.ttls
            .get(&category)
            .copied()
            .unwrap_or(Duration::from_secs(6 * HOUR))
    }
}

impl Default for TtlTable {
    /// Default TTLs: slow-moving reference data lives for weeks, volatile
    /// search results for hours.
    fn default() -> Self {
        let ttls = HashMap::from([
            (Category::Codes, Duration::from_secs(30 * DAY)),
            (Category::Symptoms, Duration::from_secs(7 * DAY)),
            (Category::Literature, Duration::from_secs(24 * HOUR)),
            (Category::Drugs, Duration::from_secs(48 * HOUR)),
            (Category::Trials, Duration::from_secs(12 * HOUR)),
            (Category::Assessments, Duration::from_secs(7 * DAY)),
            (Category::Records, Duration::from_secs(24 * HOUR)),
            (Category::Rules, Duration::from_secs(7 * DAY)),
            (Category::General, Duration::from_secs(6 * HOUR)),
        ]);
        Self { ttls }
    }
}
