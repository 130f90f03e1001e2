//! Prefetch Seed Data Module
//!
//! Static configuration for the scheduler: per-category seed queries
//! enqueued at startup, and the query relation table used to expand
//! repeated queries into speculative fetches.
//!
//! The data is serde-deserializable so deployments can swap in their own
//! tables without touching scheduler code; the built-in defaults cover
//! common clinical lookups.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::{normalize_query, Category};
use crate::prefetch::TaskPriority;

// == Prefetch Seeds ==
/// Seed queries plus the relation table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchSeeds {
    /// Queries warmed at startup, per category
    #[serde(default)]
    pub seed_queries: HashMap<Category, Vec<String>>,
    /// Query -> related queries, matched after normalization
    #[serde(default)]
    pub related_queries: HashMap<String, Vec<String>>,
}

impl PrefetchSeeds {
    /// Loads seeds from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// An empty table: nothing seeded, nothing related.
    pub fn empty() -> Self {
        Self {
            seed_queries: HashMap::new(),
            related_queries: HashMap::new(),
        }
    }

    /// Related queries for a (normalized) query; empty when unknown.
    pub fn related(&self, query: &str) -> &[String] {
        self.related_queries
            .get(&normalize_query(query))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Startup priority for a category's seed queries: code and symptom
    /// lookups are needed most often, the rest can wait.
    pub fn seed_priority(category: Category) -> TaskPriority {
        match category {
            Category::Codes | Category::Symptoms => TaskPriority::High,
            _ => TaskPriority::Medium,
        }
    }
}

impl Default for PrefetchSeeds {
    fn default() -> Self {
        let seed_queries = HashMap::from([
            (
                Category::Codes,
                strings(&["hypertension", "type 2 diabetes", "asthma", "pneumonia"]),
            ),
            (
                Category::Symptoms,
                strings(&["chest pain", "headache", "shortness of breath", "fever", "fatigue"]),
            ),
            (
                Category::Literature,
                strings(&["heart failure management", "sepsis guidelines"]),
            ),
            (
                Category::Drugs,
                strings(&["aspirin", "metformin", "lisinopril"]),
            ),
            (Category::Trials, strings(&["heart failure", "diabetes"])),
        ]);

        let related_queries = HashMap::from([
            (
                "chest pain".to_string(),
                strings(&["myocardial infarction", "angina", "coronary artery disease"]),
            ),
            (
                "headache".to_string(),
                strings(&["migraine", "tension headache"]),
            ),
            (
                "shortness of breath".to_string(),
                strings(&["asthma", "copd", "heart failure", "pulmonary embolism"]),
            ),
            (
                "fever".to_string(),
                strings(&["infection", "sepsis", "influenza"]),
            ),
            (
                "fatigue".to_string(),
                strings(&["anemia", "hypothyroidism", "depression"]),
            ),
            (
                "abdominal pain".to_string(),
                strings(&["appendicitis", "gallstones", "pancreatitis"]),
            ),
            (
                "dizziness".to_string(),
                strings(&["vertigo", "orthostatic hypotension"]),
            ),
        ]);

        Self {
            seed_queries,
            related_queries,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
