//! Structured drug knowledge base.
//!
//! A [`KnowledgeStore`] is built once by [`load`] and never mutated. Sharing
//! goes through [`KnowledgeHandle`], which hands out `Arc` snapshots and can
//! swap in a freshly loaded store as a whole.
//!
//! Category, entry and subcategory order is the order of the source
//! document; every lookup walks the store in that order.

pub mod load;

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;

use crate::error::AppError;

// ── Entries ──────────────────────────────────────────────────────────────────

/// One drug record. Source keys are Indonesian; see the `rename`s.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entry {
    #[serde(rename = "nama")]
    pub name: String,
    /// Brand names.
    #[serde(rename = "merk_dagang", default)]
    pub aliases: Vec<String>,
    #[serde(rename = "indikasi", default)]
    pub indication: String,
    #[serde(rename = "dosis", default)]
    pub dosage: String,
    #[serde(rename = "kategori_penyakit", default)]
    pub disease_category: String,
    #[serde(rename = "golongan", default)]
    pub drug_class: String,
    #[serde(rename = "efek_samping", default)]
    pub side_effects: Vec<String>,
    #[serde(rename = "interaksi_obat", default)]
    pub drug_interactions: Vec<DrugInteraction>,
    #[serde(rename = "interaksi_makanan", default)]
    pub food_interactions: Vec<FoodInteraction>,
    #[serde(rename = "catatan_khusus", default)]
    pub special_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DrugInteraction {
    #[serde(rename = "obat")]
    pub agent: String,
    #[serde(rename = "efek")]
    pub effect: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FoodInteraction {
    #[serde(rename = "makanan")]
    pub food: String,
    #[serde(rename = "efek")]
    pub effect: String,
}

// ── Categories ───────────────────────────────────────────────────────────────

/// A drug class nested under a category (`subkategori` in the source).
#[derive(Debug, Clone, PartialEq)]
pub struct Subcategory {
    pub name: String,
    pub description: Option<String>,
    /// Example drug names (`contoh_obat`).
    pub examples: Vec<String>,
    pub usual_dosage: Option<String>,
    pub side_effects: Vec<String>,
}

/// A top-level category.
///
/// The source shape decides which list is populated: an array body yields
/// `entries`, an object body with `subkategori` yields `subcategories`.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub description: Option<String>,
    pub entries: Vec<Entry>,
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    pub fn has_subcategories(&self) -> bool {
        !self.subcategories.is_empty()
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeStore {
    categories: Vec<Category>,
}

impl KnowledgeStore {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        load::from_file(path)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        load::from_json_str(raw)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, AppError> {
        load::from_value(value)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Every entry paired with its category, in store order.
    pub fn entries(&self) -> impl Iterator<Item = (&Category, &Entry)> {
        self.categories
            .iter()
            .flat_map(|c| c.entries.iter().map(move |e| (c, e)))
    }

    pub fn entry_count(&self) -> usize {
        self.categories.iter().map(|c| c.entries.len()).sum()
    }
}

// ── Shared handle ────────────────────────────────────────────────────────────

/// Cloneable, thread-safe access to the current store.
///
/// Readers take a snapshot and work on it without holding any lock, so a
/// concurrent [`replace`](Self::replace) never changes a resolution that is
/// already running.
#[derive(Debug, Clone)]
pub struct KnowledgeHandle {
    current: Arc<RwLock<Arc<KnowledgeStore>>>,
}

impl KnowledgeHandle {
    pub fn new(store: KnowledgeStore) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(store))) }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeStore> {
        // The guarded value is a plain Arc; a poisoned lock still holds a valid one.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new store. Returns the one it replaced.
    pub fn replace(&self, store: KnowledgeStore) -> Arc<KnowledgeStore> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(store))
    }
}
