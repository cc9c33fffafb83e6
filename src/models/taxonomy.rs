//! Category taxonomy loaded from `categories.json`.

use serde::{Deserialize, Serialize};

/// Slug reserved for the catch-all category; never produced by keyword matching.
pub const FALLBACK_CATEGORY: &str = "other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub keywords: CategoryKeywords,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryKeywords {
    /// Matched against topic tags and repository name tokens
    #[serde(default)]
    pub topics: Vec<String>,
    /// Matched against the free-text description
    #[serde(default)]
    pub description: Vec<String>,
}

/// Ordered, read-only list of categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Categories eligible for keyword matching (everything except the fallback).
    pub fn matchable(&self) -> impl Iterator<Item = &Category> {
        self.categories
            .iter()
            .filter(|category| category.slug != FALLBACK_CATEGORY)
    }

    pub fn get(&self, slug: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.slug == slug)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
