//! Keyword classifier
//!
//! Maps repository names, descriptions and topic tags onto the configured
//! taxonomy. All functions are pure.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::{CategoryMatch, Taxonomy};

/// Confidence for a description keyword hit.
pub const DESCRIPTION_CONFIDENCE: f64 = 0.8;
/// Confidence for a topic keyword found inside the repository name.
pub const NAME_CONFIDENCE: f64 = 0.6;
/// Confidence for an exact topic tag match.
pub const TOPIC_CONFIDENCE: f64 = 1.0;

/// Pre-filter match on listing text.
///
/// Description keywords are case-insensitive substrings of `description`;
/// topic keywords are case-insensitive substrings of `name`. Each slug
/// yields at most one match carrying the higher of the two confidences; when
/// the taxonomy repeats a slug the first matching entry wins.
pub fn match_by_text(
    name: &str,
    description: Option<&str>,
    taxonomy: &Taxonomy,
) -> Vec<CategoryMatch> {
    let name = name.to_lowercase();
    let description = description.unwrap_or_default().to_lowercase();
    let mut seen = HashSet::new();

    taxonomy
        .matchable()
        .filter_map(|category| {
            let mut confidence: f64 = 0.0;

            if contains_any(&description, &category.keywords.description) {
                confidence = confidence.max(DESCRIPTION_CONFIDENCE);
            }
            if contains_any(&name, &category.keywords.topics) {
                confidence = confidence.max(NAME_CONFIDENCE);
            }

            (confidence > 0.0 && seen.insert(category.slug.as_str()))
                .then(|| CategoryMatch::new(category.slug.clone(), confidence))
        })
        .collect()
}

/// Exact, case-insensitive match of topic tags against each category's topic keywords.
pub fn match_by_topics(topics: &[String], taxonomy: &Taxonomy) -> Vec<CategoryMatch> {
    if topics.is_empty() {
        return Vec::new();
    }

    let topic_set: HashSet<String> = topics.iter().map(|topic| topic.to_lowercase()).collect();
    let mut seen = HashSet::new();

    taxonomy
        .matchable()
        .filter(|category| {
            category
                .keywords
                .topics
                .iter()
                .any(|keyword| topic_set.contains(&keyword.to_lowercase()))
                && seen.insert(category.slug.as_str())
        })
        .map(|category| CategoryMatch::new(category.slug.clone(), TOPIC_CONFIDENCE))
        .collect()
}

/// Union by slug keeping the highest confidence, in first-seen order.
pub fn merge(a: &[CategoryMatch], b: &[CategoryMatch]) -> Vec<CategoryMatch> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut merged: Vec<CategoryMatch> = Vec::with_capacity(a.len() + b.len());

    for candidate in a.iter().chain(b) {
        match positions.get(candidate.slug.as_str()) {
            Some(&index) => {
                if candidate.confidence > merged[index].confidence {
                    merged[index].confidence = candidate.confidence;
                }
            }
            None => {
                positions.insert(candidate.slug.as_str(), merged.len());
                merged.push(candidate.clone());
            }
        }
    }

    merged
}

/// Highest-confidence match; equal confidences resolve to the smaller slug.
pub fn primary(matches: &[CategoryMatch]) -> Option<&CategoryMatch> {
    matches.iter().min_by(|left, right| {
        right
            .confidence
            .partial_cmp(&left.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| left.slug.cmp(&right.slug))
    })
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    !haystack.is_empty()
        && keywords
            .iter()
            .filter(|keyword| !keyword.is_empty())
            .any(|keyword| haystack.contains(&keyword.to_lowercase()))
}
