//! Maps free-text queries onto the service taxonomy.
//!
//! Scoring is a fixed weighted rule set; see [`normalize`].

use std::cmp::Ordering;
use std::sync::LazyLock;

use bazaar_core::{TaxonomyCatalog, TaxonomyEntry, TaxonomyLevel};
use regex::Regex;
use serde::Serialize;

use crate::config::LOW_CONFIDENCE_THRESHOLD;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("valid token regex"));

const EXACT_NAME: u32 = 100;
const MIN_TOKEN_LEN: usize = 3;

struct LevelWeights {
    exact_keyword: u32,
    name_containment: u32,
    keyword_containment: u32,
    token: u32,
    max_score: f64,
}

fn weights(level: TaxonomyLevel) -> LevelWeights {
    match level {
        TaxonomyLevel::Service => LevelWeights {
            exact_keyword: 80,
            name_containment: 60,
            keyword_containment: 50,
            token: 10,
            max_score: 100.0,
        },
        TaxonomyLevel::Subcategory => LevelWeights {
            exact_keyword: 75,
            name_containment: 40,
            keyword_containment: 35,
            token: 8,
            max_score: 90.0,
        },
        TaxonomyLevel::Category => LevelWeights {
            exact_keyword: 70,
            name_containment: 25,
            keyword_containment: 25,
            token: 5,
            max_score: 80.0,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchSource {
    Normalized,
    /// The caller named a taxonomy id directly.
    Explicit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomyMatch {
    pub taxonomy_id: String,
    pub name: String,
    pub level: TaxonomyLevel,
    pub score: u32,
}

impl TaxonomyMatch {
    fn from_entry(entry: &TaxonomyEntry, score: u32) -> Self {
        Self {
            taxonomy_id: entry.id.clone(),
            name: entry.name.clone(),
            level: entry.level,
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationResult {
    pub query: String,
    pub best_match: Option<TaxonomyMatch>,
    /// `best score / level max`, capped at 1.0; 0.0 when nothing matched.
    pub confidence: f64,
    pub source: MatchSource,
    pub services: Vec<TaxonomyMatch>,
    pub subcategories: Vec<TaxonomyMatch>,
    pub categories: Vec<TaxonomyMatch>,
}

impl NormalizationResult {
    /// Zero-confidence result for `query`.
    #[must_use]
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            best_match: None,
            confidence: 0.0,
            source: MatchSource::Normalized,
            services: Vec::new(),
            subcategories: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// Full-confidence result for an id the caller supplied directly.
    #[must_use]
    pub fn explicit(entry: &TaxonomyEntry) -> Self {
        let top = TaxonomyMatch::from_entry(entry, EXACT_NAME);
        let mut result = Self::empty(&entry.id);
        match entry.level {
            TaxonomyLevel::Service => result.services.push(top.clone()),
            TaxonomyLevel::Subcategory => result.subcategories.push(top.clone()),
            TaxonomyLevel::Category => result.categories.push(top.clone()),
        }
        result.best_match = Some(top);
        result.confidence = 1.0;
        result.source = MatchSource::Explicit;
        result
    }

    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_THRESHOLD
    }

    /// All matches in level priority order, best first within each level.
    pub fn matches(&self) -> impl Iterator<Item = &TaxonomyMatch> {
        self.services
            .iter()
            .chain(&self.subcategories)
            .chain(&self.categories)
    }
}

/// Score `query` against every active entry in `catalog`.
///
/// Per entry: an exact name match scores 100; otherwise an exact keyword
/// match scores the level's keyword weight; otherwise the best single
/// name-or-keyword containment (either direction) scores. Each distinct
/// query token of three or more characters found in the name or a keyword
/// adds the level's token weight on top. Entries scoring zero are dropped.
#[must_use]
pub fn normalize(catalog: &TaxonomyCatalog, query: &str) -> NormalizationResult {
    let text = canonical(query);
    if text.is_empty() {
        return NormalizationResult::empty(query);
    }
    let tokens = tokenize(&text);

    let mut result = NormalizationResult::empty(query);
    for level in TaxonomyLevel::PRIORITY {
        let mut matches: Vec<TaxonomyMatch> = catalog
            .by_level(level)
            .filter_map(|entry| {
                let score = score_entry(entry, &text, &tokens);
                (score > 0).then(|| TaxonomyMatch::from_entry(entry, score))
            })
            .collect();
        matches.sort_by(by_score_then_id);

        match level {
            TaxonomyLevel::Service => result.services = matches,
            TaxonomyLevel::Subcategory => result.subcategories = matches,
            TaxonomyLevel::Category => result.categories = matches,
        }
    }

    let best = result
        .services
        .first()
        .or_else(|| result.subcategories.first())
        .or_else(|| result.categories.first())
        .cloned();
    if let Some(best) = best {
        let max = weights(best.level).max_score;
        result.confidence = (f64::from(best.score) / max).min(1.0);
        result.best_match = Some(best);
    }
    result
}

fn score_entry(entry: &TaxonomyEntry, text: &str, tokens: &[&str]) -> u32 {
    let w = weights(entry.level);
    let name = canonical(&entry.name);
    let keywords: Vec<String> = entry
        .keywords
        .iter()
        .map(|k| canonical(k))
        .filter(|k| !k.is_empty())
        .collect();

    let mut score = if name == text {
        EXACT_NAME
    } else if keywords.iter().any(|k| k == text) {
        w.exact_keyword
    } else {
        let name_hit = contains_either(&name, text).then_some(w.name_containment);
        let keyword_hit = keywords
            .iter()
            .any(|k| contains_either(k, text))
            .then_some(w.keyword_containment);
        name_hit.max(keyword_hit).unwrap_or(0)
    };

    for token in tokens {
        if name.contains(token) || keywords.iter().any(|k| k.contains(token)) {
            score += w.token;
        }
    }
    score
}

fn contains_either(a: &str, b: &str) -> bool {
    !a.is_empty() && (a.contains(b) || b.contains(a))
}

/// Lowercase and collapse whitespace.
fn canonical(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = Vec::new();
    for token in TOKEN.find_iter(text).map(|m| m.as_str()) {
        if token.len() >= MIN_TOKEN_LEN && !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

fn by_score_then_id(a: &TaxonomyMatch, b: &TaxonomyMatch) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.taxonomy_id.cmp(&b.taxonomy_id))
}

#[cfg(test)]
#[path = "normalizer_test.rs"]
mod tests;
