//! Service taxonomy: category → subcategory → service, with keyword tables.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, CoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyLevel {
    Service,
    Subcategory,
    Category,
}

impl TaxonomyLevel {
    /// Levels in the order the normalizer prefers them.
    pub const PRIORITY: [TaxonomyLevel; 3] = [
        TaxonomyLevel::Service,
        TaxonomyLevel::Subcategory,
        TaxonomyLevel::Category,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaxonomyLevel::Service => "service",
            TaxonomyLevel::Subcategory => "subcategory",
            TaxonomyLevel::Category => "category",
        }
    }

    /// The level a parent entry must have, if any.
    #[must_use]
    pub fn parent_level(self) -> Option<TaxonomyLevel> {
        match self {
            TaxonomyLevel::Service => Some(TaxonomyLevel::Subcategory),
            TaxonomyLevel::Subcategory => Some(TaxonomyLevel::Category),
            TaxonomyLevel::Category => None,
        }
    }
}

impl std::fmt::Display for TaxonomyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(TaxonomyLevel::Service),
            "subcategory" => Ok(TaxonomyLevel::Subcategory),
            "category" => Ok(TaxonomyLevel::Category),
            other => Err(CoreError::InvalidTaxonomyLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    /// Stable slug, e.g. `"wedding-photography"`.
    pub id: String,
    pub level: TaxonomyLevel,
    pub name: String,
    pub parent_id: Option<String>,
    pub keywords: Vec<String>,
    pub is_active: bool,
}

impl TaxonomyEntry {
    /// Case-insensitive check against the entry name or any keyword.
    ///
    /// Matches when either side contains the other, which is the candidate
    /// filter the taxonomy read API applies before scoring.
    #[must_use]
    pub fn matches_keyword_or_name(&self, text: &str) -> bool {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        let name = self.name.to_lowercase();
        if name.contains(&needle) || needle.contains(&name) {
            return true;
        }
        self.keywords.iter().any(|k| {
            let k = k.to_lowercase();
            !k.is_empty() && (k.contains(&needle) || needle.contains(&k))
        })
    }
}

/// In-memory snapshot of the active taxonomy, keyed by entry id.
///
/// Ordered by id so every iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyCatalog {
    entries: BTreeMap<String, TaxonomyEntry>,
}

impl TaxonomyCatalog {
    /// Build a catalog from entries, dropping inactive ones.
    pub fn from_entries(entries: impl IntoIterator<Item = TaxonomyEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|e| e.is_active)
            .map(|e| (e.id.clone(), e))
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaxonomyEntry> {
        self.entries.get(id)
    }

    pub fn by_level(&self, level: TaxonomyLevel) -> impl Iterator<Item = &TaxonomyEntry> {
        self.entries.values().filter(move |e| e.level == level)
    }

    #[must_use]
    pub fn parent(&self, entry: &TaxonomyEntry) -> Option<&TaxonomyEntry> {
        entry.parent_id.as_deref().and_then(|id| self.get(id))
    }

    /// Entries of `level` whose name or keywords overlap `text`.
    #[must_use]
    pub fn find_by_keyword_or_name(&self, level: TaxonomyLevel, text: &str) -> Vec<&TaxonomyEntry> {
        self.by_level(level)
            .filter(|e| e.matches_keyword_or_name(text))
            .collect()
    }

    /// Ids of every active service at or beneath `id`.
    ///
    /// A service id yields itself; a subcategory yields its services; a
    /// category yields the services of all its subcategories. Unknown ids
    /// yield an empty list.
    #[must_use]
    pub fn services_under(&self, id: &str) -> Vec<String> {
        let Some(root) = self.get(id) else {
            return Vec::new();
        };
        match root.level {
            TaxonomyLevel::Service => vec![root.id.clone()],
            TaxonomyLevel::Subcategory => self.children_ids(&root.id, TaxonomyLevel::Service),
            TaxonomyLevel::Category => self
                .children_ids(&root.id, TaxonomyLevel::Subcategory)
                .iter()
                .flat_map(|sub| self.children_ids(sub, TaxonomyLevel::Service))
                .collect(),
        }
    }

    fn children_ids(&self, parent_id: &str, level: TaxonomyLevel) -> Vec<String> {
        self.by_level(level)
            .filter(|e| e.parent_id.as_deref() == Some(parent_id))
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxonomyEntry> {
        self.entries.values()
    }
}

/// Seed-file shape: categories nest subcategories which nest services.
#[derive(Debug, Deserialize)]
pub struct TaxonomyFile {
    pub categories: Vec<CategoryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubcategoryConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TaxonomyFile {
    /// Flatten the nested file into active entries with parent links.
    #[must_use]
    pub fn into_entries(self) -> Vec<TaxonomyEntry> {
        let mut out = Vec::new();
        for category in self.categories {
            for sub in category.subcategories {
                for service in sub.services {
                    out.push(TaxonomyEntry {
                        id: service.id,
                        level: TaxonomyLevel::Service,
                        name: service.name,
                        parent_id: Some(sub.id.clone()),
                        keywords: service.keywords,
                        is_active: true,
                    });
                }
                out.push(TaxonomyEntry {
                    id: sub.id,
                    level: TaxonomyLevel::Subcategory,
                    name: sub.name,
                    parent_id: Some(category.id.clone()),
                    keywords: sub.keywords,
                    is_active: true,
                });
            }
            out.push(TaxonomyEntry {
                id: category.id,
                level: TaxonomyLevel::Category,
                name: category.name,
                parent_id: None,
                keywords: category.keywords,
                is_active: true,
            });
        }
        out
    }
}

/// Load and validate the taxonomy seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_taxonomy_file(path: &Path) -> Result<TaxonomyFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_taxonomy_yaml(&content)
}

/// Parse and validate taxonomy YAML from a string.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_taxonomy_yaml(content: &str) -> Result<TaxonomyFile, ConfigError> {
    let file: TaxonomyFile = serde_yaml::from_str(content)?;
    validate_taxonomy(&file)?;
    Ok(file)
}

fn validate_taxonomy(file: &TaxonomyFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();
    let mut check = |id: &str, name: &str| -> Result<(), ConfigError> {
        if !is_slug(id) {
            return Err(ConfigError::Validation(format!(
                "taxonomy id '{id}' must be a lowercase slug"
            )));
        }
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "taxonomy entry '{id}' has an empty name"
            )));
        }
        if !seen_ids.insert(id.to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate taxonomy id: '{id}'"
            )));
        }
        Ok(())
    };

    for category in &file.categories {
        check(&category.id, &category.name)?;
        for sub in &category.subcategories {
            check(&sub.id, &sub.name)?;
            for service in &sub.services {
                check(&service.id, &service.name)?;
            }
        }
    }

    Ok(())
}

fn is_slug(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('-')
        && !id.ends_with('-')
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
