//! Phrase catalog
//!
//! An ordered list of source phrases and their target variants. Ordering is
//! significant: longer phrases come first so that when one phrase contains
//! another ("good morning" / "morning") the more specific entry wins.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{SwapError, SwapResult};

/// Number of entries a session samples from a large snapshot
pub const DEFAULT_WORKING_SET_SIZE: usize = 500;

/// One source phrase with its substitute renderings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseEntry {
    pub source: String,
    pub targets: Vec<String>,
}

impl PhraseEntry {
    /// Create a validated entry
    ///
    /// The phrase is trimmed; empty variants are dropped.
    ///
    /// # Errors
    ///
    /// `SwapError::InvalidEntry` when the phrase is blank or no variant remains.
    pub fn new(source: &str, targets: Vec<String>) -> SwapResult<Self> {
        let source = source.trim();
        if source.is_empty() {
            return Err(SwapError::InvalidEntry("phrase is empty".to_string()));
        }
        let targets: Vec<String> = targets
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if targets.is_empty() {
            return Err(SwapError::InvalidEntry(format!(
                "phrase '{}' has no target variants",
                source
            )));
        }
        Ok(PhraseEntry {
            source: source.to_string(),
            targets,
        })
    }

    /// Variants joined for display, e.g. `"bonjour | salut"`
    pub fn targets_display(&self) -> String {
        self.targets.join(" | ")
    }
}

/// Ordered collection of phrase entries, most specific first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<PhraseEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            entries: Vec::new(),
        }
    }

    /// Build a catalog from `(phrase, variants)` pairs
    ///
    /// Invalid pairs are skipped with a warning. A phrase seen twice keeps its
    /// first occurrence. The result is sorted by specificity.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (source, targets) in pairs {
            match PhraseEntry::new(&source, targets) {
                Ok(entry) => {
                    if seen.insert(entry.source.to_lowercase()) {
                        entries.push(entry);
                    } else {
                        debug!("Duplicate phrase '{}' ignored", entry.source);
                    }
                }
                Err(e) => warn!("Skipping catalog entry: {}", e),
            }
        }
        let mut catalog = Catalog { entries };
        catalog.sort_by_specificity();
        catalog
    }

    /// Build a catalog from a JSON object mapping phrases to variant arrays
    ///
    /// ```json
    /// { "hello": ["bonjour", "salut"], "thank you": ["merci"] }
    /// ```
    ///
    /// Values that are not arrays and variants that are not strings are ignored.
    pub fn from_json_map(value: &Value) -> SwapResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            SwapError::InvalidEntry("catalog JSON must be an object".to_string())
        })?;
        let pairs = object.iter().filter_map(|(source, targets)| {
            let Some(targets) = targets.as_array() else {
                warn!("Catalog entry '{}' is not an array, skipping", source);
                return None;
            };
            let targets = targets
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect();
            Some((source.clone(), targets))
        });
        Ok(Self::from_pairs(pairs))
    }

    /// Longer phrases first (by character count), ties alphabetically
    pub fn sort_by_specificity(&mut self) {
        self.entries.sort_by(|a, b| {
            b.source
                .chars()
                .count()
                .cmp(&a.source.chars().count())
                .then_with(|| a.source.cmp(&b.source))
        });
    }

    /// Draw a random working subset of at most `limit` entries
    ///
    /// The full list is shuffled, truncated, then sorted by specificity again.
    pub fn sample<R: Rng + ?Sized>(&self, limit: usize, rng: &mut R) -> Catalog {
        let mut entries = self.entries.clone();
        entries.shuffle(rng);
        entries.truncate(limit);
        let mut catalog = Catalog { entries };
        catalog.sort_by_specificity();
        catalog
    }

    /// Entries as `(phrase, variants)` pairs, in catalog order
    pub fn to_pairs(&self) -> Vec<(String, Vec<String>)> {
        self.entries
            .iter()
            .map(|e| (e.source.clone(), e.targets.clone()))
            .collect()
    }

    pub fn entries(&self) -> &[PhraseEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhraseEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
