//! Markup-tolerant phrase patterns
//!
//! Every catalog phrase is compiled into a regular expression that still
//! matches when the phrase is interrupted by tags, as rich text often is:
//!
//! - between two characters of a word, any run of tags may appear
//!   (`mor<b>n</b>ing`);
//! - between two words, whitespace is required and tags may surround it
//!   (`good </i> <b>morning`).
//!
//! Each phrase is anchored by word boundaries so `cat` never matches inside
//! `category`. Patterns run against the canonical serialization produced by
//! [`crate::dom::Document::matchable_inner_html`], so `&`, `<` and `>` in a
//! phrase are matched in their escaped form.
//!
//! # Example
//!
//! ```ignore
//! use context_lingo::{Catalog, CompiledCatalog};
//!
//! let catalog = Catalog::from_pairs(vec![("good morning".into(), vec!["bonjour".into()])]);
//! let compiled = CompiledCatalog::compile(&catalog)?;
//! assert!(compiled.is_match("good <b>mor</b>ning"));
//! ```

use regex::{Regex, RegexBuilder};

use crate::catalog::{Catalog, PhraseEntry};
use crate::dom::MatchableContent;
use crate::error::SwapResult;

/// Optional run of tags between two characters of one word
pub const TAG_GAP: &str = "(?:<[^>]+>)*";

/// Whitespace between two words, optionally surrounded by tags
pub const SPACE_GAP: &str = r"(?:\s*<[^>]+>\s*)*\s+(?:\s*<[^>]+>\s*)*";

/// Compiled size ceiling; a working set of a few hundred phrases needs far
/// more than the regex crate's default
const PATTERN_SIZE_LIMIT: usize = 1 << 28;

/// A phrase pattern match inside serialized content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

fn char_pattern(c: char) -> String {
    match c {
        '&' => "&amp;".to_string(),
        '<' => "&lt;".to_string(),
        '>' => "&gt;".to_string(),
        _ => regex::escape(c.encode_utf8(&mut [0; 4])),
    }
}

/// Build the regex source for a single phrase, without flags
///
/// ```ignore
/// assert_eq!(phrase_pattern("hi"), r"\bh(?:<[^>]+>)*i\b");
/// ```
pub fn phrase_pattern(phrase: &str) -> String {
    let words: Vec<String> = phrase
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            word.chars()
                .map(char_pattern)
                .collect::<Vec<_>>()
                .join(TAG_GAP)
        })
        .collect();
    format!(r"\b{}\b", words.join(SPACE_GAP))
}

fn build(source: &str) -> SwapResult<Regex> {
    Ok(RegexBuilder::new(source)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .dfa_size_limit(PATTERN_SIZE_LIMIT)
        .build()?)
}

/// The catalog with every pattern compiled, immutable once built
#[derive(Debug, Clone)]
pub struct CompiledCatalog {
    entries: Vec<PhraseEntry>,
    /// Alternation of all phrase patterns; `None` for an empty catalog
    combined: Option<Regex>,
    individual: Vec<Regex>,
    /// Coarse literal test against plain text content
    prefilter: Option<Regex>,
}

impl CompiledCatalog {
    /// Compile every phrase in catalog order
    ///
    /// # Errors
    ///
    /// `SwapError::Pattern` if a pattern exceeds the compiled size limit.
    pub fn compile(catalog: &Catalog) -> SwapResult<Self> {
        let entries = catalog.entries().to_vec();
        let sources: Vec<String> = entries.iter().map(|e| phrase_pattern(&e.source)).collect();

        let individual = sources
            .iter()
            .map(|source| build(source))
            .collect::<SwapResult<Vec<_>>>()?;

        let (combined, prefilter) = if entries.is_empty() {
            (None, None)
        } else {
            let alternation = sources
                .iter()
                .map(|s| format!("(?:{})", s))
                .collect::<Vec<_>>()
                .join("|");
            let literals = entries
                .iter()
                .map(|e| {
                    e.source
                        .split_whitespace()
                        .map(regex::escape)
                        .collect::<Vec<_>>()
                        .join(r"\s+")
                })
                .collect::<Vec<_>>()
                .join("|");
            (Some(build(&alternation)?), Some(build(&literals)?))
        };

        tracing::debug!("Compiled {} phrase patterns", entries.len());

        Ok(CompiledCatalog {
            entries,
            combined,
            individual,
            prefilter,
        })
    }

    pub fn entries(&self) -> &[PhraseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any phrase matches anywhere in `html`
    pub fn is_match(&self, html: &str) -> bool {
        self.combined.as_ref().is_some_and(|re| re.is_match(html))
    }

    /// All non-overlapping matches, leftmost-first, in document order
    pub fn find_spans(&self, html: &str) -> Vec<MatchSpan> {
        let Some(combined) = &self.combined else {
            return Vec::new();
        };
        combined
            .find_iter(html)
            .map(|m| MatchSpan {
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }

    /// Matches in `content` that can be rewritten, leftmost-first
    ///
    /// A match that lies in a tag, touches a shielded subtree or cannot be
    /// spliced without breaking the tree is skipped, and the search resumes
    /// one character after its start so a shorter match overlapping it is
    /// still found. Returned spans cover their splice range, which may
    /// include tags at the edges of the raw match.
    pub fn find_admitted(&self, content: &MatchableContent) -> Vec<MatchSpan> {
        let Some(combined) = &self.combined else {
            return Vec::new();
        };
        let html = content.html.as_str();
        let mut spans = Vec::new();
        let mut at = 0;
        let mut last_end = 0;
        while at < html.len() {
            let Some(found) = combined.find_at(html, at) else {
                break;
            };
            match content.splice_range(&found.range()) {
                Some(range) if range.start >= last_end && !range.is_empty() => {
                    at = range.end;
                    last_end = range.end;
                    spans.push(MatchSpan {
                        text: html[range.clone()].to_string(),
                        start: range.start,
                        end: range.end,
                    });
                }
                _ => {
                    let step = html[found.start()..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    at = found.start() + step;
                }
            }
        }
        spans
    }

    /// Whether plain `text` mentions any phrase at all
    ///
    /// This is a cheap literal check without word boundaries or tag
    /// tolerance, used to prune the tree before running the full pattern.
    pub fn may_contain(&self, text: &str) -> bool {
        self.prefilter.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// The first entry, in catalog order, whose own pattern matches `text`
    pub fn resolve(&self, text: &str) -> Option<&PhraseEntry> {
        self.individual
            .iter()
            .position(|re| re.is_match(text))
            .map(|index| &self.entries[index])
    }
}
