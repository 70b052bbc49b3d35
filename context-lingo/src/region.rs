//! Innermost match region selection
//!
//! Given a subtree root, find the smallest elements whose own content holds a
//! phrase match that the substituter is allowed to rewrite. Working on the
//! innermost elements keeps each rewrite as local as possible and guarantees
//! that no two regions overlap.

use tracing::{debug, warn};

use crate::dom::{Document, MatchableContent, NodeId};
use crate::error::SwapResult;
use crate::exclusion::ExclusionRules;
use crate::pattern::CompiledCatalog;

/// An element selected for substitution, with its content at selection time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub node: NodeId,
    pub content: MatchableContent,
}

/// Result of one selection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Innermost regions in document order
    pub regions: Vec<Region>,
    /// Candidates dropped because their content could not be normalized
    pub malformed: usize,
}

/// Finds innermost match regions below a root
pub struct RegionSelector<'a> {
    compiled: &'a CompiledCatalog,
    rules: &'a ExclusionRules,
}

impl<'a> RegionSelector<'a> {
    pub fn new(compiled: &'a CompiledCatalog, rules: &'a ExclusionRules) -> Self {
        RegionSelector { compiled, rules }
    }

    /// Select the innermost verified regions at or below `root`
    pub fn select(&self, doc: &Document, root: NodeId) -> Selection {
        let mut selection = Selection::default();

        if !doc.is_element(root) || self.rules.is_shielded(doc, root) {
            return selection;
        }

        let candidates = self.candidates(doc, root);
        let mut verified: Vec<Region> = Vec::new();
        for candidate in candidates {
            match self.verify(doc, candidate) {
                Ok(Some(content)) => verified.push(Region {
                    node: candidate,
                    content,
                }),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping element {}: {}", candidate.index(), e);
                    selection.malformed += 1;
                }
            }
        }

        let innermost: Vec<Region> = verified
            .iter()
            .filter(|region| {
                !verified
                    .iter()
                    .any(|other| doc.contains(region.node, other.node))
            })
            .cloned()
            .collect();

        selection.regions = innermost
            .into_iter()
            .filter(|region| !self.rules.within_injected(doc, region.node))
            .filter(|region| !self.rules.within_excluded(doc, region.node))
            .collect();

        debug!(
            "Selected {} region(s) of {} verified candidate(s) below node {}",
            selection.regions.len(),
            verified.len(),
            root.index()
        );
        selection
    }

    /// Root plus every unshielded descendant element whose text passes the
    /// prefilter, in document order
    ///
    /// A descendant's text is a substring of its ancestor's, so a subtree
    /// whose top fails the prefilter is not searched further.
    fn candidates(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.passes_prefilter(doc, root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            for &child in doc.children(node).iter().rev() {
                if doc.is_element(child)
                    && !self.rules.blocks(doc, child)
                    && self.passes_prefilter(doc, child)
                {
                    stack.push(child);
                }
            }
        }
        out
    }

    fn passes_prefilter(&self, doc: &Document, id: NodeId) -> bool {
        let text = doc.text_content(id);
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.compiled.may_contain(&collapsed)
    }

    /// Serialize the element's content and check it holds a usable match
    ///
    /// Returns the content when at least one combined-pattern match lies in
    /// text, outside every shielded descendant, and can be spliced without
    /// unbalancing the element's tags.
    pub fn verify(&self, doc: &Document, id: NodeId) -> SwapResult<Option<MatchableContent>> {
        let content = doc.matchable_inner_html(id, |node| self.rules.blocks(doc, node))?;
        let usable = !self.compiled.find_admitted(&content).is_empty();
        Ok(usable.then_some(content))
    }
}
