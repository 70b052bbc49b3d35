//! Which parts of the tree the engine must leave alone
//!
//! Two kinds of nodes are never matched: markup the engine injected itself,
//! recognized by its reserved classes, and excluded element kinds (scripts,
//! media, form controls, code, rich-text editor containers). Anything below
//! such a node is *shielded* as well.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};

/// Class on the outer wrapper of injected markup
pub const WRAPPER_CLASS: &str = "context-lingo-wrapper";
/// Class on the tooltip carrier of injected markup
pub const TOOLTIP_CLASS: &str = "context-lingo-tooltip";
/// Class on the inner text carrier of injected markup
pub const REPLACEMENT_CLASS: &str = "context-lingo-replacement";

/// Every reserved class; any element carrying one is injected markup
pub const INJECTED_CLASSES: [&str; 3] = [WRAPPER_CLASS, TOOLTIP_CLASS, REPLACEMENT_CLASS];

const DEFAULT_EXCLUDED_TAGS: [&str; 46] = [
    // metadata and scripting
    "style", "meta", "script", "noscript", "base", "title", "link", "embed",
    // embedded media
    "img", "area", "audio", "map", "track", "video", "iframe", "object", "param", "picture",
    "source", "svg", "math", "canvas",
    // form controls
    "datalist", "fieldset", "input", "optgroup", "option", "select", "textarea",
    // templating and obsolete elements
    "slot", "template", "applet", "basefont", "bgsound", "frame", "frameset", "image", "isindex",
    "keygen", "menuitem", "multicol", "nextid", "noembed", "noframes", "plaintext", "shadow",
];

const DEFAULT_EXCLUDED_TAGS_EXTRA: [&str; 3] = ["spacer", "xmp", "code"];

/// Containers of rich-text editors that must never be touched
const DEFAULT_EXCLUDED_CLASSES: [&str; 2] = ["DraftEditor-root", "public-DraftStyleDefault-block"];

/// Element kinds excluded from matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExclusionRules {
    /// Lowercase tag names
    pub tags: HashSet<String>,
    /// Class names, matched exactly
    pub classes: HashSet<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        ExclusionRules {
            tags: DEFAULT_EXCLUDED_TAGS
                .iter()
                .chain(DEFAULT_EXCLUDED_TAGS_EXTRA.iter())
                .map(|t| t.to_string())
                .collect(),
            classes: DEFAULT_EXCLUDED_CLASSES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl ExclusionRules {
    /// Rules that exclude nothing; injected markup is still recognized
    pub fn none() -> Self {
        ExclusionRules {
            tags: HashSet::new(),
            classes: HashSet::new(),
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_ascii_lowercase());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    /// Whether the node is an element the engine injected
    pub fn is_injected(&self, doc: &Document, id: NodeId) -> bool {
        doc.element(id)
            .is_some_and(|data| INJECTED_CLASSES.iter().any(|c| data.has_class(c)))
    }

    /// Whether the node is an element of an excluded kind
    pub fn is_excluded(&self, doc: &Document, id: NodeId) -> bool {
        doc.element(id).is_some_and(|data| {
            self.tags.contains(&data.name) || data.classes().any(|c| self.classes.contains(c))
        })
    }

    /// Injected or excluded, ignoring ancestors
    pub fn blocks(&self, doc: &Document, id: NodeId) -> bool {
        self.is_injected(doc, id) || self.is_excluded(doc, id)
    }

    /// Whether the node or any ancestor blocks matching
    pub fn is_shielded(&self, doc: &Document, id: NodeId) -> bool {
        self.blocks(doc, id) || doc.ancestors(id).any(|a| self.blocks(doc, a))
    }

    /// Whether the node is, or sits inside, injected markup
    pub fn within_injected(&self, doc: &Document, id: NodeId) -> bool {
        self.is_injected(doc, id) || doc.ancestors(id).any(|a| self.is_injected(doc, a))
    }

    /// Whether the node is, or sits inside, an excluded element
    pub fn within_excluded(&self, doc: &Document, id: NodeId) -> bool {
        self.is_excluded(doc, id) || doc.ancestors(id).any(|a| self.is_excluded(doc, a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &Document, name: &str) -> NodeId {
        doc.descendants(doc.root())
            .into_iter()
            .find(|&id| doc.tag_name(id) == Some(name))
            .unwrap()
    }

    #[test]
    fn test_default_rules_cover_scripts_and_code() {
        let rules = ExclusionRules::default();
        let doc = Document::parse("<script>x</script><code><span>y</span></code><p>z</p>");
        assert!(rules.is_excluded(&doc, element(&doc, "script")));
        assert!(rules.is_excluded(&doc, element(&doc, "code")));
        assert!(!rules.is_excluded(&doc, element(&doc, "span")));
        assert!(rules.is_shielded(&doc, element(&doc, "span")));
        assert!(!rules.is_shielded(&doc, element(&doc, "p")));
    }

    #[test]
    fn test_editor_containers_excluded() {
        let rules = ExclusionRules::default();
        let doc = Document::parse(
            "<div class=\"DraftEditor-root\"><div class=\"public-DraftStyleDefault-block\">\
             <span><span>typing</span></span></div></div>",
        );
        let spans = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|&id| doc.tag_name(id) == Some("span"))
            .collect::<Vec<_>>();
        assert!(spans.iter().all(|&s| rules.within_excluded(&doc, s)));
    }

    #[test]
    fn test_injected_classes_recognized() {
        let rules = ExclusionRules::none();
        let html = format!(
            "<span class=\"{}\"><abbr class=\"{}\"><span class=\"{}\">x</span></abbr></span>",
            WRAPPER_CLASS, TOOLTIP_CLASS, REPLACEMENT_CLASS
        );
        let doc = Document::parse(&html);
        let wrapper = doc.children(doc.body())[0];
        assert!(rules.is_injected(&doc, wrapper));
        for id in doc.descendants(wrapper) {
            if doc.is_element(id) {
                assert!(rules.is_injected(&doc, id));
            } else {
                assert!(rules.within_injected(&doc, id));
            }
        }
    }

    #[test]
    fn test_none_excludes_nothing() {
        let rules = ExclusionRules::none();
        let doc = Document::parse("<script>x</script>");
        assert!(!rules.is_shielded(&doc, element(&doc, "script")));
    }

    #[test]
    fn test_builder_and_serde() {
        let rules = ExclusionRules::none().with_tag("PRE").with_class("no-swap");
        let json = serde_json::to_string(&rules).unwrap();
        let back: ExclusionRules = serde_json::from_str(&json).unwrap();
        assert!(back.tags.contains("pre"));
        assert!(back.classes.contains("no-swap"));

        let partial: ExclusionRules = serde_json::from_str("{\"classes\": [\"x\"]}").unwrap();
        assert!(partial.tags.contains("script"));
        assert!(partial.classes.contains("x"));
    }
}
