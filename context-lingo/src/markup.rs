//! Substitution markup
//!
//! A substitution is rendered as three nested elements:
//!
//! ```text
//! <span class="context-lingo-wrapper" style="…">
//!   <abbr class="context-lingo-tooltip" style="…" title="hello (bonjour | salut)">
//!     <span class="context-lingo-replacement" style="…" tabindex="-1">Bonjour</span>
//!   </abbr>
//! </span>
//! ```
//!
//! Every level carries a reserved class so later passes recognize it as
//! injected and never match inside it.

use serde::{Deserialize, Serialize};

use crate::dom::serialize::escape_attribute as attribute;
use crate::exclusion::{REPLACEMENT_CLASS, TOOLTIP_CLASS, WRAPPER_CLASS};

/// Inline style strings written verbatim (attribute-escaped) into injected markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleTokens {
    pub wrapper: String,
    pub tooltip: String,
    /// Inner text carrier when the phrase was replaced
    pub replaced: String,
    /// Inner text carrier when the phrase was kept
    pub skipped: String,
    /// Reset applied to the wrapper before its own style
    pub unset_all: String,
}

impl Default for StyleTokens {
    fn default() -> Self {
        StyleTokens {
            wrapper: "display: inline; position: relative;".to_string(),
            tooltip: "text-decoration: none; border-bottom: none; cursor: help;".to_string(),
            replaced: "color: #58a700; font-weight: bold; \
                       border-bottom: 2px dotted #58a700;"
                .to_string(),
            skipped: "border-bottom: 1px dotted currentColor;".to_string(),
            unset_all: "all: unset;".to_string(),
        }
    }
}

/// One rendered substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementMarkup {
    /// Text shown in place of the phrase
    pub rendered: String,
    /// Tooltip text
    pub title: String,
    pub substituted: bool,
}

impl ReplacementMarkup {
    pub fn new(rendered: impl Into<String>, title: impl Into<String>, substituted: bool) -> Self {
        ReplacementMarkup {
            rendered: rendered.into(),
            title: title.into(),
            substituted,
        }
    }

    /// Serialize to canonical markup using the given style tokens
    pub fn to_html(&self, styles: &StyleTokens) -> String {
        let inner_style = if self.substituted {
            &styles.replaced
        } else {
            &styles.skipped
        };
        let wrapper_style = format!("{}{}", styles.unset_all, styles.wrapper);

        format!(
            "<span class=\"{}\" style=\"{}\">\
             <abbr class=\"{}\" style=\"{}\" title=\"{}\">\
             <span class=\"{}\" style=\"{}\" tabindex=\"-1\">{}</span>\
             </abbr></span>",
            WRAPPER_CLASS,
            attribute(&wrapper_style),
            TOOLTIP_CLASS,
            attribute(&styles.tooltip),
            attribute(&self.title),
            REPLACEMENT_CLASS,
            attribute(inner_style),
            html_escape::encode_text(&self.rendered),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_three_levels_with_reserved_classes() {
        let markup = ReplacementMarkup::new("Bonjour", "Hello (bonjour | salut)", true);
        let doc = Document::parse(&markup.to_html(&StyleTokens::default()));

        let wrapper = doc.children(doc.body())[0];
        let tooltip = doc.children(wrapper)[0];
        let inner = doc.children(tooltip)[0];

        assert_eq!(doc.tag_name(wrapper), Some("span"));
        assert!(doc.element(wrapper).unwrap().has_class(WRAPPER_CLASS));
        assert_eq!(doc.tag_name(tooltip), Some("abbr"));
        assert_eq!(
            doc.element(tooltip).unwrap().attr("title"),
            Some("Hello (bonjour | salut)")
        );
        assert!(doc.element(inner).unwrap().has_class(REPLACEMENT_CLASS));
        assert_eq!(doc.element(inner).unwrap().attr("tabindex"), Some("-1"));
        assert_eq!(doc.text_content(inner), "Bonjour");
    }

    #[test]
    fn test_inner_style_depends_on_decision() {
        let styles = StyleTokens {
            replaced: "R".to_string(),
            skipped: "S".to_string(),
            ..StyleTokens::default()
        };
        assert!(
            ReplacementMarkup::new("x", "t", true)
                .to_html(&styles)
                .contains("style=\"R\"")
        );
        assert!(
            ReplacementMarkup::new("x", "t", false)
                .to_html(&styles)
                .contains("style=\"S\"")
        );
    }

    #[test]
    fn test_wrapper_style_is_reset_then_wrapper() {
        let styles = StyleTokens {
            unset_all: "all: unset;".to_string(),
            wrapper: "color: red;".to_string(),
            ..StyleTokens::default()
        };
        let html = ReplacementMarkup::new("x", "t", true).to_html(&styles);
        assert!(html.contains("style=\"all: unset;color: red;\""));
    }

    #[test]
    fn test_text_and_title_escaped() {
        let markup = ReplacementMarkup::new("<b>&", "a \"quoted\" > title", true);
        let html = markup.to_html(&StyleTokens::default());
        assert!(html.contains("&lt;b&gt;&amp;"));
        assert!(!html.contains("\"quoted\""));

        let doc = Document::parse(&html);
        let tooltip = doc.find_elements_by_class(doc.root(), TOOLTIP_CLASS)[0];
        assert_eq!(
            doc.element(tooltip).unwrap().attr("title"),
            Some("a \"quoted\" > title")
        );
    }

    #[test]
    fn test_styles_deserialize_with_defaults() {
        let styles: StyleTokens = serde_json::from_str("{\"unsetAll\": \"\"}").unwrap();
        assert_eq!(styles.unset_all, "");
        assert_eq!(styles.wrapper, StyleTokens::default().wrapper);
    }
}
