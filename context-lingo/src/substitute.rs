//! Match extraction and substitution within one region

use rand::Rng;
use tracing::debug;

use crate::catalog::PhraseEntry;
use crate::dom::Document;
use crate::error::{SwapError, SwapResult};
use crate::markup::{ReplacementMarkup, StyleTokens};
use crate::pattern::{CompiledCatalog, MatchSpan};
use crate::region::Region;

/// What happened to one matched span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionDecision {
    pub span: MatchSpan,
    pub source_phrase: String,
    /// Text shown in the page after the pass
    pub rendered: String,
    pub did_substitute: bool,
}

/// Decisions made in one region, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionOutcome {
    pub decisions: Vec<SubstitutionDecision>,
    /// Spans no catalog entry claimed
    pub unresolved: usize,
}

/// Rewrites matched phrases inside a region
pub struct Substituter<'a> {
    compiled: &'a CompiledCatalog,
    styles: &'a StyleTokens,
    percentage: u8,
}

impl<'a> Substituter<'a> {
    pub fn new(compiled: &'a CompiledCatalog, styles: &'a StyleTokens, percentage: u8) -> Self {
        Substituter {
            compiled,
            styles,
            percentage,
        }
    }

    /// Rewrite every usable match in `region` and write the result back
    ///
    /// Spans are spliced last to first so earlier offsets stay valid. The
    /// region's children are replaced in a single assignment, and only when
    /// at least one span was rewritten.
    ///
    /// # Errors
    ///
    /// `SwapError::InvalidNode` if the region node can no longer hold markup.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        doc: &mut Document,
        region: &Region,
        rng: &mut R,
    ) -> SwapResult<RegionOutcome> {
        let content = &region.content;
        let spans = self.compiled.find_admitted(content);

        let mut html = content.html.clone();
        let mut outcome = RegionOutcome::default();

        for span in spans.into_iter().rev() {
            let Some(entry) = self.compiled.resolve(&span.text) else {
                let err = SwapError::NoResolvableEntry(span.text.clone());
                debug!("{}", err);
                outcome.unresolved += 1;
                continue;
            };
            let (decision, markup) = self.decide(entry, span, rng);
            html.replace_range(decision.span.range(), &markup.to_html(self.styles));
            outcome.decisions.push(decision);
        }

        if !outcome.decisions.is_empty() {
            doc.set_inner_html(region.node, &html)?;
        }
        outcome.decisions.reverse();
        Ok(outcome)
    }

    /// Pick a variant, roll against the percentage and render the markup
    pub fn decide<R: Rng + ?Sized>(
        &self,
        entry: &PhraseEntry,
        span: MatchSpan,
        rng: &mut R,
    ) -> (SubstitutionDecision, ReplacementMarkup) {
        let matched = plain_text(&span.text);

        let variant = if entry.targets.is_empty() {
            matched.clone()
        } else {
            entry.targets[rng.gen_range(0..entry.targets.len())].clone()
        };
        let draw: f64 = rng.gen_range(0.0..100.0);
        let did_substitute = self.percentage > 0 && draw <= f64::from(self.percentage);

        let mut rendered = if did_substitute {
            variant
        } else {
            matched.clone()
        };
        if matched.chars().next().is_some_and(char::is_uppercase) {
            rendered = capitalize_first(&rendered);
        }

        let title = if did_substitute {
            format!("{} ({})", matched, entry.targets_display())
        } else {
            entry.targets_display()
        };

        debug!(
            "'{}' -> '{}' ({})",
            matched,
            rendered,
            if did_substitute { "replaced" } else { "kept" }
        );

        let markup = ReplacementMarkup::new(rendered.clone(), title, did_substitute);
        let decision = SubstitutionDecision {
            span,
            source_phrase: entry.source.clone(),
            rendered,
            did_substitute,
        };
        (decision, markup)
    }
}

/// Text of a serialized fragment with tags removed and entities decoded
pub fn plain_text(serialized: &str) -> String {
    let mut out = String::with_capacity(serialized.len());
    let mut in_tag = false;
    for c in serialized.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    html_escape::decode_html_entities(&out).into_owned()
}

/// Uppercase the first character, leaving the rest untouched
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::exclusion::{ExclusionRules, REPLACEMENT_CLASS, TOOLTIP_CLASS};
    use crate::region::RegionSelector;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn compiled(pairs: &[(&str, &[&str])]) -> CompiledCatalog {
        let catalog = Catalog::from_pairs(pairs.iter().map(|(s, t)| {
            (
                s.to_string(),
                t.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            )
        }));
        CompiledCatalog::compile(&catalog).unwrap()
    }

    fn run(compiled: &CompiledCatalog, html: &str, percentage: u8) -> (Document, RegionOutcome) {
        let mut doc = Document::parse(html);
        let rules = ExclusionRules::default();
        let styles = StyleTokens::default();
        let regions = RegionSelector::new(compiled, &rules)
            .select(&doc, doc.body())
            .regions;
        let substituter = Substituter::new(compiled, &styles, percentage);
        let mut rng = StdRng::seed_from_u64(42);
        let mut outcome = RegionOutcome::default();
        for region in &regions {
            let result = substituter.apply(&mut doc, region, &mut rng).unwrap();
            outcome.decisions.extend(result.decisions);
            outcome.unresolved += result.unresolved;
        }
        (doc, outcome)
    }

    fn replacement_texts(doc: &Document) -> Vec<String> {
        doc.find_elements_by_class(doc.root(), REPLACEMENT_CLASS)
            .into_iter()
            .map(|id| doc.text_content(id))
            .collect()
    }

    // ========== Helpers ==========

    #[test]
    fn test_plain_text_strips_tags_and_decodes() {
        assert_eq!(plain_text("good <b>mor</b>ning"), "good morning");
        assert_eq!(plain_text("tom &amp; jerry"), "tom & jerry");
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("bonjour"), "Bonjour");
        assert_eq!(capitalize_first("élan"), "Élan");
        assert_eq!(capitalize_first(""), "");
    }

    // ========== Substitution ==========

    #[test]
    fn test_capitalization_preserved() {
        let compiled = compiled(&[("hello", &["bonjour"])]);
        let (doc, outcome) = run(&compiled, "<body><p>Hello world</p></body>", 100);
        assert_eq!(outcome.decisions.len(), 1);
        assert_eq!(outcome.decisions[0].rendered, "Bonjour");
        assert_eq!(replacement_texts(&doc), vec!["Bonjour"]);
    }

    #[test]
    fn test_lowercase_match_keeps_variant_case() {
        let compiled = compiled(&[("hello", &["bonjour"])]);
        let (_, outcome) = run(&compiled, "<body><p>say hello</p></body>", 100);
        assert_eq!(outcome.decisions[0].rendered, "bonjour");
    }

    #[test]
    fn test_percentage_zero_keeps_text() {
        let compiled = compiled(&[("hello", &["bonjour"])]);
        let (doc, outcome) = run(&compiled, "<body><p>Hello and hello</p></body>", 0);
        assert_eq!(outcome.decisions.len(), 2);
        assert!(outcome.decisions.iter().all(|d| !d.did_substitute));
        assert_eq!(replacement_texts(&doc), vec!["Hello", "hello"]);

        let tooltip = doc.find_elements_by_class(doc.root(), TOOLTIP_CLASS)[0];
        assert_eq!(doc.element(tooltip).unwrap().attr("title"), Some("bonjour"));
    }

    #[test]
    fn test_percentage_hundred_always_substitutes() {
        let compiled = compiled(&[("cat", &["chat", "gato"])]);
        let html = format!("<body><p>{}</p></body>", "cat ".repeat(30));
        let (doc, outcome) = run(&compiled, &html, 100);
        assert_eq!(outcome.decisions.len(), 30);
        assert!(outcome.decisions.iter().all(|d| d.did_substitute));
        assert!(
            replacement_texts(&doc)
                .iter()
                .all(|t| t == "chat" || t == "gato")
        );
    }

    #[test]
    fn test_tooltip_names_original_when_substituted() {
        let compiled = compiled(&[("thank you", &["merci", "merci bien"])]);
        let (doc, _) = run(&compiled, "<body><p>Thank you!</p></body>", 100);
        let tooltip = doc.find_elements_by_class(doc.root(), TOOLTIP_CLASS)[0];
        assert_eq!(
            doc.element(tooltip).unwrap().attr("title"),
            Some("Thank you (merci | merci bien)")
        );
    }

    #[test]
    fn test_split_phrase_rendered_as_plain_text() {
        let compiled = compiled(&[("good morning", &["bonjour"])]);
        let (doc, outcome) = run(&compiled, "<body><p>Good <b>mor</b>ning, all</p></body>", 0);
        assert_eq!(outcome.decisions[0].rendered, "Good morning");
        let p = doc.children(doc.body())[0];
        assert!(doc.text_content(p).ends_with(", all"));
        assert!(doc.descendants(p).iter().all(|&id| doc.tag_name(id) != Some("b")));
    }

    #[test]
    fn test_surrounding_markup_preserved() {
        let compiled = compiled(&[("cat", &["chat"])]);
        let (doc, _) = run(
            &compiled,
            "<body><p><i>the</i> cat <a href=\"/x\">sat</a></p></body>",
            100,
        );
        let p = doc.children(doc.body())[0];
        let html = doc.inner_html(p);
        assert!(html.starts_with("<i>the</i> <span"));
        assert!(html.ends_with(" <a href=\"/x\">sat</a>"));
    }

    #[test]
    fn test_match_leaving_an_element_keeps_tree_sound() {
        let compiled = compiled(&[("good morning", &["bonjour"])]);
        let (doc, outcome) = run(
            &compiled,
            "<body><p><a href=\"/x\">good</a> morning, see <b>more</b></p></body>",
            100,
        );
        assert_eq!(outcome.decisions.len(), 1);
        assert_eq!(outcome.decisions[0].rendered, "bonjour");

        let p = doc.children(doc.body())[0];
        let bold = doc
            .descendants(p)
            .into_iter()
            .find(|&id| doc.tag_name(id) == Some("b"))
            .unwrap();
        assert_eq!(doc.parent(bold), Some(p));
        assert!(doc.inner_html(p).ends_with("</span>, see <b>more</b>"));
    }

    #[test]
    fn test_match_unsafe_to_splice_left_untouched() {
        let compiled = compiled(&[("good morning", &["bonjour"])]);
        let html = "<p><a href=\"/x\">so good</a> morning, see <b>more</b></p>";
        let (doc, outcome) = run(&compiled, &format!("<body>{}</body>", html), 100);
        assert!(outcome.decisions.is_empty());
        assert_eq!(doc.inner_html(doc.body()), html);
    }

    #[test]
    fn test_shorter_phrase_outside_excluded_element_substituted() {
        let compiled = compiled(&[("good morning", &["bonjour"]), ("morning", &["matin"])]);
        let (doc, outcome) = run(&compiled, "<body><p><code>good</code> morning</p></body>", 100);
        assert_eq!(outcome.decisions.len(), 1);
        assert_eq!(outcome.decisions[0].source_phrase, "morning");
        assert_eq!(replacement_texts(&doc), vec!["matin"]);
        let code = doc
            .descendants(doc.body())
            .into_iter()
            .find(|&id| doc.tag_name(id) == Some("code"))
            .unwrap();
        assert_eq!(doc.text_content(code), "good");
    }

    #[test]
    fn test_decisions_in_document_order() {
        let compiled = compiled(&[("one", &["un"]), ("two", &["deux"])]);
        let (_, outcome) = run(&compiled, "<body><p>one two one</p></body>", 100);
        let phrases: Vec<&str> = outcome
            .decisions
            .iter()
            .map(|d| d.source_phrase.as_str())
            .collect();
        assert_eq!(phrases, vec!["one", "two", "one"]);
        assert!(outcome.decisions[0].span.start < outcome.decisions[1].span.start);
    }

    #[test]
    fn test_specific_entry_resolved() {
        let compiled = compiled(&[("morning", &["matin"]), ("good morning", &["bonjour"])]);
        let (_, outcome) = run(&compiled, "<body><p>good morning</p></body>", 100);
        assert_eq!(outcome.decisions.len(), 1);
        assert_eq!(outcome.decisions[0].source_phrase, "good morning");
        assert_eq!(outcome.decisions[0].rendered, "bonjour");
    }

    #[test]
    fn test_no_write_without_decisions() {
        let compiled = compiled(&[("hello", &["bonjour"])]);
        let mut doc = Document::parse("<body><p>nothing here</p></body>");
        let p = doc.children(doc.body())[0];
        let region = Region {
            node: p,
            content: doc.matchable_inner_html(p, |_| false).unwrap(),
        };
        doc.observe();
        let styles = StyleTokens::default();
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = Substituter::new(&compiled, &styles, 100)
            .apply(&mut doc, &region, &mut rng)
            .unwrap();
        assert!(outcome.decisions.is_empty());
        assert!(!doc.has_pending_records());
    }
}
