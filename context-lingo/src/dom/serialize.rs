//! Serialization of document subtrees
//!
//! Two forms are produced. `inner_html`/`outer_html` give plain canonical
//! markup. [`Document::matchable_inner_html`] gives the same markup together
//! with the byte ranges of every tag and of every shielded subtree, which is
//! what the substituter matches against and splices into.
//!
//! The canonical form guarantees that a raw `<` only ever opens a tag and a
//! raw `>` only ever closes one: text is escaped, attribute values are
//! escaped, void elements never get a self-closing slash. Comments are the
//! one construct kept verbatim, so a comment holding `<` or `>` cannot be
//! matched safely and is reported as malformed content.

use std::ops::Range;

use crate::dom::{Document, ElementData, NodeId, NodeKind, is_void_element};
use crate::error::{SwapError, SwapResult};

/// Elements whose text children are written without escaping
const UNESCAPED_TEXT_ELEMENTS: [&str; 8] = [
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// Serialized inner content of an element, ready for pattern matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchableContent {
    pub html: String,
    /// Byte ranges of every tag, comment and doctype
    pub tags: Vec<Range<usize>>,
    /// Byte ranges of shielded subtrees (outer markup included)
    pub shielded: Vec<Range<usize>>,
}

impl MatchableContent {
    fn in_ranges(ranges: &[Range<usize>], offset: usize) -> bool {
        // Ranges are sorted by start and tags never overlap each other
        let index = ranges.partition_point(|r| r.start <= offset);
        index > 0 && ranges[index - 1].contains(&offset)
    }

    /// Whether the byte at `offset` sits inside a tag
    pub fn in_tag(&self, offset: usize) -> bool {
        Self::in_ranges(&self.tags, offset)
    }

    /// Whether `span` starts and ends in text and touches no shielded subtree
    pub fn admits(&self, span: &Range<usize>) -> bool {
        if span.start >= span.end || self.in_tag(span.start) || self.in_tag(span.end - 1) {
            return false;
        }
        !self
            .shielded
            .iter()
            .any(|r| r.start < span.end && span.start < r.end)
    }

    /// The range to splice for an admitted `span`
    ///
    /// A span may hold the end tag of an element opened before it, or the
    /// start tag of one closed after it (`good</b> morning`). Replacing it
    /// as is would leave the rest of the region inside that element. When
    /// the missing tags sit directly at the span's edges the range is widened
    /// over them; otherwise there is no safe range and `None` is returned.
    pub fn splice_range(&self, span: &Range<usize>) -> Option<Range<usize>> {
        if !self.admits(span) {
            return None;
        }

        let mut unmatched_ends: Vec<&str> = Vec::new();
        let mut open: Vec<&str> = Vec::new();
        for tag in self
            .tags
            .iter()
            .filter(|r| r.start >= span.start && r.end <= span.end)
        {
            match TagKind::of(&self.html[tag.clone()]) {
                TagKind::Start(name) => open.push(name),
                TagKind::End(name) => match open.last() {
                    Some(&last) if last == name => {
                        open.pop();
                    }
                    Some(_) => return None,
                    None => unmatched_ends.push(name),
                },
                TagKind::Other => {}
            }
        }

        // Innermost first on both sides
        let mut start = span.start;
        let before = self.tags.partition_point(|r| r.end <= span.start);
        let mut preceding = self.tags[..before].iter().rev();
        for name in unmatched_ends {
            let tag = preceding.next()?;
            if tag.end != start || TagKind::of(&self.html[tag.clone()]) != TagKind::Start(name) {
                return None;
            }
            start = tag.start;
        }

        let mut end = span.end;
        let after = self.tags.partition_point(|r| r.start < span.end);
        let mut following = self.tags[after..].iter();
        for name in open.into_iter().rev() {
            let tag = following.next()?;
            if tag.start != end || TagKind::of(&self.html[tag.clone()]) != TagKind::End(name) {
                return None;
            }
            end = tag.end;
        }

        Some(start..end)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TagKind<'h> {
    Start(&'h str),
    End(&'h str),
    /// Void elements, comments and doctypes
    Other,
}

impl<'h> TagKind<'h> {
    fn of(tag: &'h str) -> Self {
        fn name(rest: &str) -> &str {
            rest.split(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                .next()
                .unwrap_or("")
        }
        if let Some(rest) = tag.strip_prefix("</") {
            TagKind::End(name(rest))
        } else if tag.starts_with("<!") {
            TagKind::Other
        } else {
            let name = name(tag.get(1..).unwrap_or(""));
            if is_void_element(name) {
                TagKind::Other
            } else {
                TagKind::Start(name)
            }
        }
    }
}

pub(crate) fn escape_attribute(value: &str) -> String {
    // A raw '>' inside a tag would end tag-tolerant gaps early
    html_escape::encode_double_quoted_attribute(value)
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn write_start_tag(data: &ElementData, out: &mut String) {
    out.push('<');
    out.push_str(&data.name);
    for (name, value) in &data.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    out.push('>');
}

struct Serializer<'d, F> {
    doc: &'d Document,
    is_shielded: F,
    out: String,
    tags: Vec<Range<usize>>,
    shielded: Vec<Range<usize>>,
    strict: bool,
}

impl<F: Fn(NodeId) -> bool> Serializer<'_, F> {
    fn tag(&mut self, text: &str) {
        let start = self.out.len();
        self.out.push_str(text);
        self.tags.push(start..self.out.len());
    }

    fn children(&mut self, id: NodeId, raw_text: bool) -> SwapResult<()> {
        for &child in self.doc.children(id) {
            self.node(child, raw_text)?;
        }
        Ok(())
    }

    fn node(&mut self, id: NodeId, raw_text: bool) -> SwapResult<()> {
        match self.doc.kind(id) {
            NodeKind::Document => self.children(id, false)?,
            NodeKind::Doctype(text) => self.tag(&format!("<!{}>", text)),
            NodeKind::Comment(text) => {
                if self.strict && (text.contains('<') || text.contains('>')) {
                    return Err(SwapError::MalformedContent(format!(
                        "comment contains markup characters: {:?}",
                        text
                    )));
                }
                self.tag(&format!("<!--{}-->", text));
            }
            NodeKind::Text(text) => {
                if raw_text {
                    if self.strict && (text.contains('<') || text.contains('>')) {
                        return Err(SwapError::MalformedContent(
                            "raw text contains markup characters outside a shielded element"
                                .to_string(),
                        ));
                    }
                    self.out.push_str(text);
                } else {
                    self.out.push_str(&html_escape::encode_text(text));
                }
            }
            NodeKind::Element(data) => {
                let shield_start = self.out.len();
                let shielded = (self.is_shielded)(id);
                let raw = UNESCAPED_TEXT_ELEMENTS.contains(&data.name.as_str());

                let mut start_tag = String::new();
                write_start_tag(data, &mut start_tag);
                self.tag(&start_tag);

                if !is_void_element(&data.name) {
                    if shielded {
                        // Shielded content is never matched; serialize it leniently
                        let strict = std::mem::replace(&mut self.strict, false);
                        let result = self.children(id, raw);
                        self.strict = strict;
                        result?;
                    } else {
                        self.children(id, raw)?;
                    }
                    self.tag(&format!("</{}>", data.name));
                }

                if shielded {
                    self.shielded.push(shield_start..self.out.len());
                }
            }
        }
        Ok(())
    }
}

impl Document {
    fn serializer<F: Fn(NodeId) -> bool>(&self, is_shielded: F, strict: bool) -> Serializer<'_, F> {
        Serializer {
            doc: self,
            is_shielded,
            out: String::new(),
            tags: Vec::new(),
            shielded: Vec::new(),
            strict,
        }
    }

    fn is_raw_text_parent(&self, id: NodeId) -> bool {
        self.tag_name(id)
            .is_some_and(|name| UNESCAPED_TEXT_ELEMENTS.contains(&name))
    }

    /// Canonical markup of the node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut serializer = self.serializer(|_| false, false);
        let raw = self.is_raw_text_parent(id);
        // Lenient mode cannot fail
        let _ = serializer.children(id, raw);
        serializer.out
    }

    /// Canonical markup of the node itself
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut serializer = self.serializer(|_| false, false);
        let raw = self.parent(id).is_some_and(|p| self.is_raw_text_parent(p));
        let _ = serializer.node(id, raw);
        serializer.out
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeKind::Text(text) = self.kind(id) {
            return text.clone();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeKind::Text(text) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Canonical markup of the node's children, with tag and shield ranges
    ///
    /// `is_shielded` marks descendant elements whose subtrees must never be
    /// matched (injected markup, excluded element kinds). Their content is
    /// still serialized so the markup can be written back unchanged.
    ///
    /// # Errors
    ///
    /// `SwapError::MalformedContent` when an unshielded comment or raw-text
    /// child contains `<` or `>`.
    pub fn matchable_inner_html<F>(&self, id: NodeId, is_shielded: F) -> SwapResult<MatchableContent>
    where
        F: Fn(NodeId) -> bool,
    {
        if !self.is_element(id) {
            return Err(SwapError::InvalidNode(format!(
                "node {} is not an element",
                id.index()
            )));
        }
        let mut serializer = self.serializer(is_shielded, true);
        let raw = self.is_raw_text_parent(id);
        serializer.children(id, raw)?;
        Ok(MatchableContent {
            html: serializer.out,
            tags: serializer.tags,
            shielded: serializer.shielded,
        })
    }
}
