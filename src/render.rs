//! Rendered element tree, as produced by the rendering pipeline.
//!
//! The engine only needs headings (with their nested inline content) and
//! in-document links; everything else the renderer draws is opaque.

use std::borrow::Cow;
use std::ops::Range;

/// Handle for an element laid out by the host. Positions are looked up through
/// [`crate::container::ScrollContainer::element_top`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// The closed set of node shapes a rendered heading can contain.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedNode {
    Text(String),
    /// Numeric content, e.g. a footnote reference number.
    Number(f64),
    /// Element with child nodes (emphasis, links, inline code, ...).
    Element {
        tag: String,
        children: Vec<RenderedNode>,
    },
    /// Element whose content is a single attribute-like value instead of
    /// children (inline math, images). `None` contributes no text.
    Valued { tag: String, value: Option<String> },
}

impl RenderedNode {
    pub fn text(text: impl Into<String>) -> Self {
        RenderedNode::Text(text.into())
    }

    pub fn element(tag: impl Into<String>, children: Vec<RenderedNode>) -> Self {
        RenderedNode::Element {
            tag: tag.into(),
            children,
        }
    }

    pub fn accept<V: NodeVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            RenderedNode::Text(text) => visitor.visit_text(text),
            RenderedNode::Number(value) => visitor.visit_number(*value),
            RenderedNode::Element { tag, children } => visitor.visit_element(tag, children),
            RenderedNode::Valued { tag, value } => visitor.visit_valued(tag, value.as_deref()),
        }
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut collector = TextCollector::default();
        self.accept(&mut collector);
        collector.text
    }
}

/// Visitor over [`RenderedNode`]. Element children are walked by default.
pub trait NodeVisitor {
    fn visit_text(&mut self, text: &str);

    fn visit_number(&mut self, value: f64);

    fn visit_element(&mut self, _tag: &str, children: &[RenderedNode]) {
        for child in children {
            child.accept(self);
        }
    }

    fn visit_valued(&mut self, tag: &str, value: Option<&str>);
}

#[derive(Default)]
struct TextCollector {
    text: String,
}

impl NodeVisitor for TextCollector {
    fn visit_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn visit_number(&mut self, value: f64) {
        self.text.push_str(&value.to_string());
    }

    fn visit_valued(&mut self, _tag: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.text.push_str(value);
        }
    }
}

/// A heading element as rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedHeading {
    pub element: ElementId,
    pub level: u8,
    /// The `h1`..`h6` element with its inline content.
    pub content: RenderedNode,
    /// Layout section this heading is drawn in.
    pub section: usize,
}

impl RenderedHeading {
    pub fn text(&self) -> String {
        self.content.text_content()
    }
}

/// A link as rendered; `href` is the destination exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLink {
    pub element: ElementId,
    pub href: String,
    pub section: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// A top-level heading block; the value indexes [`RenderedDocument::headings`].
    Heading(usize),
    Body,
}

/// A slice of the source drawn as one unit by the host, so that every element
/// inside it shares the section's measured position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub range: Range<usize>,
    pub kind: SectionKind,
}

/// Output of one render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    pub headings: Vec<RenderedHeading>,
    pub links: Vec<RenderedLink>,
    pub sections: Vec<Section>,
    /// Every link reference definition of the document, one per line.
    pub definitions: String,
}

impl RenderedDocument {
    pub fn heading(&self, element: ElementId) -> Option<&RenderedHeading> {
        self.headings.iter().find(|h| h.element == element)
    }

    /// Elements drawn inside `section`, headings first.
    pub fn elements_in(&self, section: usize) -> impl Iterator<Item = ElementId> + '_ {
        let headings = self
            .headings
            .iter()
            .filter(move |h| h.section == section)
            .map(|h| h.element);
        let links = self
            .links
            .iter()
            .filter(move |l| l.section == section)
            .map(|l| l.element);
        headings.chain(links)
    }

    pub fn links_in(&self, section: usize) -> impl Iterator<Item = &RenderedLink> + '_ {
        self.links.iter().filter(move |l| l.section == section)
    }

    /// Markdown to draw for `section` on its own. Reference definitions from
    /// the whole document are appended so `[text][label]` links still resolve.
    pub fn section_source<'a>(&self, source: &'a str, section: usize) -> Option<Cow<'a, str>> {
        let text = source.get(self.sections.get(section)?.range.clone())?;
        if self.definitions.is_empty() {
            return Some(Cow::Borrowed(text));
        }
        Some(Cow::Owned(format!("{}\n\n{}", text.trim_end(), self.definitions)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_returned_as_is() {
        assert_eq!(RenderedNode::text("Overview").text_content(), "Overview");
    }

    #[test]
    fn nested_elements_are_concatenated() {
        let node = RenderedNode::element(
            "h2",
            vec![
                RenderedNode::text("The "),
                RenderedNode::element("code", vec![RenderedNode::text("parse")]),
                RenderedNode::text(" function "),
                RenderedNode::element(
                    "em",
                    vec![RenderedNode::element("strong", vec![RenderedNode::text("now")])],
                ),
            ],
        );
        assert_eq!(node.text_content(), "The parse function now");
    }

    #[test]
    fn numbers_are_stringified() {
        let node = RenderedNode::element(
            "h2",
            vec![
                RenderedNode::text("Notes"),
                RenderedNode::element("sup", vec![RenderedNode::Number(2.0)]),
            ],
        );
        assert_eq!(node.text_content(), "Notes2");
        assert_eq!(RenderedNode::Number(1.5).text_content(), "1.5");
    }

    #[test]
    fn valued_nodes_contribute_their_value_only() {
        let node = RenderedNode::element(
            "h3",
            vec![
                RenderedNode::text("Energy "),
                RenderedNode::Valued {
                    tag: "math".into(),
                    value: Some("E=mc^2".into()),
                },
                RenderedNode::Valued {
                    tag: "img".into(),
                    value: None,
                },
            ],
        );
        assert_eq!(node.text_content(), "Energy E=mc^2");
    }

    #[test]
    fn empty_elements_contribute_nothing() {
        let node = RenderedNode::element("h1", vec![RenderedNode::element("br", vec![])]);
        assert_eq!(node.text_content(), "");
    }

    #[test]
    fn section_source_appends_definitions() {
        let doc = RenderedDocument {
            sections: vec![Section {
                range: 0..9,
                kind: SectionKind::Body,
            }],
            definitions: "[u]: #usage\n".into(),
            ..Default::default()
        };
        let source = "See [u].\n\n[u]: #usage\n";
        assert_eq!(
            doc.section_source(source, 0).as_deref(),
            Some("See [u].\n\n[u]: #usage\n")
        );
        assert_eq!(doc.section_source(source, 3), None);

        let plain = RenderedDocument {
            definitions: String::new(),
            ..doc
        };
        assert!(matches!(plain.section_source(source, 0), Some(Cow::Borrowed("See [u].\n"))));
    }

    #[test]
    fn custom_visitors_see_every_shape() {
        #[derive(Default)]
        struct Counter {
            texts: usize,
            numbers: usize,
            valued: usize,
        }
        impl NodeVisitor for Counter {
            fn visit_text(&mut self, _text: &str) {
                self.texts += 1;
            }
            fn visit_number(&mut self, _value: f64) {
                self.numbers += 1;
            }
            fn visit_valued(&mut self, _tag: &str, _value: Option<&str>) {
                self.valued += 1;
            }
        }

        let node = RenderedNode::element(
            "h1",
            vec![
                RenderedNode::text("a"),
                RenderedNode::element("em", vec![RenderedNode::text("b")]),
                RenderedNode::Number(1.0),
                RenderedNode::Valued {
                    tag: "math".into(),
                    value: None,
                },
            ],
        );
        let mut counter = Counter::default();
        node.accept(&mut counter);
        assert_eq!((counter.texts, counter.numbers, counter.valued), (2, 1, 1));
    }
}
