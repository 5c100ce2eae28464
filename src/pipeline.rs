//! Markdown to [`RenderedDocument`] using pulldown-cmark.
//!
//! The viewer draws markdown with egui_commonmark, which parses with the same
//! crate and options, so the headings and links reported here are the ones
//! that end up on screen. Source ranges are only used to cut the document into
//! layout sections; the engine itself never maps rendered headings back to
//! source lines.

use std::collections::HashMap;
use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, RefDefs, Tag, TagEnd};

use crate::render::{
    ElementId, RenderedDocument, RenderedHeading, RenderedLink, RenderedNode, Section, SectionKind,
};

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);
    options
}

/// Render `source` into headings, links and layout sections.
pub fn render(source: &str) -> RenderedDocument {
    let parser = Parser::new_ext(source, parser_options());
    let definitions = link_definitions(source, parser.reference_definitions());

    let mut builder = Builder::default();
    for (event, range) in parser.into_offset_iter() {
        builder.push(event, range);
    }
    let mut doc = builder.finish(source.len());
    doc.definitions = definitions;
    doc
}

/// Source text of every link reference definition, in document order.
fn link_definitions(source: &str, defs: &RefDefs<'_>) -> String {
    let mut spans: Vec<Range<usize>> = defs.iter().map(|(_, def)| def.span.clone()).collect();
    spans.sort_by_key(|span| span.start);

    let mut out = String::new();
    for span in spans {
        if let Some(text) = source.get(span) {
            out.push_str(text.trim());
            out.push('\n');
        }
    }
    out
}

fn tag_name(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::Emphasis => "em",
        Tag::Strong => "strong",
        Tag::Strikethrough => "del",
        Tag::Link { .. } => "a",
        _ => "span",
    }
}

struct HeadingBuilder {
    level: u8,
    section: usize,
    // Open inline elements; the first frame holds the heading's own children.
    frames: Vec<(&'static str, Vec<RenderedNode>)>,
    // Images render their alt text as an attribute, not as children.
    image_depth: usize,
}

impl HeadingBuilder {
    fn push_node(&mut self, node: RenderedNode) {
        if self.image_depth > 0 {
            return;
        }
        if let Some((_, children)) = self.frames.last_mut() {
            children.push(node);
        }
    }
}

#[derive(Default)]
struct Builder {
    doc: RenderedDocument,
    depth: usize,
    next_element: usize,
    open_body: Option<usize>,
    heading: Option<HeadingBuilder>,
    footnotes: HashMap<String, usize>,
}

impl Builder {
    fn element(&mut self) -> ElementId {
        let id = ElementId(self.next_element);
        self.next_element += 1;
        id
    }

    fn close_body(&mut self, end: usize) {
        if let Some(index) = self.open_body.take() {
            self.doc.sections[index].range.end = end;
        }
    }

    fn body_section(&mut self, start: usize) -> usize {
        match self.open_body {
            Some(index) => index,
            None => {
                let index = self.doc.sections.len();
                self.doc.sections.push(Section {
                    range: start..start,
                    kind: SectionKind::Body,
                });
                self.open_body = Some(index);
                index
            }
        }
    }

    fn current_section(&self) -> usize {
        match (&self.heading, self.open_body) {
            (Some(heading), _) => heading.section,
            (None, Some(body)) => body,
            (None, None) => self.doc.sections.len().saturating_sub(1),
        }
    }

    fn push(&mut self, event: Event<'_>, range: Range<usize>) {
        let top_level = self.depth == 0;

        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let section = if top_level {
                    self.close_body(range.start);
                    let index = self.doc.sections.len();
                    self.doc.sections.push(Section {
                        range: range.clone(),
                        kind: SectionKind::Heading(self.doc.headings.len()),
                    });
                    index
                } else {
                    self.current_section()
                };
                self.heading = Some(HeadingBuilder {
                    level: level as u8,
                    section,
                    frames: vec![("", Vec::new())],
                    image_depth: 0,
                });
                self.depth += 1;
            }
            Event::End(TagEnd::Heading(_)) => {
                self.depth = self.depth.saturating_sub(1);
                if let Some(heading) = self.heading.take() {
                    let children = heading
                        .frames
                        .into_iter()
                        .next()
                        .map(|(_, children)| children)
                        .unwrap_or_default();
                    let element = self.element();
                    self.doc.headings.push(RenderedHeading {
                        element,
                        level: heading.level,
                        content: RenderedNode::element(format!("h{}", heading.level), children),
                        section: heading.section,
                    });
                }
            }
            Event::Start(tag) => {
                if top_level {
                    self.body_section(range.start);
                }
                if let Tag::Link { dest_url, .. } = &tag {
                    let element = self.element();
                    let section = self.current_section();
                    self.doc.links.push(RenderedLink {
                        element,
                        href: dest_url.to_string(),
                        section,
                    });
                }
                if let Some(heading) = self.heading.as_mut() {
                    if matches!(tag, Tag::Image { .. }) || heading.image_depth > 0 {
                        heading.image_depth += 1;
                    } else {
                        heading.frames.push((tag_name(&tag), Vec::new()));
                    }
                }
                self.depth += 1;
            }
            Event::End(_) => {
                self.depth = self.depth.saturating_sub(1);
                if let Some(heading) = self.heading.as_mut() {
                    if heading.image_depth > 0 {
                        heading.image_depth -= 1;
                        if heading.image_depth == 0 {
                            heading.push_node(RenderedNode::Valued {
                                tag: "img".into(),
                                value: None,
                            });
                        }
                    } else if heading.frames.len() > 1 {
                        if let Some((tag, children)) = heading.frames.pop() {
                            heading.push_node(RenderedNode::element(tag, children));
                        }
                    }
                }
            }
            Event::FootnoteReference(label) => {
                let next = self.footnotes.len() + 1;
                let number = *self.footnotes.entry(label.to_string()).or_insert(next);
                if let Some(heading) = self.heading.as_mut() {
                    heading.push_node(RenderedNode::element(
                        "sup",
                        vec![RenderedNode::Number(number as f64)],
                    ));
                }
            }
            other => {
                if top_level {
                    self.body_section(range.start);
                }
                if let Some(heading) = self.heading.as_mut() {
                    if let Some(node) = inline_node(other) {
                        heading.push_node(node);
                    }
                }
            }
        }
    }

    fn finish(mut self, source_len: usize) -> RenderedDocument {
        self.close_body(source_len);
        self.doc
    }
}

fn inline_node(event: Event<'_>) -> Option<RenderedNode> {
    match event {
        Event::Text(text) => Some(RenderedNode::text(text.to_string())),
        Event::Code(code) => Some(RenderedNode::element(
            "code",
            vec![RenderedNode::text(code.to_string())],
        )),
        Event::InlineMath(tex) | Event::DisplayMath(tex) => Some(RenderedNode::Valued {
            tag: "math".into(),
            value: Some(tex.to_string()),
        }),
        Event::HardBreak => Some(RenderedNode::element("br", Vec::new())),
        Event::SoftBreak => Some(RenderedNode::text(" ")),
        _ => None,
    }
}
