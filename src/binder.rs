//! Attaches allocated ids to rendered heading elements.
//!
//! Rendered text rarely matches the source line exactly (inline markup is
//! gone, closing hashes are dropped, setext headings never show up in the
//! source scan), so lookup degrades through several keys before inventing an
//! id from the rendered text itself.

use std::collections::{HashMap, HashSet};

use crate::allocate::{HeadingIdentifierMap, HeadingKey};
use crate::render::{ElementId, RenderedHeading};
use crate::slug::{normalize_text, slug_or_default, slugify};

/// A rendered heading together with the id it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundHeading {
    pub element: ElementId,
    pub level: u8,
    pub id: String,
    /// Normalized rendered text.
    pub text: String,
    /// Slug of the rendered text (may be empty).
    pub slug: String,
}

/// Rendered headings of one view, addressable by id, lowercase id or slug.
#[derive(Debug, Clone, Default)]
pub struct BoundHeadings {
    headings: Vec<BoundHeading>,
    aliases: HashMap<String, usize>,
}

impl BoundHeadings {
    /// Headings in document order.
    pub fn iter(&self) -> impl Iterator<Item = &BoundHeading> {
        self.headings.iter()
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }

    /// Exact id match, as an element lookup by id would do.
    pub fn by_id(&self, id: &str) -> Option<&BoundHeading> {
        self.headings.iter().find(|h| h.id == id)
    }

    /// Lookup through every alias: exact id, lowercase id, then slug.
    pub fn lookup(&self, key: &str) -> Option<&BoundHeading> {
        self.aliases
            .get(key)
            .or_else(|| self.aliases.get(&key.to_lowercase()))
            .map(|&index| &self.headings[index])
    }

    pub fn by_element(&self, element: ElementId) -> Option<&BoundHeading> {
        self.headings.iter().find(|h| h.element == element)
    }

    pub fn clear(&mut self) {
        self.headings.clear();
        self.aliases.clear();
    }

    fn register_aliases(&mut self) {
        self.aliases.clear();
        // Exact ids outrank lowercase aliases, which outrank slugs. Within
        // each class the first heading in document order keeps the alias.
        for (index, heading) in self.headings.iter().enumerate() {
            self.aliases.entry(heading.id.clone()).or_insert(index);
        }
        for (index, heading) in self.headings.iter().enumerate() {
            self.aliases.entry(heading.id.to_lowercase()).or_insert(index);
        }
        for (index, heading) in self.headings.iter().enumerate() {
            if !heading.slug.is_empty() {
                self.aliases.entry(heading.slug.clone()).or_insert(index);
            }
        }
    }
}

/// Ids already given to a rendered heading. A key hands out its ids in
/// document order, skipping any already bound through another key.
#[derive(Default)]
struct IssuedIds {
    taken: HashSet<String>,
}

impl IssuedIds {
    fn take(&mut self, ids: &[String]) -> Option<String> {
        let id = ids.iter().find(|id| !self.taken.contains(*id))?.clone();
        self.taken.insert(id.clone());
        Some(id)
    }
}

/// Bind every rendered heading to an id from `map`.
pub fn bind(map: &HeadingIdentifierMap, rendered: &[RenderedHeading]) -> BoundHeadings {
    let mut issued = IssuedIds::default();
    let mut bound = BoundHeadings::default();

    for heading in rendered {
        let text = normalize_text(&heading.text());
        let slug = slugify(&text);
        let id = resolve_id(map, &mut issued, heading.level, &text, &slug);

        bound.headings.push(BoundHeading {
            element: heading.element,
            level: heading.level,
            id,
            text,
            slug,
        });
    }

    bound.register_aliases();
    log::debug!("bound {} rendered headings", bound.headings.len());
    bound
}

fn resolve_id(
    map: &HeadingIdentifierMap,
    issued: &mut IssuedIds,
    level: u8,
    text: &str,
    slug: &str,
) -> String {
    let exact = map.ids(&HeadingKey::new(level, text));
    let by_slug = map.ids(&HeadingKey::new(level, slug));
    // Any entry, at any level, whose text slugs the same way.
    let mut scanned = map
        .entries()
        .filter(|(key, _)| slugify(&key.text) == slug)
        .map(|(_, ids)| ids);

    if let Some(id) = exact.and_then(|ids| issued.take(ids)) {
        return id;
    }
    if let Some(id) = by_slug.and_then(|ids| issued.take(ids)) {
        return id;
    }
    let first_scanned = scanned.next();
    if let Some(id) = first_scanned
        .into_iter()
        .chain(scanned)
        .find_map(|ids| issued.take(ids))
    {
        log::debug!("heading {text:?} bound by slug scan to {id}");
        return id;
    }

    // More rendered headings than allocated ones: share the last id.
    if let Some(id) = exact
        .or(by_slug)
        .or(first_scanned)
        .and_then(|ids| ids.last())
    {
        log::debug!("heading {text:?} reuses {id}, every allocated id is bound");
        return id.clone();
    }

    let id = slug_or_default(text);
    log::debug!("heading {text:?} was not allocated, using {id}");
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocate::allocate;
    use crate::extract::extract_headings;
    use crate::render::RenderedNode;

    fn rendered(headings: &[(u8, RenderedNode)]) -> Vec<RenderedHeading> {
        headings
            .iter()
            .enumerate()
            .map(|(i, (level, node))| RenderedHeading {
                element: ElementId(i),
                level: *level,
                content: RenderedNode::element(format!("h{level}"), vec![node.clone()]),
                section: i,
            })
            .collect()
    }

    fn text(s: &str) -> RenderedNode {
        RenderedNode::text(s)
    }

    fn ids(bound: &BoundHeadings) -> Vec<&str> {
        bound.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn exact_text_match() {
        let map = allocate(extract_headings("# Title\n## Usage\n"));
        let bound = bind(&map, &rendered(&[(1, text("Title")), (2, text("Usage"))]));
        assert_eq!(ids(&bound), vec!["title", "usage"]);
    }

    #[test]
    fn duplicates_take_ids_in_document_order() {
        let map = allocate(extract_headings("## Intro\n## Intro\n## Intro\n"));
        let bound = bind(
            &map,
            &rendered(&[(2, text("Intro")), (2, text("Intro")), (2, text("Intro"))]),
        );
        assert_eq!(ids(&bound), vec!["intro", "intro-1", "intro-2"]);
    }

    #[test]
    fn extra_rendered_duplicates_reuse_the_last_id() {
        let map = allocate(extract_headings("## Intro\n"));
        let bound = bind(&map, &rendered(&[(2, text("Intro")), (2, text("Intro"))]));
        assert_eq!(ids(&bound), vec!["intro", "intro"]);
    }

    #[test]
    fn duplicate_with_different_markup_gets_the_next_id() {
        let map = allocate(extract_headings("## Intro\n\n## **Intro**\n"));
        let bound = bind(&map, &rendered(&[(2, text("Intro")), (2, text("Intro"))]));
        assert_eq!(ids(&bound), vec!["intro", "intro-1"]);
        assert_eq!(bound.by_id("intro-1").map(|h| h.element), Some(ElementId(1)));
    }

    #[test]
    fn formatted_source_matches_through_slug_key() {
        // Source keeps the markup, rendered text does not.
        let map = allocate(extract_headings("## The `parse` function\n"));
        let node = RenderedNode::element(
            "span",
            vec![
                text("The "),
                RenderedNode::element("code", vec![text("parse")]),
                text(" function"),
            ],
        );
        let bound = bind(&map, &rendered(&[(2, node)]));
        assert_eq!(ids(&bound), vec!["the-parse-function"]);
    }

    #[test]
    fn closing_hashes_match_through_slug_key() {
        let map = allocate(extract_headings("## Title ##\n"));
        let bound = bind(&map, &rendered(&[(2, text("Title"))]));
        assert_eq!(ids(&bound), vec!["title"]);
    }

    #[test]
    fn level_mismatch_falls_back_to_slug_scan() {
        let map = allocate(extract_headings("### Deep Dive\n"));
        let bound = bind(&map, &rendered(&[(2, text("Deep Dive"))]));
        assert_eq!(ids(&bound), vec!["deep-dive"]);
    }

    #[test]
    fn unknown_heading_uses_its_own_slug() {
        // Setext headings never appear in the source scan.
        let map = allocate(extract_headings("Setext Title\n============\n"));
        let bound = bind(&map, &rendered(&[(1, text("Setext Title"))]));
        assert_eq!(ids(&bound), vec!["setext-title"]);
    }

    #[test]
    fn symbol_only_rendered_heading_gets_default_id() {
        let map = allocate(extract_headings(""));
        let bound = bind(&map, &rendered(&[(2, text("!!!"))]));
        assert_eq!(ids(&bound), vec!["heading"]);
    }

    #[test]
    fn whitespace_differences_are_ignored() {
        let map = allocate(extract_headings("##   Spaced    Out\n"));
        let bound = bind(&map, &rendered(&[(2, text("Spaced\nOut "))]));
        assert_eq!(ids(&bound), vec!["spaced-out"]);
        assert_eq!(bound.iter().next().unwrap().text, "Spaced Out");
    }

    #[test]
    fn lookup_accepts_id_lowercase_and_slug() {
        let map = allocate(extract_headings("## Overview\n## Overview\n"));
        let bound = bind(&map, &rendered(&[(2, text("Overview")), (2, text("Overview"))]));

        assert_eq!(bound.lookup("overview-1").map(|h| h.element), Some(ElementId(1)));
        assert_eq!(bound.lookup("OVERVIEW-1").map(|h| h.element), Some(ElementId(1)));
        assert_eq!(bound.lookup("overview").map(|h| h.element), Some(ElementId(0)));
        assert!(bound.lookup("missing").is_none());
    }

    #[test]
    fn exact_ids_outrank_slug_aliases() {
        // "Intro 1" slugs to `intro-1`, an id the second heading already owns.
        let map = allocate(extract_headings("## Intro\n## Intro\n## Intro 1\n"));
        let bound = bind(
            &map,
            &rendered(&[(2, text("Intro")), (2, text("Intro")), (2, text("Intro 1"))]),
        );
        assert_eq!(ids(&bound), vec!["intro", "intro-1", "intro-1-1"]);
        assert_eq!(bound.lookup("intro-1").map(|h| h.element), Some(ElementId(1)));
        assert_eq!(bound.by_id("intro-1-1").map(|h| h.element), Some(ElementId(2)));
    }

    #[test]
    fn by_element_finds_bound_heading() {
        let map = allocate(extract_headings("# A\n"));
        let bound = bind(&map, &rendered(&[(1, text("A"))]));
        assert_eq!(bound.by_element(ElementId(0)).map(|h| h.id.as_str()), Some("a"));
        assert!(bound.by_element(ElementId(9)).is_none());
    }
}
