//! Identifier allocation for extracted headings.

use std::collections::{HashMap, HashSet};

use crate::extract::ExtractedHeading;
use crate::slug::slug_or_default;

/// One heading of the document with its allocated id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// Lookup key: heading level plus either normalized text or slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeadingKey {
    pub level: u8,
    pub text: String,
}

impl HeadingKey {
    pub fn new(level: u8, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Ids allocated for one version of the document, keyed for render-time lookup.
///
/// Every heading is recorded under `(level, text)` and `(level, slug)`. A key
/// shared by several headings keeps all of their ids in document order, and
/// keys themselves keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct HeadingIdentifierMap {
    headings: Vec<Heading>,
    entries: Vec<(HeadingKey, Vec<String>)>,
    index: HashMap<HeadingKey, usize>,
}

impl HeadingIdentifierMap {
    /// Ordered heading list, as shown in the table of contents.
    pub fn headings(&self) -> &[Heading] {
        &self.headings
    }

    /// All ids recorded under `key`, in document order.
    pub fn ids(&self, key: &HeadingKey) -> Option<&[String]> {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1.as_slice())
    }

    /// Key/ids pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&HeadingKey, &[String])> {
        self.entries.iter().map(|(key, ids)| (key, ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }

    fn record(&mut self, key: HeadingKey, id: &str) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1.push(id.to_string()),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![id.to_string()]));
            }
        }
    }
}

/// Allocate a unique id for every heading, in document order.
///
/// The first heading with a given slug gets the bare slug; later ones get
/// `slug-1`, `slug-2`, ... skipping any value already issued.
pub fn allocate<I>(headings: I) -> HeadingIdentifierMap
where
    I: IntoIterator<Item = ExtractedHeading>,
{
    let mut map = HeadingIdentifierMap::default();
    let mut issued: HashSet<String> = HashSet::new();

    for heading in headings {
        let base = slug_or_default(&heading.text);

        let mut id = base.clone();
        let mut count = 0;
        while issued.contains(&id) {
            count += 1;
            id = format!("{base}-{count}");
        }
        issued.insert(id.clone());

        map.record(HeadingKey::new(heading.level, heading.text.clone()), &id);
        if base != heading.text {
            map.record(HeadingKey::new(heading.level, base), &id);
        }

        map.headings.push(Heading {
            level: heading.level,
            text: heading.text,
            id,
        });
    }

    log::debug!("allocated {} heading ids", map.headings.len());
    map
}
