//! Heading identity and in-document anchor navigation for rendered markdown.
//!
//! Headings are scanned from the raw source, given unique ids, bound to the
//! rendered heading elements and then used to resolve `#fragment` clicks and
//! to track which heading the reader is in.

pub mod allocate;
pub mod binder;
pub mod config;
pub mod container;
pub mod document;
pub mod extract;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod schedule;
pub mod slug;
pub mod toc;
pub mod tracker;
pub mod view;

pub use allocate::{allocate, Heading, HeadingIdentifierMap};
pub use binder::{bind, BoundHeading, BoundHeadings};
pub use config::NavigationConfig;
pub use container::{ScrollBehavior, ScrollContainer, ScrollRequest, ScrollState, ScrollTarget};
pub use extract::{extract_headings, ExtractedHeading};
pub use resolver::AnchorResolver;
pub use slug::slugify;
pub use toc::{TableOfContents, TocEntry};
pub use tracker::ActiveHeadingTracker;
pub use view::DocumentView;
