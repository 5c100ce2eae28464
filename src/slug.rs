//! Heading text normalization and slug generation.
//!
//! Slugs are derived the same way for source headings, rendered headings and
//! anchor fragments, so every stage of the pipeline agrees on what `#getting-started`
//! refers to.

use std::sync::LazyLock;

use regex::Regex;

/// Identifier used when a heading's text produces an empty slug (e.g. `## ???`).
pub const DEFAULT_SLUG: &str = "heading";

// Anything that is not an ASCII word character, whitespace or a hyphen.
static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").unwrap());
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_-]+").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Convert heading text into a URL-safe slug.
///
/// Lowercases, trims, drops everything except word characters, whitespace and
/// hyphens, then turns each run of whitespace, underscores and hyphens into a
/// single hyphen. Leading and trailing hyphens are removed.
///
/// The result may be empty; use [`slug_or_default`] when an identifier is required.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = STRIP_RE.replace_all(lowered.trim(), "");
    let hyphenated = SEPARATOR_RE.replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}

/// Like [`slugify`], but never returns an empty string.
pub fn slug_or_default(text: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}

/// Trim and collapse internal whitespace runs to a single space.
///
/// Applied to both source and rendered heading text before they are used as
/// map keys, so incidental formatting differences do not break matching.
pub fn normalize_text(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Getting   Started "), "getting-started");
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("API: Authentication (v2)"), "api-authentication-v2");
        assert_eq!(slugify("What's new?"), "whats-new");
        assert_eq!(slugify("The `parse` function"), "the-parse-function");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("a---b"), "a-b");
        assert_eq!(slugify("snake_case_name"), "snake-case-name");
        assert_eq!(slugify("mixed _ - separators"), "mixed-separators");
        assert_eq!(slugify("--edge--"), "edge");
    }

    #[test]
    fn slugify_drops_non_ascii_letters() {
        assert_eq!(slugify("Über Cool"), "ber-cool");
        assert_eq!(slugify("日本語"), "");
        assert_eq!(slugify("Rocket 🚀 launch"), "rocket-launch");
    }

    #[test]
    fn slugify_may_be_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("!@#$%"), "");
    }

    #[test]
    fn slug_or_default_never_empty() {
        assert_eq!(slug_or_default("???"), DEFAULT_SLUG);
        assert_eq!(slug_or_default(""), DEFAULT_SLUG);
        assert_eq!(slug_or_default("Intro"), "intro");
    }

    #[test]
    fn slugify_is_idempotent() {
        let samples = [
            "Hello World",
            "  __init__ method ",
            "C++ & Rust: a comparison",
            "Überblick — Teil 2",
            "-- already-a-slug --",
            "Tabs\tand\nnewlines",
            "1.2.3 Release notes",
            "",
        ];
        for sample in samples {
            let once = slugify(sample);
            assert_eq!(slugify(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("  Hello   \t world \n"), "Hello world");
        assert_eq!(normalize_text("single"), "single");
        assert_eq!(normalize_text("   "), "");
    }
}
