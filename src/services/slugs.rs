//! Slug generation and validation
//!
//! Slugs are lowercase ASCII words joined by single hyphens, at most 100
//! characters. When a generated slug collides, callers append `-2`, `-3`,
//! and so on until a free one is found.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum slug length in characters
pub const SLUG_MAX_LEN: usize = 100;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug regex is valid")
});

/// Check whether a string is a well-formed slug
pub fn is_valid_slug(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.len() <= SLUG_MAX_LEN && SLUG_RE.is_match(candidate)
}

/// Generate a slug from free text, transliterating and hyphenating
pub fn generate_slug(text: &str) -> String {
    let mut slug = slug::slugify(text);
    if slug.is_empty() {
        slug = "untitled".to_string();
    }
    truncate_slug(&slug)
}

/// Append a numeric suffix for collision resolution, keeping the result
/// within the length limit
pub fn with_suffix(base: &str, n: u32) -> String {
    let suffix = format!("-{}", n);
    let budget = SLUG_MAX_LEN - suffix.len();
    let mut head = truncate_slug(base);
    if head.len() > budget {
        head.truncate(budget);
        head = head.trim_end_matches('-').to_string();
    }
    format!("{}{}", head, suffix)
}

fn truncate_slug(slug: &str) -> String {
    if slug.len() <= SLUG_MAX_LEN {
        return slug.to_string();
    }
    let mut truncated = slug[..SLUG_MAX_LEN].to_string();
    while truncated.ends_with('-') {
        truncated.pop();
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_from_title() {
        assert_eq!(generate_slug("A Weekend in Lisbon!"), "a-weekend-in-lisbon");
        assert_eq!(generate_slug("Café & Bars"), "cafe-bars");
        assert_eq!(generate_slug("   "), "untitled");
    }

    #[test]
    fn test_validation() {
        assert!(is_valid_slug("a-weekend-in-lisbon"));
        assert!(is_valid_slug("post2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("double--hyphen"));
        assert!(!is_valid_slug("Upper-Case"));
        assert!(!is_valid_slug(&"a".repeat(SLUG_MAX_LEN + 1)));
        assert!(is_valid_slug(&"a".repeat(SLUG_MAX_LEN)));
    }

    #[test]
    fn test_suffixing() {
        assert_eq!(with_suffix("lisbon", 2), "lisbon-2");
        let long = "a".repeat(SLUG_MAX_LEN);
        let suffixed = with_suffix(&long, 12);
        assert!(suffixed.len() <= SLUG_MAX_LEN);
        assert!(suffixed.ends_with("-12"));
    }

    #[test]
    fn test_generated_slugs_never_exceed_limit() {
        let long_title = "word ".repeat(60);
        assert!(generate_slug(&long_title).len() <= SLUG_MAX_LEN);
    }

    proptest! {
        #[test]
        fn prop_generated_slugs_are_valid(text in ".{1,300}") {
            let slug = generate_slug(&text);
            prop_assert!(is_valid_slug(&slug), "invalid slug {:?} from {:?}", slug, text);
        }

        #[test]
        fn prop_suffixed_slugs_are_valid(base in "[a-z0-9]{1,150}", n in 2u32..1000) {
            let slug = with_suffix(&base, n);
            prop_assert!(is_valid_slug(&slug));
        }
    }
}
