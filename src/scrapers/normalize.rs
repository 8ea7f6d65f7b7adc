//! Field normalization for raw scraped text.
//!
//! Pure functions, no I/O. Everything the extractors read off a page comes
//! through here before it reaches the reconciler.

use regex::Regex;
use std::sync::OnceLock;

/// Currency code used when a price carries no recognizable symbol.
pub const DEFAULT_CURRENCY: &str = "GBP";

/// Topical keywords that mark a link label as a plausible book category.
const CATEGORY_KEYWORDS: &[&str] = &[
    "fiction",
    "non-fiction",
    "nonfiction",
    "children",
    "kids",
    "young adult",
    "fantasy",
    "science",
    "sci-fi",
    "romance",
    "mystery",
    "thriller",
    "crime",
    "horror",
    "biography",
    "autobiography",
    "history",
    "poetry",
    "drama",
    "classics",
    "academic",
    "education",
    "reference",
    "self-help",
    "health",
    "cooking",
    "food",
    "travel",
    "art",
    "music",
    "religion",
    "philosophy",
    "psychology",
    "business",
    "technology",
    "nature",
    "sport",
    "comics",
    "graphic novel",
    "humour",
    "humor",
    "true crime",
    "books",
];

/// Chrome/navigation boilerplate that disqualifies a link label outright.
const CATEGORY_DENYLIST: &[&str] = &[
    "login",
    "log in",
    "sign in",
    "sign up",
    "register",
    "account",
    "basket",
    "cart",
    "checkout",
    "wishlist",
    "help",
    "contact",
    "about us",
    "delivery",
    "returns",
    "privacy",
    "terms",
    "cookie",
    "faq",
    "blog",
    "careers",
    "gift card",
    "track order",
    "newsletter",
    "search",
    "home",
];

/// Fixed vocabulary for synthetic condition fill.
const CONDITIONS: &[&str] = &["Very Good", "Good", "Like New", "Acceptable"];

/// Fixed vocabulary for synthetic format fill.
const FORMATS: &[&str] = &["Paperback", "Hardback", "Mass Market Paperback"];

fn currency_symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[£$€¥₹]|GBP|USD|EUR|from|From").unwrap())
}

/// Parse a price string into a positive decimal, rounded to 2 places.
///
/// Handles currency glyphs and both thousands-separator conventions:
/// a trailing `,`/`.` group of at most 2 digits is the decimal separator,
/// and anything containing both `.` and `,` treats `,` as thousands.
/// Returns `None` for non-numeric or non-positive input.
pub fn parse_price(raw: &str) -> Option<f64> {
    let stripped = currency_symbol_re().replace_all(raw, "");
    let cleaned: String = stripped
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let has_dot = cleaned.contains('.');
    let has_comma = cleaned.contains(',');

    let normalized = if has_dot && has_comma {
        // Both present: comma is a thousands separator.
        cleaned.replace(',', "")
    } else if has_comma {
        // Only commas: a trailing group of <=2 digits is the decimal part.
        let (head, tail) = cleaned.rsplit_once(',').unwrap_or((cleaned.as_str(), ""));
        if tail.len() <= 2 && !tail.is_empty() {
            format!("{}.{}", head.replace(',', ""), tail)
        } else {
            cleaned.replace(',', "")
        }
    } else if has_dot {
        // Only periods: same trailing-group rule ("1.234" is 1234).
        let (head, tail) = cleaned.rsplit_once('.').unwrap_or((cleaned.as_str(), ""));
        if tail.len() <= 2 && !tail.is_empty() {
            format!("{}.{}", head.replace('.', ""), tail)
        } else {
            cleaned.replace('.', "")
        }
    } else {
        cleaned
    };

    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some((value * 100.0).round() / 100.0)
}

/// Derive a URL-safe slug from a display name.
///
/// Lowercase, strip everything outside `[a-z0-9\s-]`, collapse whitespace
/// runs to single hyphens, collapse repeated hyphens, trim edge hyphens.
/// Idempotent: `slugify(slugify(s)) == slugify(s)`.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_hyphen = true; // suppress leading hyphen
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
            last_hyphen = false;
        } else if c.is_whitespace() || c == '-' {
            if !last_hyphen {
                out.push('-');
                last_hyphen = true;
            }
        }
        // Everything else is dropped.
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Clean an author string: strip a leading "by ", keep only characters that
/// belong in a name, collapse whitespace. Returns `None` when nothing
/// survives cleaning.
pub fn clean_author(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    // Char-boundary check guards against multi-byte leading characters.
    let without_by = if trimmed.len() >= 3
        && trimmed.is_char_boundary(3)
        && trimmed[..3].eq_ignore_ascii_case("by ")
    {
        &trimmed[3..]
    } else {
        trimmed
    };

    let kept: String = without_by
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace() || matches!(c, '.' | '\'' | '-' | ','))
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Decide whether a link label plausibly names a book category.
///
/// Accepted only when it matches the topical allow-list, misses the
/// boilerplate deny-list, and has a sane display-label length.
pub fn is_category_label(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 3 || trimmed.len() > 60 {
        return false;
    }
    let lowered = trimmed.to_lowercase();
    if CATEGORY_DENYLIST.iter().any(|d| lowered.contains(d)) {
        return false;
    }
    CATEGORY_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Parse a star rating out of free text ("4.5 out of 5", "Rating: 3").
/// Clamps to the 0-5 range.
pub fn parse_rating(raw: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());
    let value: f64 = re.captures(raw)?.get(1)?.as_str().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 5.0))
}

/// Parse a review count from text like "(1,204 reviews)".
pub fn parse_review_count(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Generated, non-authoritative category description.
pub fn category_description(name: &str) -> String {
    format!(
        "Explore our {} collection of quality used and new books.",
        name.trim()
    )
}

/// Deterministic synthetic fill for fields the page did not yield.
///
/// Opt-in only (see `ScrapeConfig::synthetic_fill`). Values are derived
/// from a hash of the product title so repeated scrapes of the same product
/// agree with each other.
pub struct SyntheticFill {
    seed: [u8; 32],
}

impl SyntheticFill {
    pub fn for_title(title: &str) -> Self {
        Self {
            seed: *blake3::hash(title.as_bytes()).as_bytes(),
        }
    }

    fn byte(&self, i: usize) -> u64 {
        self.seed[i % self.seed.len()] as u64
    }

    pub fn condition(&self) -> String {
        CONDITIONS[(self.byte(0) as usize) % CONDITIONS.len()].to_string()
    }

    pub fn format(&self) -> String {
        FORMATS[(self.byte(1) as usize) % FORMATS.len()].to_string()
    }

    /// Rating in the 3.0-5.0 band, one decimal place.
    pub fn rating(&self) -> f64 {
        3.0 + (self.byte(2) % 21) as f64 / 10.0
    }

    /// Review count in the 5-154 band.
    pub fn review_count(&self) -> u32 {
        (5 + (self.byte(3) * 256 + self.byte(4)) % 150) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_symbol() {
        assert_eq!(parse_price("£12.50"), Some(12.50));
        assert_eq!(parse_price("$8"), Some(8.0));
        assert_eq!(parse_price("From £3.99"), Some(3.99));
    }

    #[test]
    fn test_parse_price_thousands() {
        assert_eq!(parse_price("1,234.56"), Some(1234.56));
        assert_eq!(parse_price("1.234"), Some(1234.0));
        assert_eq!(parse_price("1,234"), Some(1234.0));
    }

    #[test]
    fn test_parse_price_decimal_comma() {
        assert_eq!(parse_price("12,50"), Some(12.50));
        assert_eq!(parse_price("€9,9"), Some(9.9));
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert_eq!(parse_price("not a price"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("free"), None);
    }

    #[test]
    fn test_parse_price_rejects_non_positive() {
        assert_eq!(parse_price("-5.00"), None);
        assert_eq!(parse_price("0.00"), None);
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Science Fiction & Fantasy"), "science-fiction-fantasy");
        assert_eq!(slugify("Children's Books"), "childrens-books");
        assert_eq!(slugify("  History  "), "history");
    }

    #[test]
    fn test_slugify_collapses_hyphens() {
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("--edge--"), "edge");
    }

    #[test]
    fn test_slugify_idempotent() {
        for name in ["Science Fiction & Fantasy", "Self-Help!!", "  a  b  ", "£$%"] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn test_clean_author() {
        assert_eq!(clean_author("by Jane Austen"), Some("Jane Austen".to_string()));
        assert_eq!(clean_author("BY  J. R. R. Tolkien"), Some("J. R. R. Tolkien".to_string()));
        assert_eq!(clean_author("bY Ursula K. Le Guin"), Some("Ursula K. Le Guin".to_string()));
        assert_eq!(clean_author("Émile Zola"), Some("Émile Zola".to_string()));
        assert_eq!(clean_author("O'Brien, Flann"), Some("O'Brien, Flann".to_string()));
        assert_eq!(clean_author("by 123"), None);
        assert_eq!(clean_author(""), None);
    }

    #[test]
    fn test_is_category_label() {
        assert!(is_category_label("Science Fiction & Fantasy"));
        assert!(is_category_label("True Crime"));
        assert!(!is_category_label("Login"));
        assert!(!is_category_label("Sign in to your account"));
        assert!(!is_category_label("xy")); // too short
        assert!(!is_category_label(&"Fiction ".repeat(20))); // too long
        assert!(!is_category_label("Random Link"));
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4.5 out of 5"), Some(4.5));
        assert_eq!(parse_rating("Rating: 3"), Some(3.0));
        assert_eq!(parse_rating("9 stars"), Some(5.0)); // clamped
        assert_eq!(parse_rating("no stars here"), None);
    }

    #[test]
    fn test_parse_review_count() {
        assert_eq!(parse_review_count("(1,204 reviews)"), Some(1204));
        assert_eq!(parse_review_count("12"), Some(12));
        assert_eq!(parse_review_count("none"), None);
    }

    #[test]
    fn test_synthetic_fill_deterministic() {
        let a = SyntheticFill::for_title("The Hobbit");
        let b = SyntheticFill::for_title("The Hobbit");
        assert_eq!(a.condition(), b.condition());
        assert_eq!(a.rating(), b.rating());
        assert!((3.0..=5.0).contains(&a.rating()));
        assert!((5..155).contains(&a.review_count()));
    }
}
