//! Selector-strategy set shared by both extractors.
//!
//! Each content type has an ordered list of extraction recipes; the first
//! recipe that yields at least one plausible candidate wins. Field reads
//! inside a candidate are themselves ordered cascades where a miss degrades
//! that single field to unknown rather than dropping the candidate.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::normalize::{
    category_description, clean_author, is_category_label, parse_price, parse_rating,
    parse_review_count, slugify, SyntheticFill,
};
use super::{ProductDetail, ScrapedCategory, ScrapedProduct, ScrapedReview};

/// Maximum candidate elements considered on a single page.
const MAX_CANDIDATES: usize = 60;

/// Prefix cap for the raw-list-item fallback strategy.
const MAX_LIST_ITEMS: usize = 40;

/// Minimum usable title length.
const MIN_TITLE_LEN: usize = 4;

/// Ordered category strategies: nav containers, keyword-filtered links,
/// catalog-path links.
const CATEGORY_STRATEGIES: &[(&str, &str)] = &[
    (
        "nav-links",
        "nav a[href], header a[href], .navigation a[href], .navbar a[href], .main-menu a[href], .side_categories a[href]",
    ),
    ("keyword-links", "a[href]"),
    (
        "catalog-path-links",
        "a[href*='/category/'], a[href*='/collections/'], a[href*='/books/'], a[href*='/genre/']",
    ),
];

/// Ordered product-candidate strategies: specific card classes, generic
/// cards, raw list items as a capped last resort.
const PRODUCT_STRATEGIES: &[(&str, &str)] = &[
    (
        "product-cards",
        ".product, .product-card, .product-item, .book, .book-item, .book-card, article.product_pod, [class*='product-card'], [class*='book-card']",
    ),
    (
        "generic-cards",
        ".card, .listing-item, .grid-item, [class*='listing'], [class*='search-result']",
    ),
    ("list-items", "li"),
];

/// Field-level cascades for product candidates.
const TITLE_SELECTORS: &[&str] = &[
    "h3 a",
    "h2 a",
    "h3",
    "h2",
    ".title",
    ".product-title",
    ".book-title",
    "[class*='title']",
    "a",
];
const PRICE_SELECTORS: &[&str] = &[".price", ".price_color", "[class*='price']"];
const AUTHOR_SELECTORS: &[&str] = &[".author", ".byline", "[class*='author']"];
const RATING_SELECTORS: &[&str] = &[".rating", ".star-rating", "[class*='rating']"];
const REVIEW_COUNT_SELECTORS: &[&str] = &[".review-count", "[class*='review']"];
const SYNOPSIS_SELECTORS: &[&str] = &[
    "#product_description + p",
    ".synopsis",
    ".product-description",
    "[class*='description'] p",
    "[class*='description']",
];
const REVIEW_BLOCK_SELECTORS: &[&str] = &[".review", ".review-item", "[class*='review-card']"];

fn sel(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// Visible text of an element, whitespace-collapsed.
fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First non-empty text match from an ordered selector cascade.
fn cascade_text(el: &ElementRef, selectors: &[&str]) -> Option<String> {
    for s in selectors {
        let Some(selector) = sel(s) else { continue };
        if let Some(found) = el.select(&selector).next() {
            let text = element_text(&found);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Resolve a possibly-relative href against the page URL.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| {
        let mut u = u;
        u.set_fragment(None);
        u.to_string()
    })
}

/// Word ratings some storefronts encode as class names.
fn rating_from_class(el: &ElementRef) -> Option<f64> {
    let classes = el.value().attr("class")?;
    for (word, value) in [
        ("five", 5.0),
        ("four", 4.0),
        ("three", 3.0),
        ("two", 2.0),
        ("one", 1.0),
    ] {
        if classes.to_lowercase().split_whitespace().any(|c| c == word) {
            return Some(value);
        }
    }
    None
}

/// Extract category candidates, trying each strategy in order and stopping
/// at the first that yields at least one plausible link.
pub fn extract_categories(html: &Html, base: &Url) -> Vec<ScrapedCategory> {
    for (name, selector_str) in CATEGORY_STRATEGIES {
        let Some(selector) = sel(selector_str) else { continue };
        let mut seen: HashSet<String> = HashSet::new();
        let mut found = Vec::new();

        for link in html.select(&selector).take(MAX_CANDIDATES * 4) {
            let text = element_text(&link);
            if !is_category_label(&text) {
                continue;
            }
            let Some(href) = link.value().attr("href") else { continue };
            let Some(source_url) = resolve_url(base, href) else { continue };

            let display = text.trim().to_string();
            let slug = slugify(&display);
            if slug.is_empty() || !seen.insert(slug.clone()) {
                continue;
            }
            found.push(ScrapedCategory {
                description: category_description(&display),
                name: display,
                slug,
                source_url,
            });
            if found.len() >= MAX_CANDIDATES {
                break;
            }
        }

        debug!(strategy = name, count = found.len(), "category strategy attempted");
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Read one product candidate element. Returns `None` when no usable title
/// can be found; every other field degrades independently to unknown.
fn read_product_candidate(el: &ElementRef, base: &Url, synthetic_fill: bool) -> Option<ScrapedProduct> {
    // Title: text cascade first, then attribute fallbacks.
    let title = cascade_text(el, TITLE_SELECTORS)
        .or_else(|| {
            sel("a[title]")
                .and_then(|s| el.select(&s).next())
                .and_then(|a| a.value().attr("title").map(|t| t.trim().to_string()))
        })
        .or_else(|| {
            sel("img[alt]")
                .and_then(|s| el.select(&s).next())
                .and_then(|img| img.value().attr("alt").map(|t| t.trim().to_string()))
        })
        .filter(|t| t.len() >= MIN_TITLE_LEN)?;

    let source_url = sel("a[href]")
        .and_then(|s| el.select(&s).next())
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_url(base, href))
        .unwrap_or_else(|| base.to_string());

    let mut product = ScrapedProduct::new(title, source_url);

    product.price = cascade_text(el, PRICE_SELECTORS).and_then(|raw| parse_price(&raw));
    product.author = cascade_text(el, AUTHOR_SELECTORS).and_then(|raw| clean_author(&raw));
    product.image_url = sel("img")
        .and_then(|s| el.select(&s).next())
        .and_then(|img| {
            img.value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
        })
        .and_then(|src| resolve_url(base, src));

    product.rating = (|| {
        for s in RATING_SELECTORS {
            let selector = sel(s)?;
            if let Some(found) = el.select(&selector).next() {
                if let Some(r) = rating_from_class(&found) {
                    return Some(r);
                }
                if let Some(r) = parse_rating(&element_text(&found)) {
                    return Some(r);
                }
            }
        }
        None
    })();
    product.review_count =
        cascade_text(el, REVIEW_COUNT_SELECTORS).and_then(|raw| parse_review_count(&raw));

    if synthetic_fill {
        let fill = SyntheticFill::for_title(&product.title);
        product.condition.get_or_insert_with(|| fill.condition());
        product.format.get_or_insert_with(|| fill.format());
        if product.rating.is_none() {
            product.rating = Some(fill.rating());
        }
        if product.review_count.is_none() {
            product.review_count = Some(fill.review_count());
        }
    }

    Some(product)
}

/// Extract product candidates from a listing page.
pub fn extract_products(html: &Html, base: &Url, synthetic_fill: bool) -> Vec<ScrapedProduct> {
    for (name, selector_str) in PRODUCT_STRATEGIES {
        let Some(selector) = sel(selector_str) else { continue };
        let cap = if *name == "list-items" {
            MAX_LIST_ITEMS
        } else {
            MAX_CANDIDATES
        };

        let mut found = Vec::new();
        let mut dropped = 0usize;
        for el in html.select(&selector).take(cap) {
            match read_product_candidate(&el, base, synthetic_fill) {
                Some(product) => found.push(product),
                None => dropped += 1,
            }
        }

        debug!(
            strategy = name,
            count = found.len(),
            dropped, "product strategy attempted"
        );
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Label -> value pairs from spec tables (`th`/`td` rows and dt/dd lists).
fn spec_table(html: &Html) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(row_sel) = sel("table tr") {
        for row in html.select(&row_sel) {
            let label = sel("th").and_then(|s| row.select(&s).next()).map(|e| element_text(&e));
            let value = sel("td").and_then(|s| row.select(&s).next()).map(|e| element_text(&e));
            if let (Some(label), Some(value)) = (label, value) {
                pairs.push((label.to_lowercase(), value));
            }
        }
    }
    if let (Some(dt_sel), Some(dd_sel)) = (sel("dl dt"), sel("dl dd")) {
        let labels: Vec<_> = html.select(&dt_sel).map(|e| element_text(&e)).collect();
        let values: Vec<_> = html.select(&dd_sel).map(|e| element_text(&e)).collect();
        for (label, value) in labels.into_iter().zip(values) {
            pairs.push((label.to_lowercase(), value));
        }
    }
    pairs
}

fn table_value(pairs: &[(String, String)], keys: &[&str]) -> Option<String> {
    for (label, value) in pairs {
        if keys.iter().any(|k| label.contains(k)) && !value.is_empty() {
            return Some(value.clone());
        }
    }
    None
}

/// Read one review block. Unparsable ratings default to the neutral value.
fn read_review(el: &ElementRef) -> ScrapedReview {
    let rating = cascade_text(el, RATING_SELECTORS)
        .and_then(|raw| parse_rating(&raw))
        .or_else(|| {
            sel("[class*='star']")
                .and_then(|s| el.select(&s).next())
                .and_then(|e| rating_from_class(&e))
        })
        .map(|r| (r.round() as i32).clamp(1, 5))
        .unwrap_or(3);

    let text = element_text(el).to_lowercase();
    ScrapedReview {
        reviewer_name: cascade_text(el, &[".reviewer", ".reviewer-name", "[class*='reviewer']", ".name"]),
        rating,
        review_title: cascade_text(el, &[".review-title", "h4", "h5", "[class*='review-title']"]),
        review_text: cascade_text(el, &[".review-text", ".review-body", "p", "[class*='review-text']"]),
        is_verified_purchase: text.contains("verified purchase"),
        review_date: cascade_text(el, &[".review-date", "time", "[class*='date']"])
            .and_then(|raw| parse_review_date(&raw)),
        helpful_count: cascade_text(el, &[".helpful", "[class*='helpful']"])
            .and_then(|raw| parse_review_count(&raw))
            .map(|n| n as i32),
    }
}

/// Dates appear in a handful of formats across review widgets.
fn parse_review_date(raw: &str) -> Option<chrono::NaiveDate> {
    let trimmed = raw.trim();
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d %B %Y", "%B %d, %Y"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }
    None
}

/// Extract the single product (with extended bundle and reviews) from a
/// detail page. Returns `None` when no usable title is present.
pub fn extract_product_detail(
    html: &Html,
    base: &Url,
    synthetic_fill: bool,
) -> Option<ScrapedProduct> {
    let root = html.root_element();

    let title = cascade_text(&root, &["h1", ".product-title", ".product_main h1", "[class*='title']"])
        .filter(|t| t.len() >= MIN_TITLE_LEN)?;

    let mut product = ScrapedProduct::new(title, base.to_string());
    product.price = cascade_text(&root, PRICE_SELECTORS).and_then(|raw| parse_price(&raw));
    product.author = cascade_text(&root, AUTHOR_SELECTORS).and_then(|raw| clean_author(&raw));
    product.image_url = sel(".product-image img, #product_gallery img, .carousel img, img")
        .and_then(|s| html.select(&s).next())
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| resolve_url(base, src));
    product.rating = cascade_text(&root, RATING_SELECTORS)
        .and_then(|raw| parse_rating(&raw))
        .or_else(|| {
            sel(".star-rating")
                .and_then(|s| html.select(&s).next())
                .and_then(|e| rating_from_class(&e))
        });

    let pairs = spec_table(html);
    product.condition = table_value(&pairs, &["condition"]);
    product.format = table_value(&pairs, &["format", "binding", "product type"]);
    product.review_count = table_value(&pairs, &["number of reviews", "reviews"])
        .and_then(|raw| parse_review_count(&raw));

    let mut detail = ProductDetail {
        isbn: table_value(&pairs, &["isbn-10", "isbn "]).or_else(|| {
            table_value(&pairs, &["isbn"]).filter(|v| v.replace('-', "").len() <= 10)
        }),
        isbn13: table_value(&pairs, &["isbn-13", "isbn13"])
            .or_else(|| table_value(&pairs, &["isbn", "upc"]).filter(|v| v.replace('-', "").len() >= 13)),
        publisher: table_value(&pairs, &["publisher"]),
        pages: table_value(&pairs, &["pages", "page count"]).and_then(|raw| parse_review_count(&raw)),
        language: table_value(&pairs, &["language"]),
        dimensions: table_value(&pairs, &["dimensions", "size"]),
        synopsis: cascade_text(&root, SYNOPSIS_SELECTORS),
        similar_products: Vec::new(),
        reviews: Vec::new(),
    };

    if let Some(similar_sel) = sel(".similar a, .related a, [class*='related'] a, [class*='recommend'] a") {
        let mut seen = HashSet::new();
        for link in html.select(&similar_sel).take(MAX_CANDIDATES) {
            let text = element_text(&link);
            if text.len() >= MIN_TITLE_LEN && seen.insert(text.clone()) {
                detail.similar_products.push(text);
            }
        }
    }

    for s in REVIEW_BLOCK_SELECTORS {
        let Some(selector) = sel(s) else { continue };
        let blocks: Vec<_> = html.select(&selector).take(MAX_CANDIDATES).collect();
        if !blocks.is_empty() {
            detail.reviews = blocks.iter().map(read_review).collect();
            break;
        }
    }

    if synthetic_fill {
        let fill = SyntheticFill::for_title(&product.title);
        product.condition.get_or_insert_with(|| fill.condition());
        product.format.get_or_insert_with(|| fill.format());
        if product.rating.is_none() {
            product.rating = Some(fill.rating());
        }
        if product.review_count.is_none() {
            product.review_count = Some(fill.review_count());
        }
    }

    product.detail = Some(detail);
    Some(product)
}
