//! Readability-style extractor built on `scraper`
//!
//! Metadata comes from OpenGraph/Twitter/schema.org markup first and falls
//! back to the document body. The main content is the first semantic
//! container with enough text, or else the element holding the most
//! paragraph text.

use super::Extractor;
use crate::error::ExtractError;
use crate::types::ExtractedArticle;
use ammonia::UrlRelative;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use scraper::{ElementRef, Html, Selector};
use std::cmp::Reverse;
use std::collections::HashMap;
use url::Url;

/// Containers tried in order before falling back to paragraph scoring
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    "[itemprop='articleBody']",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".story-body",
    ".article__body",
    ".article-body",
    ".content-body",
    "#article-body",
    "#content",
    ".prose",
];

/// Elements dropped from content and text
const STRIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "canvas", "object", "embed",
    "nav", "aside", "footer", "form", "button", "input", "select", "textarea", "link", "meta",
];

/// Attributes kept on content elements
const KEEP_ATTRS: &[&str] = &["href", "src", "alt", "title"];

/// Link schemes kept in content; other links lose their URL attribute
const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

const TITLE_META: &[&str] = &["meta[property='og:title']", "meta[name='twitter:title']"];

const AUTHOR_META: &[&str] = &[
    "meta[name='author']",
    "meta[property='article:author']",
    "meta[name='parsely-author']",
    "meta[name='byl']",
];

const AUTHOR_ELEMENTS: &[&str] = &[
    "[itemprop='author'] [itemprop='name']",
    "[itemprop='author']",
    "[rel='author']",
    ".byline",
    ".author",
];

const DATE_META: &[&str] = &[
    "meta[property='article:published_time']",
    "meta[itemprop='datePublished']",
    "meta[name='date']",
    "meta[name='pubdate']",
    "meta[name='publish-date']",
    "meta[name='dc.date']",
];

const IMAGE_META: &[&str] = &[
    "meta[property='og:image']",
    "meta[property='og:image:url']",
    "meta[name='twitter:image']",
];

const DESCRIPTION_META: &[&str] = &[
    "meta[name='description']",
    "meta[property='og:description']",
    "meta[name='twitter:description']",
];

/// Minimum paragraph length counted by the scorer
const MIN_PARAGRAPH_CHARS: usize = 25;

const EXCERPT_CHARS: usize = 200;

/// Bylines longer than this are page text, not a name
const MAX_AUTHOR_CHARS: usize = 100;

/// Default HTML-to-article extractor
#[derive(Debug, Clone)]
pub struct ReadabilityExtractor {
    min_content_chars: usize,
}

impl ReadabilityExtractor {
    /// Create an extractor with the default thresholds
    pub fn new() -> Self {
        Self {
            min_content_chars: 200,
        }
    }

    /// Minimum text length for a semantic container to be accepted
    pub fn min_content_chars(mut self, chars: usize) -> Self {
        self.min_content_chars = chars;
        self
    }

    fn find_content<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        for css in CONTENT_SELECTORS {
            if let Some(element) = select_first(doc, css) {
                if visible_text(element).chars().count() >= self.min_content_chars {
                    return Some(element);
                }
            }
        }

        best_paragraph_container(doc).or_else(|| select_first(doc, "body"))
    }
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for ReadabilityExtractor {
    fn name(&self) -> &'static str {
        "readability"
    }

    fn extract(&self, url: &Url, html: &str) -> Result<ExtractedArticle, ExtractError> {
        if html.trim().is_empty() {
            return Err(ExtractError::EmptyDocument);
        }

        let doc = Html::parse_document(html);

        let content_root = self.find_content(&doc).ok_or(ExtractError::NoContent)?;
        let text = visible_text(content_root);
        if text.is_empty() {
            return Err(ExtractError::NoContent);
        }

        let content = format!("<div>{}</div>", clean_html(&content_root.inner_html(), url));

        let lead_image_url = meta_content(&doc, IMAGE_META)
            .or_else(|| first_attr(content_root, "img[src]", "src"))
            .and_then(|src| resolve_url(url, &src));

        let excerpt = meta_content(&doc, DESCRIPTION_META)
            .or_else(|| Some(truncate_words(&text, EXCERPT_CHARS)));

        Ok(ExtractedArticle {
            url: url.to_string(),
            domain: url.host_str().map(str::to_string),
            title: find_title(&doc),
            author: find_author(&doc),
            date_published: find_date(&doc).map(|raw| normalize_date(&raw)),
            lead_image_url,
            excerpt,
            word_count: text.split_whitespace().count(),
            content: Some(content),
        })
    }
}

fn find_title(doc: &Html) -> Option<String> {
    meta_content(doc, TITLE_META)
        .or_else(|| first_text(doc, &["article h1", "h1"]))
        .or_else(|| first_text(doc, &["title"]).map(|t| strip_site_suffix(&t)))
}

fn find_author(doc: &Html) -> Option<String> {
    let from_meta = AUTHOR_META
        .iter()
        .filter_map(|css| meta_content(doc, &[*css]))
        // article:author is often a profile URL
        .find(|value| !value.starts_with("http"));

    from_meta
        .or_else(|| first_text(doc, AUTHOR_ELEMENTS))
        .map(|author| clean_byline(&author))
        .filter(|author| !author.is_empty() && author.chars().count() <= MAX_AUTHOR_CHARS)
}

fn find_date(doc: &Html) -> Option<String> {
    meta_content(doc, DATE_META).or_else(|| {
        ["[itemprop='datePublished']", "time[datetime]"]
            .iter()
            .find_map(|css| {
                let element = select_first(doc, css)?;
                element
                    .value()
                    .attr("datetime")
                    .or_else(|| element.value().attr("content"))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
    })
}

/// Normalize a date to RFC 3339 (UTC, milliseconds); unknown formats pass through
fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    let format = |dt: DateTime<Utc>| dt.to_rfc3339_opts(SecondsFormat::Millis, true);

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return format(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return format(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return format(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return format(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return format(naive.and_utc());
        }
    }
    raw.to_string()
}

/// Element whose paragraphs carry the most text
fn best_paragraph_container(doc: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("p").ok()?;
    // node id -> (element, first-seen order, score)
    let mut scores = HashMap::new();

    for paragraph in doc.select(&selector) {
        let length = visible_text(paragraph).chars().count();
        if length < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let order = scores.len();
        scores.entry(parent.id()).or_insert((parent, order, 0)).2 += length;

        if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
            let order = scores.len();
            scores
                .entry(grandparent.id())
                .or_insert((grandparent, order, 0))
                .2 += length / 2;
        }
    }

    // Ties go to the element seen first in document order
    scores
        .into_values()
        .max_by_key(|(_, order, score)| (*score, Reverse(*order)))
        .map(|(element, _, _)| element)
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

/// First non-empty `content` attribute among the selectors, in order
fn meta_content(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        doc.select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .find(|v| !v.is_empty())
    })
}

/// First non-empty element text among the selectors, in order
fn first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        doc.select(&selector)
            .map(visible_text)
            .find(|v| !v.is_empty())
    })
}

fn first_attr(root: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    root.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Whitespace-normalized text, skipping non-content elements
fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !STRIP_TAGS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
                out.push(' ');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Resolve a link against the document URL; drops non-web schemes
fn resolve_url(base: &Url, value: &str) -> Option<String> {
    let resolved = base.join(value.trim()).ok()?;
    URL_SCHEMES
        .contains(&resolved.scheme())
        .then(|| resolved.to_string())
}

/// Sanitize a content fragment: drop non-content elements with their
/// children, keep only [`KEEP_ATTRS`], and make links absolute
fn clean_html(fragment: &str, base: &Url) -> String {
    let mut builder = ammonia::Builder::default();
    builder
        .rm_tags(STRIP_TAGS.iter().copied())
        .add_clean_content_tags(STRIP_TAGS.iter().copied())
        .generic_attributes(KEEP_ATTRS.iter().copied().collect())
        .tag_attributes(HashMap::new())
        .url_schemes(URL_SCHEMES.iter().copied().collect())
        .url_relative(UrlRelative::RewriteWithBase(base.clone()))
        .link_rel(None);
    builder.clean(fragment).to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "Post title | Site" -> "Post title"
fn strip_site_suffix(title: &str) -> String {
    title
        .split(" | ")
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(title)
        .to_string()
}

fn clean_byline(author: &str) -> String {
    let author = collapse_whitespace(author);
    match author.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("by ") => author[3..].trim().to_string(),
        _ => author,
    }
}

/// Truncate to `max_chars`, preserving word boundaries
fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Rust in Production | Example News</title>
    <meta property="og:title" content="Rust in Production">
    <meta name="author" content="By Jane Doe">
    <meta property="article:published_time" content="2024-03-05T10:30:00+02:00">
    <meta property="og:image" content="/images/lead.jpg">
    <meta name="description" content="How teams ship Rust services.">
    <script>var tracking = "ignore me";</script>
</head>
<body>
    <nav>Home | World | Tech | Navigation links that should not appear</nav>
    <article>
        <h1>Rust in Production</h1>
        <p>Teams across the industry are adopting Rust for network services where
        predictable latency and memory safety matter more than anything else.</p>
        <p>This article covers how they structure their services, handle errors and
        test against real upstream servers. Read the <a href="/guide">full guide</a>.</p>
        <script>alert('bad');</script>
        <img src="inline.png" alt="diagram">
    </article>
    <footer>Footer content that should not be included</footer>
</body>
</html>"#;

    fn base() -> Url {
        Url::parse("https://news.example.com/2024/rust/").unwrap()
    }

    fn extract(html: &str) -> Result<ExtractedArticle, ExtractError> {
        ReadabilityExtractor::new().extract(&base(), html)
    }

    #[test]
    fn test_extract_metadata() {
        let article = extract(ARTICLE_HTML).unwrap();

        assert_eq!(article.url, "https://news.example.com/2024/rust/");
        assert_eq!(article.domain.as_deref(), Some("news.example.com"));
        assert_eq!(article.title.as_deref(), Some("Rust in Production"));
        assert_eq!(article.author.as_deref(), Some("Jane Doe"));
        assert_eq!(
            article.date_published.as_deref(),
            Some("2024-03-05T08:30:00.000Z")
        );
        assert_eq!(
            article.lead_image_url.as_deref(),
            Some("https://news.example.com/images/lead.jpg")
        );
        assert_eq!(
            article.excerpt.as_deref(),
            Some("How teams ship Rust services.")
        );
    }

    #[test]
    fn test_extract_content_is_cleaned() {
        let article = extract(ARTICLE_HTML).unwrap();
        let content = article.content.unwrap();

        assert!(content.starts_with("<div>"));
        assert!(content.contains("predictable latency"));
        assert!(content.contains(r#"<a href="https://news.example.com/guide">full guide</a>"#));
        assert!(content.contains(r#"src="https://news.example.com/2024/rust/inline.png""#));
        assert!(!content.contains("alert"));
        assert!(!content.contains("Navigation"));
        assert!(!content.contains("Footer"));
        assert!(article.word_count > 30);
    }

    #[test]
    fn test_paragraph_scoring_fallback() {
        let html = r#"<html><body>
            <div class="sidebar"><p>Short.</p></div>
            <div class="story">
                <p>The first paragraph of the story has plenty of words to be counted.</p>
                <p>The second paragraph continues the story with even more useful text.</p>
            </div>
        </body></html>"#;

        let article = extract(html).unwrap();
        let content = article.content.unwrap();
        assert!(content.contains("first paragraph"));
        assert!(content.contains("second paragraph"));
        assert!(!content.contains("Short."));
    }

    #[test]
    fn test_body_fallback_without_paragraphs() {
        let html = "<html><head><title>Plain</title></head><body>Just some text</body></html>";
        let article = extract(html).unwrap();

        assert_eq!(article.title.as_deref(), Some("Plain"));
        assert_eq!(article.word_count, 3);
        assert_eq!(article.excerpt.as_deref(), Some("Just some text"));
    }

    #[test]
    fn test_title_suffix_stripped() {
        let html = "<html><head><title>Post | Site Name</title></head><body>Body text</body></html>";
        let article = extract(html).unwrap();
        assert_eq!(article.title.as_deref(), Some("Post"));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract("   ").unwrap_err(), ExtractError::EmptyDocument);
    }

    #[test]
    fn test_document_without_text() {
        let html = "<html><body><script>var x = 1;</script><nav>menu</nav></body></html>";
        assert_eq!(extract(html).unwrap_err(), ExtractError::NoContent);
    }

    #[test]
    fn test_text_is_escaped() {
        let html = "<html><body><p>Tom &amp; Jerry &lt;3</p></body></html>";
        let article = extract(html).unwrap();
        assert!(article.content.unwrap().contains("Tom &amp; Jerry &lt;3"));
    }

    #[test]
    fn test_javascript_links_dropped() {
        let html = r#"<html><body><p><a href="javascript:void(0)">click</a></p></body></html>"#;
        let content = extract(html).unwrap().content.unwrap();
        assert!(content.contains("<a>click</a>"));
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-01-15"), "2024-01-15T00:00:00.000Z");
        assert_eq!(
            normalize_date("2024-01-15T12:00:00Z"),
            "2024-01-15T12:00:00.000Z"
        );
        assert_eq!(
            normalize_date("Mon, 15 Jan 2024 12:00:00 +0000"),
            "2024-01-15T12:00:00.000Z"
        );
        assert_eq!(normalize_date("last Tuesday"), "last Tuesday");
    }

    #[test]
    fn test_author_profile_url_skipped() {
        let html = r#"<html><head>
            <meta property="article:author" content="https://facebook.com/someone">
        </head><body><span class="byline">by  Sam Lee</span><p>Text</p></body></html>"#;
        let article = extract(html).unwrap();
        assert_eq!(article.author.as_deref(), Some("Sam Lee"));
    }

    #[test]
    fn test_equal_scores_pick_first_container() {
        let html = r#"<html><body>
            <section><div id="first"><p>Alpha text that is long enough to be counted here.</p></div></section>
            <section><div id="second"><p>Bravo text that is long enough to be counted here.</p></div></section>
        </body></html>"#;
        let doc = Html::parse_document(html);

        for _ in 0..5 {
            let best = best_paragraph_container(&doc).unwrap();
            assert_eq!(best.value().attr("id"), Some("first"));
        }

        let content = extract(html).unwrap().content.unwrap();
        assert!(content.contains("Alpha"));
        assert!(!content.contains("Bravo"));
    }

    #[test]
    fn test_only_allowed_attributes_kept() {
        let html = r#"<html><body><p class="lead" style="color:red" data-id="7">Posted
            <time datetime="2024-01-01">Jan 1</time> with an
            <img src="/a.png" alt="chart" width="10" onerror="x()"></p></body></html>"#;
        let content = extract(html).unwrap().content.unwrap();

        assert!(content.contains("<p>Posted"));
        assert!(content.contains("<time>Jan 1</time>"));
        assert!(content.contains(r#"src="https://news.example.com/a.png""#));
        assert!(content.contains(r#"alt="chart""#));
        for attr in ["class=", "style=", "data-id=", "datetime=", "width=", "onerror="] {
            assert!(!content.contains(attr), "{attr} kept");
        }
    }

    #[test]
    fn test_truncate_words() {
        let text = "This is a long text that needs to be truncated at word boundary";
        let truncated = truncate_words(text, 30);
        assert!(truncated.ends_with("..."));
        assert!(truncated.chars().count() <= 33);
        assert_eq!(truncate_words("Short text", 100), "Short text");
    }
}
