//! Element snapshots and text rendering.
//!
//! Elements are owned copies of a node's outer HTML, so they stay valid after
//! the browser moves on to another page. Scoped queries re-parse the snapshot.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

/// Elements whose contents never show up as text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start and end a line in rendered text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "tfoot",
    "thead", "tr", "ul",
];

// ---------------------------------------------------------------------------
// By
// ---------------------------------------------------------------------------

/// How to locate an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    /// A single CSS class name, e.g. `titleContent`.
    ClassName(String),
    /// A tag name, e.g. `a`.
    TagName(String),
    /// Any CSS selector.
    Css(String),
}

impl By {
    pub fn class(name: impl Into<String>) -> Self {
        Self::ClassName(name.into())
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self::TagName(name.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Human-readable name used in error messages.
    pub fn describe(&self) -> &str {
        match self {
            Self::ClassName(s) | Self::TagName(s) | Self::Css(s) => s,
        }
    }

    /// Compile to a CSS selector. Invalid selectors match nothing.
    pub(crate) fn selector(&self) -> Option<Selector> {
        let css = match self {
            Self::ClassName(name) => format!(".{name}"),
            Self::TagName(name) => name.clone(),
            Self::Css(css) => css.clone(),
        };
        match Selector::parse(&css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!(selector = %css, error = %e, "invalid selector");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A loaded document and the URL it came from.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub html: String,
}

impl Page {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    pub fn find_one(&self, by: &By) -> Option<Element> {
        self.find_many(by).into_iter().next()
    }

    pub fn find_many(&self, by: &By) -> Vec<Element> {
        let Some(selector) = by.selector() else {
            return Vec::new();
        };
        let doc = Html::parse_document(&self.html);
        doc.select(&selector)
            .map(|el| Element::from_ref(el, Some(&self.url)))
            .collect()
    }

    pub fn contains(&self, by: &By) -> bool {
        let Some(selector) = by.selector() else {
            return false;
        };
        Html::parse_document(&self.html)
            .select(&selector)
            .next()
            .is_some()
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// An owned snapshot of one element.
#[derive(Debug, Clone)]
pub struct Element {
    html: String,
    base: Option<Url>,
}

impl Element {
    /// Build a snapshot from raw outer HTML (used by tests and saved fragments).
    pub fn from_html(html: impl Into<String>, base: Option<&Url>) -> Self {
        Self {
            html: html.into(),
            base: base.cloned(),
        }
    }

    pub(crate) fn from_ref(el: ElementRef<'_>, base: Option<&Url>) -> Self {
        Self::from_html(el.html(), base)
    }

    /// Outer HTML of the element.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Text as a browser would show it: one line per block, inline
    /// whitespace collapsed, blank lines dropped.
    pub fn text(&self) -> String {
        self.with_root(rendered_text).unwrap_or_default()
    }

    /// Raw attribute value.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_root(|root| root.value().attr(name).map(String::from))
            .flatten()
    }

    /// The element's `href`, resolved against the page it came from.
    pub fn link(&self) -> Option<Url> {
        let href = self.attribute("href")?;
        match &self.base {
            Some(base) => base.join(&href).ok(),
            None => Url::parse(&href).ok(),
        }
    }

    /// First descendant matching `by`.
    pub fn find_one(&self, by: &By) -> Option<Element> {
        self.find_many(by).into_iter().next()
    }

    /// Descendants matching `by`, in document order. The element itself is excluded.
    pub fn find_many(&self, by: &By) -> Vec<Element> {
        let Some(selector) = by.selector() else {
            return Vec::new();
        };
        let base = self.base.clone();
        self.with_root(|root| {
            root.select(&selector)
                .filter(|el| el.id() != root.id())
                .map(|el| Element::from_ref(el, base.as_ref()))
                .collect()
        })
        .unwrap_or_default()
    }

    fn with_root<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> Option<T> {
        let fragment = Html::parse_fragment(&self.html);
        let root = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)?;
        Some(f(root))
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

/// Render an element's text the way a browser's inner text reads.
pub(crate) fn rendered_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    render_into(el, &mut raw);
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_into(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }

    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.push('\n');
    }

    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            render_into(child_el, out);
            // Table cells sit side by side on one line
            if matches!(child_el.value().name(), "td" | "th") {
                push_space(out);
            }
        } else if let Some(text) = child.value().as_text() {
            push_collapsed(out, text);
        }
    }

    if block {
        out.push('\n');
    }
}

fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            push_space(out);
        } else {
            out.push(c);
        }
    }
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}
