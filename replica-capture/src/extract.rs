//! Asset and hyperlink discovery over rendered markup.

use crate::result::AssetCategory;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

pub const FONT_EXTENSIONS: [&str; 5] = [".woff", ".woff2", ".ttf", ".eot", ".otf"];

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[href]").expect("static selector"));
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").expect("static selector"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("static selector"));
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href], area[href]").expect("static selector"));
static BASE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("static selector"));

/// A sub-resource reference exactly as written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub href: String,
    pub category: AssetCategory,
}

impl AssetRef {
    fn new(href: &str, category: AssetCategory) -> Self {
        Self {
            href: href.trim().to_string(),
            category,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub asset_refs: Vec<AssetRef>,
    /// Resolved hyperlink targets, in document order, any scheme.
    pub links: Vec<Url>,
    /// The document's `<base href>`, resolved, when it declares one.
    pub base: Option<Url>,
}

impl Extraction {
    /// URL that relative asset references resolve against.
    pub fn asset_base<'a>(&'a self, page_url: &'a Url) -> &'a Url {
        self.base.as_ref().unwrap_or(page_url)
    }
}

/// Enumerates asset references and hyperlinks in `markup`.
///
/// Links are resolved against the document's `<base href>` when present,
/// otherwise against `page_url`. Asset references are left as written so the
/// asset store can resolve them. Elements missing the relevant attribute are
/// skipped; parsing never fails.
pub fn extract(markup: &str, page_url: &Url) -> Extraction {
    let document = Html::parse_document(markup);
    let declared_base = document_base(&document, page_url);
    let base = declared_base.clone().unwrap_or_else(|| page_url.clone());
    let mut extraction = Extraction {
        base: declared_base,
        ..Extraction::default()
    };

    for element in document.select(&LINK_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let rel = element.value().attr("rel").unwrap_or_default();
        let is_stylesheet = has_rel(rel, "stylesheet");
        let is_preload = has_rel(rel, "preload");

        if (is_stylesheet || is_preload) && is_font_path(href) {
            extraction
                .asset_refs
                .push(AssetRef::new(href, AssetCategory::Font));
        } else if is_stylesheet {
            extraction
                .asset_refs
                .push(AssetRef::new(href, AssetCategory::Css));
        }
    }

    for element in document.select(&SCRIPT_SELECTOR) {
        if let Some(src) = element.value().attr("src") {
            extraction
                .asset_refs
                .push(AssetRef::new(src, AssetCategory::Js));
        }
    }

    for element in document.select(&IMG_SELECTOR) {
        if let Some(src) = element.value().attr("src")
            && !is_data_uri(src)
        {
            extraction
                .asset_refs
                .push(AssetRef::new(src, AssetCategory::Img));
        }
    }

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        match base.join(href.trim()) {
            Ok(url) => extraction.links.push(url),
            Err(e) => debug!("Skipping unresolvable link '{}': {}", href, e),
        }
    }

    extraction
}

fn document_base(document: &Html, page_url: &Url) -> Option<Url> {
    document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
}

fn has_rel(rel: &str, wanted: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| token.eq_ignore_ascii_case(wanted))
}

fn is_data_uri(src: &str) -> bool {
    src.trim_start()
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// True when the path part of `href` (query and fragment ignored) ends in a
/// known font extension.
pub fn is_font_path(href: &str) -> bool {
    let path = href
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    FONT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
