//! PlayStation Plus "What's new" page: the monthly games included with the
//! subscription.

use std::num::NonZeroU64;
use std::sync::Arc;

use mercury_core::{Discount, Offer, OfferRepository, StoreIdentity};
use scraper::{ElementRef, Html, Selector};

use crate::extract::{ExtractContext, Extraction, Extractor, ItemError};
use crate::fetch::{resolve_link, FetchMode, Fetcher, RawContent};
use crate::normalize::{clean_title, first_srcset_url, resolve_image};
use crate::store::Store;

pub const NAME: &str = "psplus";
pub const ID: &str = "4";
pub const SERVICE_NAME: &str = "PlayStation Plus";
pub const URL: &str = "https://www.playstation.com/en-gr/ps-plus/whats-new/";

/// Image used when neither an item nor its predecessor carries one.
pub const PLACEHOLDER_IMAGE: &str = "https://image.api.playstation.com/gs2-sec/appkgo/prod/CUSA02299_00/8/i_d3c3c3dd5cf8e284b68add3958c24353cf2b0c14f72c90cc8e3e98a1e5a6a8db/i/icon0.png";

const LINK_BASE: &str = "https://www.playstation.com";
const FALLBACK_LINK: &str = "https://store.playstation.com";

const SECTION: &str = "div.cmp-experiencefragment--wn-latest-monthly-games-content";
const ITEM: &str = r#"div[class^="box"]"#;
const TITLE: &str = "h3.txt-style-medium-title.txt-block-paragraph__title";
const BUTTON: &str = r#"a[role="button"][href]"#;
const SOURCE: &str = "source[srcset]";

/// The third `<source>` is the widest rendition.
const PREFERRED_SOURCE: usize = 2;

#[must_use]
pub fn identity(channel: Option<NonZeroU64>) -> StoreIdentity {
    StoreIdentity::new(NAME, ID, SERVICE_NAME, channel, URL)
}

/// Builds the store. Pass a custom `identity` to point it at another URL.
#[must_use]
pub fn store(
    identity: StoreIdentity,
    fetcher: Arc<dyn Fetcher>,
    repository: Arc<dyn OfferRepository>,
) -> Store {
    Store::new(identity, PsPlusExtractor, fetcher, repository)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PsPlusExtractor;

impl Extractor for PsPlusExtractor {
    fn mode(&self) -> FetchMode {
        FetchMode::Html
    }

    fn extract(&self, content: &RawContent, ctx: ExtractContext<'_>) -> Extraction {
        match content.as_html() {
            Some(html) => parse_page(html, ctx),
            None => Extraction::default(),
        }
    }
}

struct Selectors {
    section: Selector,
    item: Selector,
    title: Selector,
    button: Selector,
    source: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            section: selector(SECTION),
            item: selector(ITEM),
            title: selector(TITLE),
            button: selector(BUTTON),
            source: selector(SOURCE),
        }
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

fn parse_page(html: &str, ctx: ExtractContext<'_>) -> Extraction {
    let selectors = Selectors::new();
    let document = Html::parse_document(html);

    let Some(section) = document.select(&selectors.section).next() else {
        tracing::debug!(store = NAME, "monthly games section not found");
        return Extraction::default();
    };

    let items: Vec<ElementRef<'_>> = section.select(&selectors.item).collect();
    let own_images: Vec<Option<String>> = items
        .iter()
        .map(|item| own_image(*item, &selectors))
        .collect();

    let mut extraction = Extraction::default();
    let mut previous_own: Option<&str> = None;
    for (index, (item, own)) in items.iter().zip(&own_images).enumerate() {
        let image = resolve_image(own.as_deref(), previous_own, PLACEHOLDER_IMAGE);
        extraction.push(index, parse_item(*item, &selectors, image, ctx));
        previous_own = own.as_deref();
    }
    extraction
}

/// The item's own image: the preferred `<source>`, else the first one.
fn own_image(item: ElementRef<'_>, selectors: &Selectors) -> Option<String> {
    let sources: Vec<ElementRef<'_>> = item.select(&selectors.source).collect();
    sources
        .get(PREFERRED_SOURCE)
        .or_else(|| sources.first())
        .and_then(|source| source.value().attr("srcset"))
        .and_then(first_srcset_url)
        .and_then(|url| resolve_link(LINK_BASE, &url))
}

fn parse_item(
    item: ElementRef<'_>,
    selectors: &Selectors,
    image: String,
    ctx: ExtractContext<'_>,
) -> Result<Offer, ItemError> {
    let title = item
        .select(&selectors.title)
        .next()
        .map(|el| clean_title(&el.text().collect::<String>()))
        .filter(|title| !title.is_empty())
        .ok_or(ItemError::MissingField("title"))?;

    let url = item
        .select(&selectors.button)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_link(LINK_BASE, href))
        .unwrap_or_else(|| FALLBACK_LINK.to_string());

    Offer::new(
        ctx.store_id,
        &title,
        Discount::Subscription,
        &url,
        image,
        ctx.observed_at,
    )
    .map_err(ItemError::from)
}

#[cfg(test)]
#[path = "psplus_test.rs"]
mod tests;
