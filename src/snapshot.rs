//! Saved HTML pages as a link source.
//!
//! A static document never renders anything new, so a missing thumbnail is
//! reported as a timeout right away instead of waiting.

use crate::dom::{resolve_against, DomError, LinkElement};
use crate::{ArchiverError, Result};
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("img selector"));

pub struct PageSnapshot {
    document: Html,
    base_url: Url,
}

impl PageSnapshot {
    pub fn parse(html: &str, page_url: &str) -> Result<Self> {
        let base_url = Url::parse(page_url).map_err(|_| ArchiverError::InvalidConfig {
            key: "page_url".to_string(),
            value: page_url.to_string(),
        })?;
        Ok(Self {
            document: Html::parse_document(html),
            base_url,
        })
    }

    pub fn load(path: &Path, page_url: &str) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let html = String::from_utf8_lossy(&bytes);
        Self::parse(&html, page_url)
    }

    pub fn links(&self) -> Vec<SnapshotLink<'_>> {
        self.document
            .select(&ANCHOR_SELECTOR)
            .map(|element| SnapshotLink {
                element,
                base_url: &self.base_url,
            })
            .collect()
    }
}

pub struct SnapshotLink<'a> {
    element: ElementRef<'a>,
    base_url: &'a Url,
}

impl LinkElement for SnapshotLink<'_> {
    fn href(&self) -> std::result::Result<Option<String>, DomError> {
        Ok(self
            .element
            .value()
            .attr("href")
            .and_then(|raw| resolve_against(self.base_url, raw)))
    }

    fn thumbnail_src(&self, timeout: Duration) -> std::result::Result<Option<String>, DomError> {
        let Some(img) = self.element.select(&IMG_SELECTOR).next() else {
            return Err(DomError::Timeout(timeout));
        };
        Ok(img
            .value()
            .attr("src")
            .and_then(|raw| resolve_against(self.base_url, raw)))
    }
}
