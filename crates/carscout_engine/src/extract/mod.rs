use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use carscout_core::{ItemId, SiteType};
use scout_logging::{scout_debug, scout_warn};
use scraper::Selector;
use url::Url;

use crate::{decode_page, DiagnosticSink, FetchOutput, NullDiagnosticSink};

mod autoscout24;
mod mobile;

pub use autoscout24::AutoScout24Adapter;
pub use mobile::MobileAdapter;

/// Item identifiers found on one result page, plus detail-page URLs where the
/// site exposes them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub item_ids: BTreeSet<ItemId>,
    pub detail_links: BTreeMap<ItemId, String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}

/// The page does not have the structure the adapter expects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("result entry {index} has no `{selector}` element")]
    MissingElement { index: usize, selector: &'static str },
    #[error("result entry {index} has no `{attribute}` attribute")]
    MissingAttribute { index: usize, attribute: &'static str },
    #[error("invalid selector `{0}`")]
    Selector(&'static str),
}

/// Strategy for one listing site.
pub trait SiteAdapter: Send + Sync {
    fn site_type(&self) -> SiteType;

    /// Dot-delimited marker looked up in the URL host, e.g. `.mobile.`.
    fn host_marker(&self) -> &'static str;

    /// Parses a result page. `page_url` resolves relative links.
    fn extract(&self, html: &str, page_url: &str) -> Result<Extraction, ExtractError>;

    /// Link used in notifications when the page did not provide one for `item_id`.
    fn fallback_link(&self, source_url: &str, _item_id: &str) -> String {
        source_url.to_string()
    }
}

/// Dispatches site detection and extraction to the registered adapters.
pub struct ExtractorRegistry {
    adapters: Vec<Box<dyn SiteAdapter>>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ExtractorRegistry {
    pub fn new(diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            adapters: Vec::new(),
            diagnostics,
        }
    }

    /// Registry with every built-in adapter.
    pub fn with_default_adapters(diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self::new(diagnostics)
            .with_adapter(MobileAdapter)
            .with_adapter(AutoScout24Adapter)
    }

    pub fn with_adapter(mut self, adapter: impl SiteAdapter + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    /// Classifies a URL by its host. Unparsable or unmatched URLs are `Unknown`.
    pub fn detect_site_type(&self, url: &str) -> SiteType {
        let Some(host) = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        else {
            return SiteType::Unknown;
        };
        // Surrounding dots let `.mobile.` match both `mobile.de` and `suchen.mobile.de`.
        let dotted = format!(".{host}.");
        self.adapters
            .iter()
            .find(|adapter| dotted.contains(adapter.host_marker()))
            .map_or(SiteType::Unknown, |adapter| adapter.site_type())
    }

    fn adapter(&self, site_type: SiteType) -> Option<&dyn SiteAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.site_type() == site_type)
            .map(|adapter| &**adapter)
    }

    /// Turns a fetched page into an [`Extraction`].
    ///
    /// A page the adapter cannot parse yields an empty extraction and is
    /// handed to the diagnostic sink; it never fails the caller.
    pub fn extract(&self, site_type: SiteType, page: &FetchOutput) -> Extraction {
        let Some(adapter) = self.adapter(site_type) else {
            scout_warn!("No adapter registered for {}", site_type);
            return Extraction::default();
        };

        let decoded = decode_page(&page.bytes, page.metadata.content_type.as_deref());
        if decoded.lossy {
            scout_debug!(
                "Page {} contained malformed {} sequences",
                page.metadata.final_url,
                decoded.encoding
            );
        }

        match adapter.extract(&decoded.text, &page.metadata.final_url) {
            Ok(extraction) => {
                scout_debug!(
                    "{}: {} items on {}",
                    site_type,
                    extraction.item_ids.len(),
                    page.metadata.original_url
                );
                extraction
            }
            Err(err) => {
                scout_warn!(
                    "Unable to process {} page {}: {}",
                    site_type,
                    page.metadata.original_url,
                    err
                );
                self.diagnostics
                    .record(site_type, &page.metadata.original_url, &page.bytes);
                Extraction::default()
            }
        }
    }

    /// Detail link for a new item, falling back to the adapter's synthesized link.
    pub fn link_for(
        &self,
        site_type: SiteType,
        source_url: &str,
        detail_links: &BTreeMap<ItemId, String>,
        item_id: &str,
    ) -> String {
        if let Some(link) = detail_links.get(item_id) {
            return link.clone();
        }
        self.adapter(site_type)
            .map(|adapter| adapter.fallback_link(source_url, item_id))
            .unwrap_or_else(|| source_url.to_string())
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_default_adapters(Arc::new(NullDiagnosticSink))
    }
}

pub(crate) fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css))
}

/// Resolves `href` against the page it was found on.
pub(crate) fn resolve_link(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(href) {
        return Some(url.into());
    }
    Url::parse(page_url)
        .ok()
        .and_then(|base| base.join(href).ok())
        .map(Into::into)
}
