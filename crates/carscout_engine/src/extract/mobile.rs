use carscout_core::SiteType;
use scraper::Html;

use super::{resolve_link, selector, ExtractError, Extraction, SiteAdapter};

const RESULT_ITEM: &str = "div.cBox-body--resultitem";
const RESULT_LINK: &str = "a.result-item";
const AD_ID: &str = "data-ad-id";

/// mobile.de search results. Every result box links to its ad, and the link
/// carries the ad id.
#[derive(Debug, Default, Clone, Copy)]
pub struct MobileAdapter;

impl SiteAdapter for MobileAdapter {
    fn site_type(&self) -> SiteType {
        SiteType::Mobile
    }

    fn host_marker(&self) -> &'static str {
        ".mobile."
    }

    fn extract(&self, html: &str, page_url: &str) -> Result<Extraction, ExtractError> {
        let doc = Html::parse_document(html);
        let item_sel = selector(RESULT_ITEM)?;
        let link_sel = selector(RESULT_LINK)?;

        let mut extraction = Extraction::default();
        for (index, item) in doc.select(&item_sel).enumerate() {
            let link = item
                .select(&link_sel)
                .next()
                .ok_or(ExtractError::MissingElement {
                    index,
                    selector: RESULT_LINK,
                })?;
            let id = link
                .value()
                .attr(AD_ID)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or(ExtractError::MissingAttribute {
                    index,
                    attribute: AD_ID,
                })?;

            if let Some(href) = link.value().attr("href").and_then(|h| resolve_link(h, page_url)) {
                extraction.detail_links.insert(id.to_string(), href);
            }
            extraction.item_ids.insert(id.to_string());
        }
        Ok(extraction)
    }
}
