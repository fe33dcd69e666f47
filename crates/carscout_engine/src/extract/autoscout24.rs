use carscout_core::SiteType;
use scraper::Html;

use super::{selector, ExtractError, Extraction, SiteAdapter};

const RESULT_ITEM: &str = "div.cl-list-element-gap";
const GUID: &str = "data-guid";

/// AutoScout24 search results. The listing id sits on the result container;
/// spacer containers without one are skipped. No detail links.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoScout24Adapter;

impl SiteAdapter for AutoScout24Adapter {
    fn site_type(&self) -> SiteType {
        SiteType::AutoScout24
    }

    fn host_marker(&self) -> &'static str {
        ".autoscout24."
    }

    fn extract(&self, html: &str, _page_url: &str) -> Result<Extraction, ExtractError> {
        let doc = Html::parse_document(html);
        let item_sel = selector(RESULT_ITEM)?;
        let item_ids = doc
            .select(&item_sel)
            .filter_map(|item| item.value().attr(GUID))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Extraction {
            item_ids,
            ..Extraction::default()
        })
    }
}
