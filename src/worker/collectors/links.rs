use crate::url::registrable_domain;
use crate::worker::collectors::{Collector, CollectorError, LINKS};
use crate::worker::parser::parse_html;
use crate::worker::{PageSnapshot, Payload};
use serde_json::json;

/// Collects the page's links, split by whether they stay on the page's registrable domain
#[derive(Debug, Default, Clone, Copy)]
pub struct LinksCollector;

impl Collector for LinksCollector {
    fn id(&self) -> &'static str {
        LINKS
    }

    fn get_data(&self, page: &PageSnapshot) -> Result<Payload, CollectorError> {
        let html = page.html.as_deref().ok_or(CollectorError::MissingInput("html"))?;
        let base = page
            .final_url
            .as_ref()
            .or(page.requested_url.as_ref())
            .ok_or(CollectorError::MissingInput("url"))?;

        let site = registrable_domain(base);
        let (internal, external): (Vec<_>, Vec<_>) = parse_html(html, base)
            .links
            .into_iter()
            .partition(|link| site.is_some() && registrable_domain(link) == site);

        Ok(Payload::Json(json!({
            "internal": internal.iter().map(|u| u.as_str()).collect::<Vec<_>>(),
            "external": external.iter().map(|u| u.as_str()).collect::<Vec<_>>(),
        })))
    }
}
