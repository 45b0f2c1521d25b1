use crate::worker::collectors::{Collector, CollectorError, METADATA};
use crate::worker::parser::parse_html;
use crate::worker::{PageSnapshot, Payload};
use serde_json::json;

/// Collects title, description, status, content type and final URL
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataCollector;

impl Collector for MetadataCollector {
    fn id(&self) -> &'static str {
        METADATA
    }

    fn get_data(&self, page: &PageSnapshot) -> Result<Payload, CollectorError> {
        let final_url = page
            .final_url
            .as_ref()
            .or(page.requested_url.as_ref())
            .ok_or(CollectorError::MissingInput("url"))?;

        let parsed = page
            .html
            .as_deref()
            .map(|html| parse_html(html, final_url))
            .unwrap_or_default();

        Ok(Payload::Json(json!({
            "title": parsed.title,
            "description": parsed.description,
            "status": page.status,
            "contentType": page.content_type,
            "finalUrl": final_url.as_str(),
        })))
    }
}
