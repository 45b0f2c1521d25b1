//! Data collectors
//!
//! A collector turns the snapshot of a visited page into one payload, stored in the result
//! under the collector's id. Collectors are looked up by id in a small registry so the
//! CLI and config can name them.

mod links;
mod metadata;
mod screenshots;

pub use links::LinksCollector;
pub use metadata::MetadataCollector;
pub use screenshots::ScreenshotCollector;

use crate::worker::{PageSnapshot, PageVisitor, Payload};
use crate::ConfigError;
use std::sync::Arc;
use thiserror::Error;

/// Id of the links collector
pub const LINKS: &str = "links";

/// Id of the page metadata collector
pub const METADATA: &str = "metadata";

/// Id of the screenshot collector
pub const SCREENSHOTS: &str = "screenshots";

/// Errors a collector can report; the unit still succeeds with a null payload
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectorError {
    #[error("page snapshot has no {0}")]
    MissingInput(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Extracts one kind of data from a visited page
pub trait Collector: Send + Sync {
    /// Key of this collector's payload in the result
    fn id(&self) -> &'static str;

    /// Produces this collector's payload for one page
    fn get_data(&self, page: &PageSnapshot) -> Result<Payload, CollectorError>;
}

/// Ids of every registered collector, in registry order
pub fn collector_ids() -> Vec<&'static str> {
    vec![LINKS, METADATA, SCREENSHOTS]
}

/// Builds the collector registered under `id`
pub fn create_collector(id: &str) -> Option<Arc<dyn Collector>> {
    match id {
        LINKS => Some(Arc::new(LinksCollector)),
        METADATA => Some(Arc::new(MetadataCollector)),
        SCREENSHOTS => Some(Arc::new(ScreenshotCollector)),
        _ => None,
    }
}

/// Builds the collectors for a list of ids; an empty list selects every collector
///
/// # Errors
///
/// `ConfigError::UnknownCollector` naming the first unknown id and listing the valid ones
pub fn create_collectors(ids: &[String]) -> Result<Vec<Arc<dyn Collector>>, ConfigError> {
    if ids.is_empty() {
        return Ok(collector_ids()
            .into_iter()
            .filter_map(create_collector)
            .collect());
    }

    ids.iter()
        .map(|id| {
            create_collector(id).ok_or_else(|| ConfigError::UnknownCollector {
                id: id.clone(),
                valid: collector_ids().join(", "),
            })
        })
        .collect()
}

/// Builds the collectors for a list of ids, limited to what `visitor` can feed
///
/// An empty list selects every collector the visitor supports. Naming `screenshots` for a
/// visitor that takes no screenshots is a configuration error.
pub fn create_collectors_for(
    ids: &[String],
    visitor: &dyn PageVisitor,
) -> Result<Vec<Arc<dyn Collector>>, ConfigError> {
    let supported = |id: &str| id != SCREENSHOTS || visitor.captures_screenshots();

    if ids.is_empty() {
        return Ok(collector_ids()
            .into_iter()
            .filter(|id| supported(id))
            .filter_map(create_collector)
            .collect());
    }

    if let Some(id) = ids.iter().find(|id| !supported(id.as_str())) {
        return Err(ConfigError::Validation(format!(
            "collector \"{}\" needs a page visitor that takes screenshots",
            id
        )));
    }
    create_collectors(ids)
}
