use crate::worker::collectors::{Collector, CollectorError, SCREENSHOTS};
use crate::worker::{PageSnapshot, Payload};

/// Hands the visitor's screenshot to the result writer
#[derive(Debug, Default, Clone, Copy)]
pub struct ScreenshotCollector;

impl Collector for ScreenshotCollector {
    fn id(&self) -> &'static str {
        SCREENSHOTS
    }

    fn get_data(&self, page: &PageSnapshot) -> Result<Payload, CollectorError> {
        page.screenshot
            .clone()
            .map(Payload::Binary)
            .ok_or(CollectorError::MissingInput("screenshot"))
    }
}
