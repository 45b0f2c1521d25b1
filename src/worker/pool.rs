//! Bounded worker pool
//!
//! Runs up to `concurrency` page visits at once. Every dispatched unit produces exactly one
//! [`PoolEvent::Outcome`] on the run's channel; a fatal visitor error additionally produces
//! one [`PoolEvent::Fatal`] and stops further dispatch while in-flight units finish.

use crate::consent::ConsentAction;
use crate::logging::{LogSink, NullSink};
use crate::worker::collectors::Collector;
use crate::worker::{
    CollectedResult, PageSnapshot, PageVisitor, Payload, PoolEvent, UnitOutcome, VisitError,
    VisitFailure, VisitOptions,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Shared state every unit task needs
#[derive(Clone)]
struct UnitContext {
    visitor: Arc<dyn PageVisitor>,
    collectors: Arc<[Arc<dyn Collector>]>,
    options: Arc<VisitOptions>,
    log: Arc<dyn LogSink>,
}

/// Pool of concurrent page visits
#[derive(Clone)]
pub struct WorkerPool {
    context: UnitContext,
    concurrency: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `concurrency` visits at once, with no collectors
    pub fn new(visitor: Arc<dyn PageVisitor>, concurrency: usize) -> Self {
        Self {
            context: UnitContext {
                visitor,
                collectors: Arc::from(Vec::new()),
                options: Arc::new(VisitOptions::default()),
                log: Arc::new(NullSink),
            },
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_collectors(mut self, collectors: Vec<Arc<dyn Collector>>) -> Self {
        self.context.collectors = Arc::from(collectors);
        self
    }

    pub fn with_options(mut self, options: VisitOptions) -> Self {
        self.context.options = Arc::new(options);
        self
    }

    pub fn with_log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.context.log = log;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Warning for a consent action the visitor cannot carry out
    pub fn consent_warning(&self) -> Option<String> {
        let action = self.context.options.consent_action;
        if action == ConsentAction::NoAction || self.context.visitor.runs_consent_handshake() {
            return None;
        }
        Some(format!(
            "Consent action {} is configured but this page visitor runs no consent handshake",
            action
        ))
    }

    /// Ids of the collectors run on every page
    pub fn collector_ids(&self) -> Vec<String> {
        self.context
            .collectors
            .iter()
            .map(|c| c.id().to_string())
            .collect()
    }

    /// Starts visiting `urls` in order
    ///
    /// Dispatch stops early once `cancel` fires; units already running still report.
    /// Must be called within a tokio runtime.
    pub fn dispatch(&self, urls: Vec<Url>, cancel: CancellationToken) -> PoolRun {
        let (tx, rx) = mpsc::unbounded_channel();
        let context = self.context.clone();
        let concurrency = self.concurrency;

        let driver = tokio::spawn(drive(context, concurrency, urls, cancel, tx));

        PoolRun { events: rx, driver }
    }
}

/// Handle on one dispatch
pub struct PoolRun {
    events: mpsc::UnboundedReceiver<PoolEvent>,
    driver: JoinHandle<usize>,
}

impl PoolRun {
    /// Next event; `None` once every dispatched unit has reported
    pub async fn next_event(&mut self) -> Option<PoolEvent> {
        self.events.recv().await
    }

    /// Waits for the dispatcher to finish and returns how many units it dispatched
    pub async fn finish(self) -> usize {
        self.driver.await.unwrap_or_else(|e| {
            tracing::error!("Pool dispatcher failed: {}", e);
            0
        })
    }
}

async fn drive(
    context: UnitContext,
    concurrency: usize,
    urls: Vec<Url>,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<PoolEvent>,
) -> usize {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut in_flight = JoinSet::new();
    let mut dispatched = 0;

    for url in urls {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        if cancel.is_cancelled() {
            break;
        }

        dispatched += 1;
        tracing::debug!("Dispatching {}", url);

        let context = context.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            let fallback_url = url.clone();

            // run the unit in its own task so a panic still yields an outcome
            let (outcome, fatal) = match tokio::spawn(run_unit(context, url)).await {
                Ok(done) => done,
                Err(e) => (
                    UnitOutcome {
                        url: fallback_url,
                        result: Err(VisitFailure {
                            reason: format!("worker task failed: {}", e),
                        }),
                    },
                    None,
                ),
            };

            let _ = tx.send(PoolEvent::Outcome(outcome));
            if let Some(reason) = fatal {
                tracing::error!("Fatal visitor error, stopping dispatch: {}", reason);
                cancel.cancel();
                let _ = tx.send(PoolEvent::Fatal(reason));
            }
        });
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Unit task failed: {}", e);
        }
    }

    dispatched
}

async fn run_unit(context: UnitContext, url: Url) -> (UnitOutcome, Option<String>) {
    let started = Utc::now();

    match context.visitor.visit(&url, &context.options).await {
        Ok(snapshot) => {
            let data = collect(&context, &url, &snapshot);
            let result = CollectedResult {
                initial_url: url.clone(),
                final_url: snapshot.final_url.clone().unwrap_or_else(|| url.clone()),
                timeout: snapshot.timed_out,
                started,
                finished: Utc::now(),
                data,
            };
            (
                UnitOutcome {
                    url,
                    result: Ok(result),
                },
                None,
            )
        }
        Err(VisitError::Unit(reason)) => {
            tracing::debug!("Visit of {} failed: {}", url, reason);
            context
                .log
                .line(&format!("Failed to visit {}: {}", url, reason));
            (
                UnitOutcome {
                    url,
                    result: Err(VisitFailure { reason }),
                },
                None,
            )
        }
        Err(VisitError::Fatal(reason)) => (
            UnitOutcome {
                url,
                result: Err(VisitFailure {
                    reason: reason.clone(),
                }),
            },
            Some(reason),
        ),
    }
}

/// Runs every collector on one snapshot; failures become null payloads
fn collect(context: &UnitContext, url: &Url, snapshot: &PageSnapshot) -> BTreeMap<String, Payload> {
    context
        .collectors
        .iter()
        .map(|collector| {
            let payload = match collector.get_data(snapshot) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("Collector {} failed on {}: {}", collector.id(), url, e);
                    context.log.line(&format!(
                        "{} failed to collect data for {}: {}",
                        collector.id(),
                        url,
                        e
                    ));
                    Payload::Null
                }
            };
            (collector.id().to_string(), payload)
        })
        .collect()
}
