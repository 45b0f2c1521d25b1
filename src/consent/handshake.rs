use crate::consent::{
    engine_script, ConsentAction, HandshakeOutcome, HandshakeState, HandshakeTiming, PageContext,
    BRIDGE_NAME,
};
use crate::logging::LogSink;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{sleep, Instant};

/// Runs the consent handshake on one page
///
/// # Protocol
///
/// 1. **Armed**: expose the bridge function, then inject the detection engine configured
///    with `action`
/// 2. **Waiting**: poll the bridge every `timing.poll_interval` until a signal arrives or
///    `timing.max_wait` has been spent
/// 3. **Detected**: wait `timing.settle` so consent-driven scripts can finish, then return
/// 4. **TimedOut**: return at once, with no settle wait
///
/// Never fails: arming errors are written to `log` and returned as
/// [`HandshakeOutcome::ArmFailed`], and the visit carries on without consent resolution.
/// Only the calling task sleeps; concurrent visits are unaffected.
pub async fn run_handshake<P>(
    page: &P,
    action: ConsentAction,
    timing: &HandshakeTiming,
    log: &dyn LogSink,
) -> HandshakeOutcome
where
    P: PageContext + ?Sized,
{
    let started = Instant::now();
    tracing::trace!(state = ?HandshakeState::Armed, url = %page.url(), "consent handshake");

    let mut bridge = match page.expose_bridge(BRIDGE_NAME).await {
        Ok(rx) => rx,
        Err(e) => return arm_failed(page, log, e.to_string()),
    };

    if let Err(e) = page.evaluate(&engine_script(action)).await {
        return arm_failed(page, log, e.to_string());
    }

    tracing::trace!(state = ?HandshakeState::Waiting, url = %page.url(), "consent handshake");

    let mut waited = std::time::Duration::ZERO;
    loop {
        match bridge.try_recv() {
            Ok(payload) => {
                let after = started.elapsed();
                let mechanism = mechanism_name(&payload);
                log.line(&format!("CMP detected on {}: {}", page.url(), mechanism));
                log.line(&format!(
                    "Will wait {}ms after CMP detected!",
                    timing.settle.as_millis()
                ));
                sleep(timing.settle).await;
                return HandshakeOutcome::Detected {
                    mechanism,
                    after,
                };
            }
            Err(TryRecvError::Disconnected) => {
                tracing::debug!("Consent bridge closed on {} before any signal", page.url());
                return HandshakeOutcome::TimedOut {
                    waited: started.elapsed(),
                };
            }
            Err(TryRecvError::Empty) => {}
        }

        if waited >= timing.max_wait {
            tracing::trace!(state = ?HandshakeState::TimedOut, url = %page.url(), "consent handshake");
            return HandshakeOutcome::TimedOut {
                waited: started.elapsed(),
            };
        }

        sleep(timing.poll_interval).await;
        waited += timing.poll_interval;
    }
}

fn arm_failed<P>(page: &P, log: &dyn LogSink, error: String) -> HandshakeOutcome
where
    P: PageContext + ?Sized,
{
    log.line(&format!("Consent handshake failed on {}: {}", page.url(), error));
    HandshakeOutcome::ArmFailed { error }
}

/// Extracts a readable mechanism name from a bridge payload
///
/// The engine sends its detection stats as JSON; the CMP name is taken from `cmpName` or
/// `name` when present, otherwise the raw payload is kept.
pub fn mechanism_name(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| {
            ["cmpName", "name"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::ConsentError;
    use crate::logging::MemorySink;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Fake page that fires the bridge after `signal_after`, if set
    struct FakePage {
        signal_after: Option<Duration>,
        /// Drops the bridge sender after this delay without signalling
        close_after: Option<Duration>,
        fail_injection: bool,
        scripts: Mutex<Vec<String>>,
        sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    }

    impl FakePage {
        fn new(signal_after: Option<Duration>) -> Self {
            Self {
                signal_after,
                close_after: None,
                fail_injection: false,
                scripts: Mutex::new(Vec::new()),
                sender: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PageContext for FakePage {
        fn url(&self) -> String {
            "http://shop.test/".to_string()
        }

        async fn expose_bridge(
            &self,
            _name: &str,
        ) -> Result<mpsc::UnboundedReceiver<String>, ConsentError> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.sender.lock().unwrap() = Some(tx);
            Ok(rx)
        }

        async fn evaluate(&self, script: &str) -> Result<(), ConsentError> {
            if self.fail_injection {
                return Err(ConsentError::Injection("ConsentEngine is not defined".into()));
            }
            self.scripts.lock().unwrap().push(script.to_string());
            if let Some(delay) = self.close_after {
                let tx = self.sender.lock().unwrap().take();
                tokio::spawn(async move {
                    sleep(delay).await;
                    drop(tx);
                });
                return Ok(());
            }
            let tx = self.sender.lock().unwrap().clone();
            if let (Some(delay), Some(tx)) = (self.signal_after, tx) {
                tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = tx.send(r#"{"cmpName":"Cookiebot"}"#.to_string());
                });
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_waits_ceiling_without_settle() {
        let page = FakePage::new(None);
        let log = MemorySink::default();
        let timing = HandshakeTiming::default();

        let start = Instant::now();
        let outcome = run_handshake(&page, ConsentAction::NoAction, &timing, &log).await;
        let elapsed = start.elapsed();

        assert_eq!(outcome.final_state(), HandshakeState::TimedOut);
        assert_eq!(elapsed, timing.max_wait);
        assert!(log.lines().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_adds_settle() {
        let page = FakePage::new(Some(Duration::from_millis(1000)));
        let log = MemorySink::default();
        let timing = HandshakeTiming::default();

        let start = Instant::now();
        let outcome = run_handshake(&page, ConsentAction::AcceptAll, &timing, &log).await;
        let elapsed = start.elapsed();

        match outcome {
            HandshakeOutcome::Detected {
                mechanism,
                after,
            } => {
                assert_eq!(mechanism, "Cookiebot");
                // observed on the first poll at or after the signal
                assert!(after >= Duration::from_millis(1000));
                assert!(after < Duration::from_millis(1000) + timing.poll_interval);
                assert_eq!(elapsed, after + timing.settle);
            }
            other => panic!("expected detection, got {:?}", other),
        }

        assert!(log.lines()[0].contains("CMP detected on http://shop.test/: Cookiebot"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_bridge_ends_early_without_settle() {
        let mut page = FakePage::new(None);
        page.close_after = Some(Duration::from_millis(700));
        let log = MemorySink::default();
        let timing = HandshakeTiming::default();

        let start = Instant::now();
        let outcome = run_handshake(&page, ConsentAction::AcceptAll, &timing, &log).await;
        let elapsed = start.elapsed();

        match outcome {
            HandshakeOutcome::TimedOut { waited } => {
                // noticed on the first poll after the close
                assert!(waited >= Duration::from_millis(700));
                assert!(waited < Duration::from_millis(700) + timing.poll_interval);
                assert!(waited < timing.max_wait);
                assert_eq!(elapsed, waited);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(log.lines().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ceiling() {
        let page = FakePage::new(Some(Duration::from_secs(7)));
        let log = MemorySink::default();
        let timing = HandshakeTiming {
            max_wait: Duration::from_secs(9),
            ..HandshakeTiming::default()
        };

        let outcome = run_handshake(&page, ConsentAction::NoAction, &timing, &log).await;
        assert!(outcome.is_detected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_injection_failure_is_logged_not_fatal() {
        let mut page = FakePage::new(Some(Duration::from_millis(10)));
        page.fail_injection = true;
        let log = MemorySink::default();

        let start = Instant::now();
        let outcome =
            run_handshake(&page, ConsentAction::NoAction, &HandshakeTiming::default(), &log).await;

        assert!(matches!(outcome, HandshakeOutcome::ArmFailed { .. }));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(log.lines()[0].starts_with("Consent handshake failed on http://shop.test/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_script_matches_action() {
        let page = FakePage::new(None);
        let log = MemorySink::default();
        let timing = HandshakeTiming {
            max_wait: Duration::from_millis(300),
            ..HandshakeTiming::default()
        };

        run_handshake(&page, ConsentAction::RejectAll, &timing, &log).await;

        let scripts = page.scripts.lock().unwrap();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("REJECT_ALL"));
    }

    #[test]
    fn test_mechanism_name() {
        assert_eq!(mechanism_name(r#"{"cmpName":"OneTrust"}"#), "OneTrust");
        assert_eq!(mechanism_name(r#"{"name":"Didomi"}"#), "Didomi");
        assert_eq!(mechanism_name("Quantcast"), "Quantcast");
    }
}
