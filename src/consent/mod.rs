//! Consent handshake module
//!
//! Before data collection each page visit runs a short, bounded handshake inside the page to
//! detect a consent-management dialog and, depending on the configured action, answer it.
//!
//! # Components
//!
//! - `PageContext`: the seam to the page's execution context (provided by a browser driver)
//! - `run_handshake`: the handshake state machine `Armed -> Waiting -> {Detected, TimedOut}`
//! - `engine_script`: the in-page script that starts the detection engine

mod handshake;
mod script;

pub use handshake::{mechanism_name, run_handshake};
pub use script::{engine_script, BRIDGE_NAME};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Default interval between bridge polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Default detection ceiling
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(6000);

/// Default wait after a detection, letting consent-driven scripts and reflow finish
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(2500);

/// Errors raised while arming the handshake
#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("failed to expose bridge function: {0}")]
    Bridge(String),

    #[error("failed to inject consent engine: {0}")]
    Injection(String),
}

/// What the detection engine does with a dialog it finds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsentAction {
    /// Observe only, never interact with the dialog
    #[default]
    #[serde(rename = "NO_ACTION")]
    NoAction,

    /// Answer every consent category affirmatively
    #[serde(rename = "ACCEPT_ALL")]
    AcceptAll,

    /// Answer every consent category negatively, where the dialog supports it
    #[serde(rename = "REJECT_ALL")]
    RejectAll,
}

impl ConsentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAction => "NO_ACTION",
            Self::AcceptAll => "ACCEPT_ALL",
            Self::RejectAll => "REJECT_ALL",
        }
    }
}

impl fmt::Display for ConsentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NO_ACTION" => Ok(Self::NoAction),
            "ACCEPT_ALL" => Ok(Self::AcceptAll),
            "REJECT_ALL" => Ok(Self::RejectAll),
            other => Err(format!(
                "unknown consent action '{}', expected NO_ACTION, ACCEPT_ALL or REJECT_ALL",
                other
            )),
        }
    }
}

/// Timing knobs of the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTiming {
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub settle: Duration,
}

impl Default for HandshakeTiming {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            settle: DEFAULT_SETTLE,
        }
    }
}

/// States of the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// Bridge registered, engine being injected
    Armed,
    /// Polling the bridge
    Waiting,
    /// Signal received, settle wait done
    Detected,
    /// Ceiling reached without a signal
    TimedOut,
}

/// How a handshake ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// A dialog was detected `after` into the handshake; the settle wait has elapsed
    Detected {
        mechanism: String,
        after: Duration,
    },

    /// No signal arrived; returned without any settle wait
    TimedOut { waited: Duration },

    /// The handshake could not be armed; the visit carries on without consent resolution
    ArmFailed { error: String },
}

impl HandshakeOutcome {
    /// Final state reached; a failed handshake never leaves `Armed`
    pub fn final_state(&self) -> HandshakeState {
        match self {
            Self::Detected { .. } => HandshakeState::Detected,
            Self::TimedOut { .. } => HandshakeState::TimedOut,
            Self::ArmFailed { .. } => HandshakeState::Armed,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected { .. })
    }
}

/// The execution context of one open page
///
/// Implemented by browser drivers. The handshake only needs to register a function the page
/// can call back into, and to evaluate a script in the page.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Current URL of the page, for log lines
    fn url(&self) -> String;

    /// Exposes a function named `name` to the page
    ///
    /// Every call the page makes to it delivers its string argument on the returned channel.
    async fn expose_bridge(&self, name: &str)
        -> Result<mpsc::UnboundedReceiver<String>, ConsentError>;

    /// Evaluates a script in the page
    async fn evaluate(&self, script: &str) -> Result<(), ConsentError>;
}
