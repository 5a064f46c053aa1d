//! Health-check alert notifiers.
//!
//! This crate takes a batch of Consul health-check messages assembled by
//! the alerting pipeline and forwards it to alerting backends. Each backend
//! decides how a message becomes a remote call; the OpsGenie backend opens
//! alerts for failing checks and closes them once the check passes again.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Message, Messages, NotifierRegistry, OpsGenieNotifier, Status};
//!
//! # async fn run() {
//! let mut registry = NotifierRegistry::new();
//! registry.register(Box::new(OpsGenieNotifier::from_env()));
//!
//! let messages = Messages::new(vec![Message {
//!     node: "host1".to_string(),
//!     service: "db".to_string(),
//!     check: "disk".to_string(),
//!     status: Status::Critical,
//!     output: "disk full".to_string(),
//!     ..Message::default()
//! }]);
//!
//! for (name, ok) in registry.notify_all(&messages).await {
//!     println!("{name}: {ok}");
//! }
//! # }
//! ```
//!
//! # Configuration
//!
//! The OpsGenie backend reads `OPSGENIE_ENABLED`, `OPSGENIE_CLUSTER_NAME`,
//! `OPSGENIE_API_KEY` and `OPSGENIE_API_URL`, or a JSON/TOML file with the
//! keys `enabled`, `cluster-name`, `api-key` and `api-url`.
//!
//! # Architecture
//!
//! - [`Notifier`] trait defines the interface for notification backends
//! - [`OpsGenieNotifier`] implements OpsGenie alert notifications
//! - [`NotifierRegistry`] selects backends by name and runs the enabled ones
//! - [`cli`] drives one notification cycle for the `opsgenie-notify` binary

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod cli;
pub mod config;
pub mod error;
pub mod messages;

pub use channels::opsgenie::{AlertApi, OpsGenieClient, OpsGenieNotifier};
pub use channels::Notifier;
pub use config::OpsGenieConfig;
pub use error::{NotifyError, NotifyResult};
pub use messages::{Message, Messages, OverallStatus, Status, Summary};

use tracing::{debug, info, warn};

/// Set of notification backends, looked up by name.
#[derive(Clone, Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend, replacing any existing backend with the same name.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        let name = notifier.name();
        if let Some(slot) = self.notifiers.iter_mut().find(|n| n.name() == name) {
            debug!(notifier = name, "Replacing registered notifier");
            *slot = notifier;
        } else {
            self.notifiers.push(notifier);
        }
    }

    /// Look up a backend by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Notifier> {
        self.notifiers
            .iter()
            .find(|n| n.name() == name)
            .map(|n| n.as_ref())
    }

    /// Names of all registered backends, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Get the number of enabled backends.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.notifiers.iter().filter(|n| n.enabled()).count()
    }

    /// Run every enabled backend on `messages` and wait for all of them.
    ///
    /// Backends run one after another. Disabled backends are skipped and
    /// do not appear in the result.
    pub async fn notify_all(&self, messages: &Messages) -> Vec<(String, bool)> {
        let mut results = vec![];

        for notifier in &self.notifiers {
            let name = notifier.name();

            if !notifier.enabled() {
                debug!(notifier = name, "Notifier disabled, skipping");
                continue;
            }

            let ok = notifier.notify(messages).await;
            if ok {
                info!(notifier = name, count = messages.len(), "Notification cycle complete");
            } else {
                warn!(notifier = name, count = messages.len(), "Notification cycle had failures");
            }
            results.push((name.to_string(), ok));
        }

        results
    }
}
