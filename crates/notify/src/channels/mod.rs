//! Notification backend implementations.

pub mod opsgenie;

use async_trait::async_trait;

use crate::messages::Messages;

/// Trait for notification backends (OpsGenie, etc.).
///
/// Backends are selected at runtime by [`Notifier::name`] and invoked
/// uniformly by the pipeline.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the name used to select this backend.
    fn name(&self) -> &'static str;

    /// Check if this backend is enabled.
    fn enabled(&self) -> bool;

    /// Independent copy of this backend with the same configuration.
    fn boxed_clone(&self) -> Box<dyn Notifier>;

    /// Run one notification cycle for `messages`.
    ///
    /// Returns `true` only if every message was dispatched. Failures are
    /// logged, never propagated.
    async fn notify(&self, messages: &Messages) -> bool;
}

impl Clone for Box<dyn Notifier> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}
