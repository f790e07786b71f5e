//! Environment for the booking flow.

use crate::backend::ParkingBackend;
use crate::config::Config;
use crate::session::IdentityProvider;
use parkbook_core::environment::Clock;
use parkbook_runtime::RetryPolicy;
use std::sync::Arc;

/// Collaborators and settings the booking flow reducer runs with
#[derive(Clone)]
pub struct FlowEnvironment {
    /// Clock for "today" in date validation
    pub clock: Arc<dyn Clock>,
    /// Authoritative store
    pub backend: Arc<dyn ParkingBackend>,
    /// Session
    pub identity: Arc<dyn IdentityProvider>,
    /// Backoff for catalog reads
    pub refresh_policy: RetryPolicy,
    /// Longest booking accepted, in hours
    pub max_duration_hours: u32,
}

impl FlowEnvironment {
    /// Environment with default settings.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        backend: Arc<dyn ParkingBackend>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self::with_config(clock, backend, identity, &Config::default())
    }

    /// Environment with settings from `config`.
    #[must_use]
    pub fn with_config(
        clock: Arc<dyn Clock>,
        backend: Arc<dyn ParkingBackend>,
        identity: Arc<dyn IdentityProvider>,
        config: &Config,
    ) -> Self {
        Self {
            clock,
            backend,
            identity,
            refresh_policy: config.retry_policy(),
            max_duration_hours: config.booking.max_duration_hours,
        }
    }

    /// Replace the catalog read backoff.
    #[must_use]
    pub fn with_refresh_policy(mut self, policy: RetryPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }
}
