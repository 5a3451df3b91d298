//! Upstream HTTP clients.
//!
//! # Responsibilities
//! - Build the clients that talk to route targets
//! - Pick the verifying or non-verifying client per binding
//!
//! # Design Decisions
//! - HTTP/1.1 only: upgrades need it and dev backends speak it
//! - Redirects are relayed to the browser, never followed
//! - System proxy settings are ignored; targets are usually localhost
//! - The non-verifying client exists only if some route asks for it

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

use crate::routing::{RouteBinding, RouteTable};

/// Idle upstream connections are kept this long for reuse.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Clients shared by every exchange.
#[derive(Debug, Clone)]
pub struct UpstreamClients {
    verified: Client,
    insecure: Option<Client>,
}

impl UpstreamClients {
    /// Build the clients `table` needs.
    pub fn new(table: &RouteTable) -> Result<Self, reqwest::Error> {
        let verified = builder().build()?;
        let insecure = if table.needs_insecure_client() {
            Some(builder().danger_accept_invalid_certs(true).build()?)
        } else {
            None
        };

        Ok(Self { verified, insecure })
    }

    /// Client to use for exchanges on `binding`.
    pub fn for_binding(&self, binding: &RouteBinding) -> &Client {
        match (&self.insecure, binding.skips_tls_verification()) {
            (Some(insecure), true) => insecure,
            _ => &self.verified,
        }
    }

    #[cfg(test)]
    fn has_insecure(&self) -> bool {
        self.insecure.is_some()
    }
}

fn builder() -> reqwest::ClientBuilder {
    Client::builder()
        .http1_only()
        .redirect(Policy::none())
        .no_proxy()
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
}
