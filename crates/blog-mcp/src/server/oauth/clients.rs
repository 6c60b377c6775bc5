//! Static OAuth client registry.

use std::collections::HashMap;

use crate::config::ClientConfig;

/// Registered clients keyed by `client_id`.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, ClientConfig>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new(clients: impl IntoIterator<Item = ClientConfig>) -> Self {
        Self { clients: clients.into_iter().map(|c| (c.client_id.clone(), c)).collect() }
    }

    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<&ClientConfig> {
        self.clients.get(client_id)
    }

    /// The client, if `client_id` is registered and `redirect_uri` is one of
    /// its redirect URIs (exact string match).
    #[must_use]
    pub fn verify(&self, client_id: &str, redirect_uri: &str) -> Option<&ClientConfig> {
        self.get(client_id).filter(|c| c.redirect_uris.iter().any(|u| u == redirect_uri))
    }

    /// Union of every client's allowed scopes, sorted.
    #[must_use]
    pub fn scopes_supported(&self) -> Vec<String> {
        let mut scopes: Vec<String> =
            self.clients.values().flat_map(|c| c.allowed_scopes.iter().cloned()).collect();
        scopes.sort();
        scopes.dedup();
        scopes
    }
}
