//! Choosing a ledger store at startup.
//!
//! Every storage crate exports one [`RepositoryFactory`]. A binary registers
//! the factories it links against and opens whichever one
//! [`DbConfig::backend`] names.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::repository::{LedgerRepository, RepositoryError};

/// Which store holds the ledger, and how to reach it.
///
/// | backend  | connection_string                         |
/// |----------|-------------------------------------------|
/// | `sqlite` | file path or `sqlite:` URL, or `:memory:` |
/// | `memory` | ignored                                   |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "ledger.db".to_string(),
        }
    }
}

#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Name matched against [`DbConfig::backend`].
    fn backend_name(&self) -> &'static str;

    /// Open the store, preparing its schema if it needs one.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError>;
}

/// Linked ledger backends, keyed by name.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: BTreeMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend. A later factory with the same name wins.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        let name = factory.backend_name();
        if self.factories.insert(name, factory).is_some() {
            debug!(backend = name, "replaced ledger backend");
        }
    }

    /// Registered backend names in alphabetical order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Open the store `config` asks for.
    ///
    /// Fails with [`RepositoryError::Configuration`] when no backend of that
    /// name is registered; otherwise returns whatever the factory does.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "no ledger backend named '{}' (available: {})",
                config.backend,
                self.available_backends().join(", ")
            )));
        };

        debug!(backend = %config.backend, "opening ledger store");
        factory.create(config).await
    }
}
