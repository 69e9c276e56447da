//! Entity store selection.

use serde::{Deserialize, Serialize};

/// Which entity store backs the pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL via sqlx.
    #[default]
    Postgres,
    /// Process-local store; state is lost on exit.
    Memory,
}

/// Entity store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Apply pending SQL migrations when the PostgreSQL store is opened.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            run_migrations: true,
        }
    }
}

fn default_true() -> bool {
    true
}
