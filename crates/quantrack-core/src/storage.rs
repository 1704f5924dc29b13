use crate::error::QuantrackResult;
#[cfg(feature = "postgres")]
use quantrack_store::postgres::PostgresQuantrackStorage;
use quantrack_store::{InMemoryQuantrackStorage, QuantrackStorage};
use std::sync::Arc;

/// Pool acquire timeout, in seconds.
#[cfg(feature = "postgres")]
const POSTGRES_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Storage backend selection for the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageConfig {
    /// Keep every record in process memory; lost on restart.
    #[default]
    Memory,
    /// Persist records in PostgreSQL. Requires the `postgres` feature.
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn postgres(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self::Postgres {
            database_url: database_url.into(),
            max_connections,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }

    /// Open the configured backend.
    pub async fn connect(&self) -> QuantrackResult<Arc<dyn QuantrackStorage>> {
        match self {
            Self::Memory => Ok(Arc::new(InMemoryQuantrackStorage::new())),
            #[cfg(feature = "postgres")]
            Self::Postgres {
                database_url,
                max_connections,
            } => {
                let store = PostgresQuantrackStorage::connect_with_options(
                    database_url,
                    *max_connections,
                    POSTGRES_CONNECT_TIMEOUT_SECS,
                )
                .await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "postgres"))]
            Self::Postgres { .. } => Err(crate::error::QuantrackError::validation(
                "postgres storage needs quantrack-core built with the `postgres` feature",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_config_connects() {
        assert_eq!(StorageConfig::default(), StorageConfig::memory());
        let store = StorageConfig::default().connect().await.unwrap();
        assert_eq!(store.backend_label(), "memory");
        assert_eq!(StorageConfig::postgres("postgres://x", 4).label(), "postgres");
    }
}
