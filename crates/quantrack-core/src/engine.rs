use crate::aggregation::Analytics;
use crate::certificate::{CertificateIssuer, DEFAULT_VERIFICATION_BASE};
use crate::error::QuantrackResult;
use crate::membership::MembershipManager;
use crate::participation::ParticipationManager;
use crate::registry::Registry;
use crate::storage::StorageConfig;
use quantrack_store::QuantrackStorage;
use std::sync::Arc;
use tracing::info;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    /// Base URL certificates point at for public verification.
    pub verification_base: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::Memory,
            verification_base: DEFAULT_VERIFICATION_BASE.to_string(),
        }
    }
}

/// Facade bundling the managers over one shared store.
#[derive(Clone)]
pub struct QuantrackEngine {
    store: Arc<dyn QuantrackStorage>,
    registry: Registry,
    memberships: MembershipManager,
    participations: ParticipationManager,
    analytics: Analytics,
    certificates: CertificateIssuer,
}

impl QuantrackEngine {
    pub async fn bootstrap(config: EngineConfig) -> QuantrackResult<Self> {
        let store = config.storage.connect().await?;
        info!(
            backend = store.backend_label(),
            verification_base = %config.verification_base,
            "quantrack engine ready"
        );
        Ok(Self::with_store(store, &config.verification_base))
    }

    pub fn with_store(store: Arc<dyn QuantrackStorage>, verification_base: &str) -> Self {
        Self {
            registry: Registry::new(store.clone()),
            memberships: MembershipManager::new(store.clone()),
            participations: ParticipationManager::new(store.clone()),
            analytics: Analytics::new(store.clone()),
            certificates: CertificateIssuer::new(store.clone(), verification_base),
            store,
        }
    }

    pub fn backend_label(&self) -> &'static str {
        self.store.backend_label()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn memberships(&self) -> &MembershipManager {
        &self.memberships
    }

    pub fn participations(&self) -> &ParticipationManager {
        &self.participations
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn certificates(&self) -> &CertificateIssuer {
        &self.certificates
    }
}
