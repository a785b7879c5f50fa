// libs/booking-cell/src/services/catalog.rs

use tracing::debug;

use crate::models::{CatalogEntry, SchedulingError, ServiceType};

/// Read-only view of the service-type catalog. The engine resolves duration
/// and price through this at the moment it needs them; nothing here is ever
/// cached on an appointment record.
pub struct ServiceCatalog {
    entries: Vec<CatalogEntry>,
}

impl ServiceCatalog {
    pub fn standard() -> Self {
        Self {
            entries: CatalogEntry::standard_entries(),
        }
    }

    /// Catalog with overridden entries, for price updates and tests.
    pub fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn resolve(&self, service_type: &ServiceType) -> Result<&CatalogEntry, SchedulingError> {
        debug!("Resolving catalog entry for service type {}", service_type);

        self.entries
            .iter()
            .find(|entry| entry.service_type == *service_type)
            .ok_or_else(|| {
                SchedulingError::InvalidRequest(format!(
                    "No catalog entry for service type {}",
                    service_type
                ))
            })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
