//! # Sensor Listing
//!
//! Where the selectable sensors come from. [`StaticCatalog`] serves the
//! built-in catalog; `retrieve::sensors_http` asks the backend for the
//! tenant's sensors. Either way the list lands in a `SensorDirectory`,
//! which the session exposes as `sensors` / `sensors_loading` /
//! `sensors_error` cells.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::TelemetryError;
use crate::model::{default_catalog, Sensor};
use crate::observable::Observable;

/// Lists the sensors a consumer may select.
pub trait SensorSource: Send + Sync + 'static {
    fn fetch_sensors(&self) -> impl Future<Output = Result<Vec<Sensor>, TelemetryError>> + Send;
}

/// The built-in catalog, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl SensorSource for StaticCatalog {
    async fn fetch_sensors(&self) -> Result<Vec<Sensor>, TelemetryError> {
        Ok(default_catalog())
    }
}

/// Cells holding the last sensor listing.
///
/// A failed load keeps the previous list and records the error.
#[derive(Debug, Default)]
pub(crate) struct SensorDirectory {
    generation: Mutex<u64>,
    pub(crate) sensors: Observable<Vec<Sensor>>,
    pub(crate) loading: Observable<bool>,
    pub(crate) error: Observable<Option<TelemetryError>>,
}

impl SensorDirectory {
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn begin(&self) -> u64 {
        let mut generation = self.lock();
        *generation += 1;
        self.loading.set(true);
        self.error.set(None);
        *generation
    }

    pub(crate) fn complete(&self, generation: u64, result: Result<Vec<Sensor>, TelemetryError>) {
        let current = self.lock();
        if *current != generation {
            log::debug!(
                "Discarding sensor listing #{} (current #{})",
                generation,
                *current
            );
            return;
        }
        match result {
            Ok(sensors) => {
                log::info!("Loaded {} sensors", sensors.len());
                self.sensors.set(sensors);
            }
            Err(e) => {
                log::warn!("Sensor listing failed: {}", e);
                self.error.set(Some(e));
            }
        }
        self.loading.set(false);
    }

    pub(crate) fn fail(&self, error: TelemetryError) {
        let _generation = self.lock();
        self.loading.set(false);
        self.error.set(Some(error));
    }

    pub(crate) fn clear(&self) {
        let mut generation = self.lock();
        *generation += 1;
        self.sensors.set(Vec::new());
        self.loading.set(false);
        self.error.set(None);
    }

    /// Looks a listed sensor up by id.
    pub(crate) fn find(&self, id: &str) -> Option<Sensor> {
        self.sensors
            .with(|sensors| sensors.iter().find(|s| s.id == id).cloned())
    }
}
