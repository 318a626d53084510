//! # Historic Source
//!
//! The request/response seam for historic windows. The session only knows
//! this trait; the HTTP implementation lives in `retrieve::history_http`.

use std::future::Future;

use crate::error::TelemetryError;
use crate::model::{HistoricRecord, Sensor};

/// Largest row count the historic endpoint will return.
pub const MAX_HISTORY_LIMIT: u32 = 10_000;

/// Parameters of one historic request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub tenant_id: u64,
    pub metric: String,
    pub limit: u32,
}

impl HistoryQuery {
    /// One row per window minute, clamped to what the backend accepts.
    pub fn for_window(tenant_id: u64, sensor: &Sensor, window_minutes: u32) -> Self {
        Self {
            tenant_id,
            metric: sensor.sensor_type.clone(),
            limit: window_minutes.clamp(1, MAX_HISTORY_LIMIT),
        }
    }
}

/// Fetches historic rows, oldest first.
pub trait HistoricSource: Send + Sync + 'static {
    fn fetch_history(
        &self,
        query: HistoryQuery,
    ) -> impl Future<Output = Result<Vec<HistoricRecord>, TelemetryError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::heart_rate;

    #[test]
    fn window_is_clamped() {
        assert_eq!(HistoryQuery::for_window(1, &heart_rate(), 60).limit, 60);
        assert_eq!(HistoryQuery::for_window(1, &heart_rate(), 0).limit, 1);
        assert_eq!(HistoryQuery::for_window(1, &heart_rate(), 50_000).limit, MAX_HISTORY_LIMIT);
        assert_eq!(HistoryQuery::for_window(1, &heart_rate(), 5).metric, "heart_rate");
    }
}
