//! # HTTP Historic Source
//!
//! `GET <history_path>?tenant_id=..&metric=..&limit=..` against the
//! backend. The body is either `{"data": [...], "count": n}` (with `data`
//! possibly `null`) or a bare array of rows.

use std::time::Duration;

use serde::Deserialize;

use crate::engine::history::{HistoricSource, HistoryQuery};
use crate::error::TelemetryError;
use crate::model::HistoricRecord;
use crate::retrieve::ky_http::ApiClient;

/// Path of the history endpoint relative to the API base.
pub const DEFAULT_HISTORY_PATH: &str = "api/history";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryPayload {
    Envelope {
        #[serde(default)]
        data: Option<Vec<HistoricRecord>>,
    },
    Rows(Vec<HistoricRecord>),
}

impl HistoryPayload {
    fn into_records(self) -> Vec<HistoricRecord> {
        match self {
            HistoryPayload::Envelope { data } => data.unwrap_or_default(),
            HistoryPayload::Rows(rows) => rows,
        }
    }
}

/// [`HistoricSource`] over the backend REST API.
#[derive(Debug, Clone)]
pub struct HttpHistoricSource {
    client: ApiClient,
    history_path: String,
}

impl HttpHistoricSource {
    /// `api_base` is the absolute API root, e.g. `http://localhost:8080/`.
    pub fn new(api_base: &str, max_retries: u32, timeout: Duration) -> Result<Self, TelemetryError> {
        let client = ApiClient::new(api_base, None, max_retries, timeout)
            .map_err(|e| TelemetryError::InvalidEndpoint(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: ApiClient) -> Self {
        Self {
            client,
            history_path: DEFAULT_HISTORY_PATH.to_string(),
        }
    }

    pub fn with_path(mut self, history_path: impl Into<String>) -> Self {
        self.history_path = history_path.into();
        self
    }
}

impl HistoricSource for HttpHistoricSource {
    async fn fetch_history(&self, query: HistoryQuery) -> Result<Vec<HistoricRecord>, TelemetryError> {
        let params = [
            ("tenant_id", query.tenant_id.to_string()),
            ("metric", query.metric.clone()),
            ("limit", query.limit.to_string()),
        ];

        let response = self
            .client
            .get_json::<HistoryPayload>(&self.history_path, &params)
            .await
            .map_err(|e| TelemetryError::Fetch(format!("{:#}", e)))?;

        if !response.success {
            return Err(TelemetryError::HttpStatus {
                status: response.status,
                body: response.error_body.unwrap_or_default(),
            });
        }

        let records = response.data.map(HistoryPayload::into_records).unwrap_or_default();
        log::debug!(
            "History for tenant {} / '{}': {} rows",
            query.tenant_id,
            query.metric,
            records.len()
        );
        Ok(records)
    }
}
