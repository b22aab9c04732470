use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::analysis::result::AnalysisResult;
use crate::diff::diff_model::{ChangeRecord, DiffSummary};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("delivery endpoint {endpoint} answered {status}")]
    Status { endpoint: String, status: u16 },
}

/// The diff-summary subset of a result, for downstream telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffTelemetry {
    pub url: Option<String>,
    pub timestamp: u128,
    pub is_baseline: bool,
    pub summary: DiffSummary,
    pub change_rate: f64,
    pub significant_changes: Vec<ChangeRecord>,
}

impl DiffTelemetry {
    /// `None` when the result carries no diff.
    pub fn from_result(result: &AnalysisResult) -> Option<Self> {
        let diff = result.dom_diff.as_ref()?;
        Some(Self {
            url: result.url.clone(),
            timestamp: diff.timestamp,
            is_baseline: diff.is_baseline,
            summary: diff.summary,
            change_rate: diff.change_rate,
            significant_changes: diff.significant_changes.clone(),
        })
    }
}

pub trait DeliverySink: Send {
    fn deliver(&self, telemetry: &DiffTelemetry) -> Result<(), DeliveryError>;
}

impl<T: DeliverySink + Sync> DeliverySink for Arc<T> {
    fn deliver(&self, telemetry: &DiffTelemetry) -> Result<(), DeliveryError> {
        (**self).deliver(telemetry)
    }
}

// ============================================================================
// HTTP sink
// ============================================================================

/// Posts telemetry as JSON to a fixed endpoint.
pub struct HttpDelivery {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpDelivery {
    pub fn new(endpoint: &str) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|source| DeliveryError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl DeliverySink for HttpDelivery {
    fn deliver(&self, telemetry: &DiffTelemetry) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(telemetry)
            .send()
            .map_err(|source| DeliveryError::Http {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }
        debug!(endpoint = %self.endpoint, "telemetry delivered");
        Ok(())
    }
}

// ============================================================================
// In-memory sink (for testing without a server)
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryDelivery {
    delivered: Mutex<Vec<DiffTelemetry>>,
}

impl MemoryDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<DiffTelemetry> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl DeliverySink for MemoryDelivery {
    fn deliver(&self, telemetry: &DiffTelemetry) -> Result<(), DeliveryError> {
        let mut delivered = self
            .delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        delivered.push(telemetry.clone());
        Ok(())
    }
}
