use reqwest::Client;
use tracing::{debug, instrument};

use quiz_core::model::{PerformanceReport, ReportRange};

use crate::config::SupplierConfig;
use crate::error::{ConfigError, DashboardError};

/// Reads the server-side performance dashboard (`GET {base}/api/desempenho`).
#[derive(Clone)]
pub struct DashboardClient {
    client: Client,
    config: SupplierConfig,
}

impl DashboardClient {
    /// # Errors
    ///
    /// Returns `ConfigError::Client` if the HTTP client cannot be built.
    pub fn new(config: SupplierConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: config.http_client()?,
            config,
        })
    }

    /// Fetch the report for an inclusive date range.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError` when the request fails, the server answers with
    /// a non-success status, or the body is not a report.
    #[instrument(skip(self), fields(from = %range.from, to = %range.to))]
    pub async fn fetch_performance(
        &self,
        range: ReportRange,
    ) -> Result<PerformanceReport, DashboardError> {
        let mut url = self.config.endpoint(&["api", "desempenho"]);
        url.query_pairs_mut().extend_pairs(range.query_pairs());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DashboardError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::HttpStatus(response.status()));
        }

        let report: PerformanceReport = response
            .json()
            .await
            .map_err(|e| DashboardError::Decode(e.to_string()))?;
        debug!(
            correct = report.correct,
            incorrect = report.incorrect,
            days = report.timeline.len(),
            "performance report fetched"
        );
        Ok(report)
    }
}
