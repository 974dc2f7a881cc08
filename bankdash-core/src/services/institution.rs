//! Institution service - display metadata for a financial institution

use std::sync::Arc;

use crate::config::DEFAULT_COUNTRY_CODE;
use crate::domain::result::Result;
use crate::domain::Institution;
use crate::ports::AggregatorClient;

/// Resolves institution ids against the aggregator for one fixed country
pub struct InstitutionService {
    aggregator: Arc<dyn AggregatorClient>,
    country_codes: Vec<String>,
}

impl InstitutionService {
    pub fn new(aggregator: Arc<dyn AggregatorClient>, country_code: impl Into<String>) -> Self {
        Self {
            aggregator,
            country_codes: vec![country_code.into()],
        }
    }

    /// Service restricted to US institutions
    pub fn us(aggregator: Arc<dyn AggregatorClient>) -> Self {
        Self::new(aggregator, DEFAULT_COUNTRY_CODE)
    }

    pub fn country_code(&self) -> &str {
        &self.country_codes[0]
    }

    /// Fetch the institution record, unchanged
    pub async fn get_institution(&self, institution_id: &str) -> Result<Institution> {
        self.aggregator
            .institutions_get_by_id(institution_id, &self.country_codes)
            .await
            .map_err(|e| {
                tracing::error!(institution_id, "failed to get institution: {}", e);
                e
            })
    }
}
