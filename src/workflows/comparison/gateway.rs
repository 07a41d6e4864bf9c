use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::runtime::Runtime;

use crate::config::AnalysisConfig;

use super::domain::{AiScoreSet, Dimension, Proposal, ProposalId, Rfp};

/// Failures talking to the analysis backend. All of them are recoverable:
/// callers degrade to the general dimension set or the fallback heuristics.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("no analysis backend configured")]
    Disabled,
    #[error("analysis runtime unavailable: {0}")]
    Runtime(String),
    #[error("analysis request failed: {0}")]
    Transport(String),
    #[error("analysis backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("analysis response could not be decoded: {0}")]
    Decode(String),
}

/// Outbound seam to the AI analysis service: per-RFP dimension discovery and
/// proposal comparison scoring.
pub trait AnalysisGateway: Send + Sync {
    fn discover_dimensions(&self, rfp: &Rfp) -> Result<Vec<Dimension>, AnalysisError>;

    fn score_proposals(
        &self,
        rfp: &Rfp,
        proposals: &[&Proposal],
        dimension_ids: &[String],
    ) -> Result<AiScoreSet, AnalysisError>;
}

/// Gateway used when no analysis backend is configured. Every call reports
/// [`AnalysisError::Disabled`], which callers treat as "work locally".
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAnalysis;

impl AnalysisGateway for OfflineAnalysis {
    fn discover_dimensions(&self, _rfp: &Rfp) -> Result<Vec<Dimension>, AnalysisError> {
        Err(AnalysisError::Disabled)
    }

    fn score_proposals(
        &self,
        _rfp: &Rfp,
        _proposals: &[&Proposal],
        _dimension_ids: &[String],
    ) -> Result<AiScoreSet, AnalysisError> {
        Err(AnalysisError::Disabled)
    }
}

#[derive(Debug, Serialize)]
struct DiscoverDimensionsRequest<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    requirements: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct DiscoverDimensionsResponse {
    #[serde(default)]
    dimensions: Vec<Dimension>,
}

#[derive(Debug, Serialize)]
struct CompareRequest<'a> {
    proposal_ids: Vec<&'a ProposalId>,
    dimensions: &'a [String],
}

/// Thin wrapper around the analysis backend's HTTP API allowing synchronous
/// workflows to call it without exposing async details.
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    runtime: Runtime,
}

impl HttpAnalysisClient {
    /// Build a client from configuration. Requires `base_url` to be set; the
    /// request timeout comes from `timeout_secs` so a hung backend cannot pin
    /// an in-flight call forever.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or(AnalysisError::Disabled)?
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| AnalysisError::Runtime(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            runtime,
        })
    }

    fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, AnalysisError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .runtime
            .block_on(async {
                let mut request = self.client.post(&url).json(body);
                if let Some(key) = &self.api_key {
                    request = request.bearer_auth(key);
                }
                request.send().await
            })
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = self
                .runtime
                .block_on(response.text())
                .unwrap_or_default();
            return Err(AnalysisError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        self.runtime
            .block_on(response.json::<R>())
            .map_err(|err| AnalysisError::Decode(err.to_string()))
    }
}

impl std::fmt::Debug for HttpAnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAnalysisClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AnalysisGateway for HttpAnalysisClient {
    fn discover_dimensions(&self, rfp: &Rfp) -> Result<Vec<Dimension>, AnalysisError> {
        let request = DiscoverDimensionsRequest {
            title: &rfp.title,
            description: rfp.description.as_deref(),
            requirements: &rfp.requirements,
            budget: rfp.budget,
            deadline: rfp.deadline,
        };
        let response: DiscoverDimensionsResponse =
            self.post_json(&format!("analysis/rfp/{}/dimensions", rfp.id), &request)?;
        Ok(response.dimensions)
    }

    fn score_proposals(
        &self,
        rfp: &Rfp,
        proposals: &[&Proposal],
        dimension_ids: &[String],
    ) -> Result<AiScoreSet, AnalysisError> {
        let request = CompareRequest {
            proposal_ids: proposals.iter().map(|proposal| &proposal.id).collect(),
            dimensions: dimension_ids,
        };
        self.post_json(&format!("analysis/rfp/{}/compare", rfp.id), &request)
    }
}
