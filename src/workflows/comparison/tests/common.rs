use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::comparison::domain::{
    AiScoreSet, Dimension, DimensionKind, DimensionScore, Proposal, ProposalDetails, ProposalId,
    ProposalScores, ProposalStatus, Rfp, RfpId, RfpStatus,
};
use crate::workflows::comparison::gateway::{AnalysisError, AnalysisGateway};
use crate::workflows::comparison::repository::{
    ComparisonStore, MemoryComparisonStore, MemoryProposalStore, ProposalStore, StoreError,
};
use crate::workflows::comparison::router::comparison_router;
use crate::workflows::comparison::service::ComparisonService;
use crate::workflows::comparison::SavedComparison;

pub(super) fn open_rfp(id: &str) -> Rfp {
    Rfp {
        id: RfpId(id.to_string()),
        title: "Roof Replacement - Cedar Ridge Office Park".to_string(),
        description: Some("Full tear-off and replacement of four roof sections.".to_string()),
        requirements: vec![
            "Install TPO membrane with R-30 insulation".to_string(),
            "Provide manufacturer-backed 20 year warranty".to_string(),
        ],
        budget: Some(450_000.0),
        currency: "USD".to_string(),
        deadline: None,
        status: RfpStatus::Open,
    }
}

pub(super) fn proposal(
    id: &str,
    rfp_id: &str,
    vendor: &str,
    price: Option<&str>,
    status: ProposalStatus,
) -> Proposal {
    Proposal {
        id: ProposalId(id.to_string()),
        rfp_id: RfpId(rfp_id.to_string()),
        vendor: vendor.to_string(),
        price: price.map(str::to_string),
        currency: "USD".to_string(),
        status,
        start_date: None,
        details: ProposalDetails::default(),
        extracted_text: None,
        bid_rows: Vec::new(),
    }
}

pub(super) fn dynamic_dimension(id: &str, name: &str, keywords: &[&str]) -> Dimension {
    Dimension {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        kind: DimensionKind::Dynamic,
        keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
    }
}

/// Score set builder: `(proposal id, vendor, [(dimension, score)], overall)`.
pub(super) fn ai_scores(entries: &[(&str, &str, &[(&str, u8)], u8)]) -> AiScoreSet {
    AiScoreSet {
        proposals: entries
            .iter()
            .map(|(id, vendor, scores, overall)| ProposalScores {
                id: ProposalId(id.to_string()),
                vendor: vendor.to_string(),
                scores: scores
                    .iter()
                    .map(|(dimension, score)| {
                        (
                            dimension.to_string(),
                            DimensionScore {
                                score: *score,
                                label: "Strong".to_string(),
                                reasoning: None,
                            },
                        )
                    })
                    .collect::<BTreeMap<_, _>>(),
                overall_score: *overall,
            })
            .collect(),
    }
}

/// Gateway double scripted per test: `None` plays an unreachable backend.
#[derive(Default)]
pub(super) struct ScriptedAnalysis {
    pub(super) dimensions: Mutex<Option<Vec<Dimension>>>,
    pub(super) scores: Mutex<Option<AiScoreSet>>,
    pub(super) discover_calls: AtomicUsize,
    pub(super) score_calls: AtomicUsize,
}

impl ScriptedAnalysis {
    pub(super) fn with_scores(scores: AiScoreSet) -> Self {
        let gateway = Self::default();
        *gateway.scores.lock().expect("scores mutex poisoned") = Some(scores);
        gateway
    }

    pub(super) fn with_dimensions(dimensions: Vec<Dimension>) -> Self {
        let gateway = Self::default();
        *gateway.dimensions.lock().expect("dimensions mutex poisoned") = Some(dimensions);
        gateway
    }
}

impl AnalysisGateway for ScriptedAnalysis {
    fn discover_dimensions(&self, _rfp: &Rfp) -> Result<Vec<Dimension>, AnalysisError> {
        self.discover_calls.fetch_add(1, Ordering::Relaxed);
        self.dimensions
            .lock()
            .expect("dimensions mutex poisoned")
            .clone()
            .ok_or(AnalysisError::Disabled)
    }

    fn score_proposals(
        &self,
        _rfp: &Rfp,
        _proposals: &[&Proposal],
        _dimension_ids: &[String],
    ) -> Result<AiScoreSet, AnalysisError> {
        self.score_calls.fetch_add(1, Ordering::Relaxed);
        self.scores
            .lock()
            .expect("scores mutex poisoned")
            .clone()
            .ok_or(AnalysisError::Disabled)
    }
}

/// Comparison store wrapper counting snapshot fetches, for the one-shot
/// restoration guard.
#[derive(Default, Clone)]
pub(super) struct SpyComparisonStore {
    inner: MemoryComparisonStore,
    pub(super) fetch_calls: Arc<AtomicUsize>,
}

impl SpyComparisonStore {
    pub(super) fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::Relaxed)
    }
}

impl ComparisonStore for SpyComparisonStore {
    fn fetch(&self, rfp_id: &RfpId) -> Result<Option<SavedComparison>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.fetch(rfp_id)
    }

    fn save(&self, comparison: SavedComparison) -> Result<SavedComparison, StoreError> {
        self.inner.save(comparison)
    }

    fn list(&self) -> Result<Vec<SavedComparison>, StoreError> {
        self.inner.list()
    }

    fn delete(&self, rfp_id: &RfpId) -> Result<bool, StoreError> {
        self.inner.delete(rfp_id)
    }
}

pub(super) type TestService =
    ComparisonService<MemoryProposalStore, SpyComparisonStore, ScriptedAnalysis>;

pub(super) fn build_service(
    gateway: ScriptedAnalysis,
) -> (
    Arc<TestService>,
    Arc<MemoryProposalStore>,
    Arc<SpyComparisonStore>,
    Arc<ScriptedAnalysis>,
) {
    let proposals = Arc::new(MemoryProposalStore::default());
    let comparisons = Arc::new(SpyComparisonStore::default());
    let gateway = Arc::new(gateway);
    let service = Arc::new(ComparisonService::new(
        proposals.clone(),
        comparisons.clone(),
        gateway.clone(),
    ));
    (service, proposals, comparisons, gateway)
}

/// Seed one open RFP with the given proposals.
pub(super) fn seed_rfp(
    proposals_store: &MemoryProposalStore,
    rfp_id: &str,
    proposals: Vec<Proposal>,
) {
    proposals_store
        .insert_rfp(open_rfp(rfp_id))
        .expect("fresh store accepts rfp");
    for proposal in proposals {
        proposals_store
            .insert_proposal(proposal)
            .expect("fresh store accepts proposal");
    }
}

pub(super) fn test_router(service: Arc<TestService>) -> axum::Router {
    comparison_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
