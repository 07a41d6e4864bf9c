use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

use super::catalog::{general_dimensions, sanitize_dynamic_dimensions, DimensionSelection};
use super::domain::{
    AiScoreSet, DecisionError, Dimension, DimensionKind, Proposal, ProposalId, Rfp, RfpId,
    SavedComparison,
};
use super::filter::eligible_proposals;
use super::gateway::AnalysisGateway;
use super::matrix::{build_matrix, ComparisonMatrix};
use super::repository::{ComparisonStore, ProposalStore, StoreError};
use super::scoring::{ScoreEngine, ScoreRow};

/// Lifecycle of an RFP's comparison report relative to its persisted
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    /// Nothing persisted yet; the user has to pick dimensions and generate.
    NoSnapshot,
    /// Snapshot matches the live eligible proposal set; cached scores are
    /// shown without another backend call.
    Fresh,
    /// The eligible set diverged from the snapshot; the report stays hidden
    /// until regenerated.
    Stale,
}

impl ReportState {
    pub const fn label(self) -> &'static str {
        match self {
            ReportState::NoSnapshot => "no_snapshot",
            ReportState::Fresh => "fresh",
            ReportState::Stale => "stale",
        }
    }
}

/// Request kinds whose in-flight status is tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FetchKind {
    Dimensions,
    Scores,
    Snapshot,
    SavedComparisons,
}

impl FetchKind {
    pub const fn label(self) -> &'static str {
        match self {
            FetchKind::Dimensions => "dimensions",
            FetchKind::Scores => "scores",
            FetchKind::Snapshot => "snapshot",
            FetchKind::SavedComparisons => "saved_comparisons",
        }
    }
}

/// Explicit map from request kind to in-flight status, so concurrent
/// indicators render deterministically instead of from scattered booleans.
#[derive(Debug, Default)]
pub struct LoadingTracker {
    in_flight: Mutex<BTreeMap<FetchKind, usize>>,
}

impl LoadingTracker {
    pub fn begin(&self, kind: FetchKind) -> LoadingGuard<'_> {
        let mut guard = self.in_flight.lock().expect("loading mutex poisoned");
        *guard.entry(kind).or_default() += 1;
        LoadingGuard {
            tracker: self,
            kind,
        }
    }

    pub fn is_loading(&self, kind: FetchKind) -> bool {
        let guard = self.in_flight.lock().expect("loading mutex poisoned");
        guard.get(&kind).copied().unwrap_or_default() > 0
    }

    fn finish(&self, kind: FetchKind) {
        let mut guard = self.in_flight.lock().expect("loading mutex poisoned");
        if let Some(count) = guard.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
    }
}

/// Clears the in-flight flag when dropped, so an early return cannot leave an
/// indicator stuck.
pub struct LoadingGuard<'a> {
    tracker: &'a LoadingTracker,
    kind: FetchKind,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish(self.kind);
    }
}

/// Per-RFP view state. Keeping sessions keyed by RFP id means a late result
/// for one RFP can only ever land on its own entry, never on whichever RFP
/// the user navigated to next.
#[derive(Debug, Clone, Default)]
struct ReportSession {
    selection: DimensionSelection,
    discovered: Vec<Dimension>,
    scores_cache: Option<AiScoreSet>,
    snapshot_ids: Option<Vec<ProposalId>>,
}

/// Report payload handed to the HTTP layer and the CLI renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub rfp_id: RfpId,
    pub rfp_title: String,
    pub state: ReportState,
    pub selected_dimensions: Vec<String>,
    pub eligible_proposal_ids: Vec<ProposalId>,
    /// Empty unless the report is fresh.
    pub rows: Vec<ScoreRow>,
    /// False when the rows came from the local heuristics rather than the
    /// analysis backend.
    pub ai_scored: bool,
}

/// Entry in the saved-comparison index.
#[derive(Debug, Clone, Serialize)]
pub struct SavedComparisonSummary {
    pub id: String,
    pub rfp_id: RfpId,
    pub rfp_title: String,
}

/// RFP index entry for the listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RfpSummary {
    pub id: RfpId,
    pub title: String,
    pub status: &'static str,
    pub proposals: usize,
}

/// Error raised by the comparison service. Analysis-backend failures never
/// appear here; those degrade to fallback behavior inside the service.
#[derive(Debug, thiserror::Error)]
pub enum ComparisonServiceError {
    #[error("rfp {0} not found")]
    RfpNotFound(RfpId),
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),
    #[error("select at least one dimension before generating a report")]
    NoDimensionsSelected,
    #[error("rfp {0} has no proposals eligible for comparison")]
    NoEligibleProposals(RfpId),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service composing the stores, the analysis gateway, and the score engine
/// behind the comparison workflow.
pub struct ComparisonService<P, C, G> {
    proposals: Arc<P>,
    comparisons: Arc<C>,
    analysis: Arc<G>,
    engine: ScoreEngine,
    sessions: Mutex<HashMap<RfpId, ReportSession>>,
    restored: Mutex<HashSet<RfpId>>,
    loading: LoadingTracker,
}

impl<P, C, G> ComparisonService<P, C, G>
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    pub fn new(proposals: Arc<P>, comparisons: Arc<C>, analysis: Arc<G>) -> Self {
        Self {
            proposals,
            comparisons,
            analysis,
            engine: ScoreEngine,
            sessions: Mutex::new(HashMap::new()),
            restored: Mutex::new(HashSet::new()),
            loading: LoadingTracker::default(),
        }
    }

    pub fn loading(&self) -> &LoadingTracker {
        &self.loading
    }

    fn rfp(&self, rfp_id: &RfpId) -> Result<Rfp, ComparisonServiceError> {
        self.proposals
            .get_rfp(rfp_id)?
            .ok_or_else(|| ComparisonServiceError::RfpNotFound(rfp_id.clone()))
    }

    /// Fetch the persisted snapshot for this RFP at most once per service
    /// lifetime. A fetch failure counts as a completed attempt: the session
    /// simply starts without a snapshot.
    fn ensure_restored(&self, rfp_id: &RfpId) -> Result<(), ComparisonServiceError> {
        {
            let restored = self.restored.lock().expect("restored mutex poisoned");
            if restored.contains(rfp_id) {
                return Ok(());
            }
        }

        let saved = {
            let _guard = self.loading.begin(FetchKind::Snapshot);
            match self.comparisons.fetch(rfp_id) {
                Ok(saved) => saved,
                Err(err) => {
                    warn!(rfp = %rfp_id, error = %err, "saved comparison fetch failed; continuing without a snapshot");
                    None
                }
            }
        };

        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let session = sessions.entry(rfp_id.clone()).or_default();
        if let Some(saved) = saved {
            session.selection = DimensionSelection::from_ids(saved.dimensions);
            session.snapshot_ids = Some(saved.proposal_ids);
            session.scores_cache = saved.scores_cache;
        }
        drop(sessions);

        self.restored
            .lock()
            .expect("restored mutex poisoned")
            .insert(rfp_id.clone());
        Ok(())
    }

    /// Current report for an RFP. Restores the snapshot on first view, then
    /// re-evaluates staleness against the live eligible set on every call.
    /// Fresh reports reuse cached scores; no analysis call happens here.
    pub fn view_report(
        &self,
        rfp_id: &RfpId,
        accepted_only: bool,
    ) -> Result<ReportView, ComparisonServiceError> {
        let rfp = self.rfp(rfp_id)?;
        self.ensure_restored(rfp_id)?;

        let proposals = self.proposals.list_proposals(rfp_id)?;
        let eligible = eligible_proposals(&proposals, rfp_id, accepted_only);
        let eligible_ids: Vec<ProposalId> =
            eligible.iter().map(|proposal| proposal.id.clone()).collect();

        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let session = sessions.entry(rfp_id.clone()).or_default();

        let state = match &session.snapshot_ids {
            None => ReportState::NoSnapshot,
            Some(snapshot_ids) if same_id_set(snapshot_ids, &eligible_ids) => ReportState::Fresh,
            Some(_) => ReportState::Stale,
        };
        if state == ReportState::Stale {
            // Old scores cover a different proposal set; they must not leak
            // into the next generation.
            session.scores_cache = None;
        }

        let (rows, ai_scored) = if state == ReportState::Fresh {
            let dimensions = resolve_dimensions(session);
            let rows = self.engine.compute_rows(
                &eligible,
                &dimensions,
                &session.selection,
                session.scores_cache.as_ref(),
            );
            (rows, session.scores_cache.is_some())
        } else {
            (Vec::new(), false)
        };

        Ok(ReportView {
            rfp_id: rfp_id.clone(),
            rfp_title: rfp.title,
            state,
            selected_dimensions: session.selection.ids().to_vec(),
            eligible_proposal_ids: eligible_ids,
            rows,
            ai_scored,
        })
    }

    /// Catalog for an RFP: the general rubric plus whatever the analysis
    /// backend discovers from the requirement text. Discovery failure is
    /// non-fatal and leaves the general set alone.
    pub fn list_dimensions(&self, rfp_id: &RfpId) -> Result<Vec<Dimension>, ComparisonServiceError> {
        let rfp = self.rfp(rfp_id)?;
        let mut dimensions = general_dimensions();

        let discovered = {
            let _guard = self.loading.begin(FetchKind::Dimensions);
            match self.analysis.discover_dimensions(&rfp) {
                Ok(found) => sanitize_dynamic_dimensions(found, &dimensions),
                Err(err) => {
                    warn!(rfp = %rfp_id, error = %err, "dimension discovery failed; offering the general set only");
                    Vec::new()
                }
            }
        };

        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let session = sessions.entry(rfp_id.clone()).or_default();
        session.discovered = discovered.clone();
        drop(sessions);

        dimensions.extend(discovered);
        Ok(dimensions)
    }

    /// Generate (or regenerate) the report: score the current eligible set,
    /// cache the result, persist the snapshot, and mark the session fresh.
    /// Validation failures never reach the analysis backend; an analysis
    /// failure degrades to heuristic scores instead of surfacing.
    pub fn generate_report(
        &self,
        rfp_id: &RfpId,
        dimension_ids: Vec<String>,
        accepted_only: bool,
    ) -> Result<ReportView, ComparisonServiceError> {
        let rfp = self.rfp(rfp_id)?;

        let selection = DimensionSelection::from_ids(dimension_ids);
        if selection.is_empty() {
            return Err(ComparisonServiceError::NoDimensionsSelected);
        }

        // The restoration fetch must settle before a generate can be compared
        // against the snapshot it replaces.
        self.ensure_restored(rfp_id)?;

        let proposals = self.proposals.list_proposals(rfp_id)?;
        let eligible = eligible_proposals(&proposals, rfp_id, accepted_only);
        if eligible.is_empty() {
            return Err(ComparisonServiceError::NoEligibleProposals(rfp_id.clone()));
        }
        let eligible_ids: Vec<ProposalId> =
            eligible.iter().map(|proposal| proposal.id.clone()).collect();

        let cache = {
            let _guard = self.loading.begin(FetchKind::Scores);
            match self
                .analysis
                .score_proposals(&rfp, &eligible, selection.ids())
            {
                Ok(scores) => Some(scores),
                Err(err) => {
                    warn!(rfp = %rfp_id, error = %err, "analysis scoring unavailable; using heuristic scores");
                    None
                }
            }
        };

        let snapshot = SavedComparison {
            id: String::new(),
            rfp_id: rfp_id.clone(),
            dimensions: selection.ids().to_vec(),
            proposal_ids: eligible_ids.clone(),
            scores_cache: cache.clone(),
        };
        match self.comparisons.save(snapshot) {
            Ok(saved) => info!(rfp = %rfp_id, comparison = %saved.id, "comparison snapshot persisted"),
            Err(err) => {
                warn!(rfp = %rfp_id, error = %err, "comparison snapshot not persisted; report remains available")
            }
        }

        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let session = sessions.entry(rfp_id.clone()).or_default();
        session.selection = selection;
        session.scores_cache = cache;
        session.snapshot_ids = Some(eligible_ids.clone());

        let dimensions = resolve_dimensions(session);
        let rows = self.engine.compute_rows(
            &eligible,
            &dimensions,
            &session.selection,
            session.scores_cache.as_ref(),
        );
        let ai_scored = session.scores_cache.is_some();
        let selected_dimensions = session.selection.ids().to_vec();
        drop(sessions);

        Ok(ReportView {
            rfp_id: rfp_id.clone(),
            rfp_title: rfp.title,
            state: ReportState::Fresh,
            selected_dimensions,
            eligible_proposal_ids: eligible_ids,
            rows,
            ai_scored,
        })
    }

    /// Saved comparison index with RFP titles joined in.
    pub fn saved_comparisons(
        &self,
    ) -> Result<Vec<SavedComparisonSummary>, ComparisonServiceError> {
        let _guard = self.loading.begin(FetchKind::SavedComparisons);
        let entries = self.comparisons.list()?;
        entries
            .into_iter()
            .map(|entry| {
                let rfp_title = self
                    .proposals
                    .get_rfp(&entry.rfp_id)?
                    .map(|rfp| rfp.title)
                    .unwrap_or_else(|| "Unknown RFP".to_string());
                Ok(SavedComparisonSummary {
                    id: entry.id,
                    rfp_id: entry.rfp_id,
                    rfp_title,
                })
            })
            .collect()
    }

    /// Drop the persisted comparison and reset the RFP's session to a blank
    /// slate. Returns whether anything was deleted.
    pub fn delete_comparison(&self, rfp_id: &RfpId) -> Result<bool, ComparisonServiceError> {
        let deleted = self.comparisons.delete(rfp_id)?;

        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        if let Some(session) = sessions.get_mut(rfp_id) {
            session.snapshot_ids = None;
            session.scores_cache = None;
            session.selection = DimensionSelection::new();
        }
        Ok(deleted)
    }

    pub fn list_rfps(&self) -> Result<Vec<RfpSummary>, ComparisonServiceError> {
        let rfps = self.proposals.list_rfps()?;
        rfps.into_iter()
            .map(|rfp| {
                let proposals = self.proposals.list_proposals(&rfp.id)?.len();
                Ok(RfpSummary {
                    id: rfp.id,
                    title: rfp.title,
                    status: rfp.status.label(),
                    proposals,
                })
            })
            .collect()
    }

    pub fn approve_proposal(&self, id: &ProposalId) -> Result<Proposal, ComparisonServiceError> {
        self.decide(id, Proposal::approve)
    }

    pub fn reject_proposal(&self, id: &ProposalId) -> Result<Proposal, ComparisonServiceError> {
        self.decide(id, Proposal::reject)
    }

    fn decide(
        &self,
        id: &ProposalId,
        action: impl FnOnce(&mut Proposal) -> Result<(), DecisionError>,
    ) -> Result<Proposal, ComparisonServiceError> {
        let mut proposal = self
            .proposals
            .get_proposal(id)?
            .ok_or_else(|| ComparisonServiceError::ProposalNotFound(id.clone()))?;
        action(&mut proposal)?;
        self.proposals.update_proposal(proposal.clone())?;
        Ok(proposal)
    }

    pub fn matrix(&self, rfp_id: &RfpId) -> Result<ComparisonMatrix, ComparisonServiceError> {
        let rfp = self.rfp(rfp_id)?;
        let proposals = self.proposals.list_proposals(rfp_id)?;
        let refs: Vec<&Proposal> = proposals.iter().collect();
        Ok(build_matrix(&rfp, &refs))
    }
}

/// Order-insensitive proposal-id set comparison.
fn same_id_set(left: &[ProposalId], right: &[ProposalId]) -> bool {
    let mut left: Vec<&ProposalId> = left.iter().collect();
    let mut right: Vec<&ProposalId> = right.iter().collect();
    left.sort();
    right.sort();
    left == right
}

/// Dimensions the engine can score against for this session: the general
/// rubric, dynamic dimensions discovered for the RFP, and a bare stand-in for
/// any selected id the catalog no longer knows (its lowercased name becomes
/// the keyword).
fn resolve_dimensions(session: &ReportSession) -> Vec<Dimension> {
    let mut dimensions = general_dimensions();
    for found in &session.discovered {
        if !dimensions.iter().any(|dimension| dimension.id == found.id) {
            dimensions.push(found.clone());
        }
    }
    for id in session.selection.ids() {
        if !dimensions.iter().any(|dimension| dimension.id == *id) {
            dimensions.push(Dimension {
                id: id.clone(),
                name: id.clone(),
                description: None,
                kind: DimensionKind::Dynamic,
                keywords: Vec::new(),
            });
        }
    }
    dimensions
}
