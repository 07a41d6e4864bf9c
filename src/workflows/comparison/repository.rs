use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::domain::{Proposal, ProposalId, Rfp, RfpId, SavedComparison};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over RFPs and their proposals so the comparison
/// service can be exercised against any backend.
pub trait ProposalStore: Send + Sync {
    fn list_rfps(&self) -> Result<Vec<Rfp>, StoreError>;
    fn get_rfp(&self, id: &RfpId) -> Result<Option<Rfp>, StoreError>;
    fn insert_rfp(&self, rfp: Rfp) -> Result<Rfp, StoreError>;
    fn update_rfp(&self, rfp: Rfp) -> Result<(), StoreError>;
    fn list_proposals(&self, rfp_id: &RfpId) -> Result<Vec<Proposal>, StoreError>;
    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, StoreError>;
    fn insert_proposal(&self, proposal: Proposal) -> Result<Proposal, StoreError>;
    fn update_proposal(&self, proposal: Proposal) -> Result<(), StoreError>;
}

/// Storage abstraction for saved comparisons: at most one per RFP, upserted
/// on save.
pub trait ComparisonStore: Send + Sync {
    fn fetch(&self, rfp_id: &RfpId) -> Result<Option<SavedComparison>, StoreError>;
    fn save(&self, comparison: SavedComparison) -> Result<SavedComparison, StoreError>;
    fn list(&self) -> Result<Vec<SavedComparison>, StoreError>;
    fn delete(&self, rfp_id: &RfpId) -> Result<bool, StoreError>;
}

static RFP_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PROPOSAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static COMPARISON_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_rfp_id() -> RfpId {
    let id = RFP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RfpId(format!("rfp-{id:06}"))
}

pub fn next_proposal_id() -> ProposalId {
    let id = PROPOSAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ProposalId(format!("prop-{id:06}"))
}

fn next_comparison_id() -> String {
    let id = COMPARISON_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("cmp-{id:06}")
}

/// In-memory reference store backing the default server, the CLI, and tests.
#[derive(Default, Clone)]
pub struct MemoryProposalStore {
    rfps: Arc<Mutex<BTreeMap<RfpId, Rfp>>>,
    proposals: Arc<Mutex<BTreeMap<ProposalId, Proposal>>>,
}

impl ProposalStore for MemoryProposalStore {
    fn list_rfps(&self) -> Result<Vec<Rfp>, StoreError> {
        let guard = self.rfps.lock().expect("rfp mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn get_rfp(&self, id: &RfpId) -> Result<Option<Rfp>, StoreError> {
        let guard = self.rfps.lock().expect("rfp mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_rfp(&self, rfp: Rfp) -> Result<Rfp, StoreError> {
        let mut guard = self.rfps.lock().expect("rfp mutex poisoned");
        if guard.contains_key(&rfp.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(rfp.id.clone(), rfp.clone());
        Ok(rfp)
    }

    fn update_rfp(&self, rfp: Rfp) -> Result<(), StoreError> {
        let mut guard = self.rfps.lock().expect("rfp mutex poisoned");
        if !guard.contains_key(&rfp.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(rfp.id.clone(), rfp);
        Ok(())
    }

    fn list_proposals(&self, rfp_id: &RfpId) -> Result<Vec<Proposal>, StoreError> {
        let guard = self.proposals.lock().expect("proposal mutex poisoned");
        Ok(guard
            .values()
            .filter(|proposal| proposal.rfp_id == *rfp_id)
            .cloned()
            .collect())
    }

    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, StoreError> {
        let guard = self.proposals.lock().expect("proposal mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_proposal(&self, proposal: Proposal) -> Result<Proposal, StoreError> {
        let mut guard = self.proposals.lock().expect("proposal mutex poisoned");
        if guard.contains_key(&proposal.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(proposal.id.clone(), proposal.clone());
        Ok(proposal)
    }

    fn update_proposal(&self, proposal: Proposal) -> Result<(), StoreError> {
        let mut guard = self.proposals.lock().expect("proposal mutex poisoned");
        if !guard.contains_key(&proposal.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(proposal.id.clone(), proposal);
        Ok(())
    }
}

/// In-memory saved-comparison store keyed by RFP id. An upsert keeps the
/// original record id so clients can hold a stable reference.
#[derive(Default, Clone)]
pub struct MemoryComparisonStore {
    entries: Arc<Mutex<BTreeMap<RfpId, SavedComparison>>>,
}

impl ComparisonStore for MemoryComparisonStore {
    fn fetch(&self, rfp_id: &RfpId) -> Result<Option<SavedComparison>, StoreError> {
        let guard = self.entries.lock().expect("comparison mutex poisoned");
        Ok(guard.get(rfp_id).cloned())
    }

    fn save(&self, mut comparison: SavedComparison) -> Result<SavedComparison, StoreError> {
        let mut guard = self.entries.lock().expect("comparison mutex poisoned");
        comparison.id = match guard.get(&comparison.rfp_id) {
            Some(existing) => existing.id.clone(),
            None => next_comparison_id(),
        };
        guard.insert(comparison.rfp_id.clone(), comparison.clone());
        Ok(comparison)
    }

    fn list(&self) -> Result<Vec<SavedComparison>, StoreError> {
        let guard = self.entries.lock().expect("comparison mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn delete(&self, rfp_id: &RfpId) -> Result<bool, StoreError> {
        let mut guard = self.entries.lock().expect("comparison mutex poisoned");
        Ok(guard.remove(rfp_id).is_some())
    }
}
