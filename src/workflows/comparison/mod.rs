//! Proposal comparison workflow: eligibility filtering, dimension catalogs,
//! score computation, and snapshot-backed report caching with staleness
//! detection.

pub mod catalog;
pub mod domain;
pub mod filter;
pub mod gateway;
pub mod matrix;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{
    general_dimensions, sanitize_dynamic_dimensions, DimensionSelection, MAX_SELECTED_DIMENSIONS,
};
pub use domain::{
    AiScoreSet, BidFormRow, DecisionError, Dimension, DimensionKind, DimensionScore,
    LifecycleError, Proposal, ProposalDetails, ProposalId, ProposalScores, ProposalStatus, Rfp,
    RfpId, RfpStatus, SavedComparison,
};
pub use filter::{eligible_ids, eligible_proposals};
pub use gateway::{AnalysisError, AnalysisGateway, HttpAnalysisClient, OfflineAnalysis};
pub use matrix::{build_matrix, to_csv, ComparisonMatrix, MatrixRow, MatrixVendor, VendorValues};
pub use repository::{
    next_proposal_id, next_rfp_id, ComparisonStore, MemoryComparisonStore, MemoryProposalStore,
    ProposalStore, StoreError,
};
pub use router::comparison_router;
pub use scoring::{ScoreEngine, ScoreRow};
pub use service::{
    ComparisonService, ComparisonServiceError, FetchKind, LoadingTracker, ReportState, ReportView,
    RfpSummary, SavedComparisonSummary,
};
