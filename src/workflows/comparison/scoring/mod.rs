mod fallback;

use std::collections::BTreeMap;

use serde::Serialize;

use super::catalog::DimensionSelection;
use super::domain::{AiScoreSet, Dimension, DimensionScore, Proposal, ProposalId, ProposalScores};

pub(crate) const NEUTRAL_SCORE: u8 = 50;
const MAX_SCORE: u8 = 100;

/// One proposal's line in a comparison report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreRow {
    pub proposal_id: ProposalId,
    pub vendor: String,
    pub price: Option<String>,
    pub summary: Option<String>,
    pub scores: BTreeMap<String, DimensionScore>,
    pub overall_score: u8,
}

/// Stateless engine producing score rows for a set of eligible proposals.
///
/// When an analysis-backend score set is supplied, its numbers are used
/// verbatim (clamped to 100) and nothing is computed locally. Without one,
/// the deterministic fallback heuristics in [`fallback`] take over. Inputs
/// are never mutated.
#[derive(Debug, Default)]
pub struct ScoreEngine;

impl ScoreEngine {
    pub fn compute_rows(
        &self,
        proposals: &[&Proposal],
        dimensions: &[Dimension],
        selection: &DimensionSelection,
        ai_scores: Option<&AiScoreSet>,
    ) -> Vec<ScoreRow> {
        let max_price = fallback::max_eligible_price(proposals);
        proposals
            .iter()
            .map(|proposal| {
                match ai_scores.and_then(|set| set.for_proposal(&proposal.id)) {
                    Some(remote) => remote_row(proposal, remote),
                    None => fallback_row(proposal, dimensions, selection, max_price),
                }
            })
            .collect()
    }
}

fn remote_row(proposal: &Proposal, remote: &ProposalScores) -> ScoreRow {
    let scores: BTreeMap<String, DimensionScore> = remote
        .scores
        .iter()
        .map(|(dimension_id, cell)| {
            (
                dimension_id.clone(),
                DimensionScore {
                    score: cell.score.min(MAX_SCORE),
                    label: cell.label.clone(),
                    reasoning: cell.reasoning.clone(),
                },
            )
        })
        .collect();

    ScoreRow {
        proposal_id: proposal.id.clone(),
        vendor: proposal.vendor.clone(),
        price: proposal.price.clone(),
        summary: proposal.details.summary.clone(),
        scores,
        overall_score: remote.overall_score.min(MAX_SCORE),
    }
}

fn fallback_row(
    proposal: &Proposal,
    dimensions: &[Dimension],
    selection: &DimensionSelection,
    max_price: f64,
) -> ScoreRow {
    let mut scores = BTreeMap::new();
    for dimension in dimensions {
        let score = fallback::score_cell(proposal, dimension, max_price);
        scores.insert(
            dimension.id.clone(),
            DimensionScore {
                score,
                label: label_for(score).to_string(),
                reasoning: None,
            },
        );
    }
    let overall_score = overall_score(&scores, selection);

    ScoreRow {
        proposal_id: proposal.id.clone(),
        vendor: proposal.vendor.clone(),
        price: proposal.price.clone(),
        summary: proposal.details.summary.clone(),
        scores,
        overall_score,
    }
}

/// Rounded mean over the selected dimension ids; over every computed cell
/// when nothing is selected; neutral when there is nothing to average.
fn overall_score(scores: &BTreeMap<String, DimensionScore>, selection: &DimensionSelection) -> u8 {
    let values: Vec<u8> = if selection.is_empty() {
        scores.values().map(|cell| cell.score).collect()
    } else {
        selection
            .ids()
            .iter()
            .filter_map(|id| scores.get(id))
            .map(|cell| cell.score)
            .collect()
    };

    if values.is_empty() {
        return NEUTRAL_SCORE;
    }
    let sum: u32 = values.iter().map(|score| u32::from(*score)).sum();
    (sum as f64 / values.len() as f64).round() as u8
}

fn label_for(score: u8) -> &'static str {
    if score >= 80 {
        "Strong"
    } else if score >= 50 {
        "Adequate"
    } else {
        "Weak"
    }
}
