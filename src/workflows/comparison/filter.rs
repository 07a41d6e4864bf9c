use super::domain::{Proposal, ProposalId, ProposalStatus, RfpId};

/// Select the subset of `proposals` eligible for comparison under `rfp_id`.
///
/// Proposals belonging to another RFP are always excluded. With
/// `accepted_only` set, only accepted proposals remain; otherwise everything
/// that has not been rejected participates.
pub fn eligible_proposals<'a>(
    proposals: &'a [Proposal],
    rfp_id: &RfpId,
    accepted_only: bool,
) -> Vec<&'a Proposal> {
    proposals
        .iter()
        .filter(|proposal| proposal.rfp_id == *rfp_id)
        .filter(|proposal| {
            if accepted_only {
                proposal.status == ProposalStatus::Accepted
            } else {
                proposal.status != ProposalStatus::Rejected
            }
        })
        .collect()
}

/// Ids of the eligible subset, in listing order.
pub fn eligible_ids(proposals: &[Proposal], rfp_id: &RfpId, accepted_only: bool) -> Vec<ProposalId> {
    eligible_proposals(proposals, rfp_id, accepted_only)
        .into_iter()
        .map(|proposal| proposal.id.clone())
        .collect()
}
