use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for Requests for Proposals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RfpId(pub String);

impl fmt::Display for RfpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for vendor proposals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a solicitation: authored as a draft, opened for bidding, then
/// manually closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RfpStatus {
    Draft,
    Open,
    Closed,
}

impl RfpStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RfpStatus::Draft => "draft",
            RfpStatus::Open => "open",
            RfpStatus::Closed => "closed",
        }
    }
}

/// Buyer-authored solicitation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfp {
    pub id: RfpId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Ordered requirement statements shown to vendors and fed to dimension
    /// discovery.
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    pub currency: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    pub status: RfpStatus,
}

impl Rfp {
    pub fn publish(&mut self) -> Result<(), LifecycleError> {
        match self.status {
            RfpStatus::Draft => {
                self.status = RfpStatus::Open;
                Ok(())
            }
            from => Err(LifecycleError {
                from,
                action: "publish",
            }),
        }
    }

    pub fn close(&mut self) -> Result<(), LifecycleError> {
        match self.status {
            RfpStatus::Open => {
                self.status = RfpStatus::Closed;
                Ok(())
            }
            from => Err(LifecycleError {
                from,
                action: "close",
            }),
        }
    }
}

/// Rejected lifecycle transition, surfaced to the caller without mutating the
/// record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} an rfp while it is {}", .from.label())]
pub struct LifecycleError {
    pub from: RfpStatus,
    pub action: &'static str,
}

/// Review status of a vendor proposal. `Accepted` and `Rejected` are terminal;
/// there is no unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Submitted,
    Pending,
    Processing,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProposalStatus::Submitted => "submitted",
            ProposalStatus::Pending => "pending",
            ProposalStatus::Processing => "processing",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub const fn is_decided(self) -> bool {
        matches!(self, ProposalStatus::Accepted | ProposalStatus::Rejected)
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(ProposalStatus::Submitted),
            "pending" => Some(ProposalStatus::Pending),
            "processing" => Some(ProposalStatus::Processing),
            "accepted" => Some(ProposalStatus::Accepted),
            "rejected" => Some(ProposalStatus::Rejected),
            _ => None,
        }
    }
}

/// Free-text fields the extraction pipeline pulls out of an uploaded proposal
/// PDF. All optional; absent fields read as empty text during scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDetails {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub warranty: Option<String>,
    #[serde(default)]
    pub cost_breakdown: Option<String>,
}

/// One line of the vendor's filled bid form, matched against the solicitation
/// structure by item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidFormRow {
    #[serde(default)]
    pub section: Option<String>,
    pub item_id: String,
    pub description: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_cost: Option<String>,
    #[serde(default)]
    pub total: Option<String>,
}

/// A vendor's submitted response to an RFP plus its extracted fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub rfp_id: RfpId,
    pub vendor: String,
    /// Price as extracted from the document, e.g. `"$1,295,648.70"` or
    /// `"120k"`. Normalization happens at scoring time.
    #[serde(default)]
    pub price: Option<String>,
    pub currency: String,
    pub status: ProposalStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub details: ProposalDetails,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub bid_rows: Vec<BidFormRow>,
}

impl Proposal {
    /// All analyzed text for keyword heuristics: the raw extraction plus every
    /// structured detail field, space-joined.
    pub fn analyzed_text(&self) -> String {
        let details = &self.details;
        [
            self.extracted_text.as_deref(),
            details.summary.as_deref(),
            details.experience.as_deref(),
            details.materials.as_deref(),
            details.timeline.as_deref(),
            details.warranty.as_deref(),
            details.cost_breakdown.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub fn approve(&mut self) -> Result<(), DecisionError> {
        self.decide(ProposalStatus::Accepted)
    }

    pub fn reject(&mut self) -> Result<(), DecisionError> {
        self.decide(ProposalStatus::Rejected)
    }

    fn decide(&mut self, next: ProposalStatus) -> Result<(), DecisionError> {
        if self.status.is_decided() {
            return Err(DecisionError::AlreadyDecided {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Raised when a decision would overwrite a terminal proposal status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    #[error("proposal {id} is already {}; decisions are final", .status.label())]
    AlreadyDecided { id: ProposalId, status: ProposalStatus },
}

/// Provenance of a comparison dimension: the fixed general rubric or a
/// per-RFP discovery produced by the analysis backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKind {
    General,
    #[default]
    Dynamic,
}

/// A named criterion along which proposals are scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: DimensionKind,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Score assigned to one proposal on one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: u8,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Per-proposal slice of an analysis-backend comparison response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalScores {
    pub id: ProposalId,
    pub vendor: String,
    #[serde(default)]
    pub scores: BTreeMap<String, DimensionScore>,
    pub overall_score: u8,
}

/// The full score object returned by one comparison call, cached verbatim in
/// the saved comparison so a revisit can skip the backend entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiScoreSet {
    #[serde(default)]
    pub proposals: Vec<ProposalScores>,
}

impl AiScoreSet {
    pub fn for_proposal(&self, id: &ProposalId) -> Option<&ProposalScores> {
        self.proposals.iter().find(|entry| entry.id == *id)
    }
}

/// Persisted record of one comparison run: the selected dimensions, the exact
/// proposal-id set it covered, and optionally the score object it produced.
/// Valid only while the stored proposal-id set still equals the live eligible
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedComparison {
    pub id: String,
    pub rfp_id: RfpId,
    pub dimensions: Vec<String>,
    pub proposal_ids: Vec<ProposalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores_cache: Option<AiScoreSet>,
}
