use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::workflows::comparison::{
    next_proposal_id, Proposal, ProposalDetails, ProposalStatus, RfpId,
};

use super::ProposalImportError;

pub(crate) fn parse_proposals<R: Read>(
    reader: R,
    rfp_id: &RfpId,
) -> Result<Vec<Proposal>, ProposalImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut proposals = Vec::new();

    for (index, record) in csv_reader.deserialize::<ProposalRow>().enumerate() {
        let row = record?;
        // The header occupies line 1 of the export.
        let line = index + 2;
        proposals.push(row.into_proposal(rfp_id, line)?);
    }

    Ok(proposals)
}

#[derive(Debug, Deserialize)]
struct ProposalRow {
    #[serde(rename = "Vendor")]
    vendor: String,
    #[serde(rename = "Price", default, deserialize_with = "empty_string_as_none")]
    price: Option<String>,
    #[serde(rename = "Currency", default, deserialize_with = "empty_string_as_none")]
    currency: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(
        rename = "Start Date",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    start_date: Option<String>,
    #[serde(rename = "Summary", default, deserialize_with = "empty_string_as_none")]
    summary: Option<String>,
    #[serde(
        rename = "Experience",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    experience: Option<String>,
    #[serde(
        rename = "Materials",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    materials: Option<String>,
    #[serde(rename = "Timeline", default, deserialize_with = "empty_string_as_none")]
    timeline: Option<String>,
    #[serde(rename = "Warranty", default, deserialize_with = "empty_string_as_none")]
    warranty: Option<String>,
    #[serde(
        rename = "Cost Breakdown",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    cost_breakdown: Option<String>,
    #[serde(rename = "Notes", default, deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

impl ProposalRow {
    fn into_proposal(self, rfp_id: &RfpId, row: usize) -> Result<Proposal, ProposalImportError> {
        if self.vendor.is_empty() {
            return Err(ProposalImportError::MissingVendor { row });
        }

        let status = match self.status.as_deref() {
            None => ProposalStatus::Submitted,
            Some(value) => ProposalStatus::from_label(value).ok_or_else(|| {
                ProposalImportError::InvalidStatus {
                    row,
                    value: value.to_string(),
                }
            })?,
        };

        let start_date = self
            .start_date
            .as_deref()
            .map(|value| {
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                    ProposalImportError::InvalidDate {
                        row,
                        value: value.to_string(),
                    }
                })
            })
            .transpose()?;

        Ok(Proposal {
            id: next_proposal_id(),
            rfp_id: rfp_id.clone(),
            vendor: self.vendor,
            price: self.price,
            currency: self.currency.unwrap_or_else(|| "USD".to_string()),
            status,
            start_date,
            details: ProposalDetails {
                summary: self.summary,
                experience: self.experience,
                materials: self.materials,
                timeline: self.timeline,
                warranty: self.warranty,
                cost_breakdown: self.cost_breakdown,
            },
            extracted_text: self.notes,
            bid_rows: Vec::new(),
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
