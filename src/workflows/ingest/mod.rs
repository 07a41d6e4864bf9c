//! Bulk proposal intake from spreadsheet exports, used to seed comparison
//! runs without the upload/extraction pipeline.

mod parser;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::workflows::comparison::{Proposal, RfpId};

/// Error raised while importing a proposal export.
#[derive(Debug, thiserror::Error)]
pub enum ProposalImportError {
    #[error("unable to read proposal export: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed proposal export: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: vendor name is required")]
    MissingVendor { row: usize },
    #[error("row {row}: unrecognized status '{value}'")]
    InvalidStatus { row: usize, value: String },
    #[error("row {row}: invalid start date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { row: usize, value: String },
}

/// Reads vendor proposals for one RFP out of a CSV export.
#[derive(Debug)]
pub struct ProposalCsvImporter;

impl ProposalCsvImporter {
    pub fn from_path(
        path: impl AsRef<Path>,
        rfp_id: &RfpId,
    ) -> Result<Vec<Proposal>, ProposalImportError> {
        let file = File::open(path)?;
        Self::from_reader(file, rfp_id)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        rfp_id: &RfpId,
    ) -> Result<Vec<Proposal>, ProposalImportError> {
        parser::parse_proposals(reader, rfp_id)
    }
}
