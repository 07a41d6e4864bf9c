use std::collections::HashMap;

use serde::Serialize;

use super::domain::{BidFormRow, Proposal, ProposalId, Rfp};

const FIXED_COLUMNS: [&str; 2] = ["Item", "Description"];
const VENDOR_COLUMNS: [&str; 4] = ["Quantity", "Unit", "Unit Cost", "Total"];
const NOT_QUOTED: &str = "Not Quoted";
const MISSING_VALUE: &str = "-";

/// Vendor header entry of the matrix, in proposal listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixVendor {
    pub id: ProposalId,
    pub vendor: String,
    pub status: &'static str,
}

/// One vendor's cells for a matrix row, aligned with `vendor_columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorValues {
    pub proposal_id: ProposalId,
    pub values: Vec<String>,
}

/// One line of the comparison matrix: the solicitation's fixed values plus
/// each vendor's quoted cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub fixed_values: Vec<String>,
    pub vendor_values: Vec<VendorValues>,
    pub is_grand_total: bool,
}

/// Side-by-side bid breakdown for every proposal under one RFP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMatrix {
    pub rfp_title: String,
    pub fixed_columns: Vec<String>,
    pub vendor_columns: Vec<String>,
    pub proposals: Vec<MatrixVendor>,
    pub rows: Vec<MatrixRow>,
}

/// Assemble the matrix from the vendors' filled bid forms.
///
/// The row structure is elected from the proposals themselves: the most
/// common bid-row count wins, ties broken toward the larger form so no line
/// items are hidden. Vendors are joined to each structure row by item id;
/// a vendor with no matching row shows `Not Quoted`.
pub fn build_matrix(rfp: &Rfp, proposals: &[&Proposal]) -> ComparisonMatrix {
    let vendors: Vec<MatrixVendor> = proposals
        .iter()
        .map(|proposal| MatrixVendor {
            id: proposal.id.clone(),
            vendor: proposal.vendor.clone(),
            status: proposal.status.label(),
        })
        .collect();

    let structure = elect_structure(proposals);
    let Some(structure) = structure else {
        return ComparisonMatrix {
            rfp_title: rfp.title.clone(),
            fixed_columns: Vec::new(),
            vendor_columns: Vec::new(),
            proposals: vendors,
            rows: Vec::new(),
        };
    };

    let mut grand_totals: HashMap<ProposalId, f64> = HashMap::new();
    let mut rows = Vec::with_capacity(structure.len() + 1);

    for template in structure {
        let mut vendor_values = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let matched = proposal
                .bid_rows
                .iter()
                .find(|row| row.item_id.trim() == template.item_id.trim());

            let values = match matched {
                Some(row) => {
                    if let Some(total) = row.total.as_deref().and_then(parse_amount) {
                        *grand_totals.entry(proposal.id.clone()).or_default() += total;
                    }
                    vec![
                        cell_value(row.quantity.as_deref()),
                        cell_value(row.unit.as_deref()),
                        cell_value(row.unit_cost.as_deref()),
                        cell_value(row.total.as_deref()),
                    ]
                }
                None => vec![NOT_QUOTED.to_string(); VENDOR_COLUMNS.len()],
            };
            vendor_values.push(VendorValues {
                proposal_id: proposal.id.clone(),
                values,
            });
        }

        rows.push(MatrixRow {
            fixed_values: vec![template.item_id.clone(), template.description.clone()],
            vendor_values,
            is_grand_total: false,
        });
    }

    rows.push(grand_total_row(proposals, &grand_totals));

    ComparisonMatrix {
        rfp_title: rfp.title.clone(),
        fixed_columns: FIXED_COLUMNS.iter().map(|name| name.to_string()).collect(),
        vendor_columns: VENDOR_COLUMNS.iter().map(|name| name.to_string()).collect(),
        proposals: vendors,
        rows,
    }
}

/// Render the matrix as CSV. The header lists the fixed columns and then
/// `"{vendor} {column}"` for every vendor/column pair. Fixed-column values
/// are always quoted, with embedded quotes doubled; vendor cells are written
/// bare.
pub fn to_csv(matrix: &ComparisonMatrix) -> String {
    let mut header: Vec<String> = matrix.fixed_columns.clone();
    for vendor in &matrix.proposals {
        for column in &matrix.vendor_columns {
            header.push(format!("{} {}", vendor.vendor, column));
        }
    }

    let mut output = header.join(",");
    output.push('\n');

    for row in &matrix.rows {
        let mut cells: Vec<String> = row
            .fixed_values
            .iter()
            .map(|value| quote_field(value))
            .collect();
        for vendor in &row.vendor_values {
            cells.extend(vendor.values.iter().cloned());
        }
        output.push_str(&cells.join(","));
        output.push('\n');
    }

    output
}

fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn cell_value(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => MISSING_VALUE.to_string(),
    }
}

fn grand_total_row(
    proposals: &[&Proposal],
    grand_totals: &HashMap<ProposalId, f64>,
) -> MatrixRow {
    let vendor_values = proposals
        .iter()
        .map(|proposal| {
            let mut values = vec![String::new(); VENDOR_COLUMNS.len()];
            if let Some(total) = grand_totals.get(&proposal.id) {
                values[VENDOR_COLUMNS.len() - 1] = format_currency(*total);
            }
            VendorValues {
                proposal_id: proposal.id.clone(),
                values,
            }
        })
        .collect();

    MatrixRow {
        fixed_values: vec![String::new(), "GRAND TOTAL".to_string()],
        vendor_values,
        is_grand_total: true,
    }
}

/// Elect the row structure from the submitted bid forms: majority row count
/// wins, ties resolved toward the larger form.
fn elect_structure<'a>(proposals: &[&'a Proposal]) -> Option<&'a [BidFormRow]> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for proposal in proposals {
        if !proposal.bid_rows.is_empty() {
            *counts.entry(proposal.bid_rows.len()).or_default() += 1;
        }
    }
    let max_frequency = counts.values().copied().max()?;
    let winner_len = counts
        .iter()
        .filter(|(_, frequency)| **frequency == max_frequency)
        .map(|(len, _)| *len)
        .max()?;

    proposals
        .iter()
        .find(|proposal| proposal.bid_rows.len() == winner_len)
        .map(|proposal| proposal.bid_rows.as_slice())
}

/// Parse a money cell, ignoring placeholder markers from the extraction step.
fn parse_amount(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if matches!(trimmed.to_ascii_uppercase().as_str(), "TBD" | "N/A" | "-" | "$-") {
        return None;
    }
    let cleaned = trimmed.trim_start_matches('$').replace(',', "");
    cleaned.trim().parse::<f64>().ok()
}

fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let negative = cents < 0;
    let cents = cents.abs();
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{fraction:02}")
}
