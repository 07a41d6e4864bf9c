use super::common::*;
use crate::workflows::comparison::domain::{BidFormRow, ProposalId, ProposalStatus};
use crate::workflows::comparison::matrix::{
    build_matrix, to_csv, ComparisonMatrix, MatrixRow, MatrixVendor, VendorValues,
};

fn bid_row(item_id: &str, description: &str, unit_cost: &str, total: &str) -> BidFormRow {
    BidFormRow {
        section: Some("I Structural".to_string()),
        item_id: item_id.to_string(),
        description: description.to_string(),
        quantity: Some("100".to_string()),
        unit: Some("SF".to_string()),
        unit_cost: Some(unit_cost.to_string()),
        total: Some(total.to_string()),
    }
}

#[test]
fn joins_vendor_rows_by_item_id() {
    let mut acme = proposal("p-acme", "rfp-m", "Acme", None, ProposalStatus::Pending);
    acme.bid_rows = vec![
        bid_row("1", "Wall sheathing repairs", "$4.10", "$410.00"),
        bid_row("2", "Framing repairs", "$7.49", "$749.00"),
    ];
    let mut zenith = proposal("p-zen", "rfp-m", "Zenith", None, ProposalStatus::Pending);
    zenith.bid_rows = vec![bid_row("1", "Wall sheathing repairs", "$8.00", "$800.00")];

    let rfp = open_rfp("rfp-m");
    let matrix = build_matrix(&rfp, &[&acme, &zenith]);

    assert_eq!(matrix.fixed_columns, vec!["Item", "Description"]);
    assert_eq!(
        matrix.vendor_columns,
        vec!["Quantity", "Unit", "Unit Cost", "Total"]
    );
    // Acme has the larger form, so its two rows win the structure election.
    assert_eq!(matrix.rows.len(), 3, "two item rows plus the grand total");

    let second = &matrix.rows[1];
    assert_eq!(second.fixed_values, vec!["2", "Framing repairs"]);
    let zenith_cells = second
        .vendor_values
        .iter()
        .find(|cells| cells.proposal_id.0 == "p-zen")
        .expect("zenith cells");
    assert!(zenith_cells
        .values
        .iter()
        .all(|value| value == "Not Quoted"));
}

#[test]
fn grand_total_sums_only_parseable_totals() {
    let mut acme = proposal("p-acme", "rfp-m", "Acme", None, ProposalStatus::Pending);
    acme.bid_rows = vec![
        bid_row("1", "Tear-off", "$4.10", "$1,000.50"),
        bid_row("2", "Membrane", "$3.80", "TBD"),
        bid_row("3", "Flashing", "$2.00", "$499.50"),
    ];

    let rfp = open_rfp("rfp-m");
    let matrix = build_matrix(&rfp, &[&acme]);

    let total_row = matrix.rows.last().expect("grand total row");
    assert!(total_row.is_grand_total);
    assert_eq!(total_row.fixed_values, vec!["", "GRAND TOTAL"]);
    let cells = &total_row.vendor_values[0];
    assert_eq!(cells.values.last().map(String::as_str), Some("$1,500.00"));
}

#[test]
fn structure_election_prefers_majority_then_largest() {
    let mut one = proposal("p-1", "rfp-m", "One", None, ProposalStatus::Pending);
    one.bid_rows = vec![bid_row("1", "A", "$1", "$1")];
    let mut two = proposal("p-2", "rfp-m", "Two", None, ProposalStatus::Pending);
    two.bid_rows = vec![bid_row("1", "A", "$1", "$1"), bid_row("2", "B", "$1", "$1")];
    let mut three = proposal("p-3", "rfp-m", "Three", None, ProposalStatus::Pending);
    three.bid_rows = vec![
        bid_row("1", "A", "$1", "$1"),
        bid_row("2", "B", "$1", "$1"),
    ];

    let rfp = open_rfp("rfp-m");
    let matrix = build_matrix(&rfp, &[&one, &two, &three]);
    // Two proposals agree on two rows; the single-row form loses.
    assert_eq!(matrix.rows.len(), 3);
}

#[test]
fn no_bid_rows_yields_an_empty_matrix() {
    let acme = proposal("p-acme", "rfp-m", "Acme", None, ProposalStatus::Pending);
    let rfp = open_rfp("rfp-m");

    let matrix = build_matrix(&rfp, &[&acme]);
    assert!(matrix.rows.is_empty());
    assert!(matrix.fixed_columns.is_empty());
    assert_eq!(matrix.proposals.len(), 1);
}

#[test]
fn csv_header_lists_fixed_then_vendor_column_pairs() {
    let matrix = ComparisonMatrix {
        rfp_title: "Repairs".to_string(),
        fixed_columns: vec!["Item".to_string(), "Description".to_string()],
        vendor_columns: vec!["Total".to_string()],
        proposals: vec![
            MatrixVendor {
                id: ProposalId("p-1".to_string()),
                vendor: "Alpha".to_string(),
                status: "pending",
            },
            MatrixVendor {
                id: ProposalId("p-2".to_string()),
                vendor: "Beta".to_string(),
                status: "pending",
            },
        ],
        rows: vec![MatrixRow {
            fixed_values: vec!["1".to_string(), "Tear-off".to_string()],
            vendor_values: vec![
                VendorValues {
                    proposal_id: ProposalId("p-1".to_string()),
                    values: vec!["$410.00".to_string()],
                },
                VendorValues {
                    proposal_id: ProposalId("p-2".to_string()),
                    values: vec!["$800.00".to_string()],
                },
            ],
            is_grand_total: false,
        }],
    };

    let csv = to_csv(&matrix);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Item,Description,Alpha Total,Beta Total")
    );
    assert_eq!(lines.next(), Some("\"1\",\"Tear-off\",$410.00,$800.00"));
}

#[test]
fn csv_quotes_fixed_values_and_doubles_embedded_quotes() {
    let matrix = ComparisonMatrix {
        rfp_title: "Repairs".to_string(),
        fixed_columns: vec!["Item".to_string(), "Description".to_string()],
        vendor_columns: vec!["Total".to_string()],
        proposals: vec![MatrixVendor {
            id: ProposalId("p-1".to_string()),
            vendor: "Alpha".to_string(),
            status: "pending",
        }],
        rows: vec![MatrixRow {
            fixed_values: vec![
                "1".to_string(),
                "Shingles, \"Class A\" rated".to_string(),
            ],
            vendor_values: vec![VendorValues {
                proposal_id: ProposalId("p-1".to_string()),
                values: vec!["$99.00".to_string()],
            }],
            is_grand_total: false,
        }],
    };

    let csv = to_csv(&matrix);
    let data_line = csv.lines().nth(1).expect("data row");
    assert_eq!(
        data_line,
        "\"1\",\"Shingles, \"\"Class A\"\" rated\",$99.00"
    );
}

#[test]
fn missing_cell_values_render_as_dashes() {
    let mut acme = proposal("p-acme", "rfp-m", "Acme", None, ProposalStatus::Pending);
    acme.bid_rows = vec![BidFormRow {
        section: None,
        item_id: "1".to_string(),
        description: "Tear-off".to_string(),
        quantity: None,
        unit: Some("SF".to_string()),
        unit_cost: None,
        total: None,
    }];

    let rfp = open_rfp("rfp-m");
    let matrix = build_matrix(&rfp, &[&acme]);
    let cells = &matrix.rows[0].vendor_values[0];
    assert_eq!(cells.values, vec!["-", "SF", "-", "-"]);
}
