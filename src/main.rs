use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use procure_ai::config::AppConfig;
use procure_ai::error::AppError;
use procure_ai::telemetry;
use procure_ai::workflows::comparison::{
    comparison_router, next_proposal_id, next_rfp_id, to_csv, AnalysisGateway, BidFormRow,
    ComparisonService, DimensionKind, HttpAnalysisClient, MemoryComparisonStore,
    MemoryProposalStore, OfflineAnalysis, Proposal, ProposalDetails, ProposalStatus,
    ProposalStore, ReportView, Rfp, RfpId, RfpStatus,
};
use procure_ai::workflows::ingest::ProposalCsvImporter;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Procurement Comparison Service",
    about = "Run the RFP comparison service or generate comparison reports from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with proposal comparisons without the HTTP layer
    Compare {
        #[command(subcommand)]
        command: CompareCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Seed an example RFP with proposals so the API is explorable
    #[arg(long)]
    demo: bool,
}

#[derive(Subcommand, Debug)]
enum CompareCommand {
    /// Score a CSV proposal export and print the comparison report
    Report(CompareReportArgs),
}

#[derive(Args, Debug)]
struct CompareReportArgs {
    /// Title for the RFP the proposals answer
    #[arg(long)]
    rfp_title: String,
    /// CSV export of vendor proposals (Vendor, Price, Status, ... columns)
    #[arg(long)]
    proposals_csv: PathBuf,
    /// Dimension ids to score, comma separated (defaults to cost,schedule,experience)
    #[arg(long, value_delimiter = ',')]
    dimensions: Vec<String>,
    /// Compare accepted proposals only
    #[arg(long)]
    accepted_only: bool,
    /// RFP requirement statement; repeatable
    #[arg(long = "requirement")]
    requirements: Vec<String>,
    /// RFP budget
    #[arg(long)]
    budget: Option<f64>,
    /// RFP deadline (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    deadline: Option<NaiveDate>,
    /// Also write the bid comparison matrix to this CSV file
    #[arg(long)]
    matrix_csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Compare {
            command: CompareCommand::Report(args),
        } => {
            // The report path may call the analysis backend through its own
            // runtime, so it must not run on the async workers.
            tokio::task::spawn_blocking(move || run_compare_report(args))
                .await
                .map_err(|err| AppError::Io(std::io::Error::other(err)))?
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let proposals = Arc::new(MemoryProposalStore::default());
    let comparisons = Arc::new(MemoryComparisonStore::default());

    if args.demo {
        let rfp_id = seed_demo(proposals.as_ref());
        info!(rfp = %rfp_id, "demo data seeded");
    }

    let api = match &config.analysis.base_url {
        Some(_) => {
            let gateway = Arc::new(HttpAnalysisClient::from_config(&config.analysis)?);
            info!("analysis backend configured; AI scoring enabled");
            api_router(proposals, comparisons, gateway)
        }
        None => {
            info!("no analysis backend configured; running with heuristic scoring");
            api_router(proposals, comparisons, Arc::new(OfflineAnalysis))
        }
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(api)
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "procurement comparison service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn api_router<G>(
    proposals: Arc<MemoryProposalStore>,
    comparisons: Arc<MemoryComparisonStore>,
    gateway: Arc<G>,
) -> Router
where
    G: AnalysisGateway + 'static,
{
    let service = Arc::new(ComparisonService::new(proposals, comparisons, gateway));
    comparison_router(service)
}

fn run_compare_report(args: CompareReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    match &config.analysis.base_url {
        Some(_) => {
            let gateway = Arc::new(HttpAnalysisClient::from_config(&config.analysis)?);
            run_report_with_gateway(gateway, args)
        }
        None => run_report_with_gateway(Arc::new(OfflineAnalysis), args),
    }
}

fn run_report_with_gateway<G>(
    gateway: Arc<G>,
    args: CompareReportArgs,
) -> Result<(), AppError>
where
    G: AnalysisGateway + 'static,
{
    let CompareReportArgs {
        rfp_title,
        proposals_csv,
        dimensions,
        accepted_only,
        requirements,
        budget,
        deadline,
        matrix_csv,
    } = args;

    let proposals_store = Arc::new(MemoryProposalStore::default());
    let comparisons = Arc::new(MemoryComparisonStore::default());

    let mut rfp = Rfp {
        id: next_rfp_id(),
        title: rfp_title,
        description: None,
        requirements,
        budget,
        currency: "USD".to_string(),
        deadline,
        status: RfpStatus::Draft,
    };
    rfp.publish().expect("fresh draft publishes");
    let rfp_id = rfp.id.clone();
    proposals_store
        .insert_rfp(rfp)
        .expect("fresh store accepts the rfp");

    let imported = ProposalCsvImporter::from_path(&proposals_csv, &rfp_id)?;
    let count = imported.len();
    for proposal in imported {
        proposals_store
            .insert_proposal(proposal)
            .expect("fresh store accepts imported proposals");
    }
    println!(
        "Imported {count} proposal(s) from {}",
        proposals_csv.display()
    );

    let service = Arc::new(ComparisonService::new(
        proposals_store,
        comparisons,
        gateway,
    ));

    let catalog = service.list_dimensions(&rfp_id)?;
    let dynamic = catalog
        .iter()
        .filter(|dimension| dimension.kind == DimensionKind::Dynamic)
        .count();
    if dynamic > 0 {
        println!("Discovered {dynamic} RFP-specific dimension(s)");
    }

    let selected = if dimensions.is_empty() {
        vec![
            "cost".to_string(),
            "schedule".to_string(),
            "experience".to_string(),
        ]
    } else {
        dimensions
    };

    let view = service.generate_report(&rfp_id, selected, accepted_only)?;
    render_comparison_report(&view);

    if let Some(path) = matrix_csv {
        let matrix = service.matrix(&rfp_id)?;
        std::fs::write(&path, to_csv(&matrix))?;
        println!("\nBid comparison matrix written to {}", path.display());
    }

    Ok(())
}

fn render_comparison_report(view: &ReportView) {
    println!("\nProposal comparison report");
    println!("RFP: {} ({})", view.rfp_title, view.rfp_id);
    println!(
        "Scoring source: {}",
        if view.ai_scored {
            "analysis backend"
        } else {
            "built-in heuristics"
        }
    );
    println!("Dimensions: {}", view.selected_dimensions.join(", "));

    for row in &view.rows {
        println!("\n- {} [{}]", row.vendor, row.proposal_id);
        if let Some(price) = &row.price {
            println!("  Price: {price}");
        }
        for dimension_id in &view.selected_dimensions {
            if let Some(cell) = row.scores.get(dimension_id) {
                println!("  {}: {} ({})", dimension_id, cell.score, cell.label);
            }
        }
        println!("  Overall: {}", row.overall_score);
        if let Some(summary) = &row.summary {
            println!("  Summary: {summary}");
        }
    }
}

/// Seed one open RFP with three proposals so `serve --demo` answers every
/// endpoint with data.
fn seed_demo(store: &MemoryProposalStore) -> RfpId {
    let mut rfp = Rfp {
        id: next_rfp_id(),
        title: "Roof Replacement - Cedar Ridge Office Park".to_string(),
        description: Some(
            "Full tear-off and replacement of four low-slope roof sections, including \
             insulation upgrades and a 20-year warranty."
                .to_string(),
        ),
        requirements: vec![
            "Remove and dispose of all existing roofing material".to_string(),
            "Install TPO membrane with R-30 insulation".to_string(),
            "Provide manufacturer-backed 20 year warranty".to_string(),
            "Work must not interrupt tenant operations".to_string(),
        ],
        budget: Some(450_000.0),
        currency: "USD".to_string(),
        deadline: NaiveDate::from_ymd_opt(2026, 10, 15),
        status: RfpStatus::Draft,
    };
    rfp.publish().expect("fresh draft publishes");
    let rfp_id = rfp.id.clone();
    store.insert_rfp(rfp).expect("fresh store accepts demo rfp");

    let vendors = [
        (
            "Summit Roofing Co",
            Some("$412,500"),
            ProposalStatus::Pending,
            NaiveDate::from_ymd_opt(2026, 8, 1),
            "Crew of 12 with 18 years of commercial TPO experience; start within two weeks.",
            ("$4.10", "$164,000"),
        ),
        (
            "Apex Exteriors",
            Some("389k"),
            ProposalStatus::Pending,
            None,
            "Materials include GAF EverGuard membrane with a 20 year warranty and OSHA training for all staff.",
            ("$3.80", "$152,000"),
        ),
        (
            "Northside Construction",
            Some("$455,000"),
            ProposalStatus::Submitted,
            NaiveDate::from_ymd_opt(2026, 9, 15),
            "Phased schedule keeps tenants operational; dedicated support contact with 24 hour availability.",
            ("$4.55", "$182,000"),
        ),
    ];

    for (vendor, price, status, start_date, summary, (unit_cost, total)) in vendors {
        let proposal = Proposal {
            id: next_proposal_id(),
            rfp_id: rfp_id.clone(),
            vendor: vendor.to_string(),
            price: price.map(str::to_string),
            currency: "USD".to_string(),
            status,
            start_date,
            details: ProposalDetails {
                summary: Some(summary.to_string()),
                ..ProposalDetails::default()
            },
            extracted_text: None,
            bid_rows: vec![
                BidFormRow {
                    section: Some("I Roofing".to_string()),
                    item_id: "1".to_string(),
                    description: "Tear-off and disposal".to_string(),
                    quantity: Some("40,000".to_string()),
                    unit: Some("SF".to_string()),
                    unit_cost: Some(unit_cost.to_string()),
                    total: Some(total.to_string()),
                },
                BidFormRow {
                    section: Some("I Roofing".to_string()),
                    item_id: "2".to_string(),
                    description: "TPO membrane installation".to_string(),
                    quantity: Some("40,000".to_string()),
                    unit: Some("SF".to_string()),
                    unit_cost: Some(unit_cost.to_string()),
                    total: Some(total.to_string()),
                },
            ],
        };
        store
            .insert_proposal(proposal)
            .expect("fresh store accepts demo proposals");
    }

    rfp_id
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
