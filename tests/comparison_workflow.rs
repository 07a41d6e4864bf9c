//! Integration specifications for the proposal comparison workflow.
//!
//! Scenarios run through the public service facade and HTTP router so
//! snapshot caching, staleness detection, and decision locking are validated
//! without reaching into private modules.

mod common {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use procure_ai::workflows::comparison::{
        AiScoreSet, AnalysisError, AnalysisGateway, ComparisonService, Dimension, DimensionScore,
        MemoryComparisonStore, MemoryProposalStore, Proposal, ProposalDetails, ProposalId,
        ProposalScores, ProposalStatus, ProposalStore, Rfp, RfpId, RfpStatus,
    };

    pub(super) fn rfp_id() -> RfpId {
        RfpId("rfp-flow".to_string())
    }

    pub(super) fn open_rfp() -> Rfp {
        Rfp {
            id: rfp_id(),
            title: "Parking Structure Restoration".to_string(),
            description: Some("Concrete repair and traffic coating for two decks.".to_string()),
            requirements: vec![
                "Repair spalled concrete on both decks".to_string(),
                "Apply traffic-rated membrane coating".to_string(),
            ],
            budget: Some(800_000.0),
            currency: "USD".to_string(),
            deadline: None,
            status: RfpStatus::Open,
        }
    }

    pub(super) fn proposal(id: &str, vendor: &str, price: &str) -> Proposal {
        Proposal {
            id: ProposalId(id.to_string()),
            rfp_id: rfp_id(),
            vendor: vendor.to_string(),
            price: Some(price.to_string()),
            currency: "USD".to_string(),
            status: ProposalStatus::Pending,
            start_date: None,
            details: ProposalDetails {
                summary: Some(format!("{vendor} full restoration bid")),
                ..ProposalDetails::default()
            },
            extracted_text: None,
            bid_rows: Vec::new(),
        }
    }

    /// Gateway double that returns a canned score set and counts calls.
    #[derive(Default)]
    pub(super) struct CannedAnalysis {
        pub(super) scores: Mutex<Option<AiScoreSet>>,
        pub(super) score_calls: AtomicUsize,
    }

    impl CannedAnalysis {
        pub(super) fn scoring(entries: &[(&str, &str, u8)]) -> Self {
            let gateway = Self::default();
            let set = AiScoreSet {
                proposals: entries
                    .iter()
                    .map(|(id, vendor, score)| ProposalScores {
                        id: ProposalId(id.to_string()),
                        vendor: vendor.to_string(),
                        scores: BTreeMap::from([(
                            "cost".to_string(),
                            DimensionScore {
                                score: *score,
                                label: "Strong".to_string(),
                                reasoning: None,
                            },
                        )]),
                        overall_score: *score,
                    })
                    .collect(),
            };
            *gateway.scores.lock().expect("scores mutex poisoned") = Some(set);
            gateway
        }

        pub(super) fn calls(&self) -> usize {
            self.score_calls.load(Ordering::Relaxed)
        }
    }

    impl AnalysisGateway for CannedAnalysis {
        fn discover_dimensions(&self, _rfp: &Rfp) -> Result<Vec<Dimension>, AnalysisError> {
            Err(AnalysisError::Disabled)
        }

        fn score_proposals(
            &self,
            _rfp: &Rfp,
            _proposals: &[&Proposal],
            _dimension_ids: &[String],
        ) -> Result<AiScoreSet, AnalysisError> {
            self.score_calls.fetch_add(1, Ordering::Relaxed);
            self.scores
                .lock()
                .expect("scores mutex poisoned")
                .clone()
                .ok_or(AnalysisError::Disabled)
        }
    }

    pub(super) type FlowService =
        ComparisonService<MemoryProposalStore, MemoryComparisonStore, CannedAnalysis>;

    pub(super) struct Fixture {
        pub(super) proposals: Arc<MemoryProposalStore>,
        pub(super) comparisons: Arc<MemoryComparisonStore>,
        pub(super) gateway: Arc<CannedAnalysis>,
    }

    impl Fixture {
        pub(super) fn seeded(gateway: CannedAnalysis) -> Self {
            let proposals = Arc::new(MemoryProposalStore::default());
            proposals
                .insert_rfp(open_rfp())
                .expect("fresh store accepts rfp");
            proposals
                .insert_proposal(proposal("p-1", "Summit Restoration", "$740,000"))
                .expect("insert");
            proposals
                .insert_proposal(proposal("p-2", "Apex Concrete", "698k"))
                .expect("insert");

            Self {
                proposals,
                comparisons: Arc::new(MemoryComparisonStore::default()),
                gateway: Arc::new(gateway),
            }
        }

        /// A service over the shared stores, as a fresh process would build it.
        pub(super) fn service(&self) -> Arc<FlowService> {
            Arc::new(ComparisonService::new(
                self.proposals.clone(),
                self.comparisons.clone(),
                self.gateway.clone(),
            ))
        }
    }
}

mod caching {
    use super::common::*;
    use procure_ai::workflows::comparison::{ReportState, RfpId};

    #[test]
    fn a_restart_restores_the_report_without_rescoring() {
        let fixture = Fixture::seeded(CannedAnalysis::scoring(&[
            ("p-1", "Summit Restoration", 74),
            ("p-2", "Apex Concrete", 81),
        ]));

        let first = fixture.service();
        let generated = first
            .generate_report(&rfp_id(), vec!["cost".to_string()], false)
            .expect("generate");
        assert_eq!(generated.state, ReportState::Fresh);
        assert!(generated.ai_scored);
        assert_eq!(fixture.gateway.calls(), 1);

        // A new service instance over the same stores (a fresh page view)
        // must restore the snapshot and reuse its cached scores.
        let second = fixture.service();
        let restored = second.view_report(&rfp_id(), false).expect("view");
        assert_eq!(restored.state, ReportState::Fresh);
        assert!(restored.ai_scored);
        let row = restored
            .rows
            .iter()
            .find(|row| row.proposal_id.0 == "p-2")
            .expect("row");
        assert_eq!(row.overall_score, 81);
        assert_eq!(fixture.gateway.calls(), 1, "restore must not rescore");
    }

    #[test]
    fn a_new_proposal_invalidates_the_snapshot_until_regeneration() {
        let fixture = Fixture::seeded(CannedAnalysis::scoring(&[
            ("p-1", "Summit Restoration", 74),
            ("p-2", "Apex Concrete", 81),
        ]));

        fixture
            .service()
            .generate_report(&rfp_id(), vec!["cost".to_string()], false)
            .expect("generate");

        use procure_ai::workflows::comparison::ProposalStore;
        fixture
            .proposals
            .insert_proposal(proposal("p-3", "Latecomer Builders", "$655,000"))
            .expect("insert");

        let service = fixture.service();
        let stale = service.view_report(&rfp_id(), false).expect("view");
        assert_eq!(stale.state, ReportState::Stale);
        assert!(stale.rows.is_empty(), "stale reports must not display");

        let regenerated = service
            .generate_report(&rfp_id(), vec!["cost".to_string()], false)
            .expect("regenerate");
        assert_eq!(regenerated.state, ReportState::Fresh);
        assert_eq!(regenerated.eligible_proposal_ids.len(), 3);
    }

    #[test]
    fn snapshots_round_trip_their_dimension_selection() {
        let fixture = Fixture::seeded(CannedAnalysis::default());

        fixture
            .service()
            .generate_report(
                &rfp_id(),
                vec![
                    "schedule".to_string(),
                    "cost".to_string(),
                    "schedule".to_string(),
                ],
                false,
            )
            .expect("generate");

        use procure_ai::workflows::comparison::ComparisonStore;
        let saved = fixture
            .comparisons
            .fetch(&rfp_id())
            .expect("fetch")
            .expect("snapshot");
        assert_eq!(saved.dimensions, vec!["schedule", "cost"]);

        let restored = fixture.service().view_report(&rfp_id(), false).expect("view");
        assert_eq!(restored.selected_dimensions, vec!["schedule", "cost"]);
    }

    #[test]
    fn unknown_rfps_do_not_leak_sessions() {
        let fixture = Fixture::seeded(CannedAnalysis::default());
        let service = fixture.service();

        assert!(service
            .view_report(&RfpId("rfp-elsewhere".to_string()), false)
            .is_err());
        // The real RFP still behaves normally afterwards.
        let view = service.view_report(&rfp_id(), false).expect("view");
        assert_eq!(view.state, ReportState::NoSnapshot);
    }
}

mod decisions {
    use super::common::*;
    use procure_ai::workflows::comparison::{ProposalId, ProposalStatus, ProposalStore};

    #[test]
    fn decisions_are_final_in_both_directions() {
        let fixture = Fixture::seeded(CannedAnalysis::default());
        let service = fixture.service();

        let accepted = service
            .approve_proposal(&ProposalId("p-1".to_string()))
            .expect("approve");
        assert_eq!(accepted.status, ProposalStatus::Accepted);
        assert!(service.reject_proposal(&ProposalId("p-1".to_string())).is_err());

        let rejected = service
            .reject_proposal(&ProposalId("p-2".to_string()))
            .expect("reject");
        assert_eq!(rejected.status, ProposalStatus::Rejected);
        assert!(service.approve_proposal(&ProposalId("p-2".to_string())).is_err());

        let stored = fixture
            .proposals
            .get_proposal(&ProposalId("p-1".to_string()))
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.status, ProposalStatus::Accepted);
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use procure_ai::workflows::comparison::comparison_router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn read_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn generate_then_view_over_http() {
        let fixture = Fixture::seeded(CannedAnalysis::scoring(&[
            ("p-1", "Summit Restoration", 74),
            ("p-2", "Apex Concrete", 81),
        ]));
        let router = comparison_router(fixture.service());

        let generate = Request::builder()
            .method("POST")
            .uri("/api/v1/rfps/rfp-flow/comparison/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::to_vec(&json!({ "dimension_ids": ["cost"] })).expect("serialize"),
            ))
            .expect("request");

        let response = router
            .clone()
            .oneshot(generate)
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload.get("state"), Some(&json!("fresh")));
        assert_eq!(payload.get("ai_scored"), Some(&json!(true)));

        let view = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/rfps/rfp-flow/comparison")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(view.status(), StatusCode::OK);
        let view_payload = read_json(view).await;
        assert_eq!(view_payload.get("state"), Some(&json!("fresh")));
        let rows = view_payload
            .get("rows")
            .and_then(Value::as_array)
            .expect("rows");
        assert_eq!(rows.len(), 2);
    }
}
