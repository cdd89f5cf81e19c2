use chrono::{TimeZone, Utc};
use labgraph_domains::{DomainQuery, MetadataClient};
use labgraph_graph::{MemorySource, QueryError, Row, Table};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn millis(day: u32, hour: u32) -> i64 {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0)
        .unwrap()
        .timestamp_millis()
}

/// One ecephys run with a mouse, a session result, a weight result, two
/// stream modules, two reward spouts and a platform; plus a second run
/// with no steps at all.
fn session_store(subject: &str) -> MemorySource {
    MemorySource::from_rows([
        Row::new("ExperimentTemplate", 1).with("xptm_name", "Ecephys Session"),
        Row::new("ExperimentRun", 100)
            .with("xprn_fk_experimentTemplate", 1)
            .with("xprn_name", "ecephys run")
            .with("xprn_createdOn", millis(3, 8))
            .with_display("xprn_createdBy", 5, "Jane Doe"),
        Row::new("ExperimentRun", 101)
            .with("xprn_fk_experimentTemplate", 1)
            .with("xprn_createdOn", millis(20, 8)),
        Row::new("ExperimentRunStep", 200)
            .with("xprs_fk_experimentRun", 100)
            .with("xprs_cf_fk_protocol", 700),
        Row::new("ExperimentRunStepContent", 300)
            .with("xrsc_fk_experimentRunStep", 200)
            .with("xrsc_fk_content", 400),
        Row::new("Content", 400)
            .with("cntn_barCode", subject)
            .with_display("cntn_fk_contentType", 1, "Mouse"),
        Row::new("Result", 500)
            .with("rslt_fk_experimentRunStep", 200)
            .with_display("rslt_fk_test", 9, "Mouse Session")
            .with("rslt_cf_sessionName", "ecephys_session_1")
            .with("rslt_cf_startTime", millis(3, 10))
            .with("rslt_cf_endTime", millis(3, 11))
            .with("rslt_cf_rigId", "323_EPHYS1")
            .with("rslt_cf_rewardConsumedMl", "0.8 mL")
            .with("rslt_cf_activeMousePlatform", false)
            .with("rslt_cf_fk_rewardSpouts", json!([600, 601]))
            .with("rslt_cf_fk_mousePlatform", 602),
        Row::new("Result", 501)
            .with("rslt_fk_experimentRunStep", 200)
            .with_display("rslt_fk_test", 10, "Mouse Weight")
            .with("rslt_cf_weightPrior", 22.1)
            .with("rslt_cf_weightPost", "22.6 g"),
        Row::new("Result", 502)
            .with("rslt_fk_experimentRunStep", 200)
            .with_display("rslt_fk_test", 11, "Stream Module")
            .with_display("rslt_cf_fk_probe", 3, "Probe A")
            .with("rslt_cf_arcAngle", -15.0),
        Row::new("Result", 503)
            .with("rslt_fk_experimentRunStep", 200)
            .with_display("rslt_fk_test", 11, "Stream Module")
            .with_display("rslt_cf_fk_probe", 4, "Probe B")
            .with("rslt_cf_arcAngle", 20.0),
        Row::new("ReferenceDataRecord", 600)
            .with_display("rdrc_fk_referenceDataType", 1, "Reward Spout")
            .with("rdrc_name", "Left spout")
            .with("rdrc_cf_side", "Left")
            .with("rdrc_cf_spoutDiameter", "1.2 mm")
            .with("rdrc_cf_solution", "Water"),
        Row::new("ReferenceDataRecord", 601)
            .with_display("rdrc_fk_referenceDataType", 1, "Reward Spout")
            .with("rdrc_name", "Right spout")
            .with("rdrc_cf_side", "Right"),
        Row::new("ReferenceDataRecord", 602)
            .with_display("rdrc_fk_referenceDataType", 2, "Mouse Platform")
            .with("rdrc_name", "Running wheel"),
        Row::new("SOP", 700).with("sop_name", "Ecephys surgery and recording"),
    ])
}

#[tokio::test]
async fn test_session_assembled_from_every_hop() {
    let source = Arc::new(session_store("614173"));
    let client = MetadataClient::new(source.clone());

    let sessions = client.get_sessions(&DomainQuery::new()).await.unwrap();
    assert_eq!(sessions.len(), 2);

    let session = &sessions[0];
    assert_eq!(session.run_name.as_deref(), Some("ecephys run"));
    assert_eq!(session.session_name.as_deref(), Some("ecephys_session_1"));
    assert_eq!(session.subject_id.as_deref(), Some("614173"));
    assert_eq!(session.rig_id.as_deref(), Some("323_EPHYS1"));
    assert_eq!(session.experimenter.as_deref(), Some("Jane Doe"));
    assert_eq!(session.reward_consumed_ml, Some(0.8));
    assert_eq!(session.active_mouse_platform, Some(false));
    assert_eq!(session.animal_weight_prior_g, Some(22.1));
    assert_eq!(session.animal_weight_post_g, Some(22.6));
    assert_eq!(session.stream_modules.len(), 2);
    assert_eq!(session.reward_spouts.len(), 2);
    assert_eq!(session.mouse_platform_name.as_deref(), Some("Running wheel"));
    assert_eq!(session.protocol_names, vec!["Ecephys surgery and recording".to_string()]);
    assert_eq!(
        session.start_time.map(|t| t.timestamp_millis()),
        Some(millis(3, 10))
    );

    // A run with nothing below it is still reported.
    let bare = &sessions[1];
    assert_eq!(bare.subject_id, None);
    assert!(bare.stream_modules.is_empty());

    // template, runs, steps, {links, results, SOPs}, {mice, reference data}
    assert_eq!(source.fetch_count(), 8);
}

#[tokio::test]
async fn test_reference_data_fetched_once_for_both_columns() {
    let source = Arc::new(session_store("614173"));
    let client = MetadataClient::new(source.clone());
    client.get_sessions(&DomainQuery::new()).await.unwrap();

    let reference_fetches: Vec<_> = source
        .fetch_log()
        .into_iter()
        .filter(|f| f.table == Table::ReferenceDataRecord)
        .collect();
    assert_eq!(reference_fetches.len(), 1);
    assert_eq!(
        reference_fetches[0].criterion,
        labgraph_graph::Criterion::one_of(
            "rdrc_pk",
            [600, 601, 602].into_iter().map(labgraph_graph::KeyValue::Int)
        )
    );
}

#[tokio::test]
async fn test_date_range_pushed_into_run_query() {
    let source = Arc::new(session_store("614173"));
    let client = MetadataClient::new(source.clone());
    let start = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();

    let sessions = client
        .get_sessions(&DomainQuery::new().between(Some(start), None))
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].run_name, None);
    // The run query carried the range: only run 101 came back.
    let runs_fetch = &source.fetch_log()[1];
    assert_eq!(runs_fetch.table, Table::ExperimentRun);
    assert!(runs_fetch.criterion.fields().contains(&"xprn_createdOn"));
}

#[tokio::test]
async fn test_session_name_filter() {
    let client = MetadataClient::new(Arc::new(session_store("614173")));

    let hit = client
        .get_sessions(&DomainQuery::new().session_name("ecephys_session_1"))
        .await
        .unwrap();
    assert_eq!(hit.len(), 1);

    let miss = client
        .get_sessions(&DomainQuery::new().session_name("other"))
        .await
        .unwrap();
    assert!(miss.is_empty());
}

#[tokio::test]
async fn test_source_failure_propagates() {
    let source = Arc::new(session_store("614173").fail_on("Result"));
    let client = MetadataClient::new(source);
    let err = client.get_sessions(&DomainQuery::new()).await.unwrap_err();
    assert!(matches!(err, QueryError::Source(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_subject_filter_round_trip(
        subject in "[0-9]{6}",
        other in "[0-9]{6}",
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let client = MetadataClient::new(Arc::new(session_store(&subject)));

        let unfiltered = runtime.block_on(client.get_sessions(&DomainQuery::new())).unwrap();
        let own = runtime
            .block_on(client.get_sessions(&DomainQuery::new().subject(subject.clone())))
            .unwrap();
        prop_assert_eq!(own.len(), 1);
        prop_assert_eq!(&own[0], &unfiltered[0]);

        let foreign = runtime
            .block_on(client.get_sessions(&DomainQuery::new().subject(other.clone())))
            .unwrap();
        if other == subject {
            prop_assert_eq!(foreign.len(), 1);
        } else {
            prop_assert!(foreign.is_empty());
        }
    }
}
