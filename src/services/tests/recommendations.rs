//! Detector tests: pure detection functions over fixture records plus the
//! merged report against a seeded store.

use crate::{
    config::DetectorConfig,
    models::{Recommendation, TagStatus, UNASSIGNED},
    services::{
        RecommendationService,
        recommendations::{detect_idle, detect_spikes, detect_tagging_gaps},
        tests::{record, seeded_pool},
    },
};

fn actions() -> Vec<String> {
    vec!["Review the resource".to_string()]
}

/// Enriched view of the seeded August scenario.
fn august() -> Vec<crate::models::EnrichedRecord> {
    vec![
        record("2025-08", Some("res1"), 10.0, 10.0, 1000.0, "team1", "prod"),
        record("2025-08", Some("res2"), 1.0, 20.0, 2000.0, UNASSIGNED, "dev"),
        record("2025-08", Some("res3"), 5.0, 15.0, 750.0, "team2", UNASSIGNED),
        record("2025-08", Some("res4"), 0.0, 30.0, 500.0, UNASSIGNED, UNASSIGNED),
    ]
}

#[test]
fn idle_flags_low_utilization_above_cost_floor() {
    let rec = detect_idle(&august(), 0.1, 100.0, 0.7, &actions()).unwrap();
    let Recommendation::IdleResources {
        resources,
        estimated_monthly_savings,
        ..
    } = rec
    else {
        panic!("expected idle recommendation");
    };

    // res2 sits exactly at the utilization threshold and is not idle
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].resource_id, "res4");
    assert_eq!(resources[0].owner, UNASSIGNED);
    assert_eq!(resources[0].current_monthly_cost, 500.0);
    assert_eq!(resources[0].utilization, 0.0);
    assert_eq!(resources[0].potential_savings, 350.0);
    assert_eq!(estimated_monthly_savings, 350.0);
}

#[test]
fn idle_widened_thresholds_flag_more_resources() {
    let rec = detect_idle(&august(), 0.2, 400.0, 0.7, &actions()).unwrap();
    let Recommendation::IdleResources {
        resources,
        estimated_monthly_savings,
        ..
    } = rec
    else {
        panic!("expected idle recommendation");
    };

    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].resource_id, "res2");
    assert_eq!(resources[0].utilization, 10.0);
    assert_eq!(resources[1].resource_id, "res4");
    assert_eq!(estimated_monthly_savings, 1750.0);
}

#[test]
fn idle_savings_never_exceed_cost() {
    let rec = detect_idle(&august(), 0.2, 400.0, 0.7, &actions()).unwrap();
    let Recommendation::IdleResources { resources, .. } = rec else {
        panic!("expected idle recommendation");
    };
    for detail in &resources {
        assert!(detail.potential_savings >= 0.0);
        assert!(detail.potential_savings <= detail.current_monthly_cost);
    }
}

#[test]
fn idle_skips_an_all_zero_usage_cohort() {
    let rows = vec![
        record("2025-08", Some("r1"), 0.0, 1.0, 900.0, "a", "prod"),
        record("2025-08", Some("r2"), 0.0, 1.0, 800.0, "a", "prod"),
    ];
    assert_eq!(detect_idle(&rows, 0.1, 100.0, 0.7, &actions()), None);
}

#[test]
fn detectors_return_nothing_for_empty_data() {
    assert_eq!(detect_idle(&[], 0.1, 100.0, 0.7, &actions()), None);
    assert_eq!(detect_spikes(&[], 0.3, 0.5, &actions()), None);
    assert_eq!(detect_tagging_gaps(&[], 0.2, &actions()), None);
}

#[test]
fn spike_flags_increase_and_prices_it_at_latest_cost() {
    let rows = vec![
        record("2025-07", Some("vm-a"), 1.0, 10.0, 10.0, "a", "prod"),
        record("2025-08", Some("vm-a"), 1.0, 20.0, 20.0, "a", "prod"),
    ];
    let rec = detect_spikes(&rows, 0.3, 0.5, &actions()).unwrap();
    let Recommendation::CostSpikes {
        resources,
        estimated_monthly_savings,
        ..
    } = rec
    else {
        panic!("expected spike recommendation");
    };

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].resource_id, "vm-a");
    assert_eq!(resources[0].unit_cost_increase, "100.0%");
    assert_eq!(resources[0].current_monthly_cost, 20.0);
    // savings = latest cost * pct change * recovery rate
    assert_eq!(resources[0].potential_savings, 10.0);
    assert_eq!(estimated_monthly_savings, 10.0);
}

#[test]
fn spike_never_flags_a_price_drop() {
    let rows = vec![
        record("2025-07", Some("vm-a"), 1.0, 20.0, 20.0, "a", "prod"),
        record("2025-08", Some("vm-a"), 1.0, 5.0, 5.0, "a", "prod"),
    ];
    assert_eq!(detect_spikes(&rows, 0.3, 0.5, &actions()), None);
}

#[test]
fn spike_exactly_at_threshold_is_flagged() {
    let rows = vec![
        record("2025-07", Some("vm-a"), 1.0, 10.0, 10.0, "a", "prod"),
        record("2025-08", Some("vm-a"), 1.0, 13.0, 13.0, "a", "prod"),
    ];
    let rec = detect_spikes(&rows, 0.3, 0.5, &actions());
    assert!(rec.is_some());
}

#[test]
fn spike_on_a_resource_absent_from_the_latest_month_saves_nothing() {
    let rows = vec![
        // vm-old spikes between June and July, then disappears
        record("2025-06", Some("vm-old"), 1.0, 10.0, 10.0, "a", "prod"),
        record("2025-07", Some("vm-old"), 1.0, 20.0, 20.0, "a", "prod"),
        // vm-new defines the latest month
        record("2025-08", Some("vm-new"), 1.0, 1.0, 1.0, "a", "prod"),
    ];
    let rec = detect_spikes(&rows, 0.3, 0.5, &actions()).unwrap();
    let Recommendation::CostSpikes { resources, .. } = rec else {
        panic!("expected spike recommendation");
    };
    assert_eq!(resources[0].resource_id, "vm-old");
    assert_eq!(resources[0].current_monthly_cost, 0.0);
    assert_eq!(resources[0].potential_savings, 0.0);
}

#[test]
fn tagging_gaps_classify_missing_and_partial_tags() {
    let rec = detect_tagging_gaps(&august(), 0.2, &actions()).unwrap();
    let Recommendation::TaggingGaps {
        resources,
        estimated_monthly_savings,
        ..
    } = rec
    else {
        panic!("expected tagging recommendation");
    };

    assert_eq!(resources.len(), 3);

    assert_eq!(resources[0].resource_id, "res2");
    assert_eq!(resources[0].owner_tag, TagStatus::Missing);
    assert_eq!(resources[0].environment_tag, TagStatus::Partial);
    assert_eq!(resources[0].monthly_unattributed_cost, 2000.0);

    assert_eq!(resources[1].resource_id, "res3");
    assert_eq!(resources[1].owner_tag, TagStatus::Partial);
    assert_eq!(resources[1].environment_tag, TagStatus::Missing);

    assert_eq!(resources[2].resource_id, "res4");
    assert_eq!(resources[2].owner_tag, TagStatus::Missing);
    assert_eq!(resources[2].environment_tag, TagStatus::Missing);

    // 20% of the 3250 unattributed cost
    assert_eq!(estimated_monthly_savings, 650.0);
}

#[test]
fn fully_tagged_data_has_no_tagging_gaps() {
    let rows = vec![
        record("2025-08", Some("r1"), 1.0, 1.0, 10.0, "a", "prod"),
        record("2025-08", Some("r2"), 1.0, 1.0, 20.0, "b", "dev"),
    ];
    assert_eq!(detect_tagging_gaps(&rows, 0.2, &actions()), None);
}

#[tokio::test]
async fn merged_report_sums_savings_across_detectors() {
    let service = RecommendationService::new(seeded_pool().await, DetectorConfig::default());
    let report = service.get_all_recommendations().await.unwrap();

    // single month of data: idle and tagging fire, spikes cannot
    let kinds: Vec<&str> = report.recommendations.iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, ["idle_resources", "tagging_gaps"]);
    assert_eq!(report.total_estimated_monthly_savings, 1000.0);
}

#[tokio::test]
async fn merged_report_over_empty_store_is_empty() {
    let db = crate::db::tests::harness::create_db_pool().await;
    let service = RecommendationService::new(db, DetectorConfig::default());
    let report = service.get_all_recommendations().await.unwrap();

    assert!(report.recommendations.is_empty());
    assert_eq!(report.total_estimated_monthly_savings, 0.0);
}
