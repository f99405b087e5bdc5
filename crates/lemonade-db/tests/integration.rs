//! Offline tests for lemonade-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use chrono::{NaiveDate, Utc};
use lemonade_core::{
    AppConfig, CompetitorReport, CompetitorSignal, Environment, QuotaLimits, ReportListItem,
    ReportMetadata, TrackedCompetitor,
};
use lemonade_db::{PoolConfig, RateLimitRow, ReportListRow, ReportRow, TrackedRow};
use sqlx::types::Json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        openai_api_key: None,
        llm_base_url: "https://api.openai.com/v1".to_string(),
        llm_fast_model: "fast".to_string(),
        llm_standard_model: "standard".to_string(),
        llm_premium_model: "premium".to_string(),
        http_timeout_secs: 15,
        user_agent: "ua".to_string(),
        quota: QuotaLimits::default(),
        max_competitors: 5,
        report_cache_hours: 6,
        reddit_sentiment_enabled: false,
        reddit_comment_delay_ms: 0,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn metadata() -> ReportMetadata {
    ReportMetadata {
        total_signals: 4,
        sources: vec!["news".to_string()],
        model: "standard".to_string(),
        premium: false,
        fingerprint: "abc".to_string(),
        unavailable_sources: 0,
    }
}

#[test]
fn report_row_converts_to_domain_report() {
    let id = Uuid::new_v4();
    let row = ReportRow {
        id,
        user_id: None,
        guest_session_id: Some("guest-1".to_string()),
        title: "Acme vs Beta".to_string(),
        competitors: vec!["Acme".to_string(), "Beta".to_string()],
        signals: Json(vec![CompetitorSignal {
            source: "news".to_string(),
            competitor: "Acme".to_string(),
            items: Vec::new(),
            unavailable: None,
        }]),
        summary: "{}".to_string(),
        metadata: Json(metadata()),
        fingerprint: "abc".to_string(),
        created_at: Utc::now(),
    };

    let report = CompetitorReport::from(row);
    assert_eq!(report.id, id);
    assert_eq!(report.guest_session_id.as_deref(), Some("guest-1"));
    assert_eq!(report.signals.len(), 1);
    assert_eq!(report.metadata.total_signals, 4);
}

#[test]
fn report_list_row_keeps_total() {
    let item = ReportListItem::from(ReportListRow {
        id: Uuid::new_v4(),
        title: "Acme".to_string(),
        competitors: vec!["Acme".to_string()],
        total_signals: 12,
        created_at: Utc::now(),
    });
    assert_eq!(item.total_signals, 12);
}

#[test]
fn tracked_row_converts() {
    let tracked = TrackedCompetitor::from(TrackedRow {
        id: 9,
        user_id: 1,
        competitor_name: "Acme Inc".to_string(),
        canonical_name: "acme".to_string(),
        is_active: true,
        added_at: Utc::now(),
        last_analyzed_at: None,
    });
    assert_eq!(tracked.canonical_name, "acme");
    assert!(tracked.is_active);
}

#[test]
fn negative_stored_count_reads_as_zero() {
    let row = RateLimitRow {
        id: 1,
        user_id: Some(1),
        session_id: None,
        query_count: -3,
        last_reset: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
        updated_at: Utc::now(),
    };
    assert_eq!(row.counter().query_count, 0);
}
