//! Domain model shared by every Competitor Lemonade crate.
//!
//! Holds the signal and report types, competitor-name parsing and canonical
//! identity, the per-identity quota state machine, the storage traits the
//! pipeline is written against, and environment-driven [`AppConfig`] loading.

use thiserror::Error;

pub mod app_config;
pub mod competitors;
pub mod config;
pub mod models;
pub mod quota;
pub mod signals;
pub mod store;

pub use app_config::{AppConfig, Environment, QuotaLimits};
pub use competitors::{canonical_identity, parse_competitor_input, report_fingerprint, InputError};
pub use config::{load_app_config, load_app_config_from_env};
pub use models::{
    CompetitorReport, NewReport, ReportListItem, ReportMetadata, TrackOutcome, TrackResult,
    TrackedCompetitor, User,
};
pub use quota::{Identity, Plan, QuotaCounter, QuotaDecision, QuotaPolicy, QuotaUsage};
pub use signals::{CompetitorSignal, SignalItem, SignalType, SourceToggles};
pub use store::{
    AccountStore, QuotaLedger, ReportStore, Store, StoreError, StoreHealth, WatchList,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
