pub mod models;
pub mod db;
pub mod auth;
pub mod config;
pub mod domain;
pub mod api;

// Re-export commonly used types
pub use models::{
    Badge, BadgeSet, ExpertDetails, Notification, ProgressLevel, Satisfaction, SessionReview,
};

pub use db::{
    create_pool, health_check, with_retry, DatabaseError, MemoryReputationStore,
    PgReputationStore, ReputationStore, ReputationTx,
};

pub use domain::{
    compute_reputation, determine_badges, determine_progress_level, DomainError,
    ReputationOutcome, ReviewMutation, ReviewService, ReviewStats,
};

pub use config::{ServerConfig, TelemetryConfig};
