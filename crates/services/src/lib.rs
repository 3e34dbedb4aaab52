#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod dashboard_service;
pub mod error;
pub mod identity_service;
pub mod sessions;
pub mod supplier;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use config::SupplierConfig;
pub use dashboard_service::DashboardClient;
pub use error::{
    AppServicesError, ConfigError, DashboardError, IdentityError, NotAnswerableError, Recovery,
    SessionError, SubmitError, SupplyError,
};
pub use identity_service::{IdentityProvider, IdentityService};
pub use supplier::{HttpQuestionSupplier, QuestionSupplier};

pub use sessions::{
    Advance, Current, ElapsedTime, QuestionPhase, SessionAnswer, SessionController,
    SessionProgress, SessionState, SessionSummaryId, SessionSummaryListItem,
    SessionSummaryService,
};
