use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::config::SupplierConfig;
use crate::dashboard_service::DashboardClient;
use crate::error::AppServicesError;
use crate::identity_service::IdentityService;
use crate::sessions::{SessionController, SessionSummaryService};
use crate::supplier::{HttpQuestionSupplier, QuestionSupplier};

/// Assembles the app-facing services around one storage backend and one supplier.
#[derive(Clone)]
pub struct AppServices {
    sessions: Arc<SessionController>,
    session_summaries: Arc<SessionSummaryService>,
    identity: Arc<IdentityService>,
    dashboard: Arc<DashboardClient>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP question supplier.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or HTTP client setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: SupplierConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let supplier = Arc::new(HttpQuestionSupplier::new(config.clone())?);
        let dashboard = DashboardClient::new(config)?;
        Ok(Self::from_parts(&storage, clock, supplier, dashboard))
    }

    /// Wire services from already-built collaborators.
    #[must_use]
    pub fn from_parts(
        storage: &Storage,
        clock: Clock,
        supplier: Arc<dyn QuestionSupplier>,
        dashboard: DashboardClient,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionController::new(
                clock,
                supplier,
                Arc::clone(&storage.session_summaries),
            )),
            session_summaries: Arc::new(SessionSummaryService::new(
                clock,
                Arc::clone(&storage.session_summaries),
            )),
            identity: Arc::new(IdentityService::new(clock, Arc::clone(&storage.users))),
            dashboard: Arc::new(dashboard),
        }
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionController> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn session_summaries(&self) -> Arc<SessionSummaryService> {
        Arc::clone(&self.session_summaries)
    }

    #[must_use]
    pub fn identity(&self) -> Arc<IdentityService> {
        Arc::clone(&self.identity)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardClient> {
        Arc::clone(&self.dashboard)
    }
}
