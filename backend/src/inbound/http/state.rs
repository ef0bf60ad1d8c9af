//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CatalogService, ChangeFeed, CirculationService, DirectoryService, LoginService, ReportsQuery,
};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub login: Arc<dyn LoginService>,
    pub directory: Arc<dyn DirectoryService>,
    pub catalog: Arc<dyn CatalogService>,
    pub circulation: Arc<dyn CirculationService>,
    pub reports: Arc<dyn ReportsQuery>,
    pub changes: Arc<dyn ChangeFeed>,
}

/// Dependency bundle for HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub directory: Arc<dyn DirectoryService>,
    pub catalog: Arc<dyn CatalogService>,
    pub circulation: Arc<dyn CirculationService>,
    pub reports: Arc<dyn ReportsQuery>,
    pub changes: Arc<dyn ChangeFeed>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use chrono::TimeDelta;
    /// use library_backend::domain::{
    ///     AccountService, CirculationRules, FlatDailyFine, LibraryService, Money,
    /// };
    /// use library_backend::inbound::http::state::{HttpState, HttpStatePorts};
    /// use library_backend::outbound::credentials::InMemoryAuthProvider;
    /// use mockable::DefaultClock;
    ///
    /// let library = Arc::new(LibraryService::new(
    ///     Arc::new(DefaultClock),
    ///     CirculationRules {
    ///         loan_period: TimeDelta::days(14),
    ///         fine_policy: Arc::new(FlatDailyFine::new(Money::from_cents(100), None)),
    ///     },
    /// ));
    /// let accounts = Arc::new(AccountService::new(
    ///     library.clone(),
    ///     Arc::new(InMemoryAuthProvider::new()),
    /// ));
    /// let state = HttpState::new(HttpStatePorts {
    ///     login: accounts.clone(),
    ///     directory: accounts,
    ///     catalog: library.clone(),
    ///     circulation: library.clone(),
    ///     reports: library.clone(),
    ///     changes: library,
    /// });
    /// let _login = state.login.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            login,
            directory,
            catalog,
            circulation,
            reports,
            changes,
        } = ports;
        Self {
            login,
            directory,
            catalog,
            circulation,
            reports,
            changes,
        }
    }
}
