//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Service`, `*Query`, [`ChangeFeed`]) are called by inbound
//! adapters; driven ports ([`RowStore`], [`AuthProvider`]) are implemented by
//! outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod auth_provider;
mod catalog_service;
mod change_feed;
mod circulation_service;
mod directory_service;
mod login_service;
mod reports_query;
mod row_store;

#[cfg(test)]
pub use auth_provider::MockAuthProvider;
pub use auth_provider::{AuthProvider, AuthProviderError};
#[cfg(test)]
pub use catalog_service::MockCatalogService;
pub use catalog_service::CatalogService;
#[cfg(test)]
pub use change_feed::MockChangeFeed;
pub use change_feed::ChangeFeed;
#[cfg(test)]
pub use circulation_service::MockCirculationService;
pub use circulation_service::{CirculationService, TransactionFilter};
#[cfg(test)]
pub use directory_service::MockDirectoryService;
pub use directory_service::DirectoryService;
#[cfg(test)]
pub use login_service::MockLoginService;
pub use login_service::LoginService;
#[cfg(test)]
pub use reports_query::MockReportsQuery;
pub use reports_query::ReportsQuery;
#[cfg(test)]
pub use row_store::MockRowStore;
pub use row_store::{Row, RowEvent, RowFilter, RowStore, RowStoreError};
