//! HTTP inbound adapter exposing the console's REST endpoints.

pub mod books;
pub mod dto;
pub mod error;
pub mod health;
pub mod reports;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod transactions;
pub mod users;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Mount every REST route; callers scope this under `/api/v1`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(users::configure)
        .configure(books::configure)
        .configure(transactions::configure)
        .configure(reports::configure);
}
