//! Server settings loaded via OrthoConfig, and the builder handed to
//! [`create_server`](super::create_server).

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::cookie::{Key, SameSite};
use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{CirculationRules, FlatDailyFine, Money};
use crate::inbound::ws::state::AllowedOrigins;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;
const DEFAULT_FINE_PER_DAY_CENTS: u64 = 100;

/// Library settings read from `LIBRARY_*` variables, config files and flags.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LIBRARY")]
pub struct LibrarySettings {
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind_addr: Option<String>,
    /// Loan length when a borrow names no due date.
    pub loan_period_days: Option<u32>,
    /// Late fee per started day, in cents.
    pub fine_per_day_cents: Option<u64>,
    /// Upper bound on a single fine, in cents.
    pub fine_cap_cents: Option<u64>,
    /// Seed the demo accounts and books into an empty store at startup.
    #[ortho_config(default = false)]
    pub seed_demo_data: bool,
    /// Origins allowed to open the change stream; comma-separated in the
    /// environment.
    pub allowed_origins: Option<Vec<String>>,
}

/// Settings that do not describe a runnable server.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The listen address does not parse.
    #[error("invalid bind address '{value}': {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    /// A zero-day loan period.
    #[error("loan period must be at least one day")]
    ZeroLoanPeriod,
    /// An allowed origin is not a URL.
    #[error("invalid allowed origin: {0}")]
    Origin(#[from] url::ParseError),
}

impl From<SettingsError> for std::io::Error {
    fn from(error: SettingsError) -> Self {
        Self::new(std::io::ErrorKind::InvalidInput, error)
    }
}

impl LibrarySettings {
    /// Configured listen address, or `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    /// Loan period and flat daily fine, 14 days and 1.00 per day by default.
    pub fn circulation_rules(&self) -> Result<CirculationRules, SettingsError> {
        let days = self.loan_period_days.unwrap_or(DEFAULT_LOAN_PERIOD_DAYS);
        if days == 0 {
            return Err(SettingsError::ZeroLoanPeriod);
        }
        let per_day = Money::from_cents(
            self.fine_per_day_cents
                .unwrap_or(DEFAULT_FINE_PER_DAY_CENTS),
        );
        let cap = self.fine_cap_cents.map(Money::from_cents);
        Ok(CirculationRules {
            loan_period: TimeDelta::days(i64::from(days)),
            fine_policy: Arc::new(FlatDailyFine::new(per_day, cap)),
        })
    }

    /// Parsed change-stream allow-list; blank entries are skipped.
    pub fn allowed_origins(&self) -> Result<AllowedOrigins, SettingsError> {
        let origins = self
            .allowed_origins
            .iter()
            .flatten()
            .map(|entry| entry.as_str().trim())
            .filter(|entry| !entry.is_empty());
        Ok(AllowedOrigins::parse(origins)?)
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) rules: CirculationRules,
    pub(crate) origins: AllowedOrigins,
    pub(crate) seed_demo_data: bool,
}

impl ServerConfig {
    /// Server with default loan rules, no demo data and no extra origins.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            rules: CirculationRules {
                loan_period: TimeDelta::days(i64::from(DEFAULT_LOAN_PERIOD_DAYS)),
                fine_policy: Arc::new(FlatDailyFine::new(
                    Money::from_cents(DEFAULT_FINE_PER_DAY_CENTS),
                    None,
                )),
            },
            origins: AllowedOrigins::default(),
            seed_demo_data: false,
        }
    }

    /// Apply loan rules, seeding and origins from `settings`.
    pub fn with_settings(mut self, settings: &LibrarySettings) -> Result<Self, SettingsError> {
        self.rules = settings.circulation_rules()?;
        self.origins = settings.allowed_origins()?;
        self.seed_demo_data = settings.seed_demo_data;
        Ok(self)
    }

    /// Seed demo data into the empty store at startup.
    #[must_use]
    pub fn with_demo_data(mut self, enabled: bool) -> Self {
        self.seed_demo_data = enabled;
        self
    }

    /// Socket address the server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
