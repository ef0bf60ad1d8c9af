//! Server construction and middleware wiring.
//!
//! Startup order: seed the store (optional), hydrate the library from it,
//! start the outbox mirror and the row-feed apply loop, then bind the HTTP
//! server and report ready.

mod config;

pub use config::{LibrarySettings, ServerConfig, SettingsError};

use std::sync::Arc;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::Clock;
use tokio::sync::mpsc;
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::Trace;
#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::ports::{AuthProvider, RowStore};
use crate::domain::{AccountService, CirculationRules, LibraryService, run_apply_loop};
use crate::inbound::http::configure_api;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::inbound::http::validation::{json_config, query_config};
use crate::inbound::ws;
use crate::inbound::ws::state::WsState;
use crate::outbound::credentials::InMemoryAuthProvider;
use crate::outbound::row_store::{
    HydrateError, InMemoryRowStore, ROW_FEED_CAPACITY, RowFeed, RowStoreMirror, hydrate,
};
use crate::outbound::seed::{SeedError, seed_demo_data};

/// Startup failures before the listener is bound.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Demo data could not be written.
    #[error(transparent)]
    Seed(#[from] SeedError),
    /// The library could not be loaded from the row store.
    #[error(transparent)]
    Hydrate(#[from] HydrateError),
}

impl From<BootstrapError> for std::io::Error {
    fn from(error: BootstrapError) -> Self {
        Self::other(error)
    }
}

/// Hydrated library with its background tasks running.
pub struct LibraryRuntime {
    /// Shared library state and use-cases.
    pub library: Arc<LibraryService>,
    /// Credential store behind sign-in.
    pub auth: Arc<dyn AuthProvider>,
    /// Row store mirroring the library.
    pub store: Arc<dyn RowStore>,
}

impl LibraryRuntime {
    /// Handler ports backed by this runtime.
    pub fn http_state(&self) -> HttpState {
        let accounts = Arc::new(AccountService::new(self.library.clone(), self.auth.clone()));
        HttpState::new(HttpStatePorts {
            login: accounts.clone(),
            directory: accounts,
            catalog: self.library.clone(),
            circulation: self.library.clone(),
            reports: self.library.clone(),
            changes: self.library.clone(),
        })
    }
}

/// Build the library over a fresh in-memory store and start the tasks that
/// keep it in step with the store.
///
/// Must be called from within an Actix or Tokio runtime.
///
/// # Errors
/// Fails when seeding or hydration fails.
pub async fn start_library(
    clock: Arc<dyn Clock>,
    rules: CirculationRules,
    seed: bool,
) -> Result<LibraryRuntime, BootstrapError> {
    let store: Arc<dyn RowStore> = Arc::new(InMemoryRowStore::new());
    let auth: Arc<dyn AuthProvider> = Arc::new(InMemoryAuthProvider::new());

    if seed {
        let summary = seed_demo_data(store.as_ref(), auth.as_ref(), clock.utc()).await?;
        info!(users = summary.users, books = summary.books, "demo data seeded");
    }

    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    let library = Arc::new(LibraryService::new(clock, rules).with_outbox(outbox));
    let feed = RowFeed::subscribe(store.as_ref());
    hydrate(store.as_ref(), &library).await?;

    let (feed_tx, feed_rx) = mpsc::channel(ROW_FEED_CAPACITY);
    actix_web::rt::spawn(RowStoreMirror::new(store.clone()).run(outbox_rx));
    actix_web::rt::spawn(feed.forward(feed_tx));
    actix_web::rt::spawn(run_apply_loop(library.clone(), feed_rx));

    Ok(LibraryRuntime {
        library,
        auth,
        store,
    })
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    ws_state: web::Data<WsState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        ws_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(8)),
        )
        .build();

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(ws_state)
        .app_data(json_config())
        .app_data(query_config())
        .wrap(session)
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
        .service(ws::ws_entry)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Start the library and construct an Actix HTTP server over it.
///
/// The health state is marked ready once the listener is bound.
///
/// # Errors
/// Propagates startup failures and [`std::io::Error`] from binding the socket.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    clock: Arc<dyn Clock>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        rules,
        origins,
        seed_demo_data,
    } = config;

    let runtime = start_library(clock, rules, seed_demo_data).await?;
    let http_state = web::Data::new(runtime.http_state());
    let ws_state = web::Data::new(WsState::new(origins));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            ws_state: ws_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "library console listening");
    health_state.mark_ready();
    Ok(server)
}
