//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};

use crate::domain::ports::{
    CatalogService, ChangeFeed, CirculationService, DirectoryService, LoginService,
    MockCatalogService, MockChangeFeed, MockCirculationService, MockDirectoryService,
    MockLoginService, MockReportsQuery, ReportsQuery,
};
use crate::domain::{Actor, Role, UserId};

use super::ApiResult;
use super::session::SessionContext;
use super::state::HttpState;

const SIGN_IN_PATH: &str = "/test/sign-in";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Session cookie issued by a response.
pub fn session_cookie(res: &ServiceResponse) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// App with the session middleware, `state`, a sign-in shortcut and
/// `routes` mounted under `/api/v1`.
pub fn test_app(
    state: HttpState,
    routes: impl FnOnce(&mut web::ServiceConfig),
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(test_session_middleware())
        .route(SIGN_IN_PATH, web::post().to(sign_in))
        .service(web::scope("/api/v1").configure(routes))
}

async fn sign_in(session: SessionContext) -> ApiResult<HttpResponse> {
    session.persist_user(&UserId::random())?;
    Ok(HttpResponse::NoContent().finish())
}

/// Cookie of a freshly signed-in session; which account it maps to is up to
/// the login mock.
pub async fn signed_in_cookie(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
) -> Cookie<'static> {
    let res = test::call_service(app, test::TestRequest::post().uri(SIGN_IN_PATH).to_request()).await;
    assert!(res.status().is_success(), "test sign-in failed");
    session_cookie(&res)
}

/// Staff member used by handler tests.
pub fn actor(role: Role) -> Actor {
    Actor {
        user_id: UserId::random(),
        name: match role {
            Role::Admin => "Admin User".to_owned(),
            Role::Librarian => "Librarian User".to_owned(),
        },
        role,
    }
}

/// Mock ports assembled into [`HttpState`]; tests set expectations before
/// calling [`MockPorts::into_state`].
#[derive(Default)]
pub struct MockPorts {
    pub login: MockLoginService,
    pub directory: MockDirectoryService,
    pub catalog: MockCatalogService,
    pub circulation: MockCirculationService,
    pub reports: MockReportsQuery,
    pub changes: MockChangeFeed,
}

impl MockPorts {
    /// Ports whose login mock resolves every session to `actor`.
    pub fn signed_in_as(actor: Actor) -> Self {
        let mut ports = Self::default();
        ports
            .login
            .expect_resolve_actor()
            .returning(move |_| Ok(actor.clone()));
        ports
    }

    /// Freeze the mocks into handler state.
    pub fn into_state(self) -> HttpState {
        let login: Arc<dyn LoginService> = Arc::new(self.login);
        let directory: Arc<dyn DirectoryService> = Arc::new(self.directory);
        let catalog: Arc<dyn CatalogService> = Arc::new(self.catalog);
        let circulation: Arc<dyn CirculationService> = Arc::new(self.circulation);
        let reports: Arc<dyn ReportsQuery> = Arc::new(self.reports);
        let changes: Arc<dyn ChangeFeed> = Arc::new(self.changes);
        HttpState::new(super::state::HttpStatePorts {
            login,
            directory,
            catalog,
            circulation,
            reports,
            changes,
        })
    }
}
