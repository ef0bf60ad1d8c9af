//! Sign-in and account API handlers.
//!
//! ```text
//! POST /api/v1/login {"email":"admin@library.com","password":"admin123"}
//! GET /api/v1/users/me
//! POST /api/v1/users {"email":"new@library.com","name":"New Librarian","role":"librarian","password":"secret1"}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::{
    Error, LoginCredentials, LoginValidationError, Password, UserDraft, UserId, UserPatch,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::books::{RecordPath, SearchQuery};
use crate::inbound::http::dto::{CurrentUserDto, UserDto, views};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_role, require};

const USER_ID: FieldName = FieldName::new("id");
const EMAIL: FieldName = FieldName::new("email");
const NAME: FieldName = FieldName::new("name");
const ROLE: FieldName = FieldName::new("role");
const PASSWORD: FieldName = FieldName::new("password");

/// Login request body for `POST /api/v1/login`.
///
/// Example JSON:
/// `{"email":"admin@library.com","password":"admin123"}`
#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.email, &value.password)
    }
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyEmail => Error::invalid_request("email must not be empty")
            .with_details(json!({ "field": "email", "code": "empty_email" })),
        LoginValidationError::EmptyPassword => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "empty_password" })),
        LoginValidationError::PasswordTooShort { min } => Error::invalid_request(format!(
            "password must be at least {min} characters"
        ))
        .with_details(json!({ "field": "password", "code": "password_too_short", "min": min })),
    }
}

fn parse_password(raw: &str) -> Result<Password, Error> {
    Password::new(raw).map_err(map_login_validation_error)
}

/// Body of `POST /api/v1/users`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    #[schema(example = "librarian")]
    pub role: Option<String>,
    /// Initial password.
    pub password: Option<String>,
}

impl CreateUserRequest {
    fn into_parts(self) -> Result<(UserDraft, Password), Error> {
        let role = require(self.role, ROLE)?;
        let password = require(self.password, PASSWORD)?;
        let draft = UserDraft {
            email: require(self.email, EMAIL)?,
            name: require(self.name, NAME)?,
            role: parse_role(&role, ROLE)?,
        };
        Ok((draft, parse_password(&password)?))
    }
}

/// Body of `PUT /api/v1/users/{id}`; omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    /// Replacement password.
    pub password: Option<String>,
}

impl UpdateUserRequest {
    fn into_parts(self) -> Result<(UserPatch, Option<Password>), Error> {
        let patch = UserPatch {
            email: self.email,
            name: self.name,
            role: self.role.map(|raw| parse_role(&raw, ROLE)).transpose()?,
        };
        let password = self.password.as_deref().map(parse_password).transpose()?;
        Ok((patch, password))
    }
}

/// Authenticate and establish a session.
///
/// Uses the centralised `Error` type so clients get a consistent
/// error schema across all endpoints.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = CurrentUserDto,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 503, description = "Authentication unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<CurrentUserDto>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let user = state.login.authenticate(&credentials).await?;
    session.persist_user(&user.id)?;
    info!(user_id = %user.id, role = %user.role, "signed in");
    Ok(web::Json(CurrentUserDto::from(&user)))
}

/// End the session.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 204, description = "Signed out")),
    tags = ["users"],
    operation_id = "logout",
    security([])
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::NoContent().finish()
}

/// The signed-in account and the console sections it may open.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = CurrentUserDto),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUser",
    security(("SessionCookie" = []))
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<CurrentUserDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let user = state.directory.get_user(&actor, &actor.user_id).await?;
    Ok(web::Json(CurrentUserDto::from(&user)))
}

/// List staff accounts matching a search term.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(SearchQuery),
    responses(
        (status = 200, description = "Users", body = [UserDto]),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listUsers",
    security(("SessionCookie" = []))
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<SearchQuery>,
) -> ApiResult<web::Json<Vec<UserDto>>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let users = state.directory.list_users(&actor, query.term()).await?;
    Ok(web::Json(views(&users)))
}

/// Fetch one account.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(RecordPath),
    responses(
        (status = 200, description = "User", body = UserDto),
        (status = 400, description = "Invalid id", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUser",
    security(("SessionCookie" = []))
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RecordPath>,
) -> ApiResult<web::Json<UserDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let id: UserId = parse_id(&path.id, USER_ID)?;
    let user = state.directory.get_user(&actor, &id).await?;
    Ok(web::Json(UserDto::from(&user)))
}

/// Create a staff account. Admins only.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 409, description = "Email already in use", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "addUser",
    security(("SessionCookie" = []))
)]
#[post("/users")]
pub async fn add_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let (draft, password) = payload.into_inner().into_parts()?;
    let user = state.directory.add_user(&actor, draft, password).await?;
    Ok(HttpResponse::Created().json(UserDto::from(&user)))
}

/// Edit a staff account. Admins only.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(RecordPath),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Email in use or last admin", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "updateUser",
    security(("SessionCookie" = []))
)]
#[put("/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RecordPath>,
    payload: web::Json<UpdateUserRequest>,
) -> ApiResult<web::Json<UserDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let id: UserId = parse_id(&path.id, USER_ID)?;
    let (patch, password) = payload.into_inner().into_parts()?;
    let user = state
        .directory
        .update_user(&actor, &id, patch, password)
        .await?;
    Ok(web::Json(UserDto::from(&user)))
}

/// Remove a staff account. Admins only.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(RecordPath),
    responses(
        (status = 204, description = "User removed"),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Open loans or last admin", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "removeUser",
    security(("SessionCookie" = []))
)]
#[delete("/users/{id}")]
pub async fn remove_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RecordPath>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let id: UserId = parse_id(&path.id, USER_ID)?;
    state.directory.remove_user(&actor, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Mount the sign-in and account routes. `/users/me` is registered ahead of
/// `/users/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(logout)
        .service(current_user)
        .service(list_users)
        .service(get_user)
        .service(add_user)
        .service(update_user)
        .service(remove_user);
}
