//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every REST handler, the wire DTOs and the shared
//! error payload, plus the session cookie security scheme. The document is
//! served by Swagger UI in debug builds and exported by the `openapi-dump`
//! binary.

use crate::inbound::http::books::{CreateBookRequest, UpdateBookRequest};
use crate::inbound::http::dto::{BookDto, CurrentUserDto, TransactionDto, UserDto};
use crate::inbound::http::reports::{
    CategoryCountDto, DashboardDto, DashboardStatsDto, MonthlyActivityDto, ReportsDto,
    TitleCountDto,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::transactions::{BorrowBody, ReturnBody};
use crate::inbound::http::users::{CreateUserRequest, LoginRequest, UpdateUserRequest};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the library console API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Library console API",
        description = "Catalogue, circulation and staff directory for the library console."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::add_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::remove_user,
        crate::inbound::http::books::list_books,
        crate::inbound::http::books::get_book,
        crate::inbound::http::books::add_book,
        crate::inbound::http::books::update_book,
        crate::inbound::http::books::remove_book,
        crate::inbound::http::transactions::list_transactions,
        crate::inbound::http::transactions::get_transaction,
        crate::inbound::http::transactions::borrow_book,
        crate::inbound::http::transactions::return_book,
        crate::inbound::http::reports::dashboard,
        crate::inbound::http::reports::reports,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        LoginRequest,
        CreateUserRequest,
        UpdateUserRequest,
        CreateBookRequest,
        UpdateBookRequest,
        BorrowBody,
        ReturnBody,
        BookDto,
        UserDto,
        CurrentUserDto,
        TransactionDto,
        DashboardDto,
        DashboardStatsDto,
        ReportsDto,
        MonthlyActivityDto,
        CategoryCountDto,
        TitleCountDto,
    )),
    tags(
        (name = "users", description = "Sign-in and staff accounts"),
        (name = "books", description = "Catalogue"),
        (name = "transactions", description = "Loans and returns"),
        (name = "reports", description = "Dashboard and reports"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
