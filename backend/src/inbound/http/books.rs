//! Catalogue API handlers.
//!
//! ```text
//! GET /api/v1/books?q=phys
//! POST /api/v1/books {"title":"Advanced Calculus","author":"John Doe","category":"Maths","totalCopies":8}
//! PUT /api/v1/books/{id} {"availableCopies":5}
//! DELETE /api/v1/books/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{BookDraft, BookId, BookPatch};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{BookDto, views};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_category, parse_id, require};

const BOOK_ID: FieldName = FieldName::new("id");
const TITLE: FieldName = FieldName::new("title");
const AUTHOR: FieldName = FieldName::new("author");
const CATEGORY: FieldName = FieldName::new("category");
const TOTAL_COPIES: FieldName = FieldName::new("totalCopies");

/// Free-text search over title, author and category.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring; empty matches everything.
    pub q: Option<String>,
}

impl SearchQuery {
    pub(crate) fn term(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }
}

/// Path parameters naming one record.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct RecordPath {
    /// Record identifier.
    pub id: String,
}

/// Body of `POST /api/v1/books`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    #[schema(example = "Physics")]
    pub category: Option<String>,
    pub total_copies: Option<u32>,
    /// Defaults to `totalCopies`; clamped to it.
    pub available_copies: Option<u32>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub publisher: Option<String>,
}

impl TryFrom<CreateBookRequest> for BookDraft {
    type Error = crate::domain::Error;

    fn try_from(value: CreateBookRequest) -> Result<Self, Self::Error> {
        let category = require(value.category, CATEGORY)?;
        Ok(Self {
            title: require(value.title, TITLE)?,
            author: require(value.author, AUTHOR)?,
            category: parse_category(&category, CATEGORY)?,
            total_copies: require(value.total_copies, TOTAL_COPIES)?,
            available_copies: value.available_copies,
            isbn: value.isbn,
            published_year: value.published_year,
            publisher: value.publisher,
        })
    }
}

/// Body of `PUT /api/v1/books/{id}`; omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub total_copies: Option<u32>,
    pub available_copies: Option<u32>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub publisher: Option<String>,
}

impl TryFrom<UpdateBookRequest> for BookPatch {
    type Error = crate::domain::Error;

    fn try_from(value: UpdateBookRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: value.title,
            author: value.author,
            category: value
                .category
                .map(|raw| parse_category(&raw, CATEGORY))
                .transpose()?,
            total_copies: value.total_copies,
            available_copies: value.available_copies,
            isbn: value.isbn,
            published_year: value.published_year,
            publisher: value.publisher,
        })
    }
}

/// List books matching a search term, ordered by title.
#[utoipa::path(
    get,
    path = "/api/v1/books",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching books", body = [BookDto]),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "listBooks",
    security(("SessionCookie" = []))
)]
#[get("/books")]
pub async fn list_books(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<SearchQuery>,
) -> ApiResult<web::Json<Vec<BookDto>>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let books = state.catalog.list_books(&actor, query.term()).await?;
    Ok(web::Json(views(&books)))
}

/// Fetch one book.
#[utoipa::path(
    get,
    path = "/api/v1/books/{id}",
    params(RecordPath),
    responses(
        (status = 200, description = "Book", body = BookDto),
        (status = 400, description = "Invalid id", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "getBook",
    security(("SessionCookie" = []))
)]
#[get("/books/{id}")]
pub async fn get_book(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RecordPath>,
) -> ApiResult<web::Json<BookDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let id: BookId = parse_id(&path.id, BOOK_ID)?;
    let book = state.catalog.get_book(&actor, &id).await?;
    Ok(web::Json(BookDto::from(&book)))
}

/// Add a title to the catalogue.
#[utoipa::path(
    post,
    path = "/api/v1/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book added", body = BookDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "addBook",
    security(("SessionCookie" = []))
)]
#[post("/books")]
pub async fn add_book(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateBookRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let draft = BookDraft::try_from(payload.into_inner())?;
    let book = state.catalog.add_book(&actor, draft).await?;
    Ok(HttpResponse::Created().json(BookDto::from(&book)))
}

/// Edit a title.
#[utoipa::path(
    put,
    path = "/api/v1/books/{id}",
    params(RecordPath),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "updateBook",
    security(("SessionCookie" = []))
)]
#[put("/books/{id}")]
pub async fn update_book(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RecordPath>,
    payload: web::Json<UpdateBookRequest>,
) -> ApiResult<web::Json<BookDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let id: BookId = parse_id(&path.id, BOOK_ID)?;
    let patch = BookPatch::try_from(payload.into_inner())?;
    let book = state.catalog.update_book(&actor, &id, patch).await?;
    Ok(web::Json(BookDto::from(&book)))
}

/// Remove a title that has no open loans.
#[utoipa::path(
    delete,
    path = "/api/v1/books/{id}",
    params(RecordPath),
    responses(
        (status = 204, description = "Book removed"),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Copies still on loan", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "removeBook",
    security(("SessionCookie" = []))
)]
#[delete("/books/{id}")]
pub async fn remove_book(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RecordPath>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let id: BookId = parse_id(&path.id, BOOK_ID)?;
    state.catalog.remove_book(&actor, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Mount the catalogue routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_books)
        .service(get_book)
        .service(add_book)
        .service(update_book)
        .service(remove_book);
}

#[cfg(test)]
#[path = "books_tests.rs"]
mod tests;
