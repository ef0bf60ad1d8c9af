//! Circulation API handlers.
//!
//! ```text
//! GET /api/v1/transactions?status=overdue&q=calculus
//! POST /api/v1/transactions {"userId":"…","bookId":"…","dueDate":"2024-03-15"}
//! POST /api/v1/transactions/{id}/return {"returnDate":"2024-03-20"}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::TransactionFilter;
use crate::domain::{BookId, BorrowRequest, TransactionId, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::books::RecordPath;
use crate::inbound::http::dto::{TransactionDto, views};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_id, parse_optional_timestamp, parse_status, require,
};

const TRANSACTION_ID: FieldName = FieldName::new("id");
const USER_ID: FieldName = FieldName::new("userId");
const BOOK_ID: FieldName = FieldName::new("bookId");
const STATUS: FieldName = FieldName::new("status");
const BORROW_DATE: FieldName = FieldName::new("borrowDate");
const DUE_DATE: FieldName = FieldName::new("dueDate");
const RETURN_DATE: FieldName = FieldName::new("returnDate");

/// Narrowing for `GET /api/v1/transactions`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct TransactionQuery {
    /// Substring of the borrower name or book title.
    pub q: Option<String>,
    /// `borrowed`, `returned` or `overdue`.
    pub status: Option<String>,
    /// Only loans of this borrower.
    pub user_id: Option<String>,
    /// Only loans of this title.
    pub book_id: Option<String>,
}

impl TryFrom<TransactionQuery> for TransactionFilter {
    type Error = crate::domain::Error;

    fn try_from(value: TransactionQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            term: value.q.unwrap_or_default(),
            status: value
                .status
                .map(|raw| parse_status(&raw, STATUS))
                .transpose()?,
            user_id: value
                .user_id
                .map(|raw| parse_id::<UserId>(&raw, USER_ID))
                .transpose()?,
            book_id: value
                .book_id
                .map(|raw| parse_id::<BookId>(&raw, BOOK_ID))
                .transpose()?,
        })
    }
}

/// Body of `POST /api/v1/transactions`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowBody {
    pub user_id: Option<String>,
    pub book_id: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`; defaults to now.
    pub borrow_date: Option<String>,
    /// Defaults to the borrow date plus the loan period.
    pub due_date: Option<String>,
}

impl TryFrom<BorrowBody> for BorrowRequest {
    type Error = crate::domain::Error;

    fn try_from(value: BorrowBody) -> Result<Self, Self::Error> {
        let user_id = require(value.user_id, USER_ID)?;
        let book_id = require(value.book_id, BOOK_ID)?;
        Ok(Self {
            user_id: parse_id(&user_id, USER_ID)?,
            book_id: parse_id(&book_id, BOOK_ID)?,
            borrow_date: parse_optional_timestamp(value.borrow_date.as_deref(), BORROW_DATE)?,
            due_date: parse_optional_timestamp(value.due_date.as_deref(), DUE_DATE)?,
        })
    }
}

/// Body of `POST /api/v1/transactions/{id}/return`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnBody {
    /// Defaults to now.
    pub return_date: Option<String>,
}

/// List loans, newest first, with statuses evaluated now.
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Matching transactions", body = [TransactionDto]),
        (status = 400, description = "Invalid filter", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["transactions"],
    operation_id = "listTransactions",
    security(("SessionCookie" = []))
)]
#[get("/transactions")]
pub async fn list_transactions(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TransactionQuery>,
) -> ApiResult<web::Json<Vec<TransactionDto>>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let filter = TransactionFilter::try_from(query.into_inner())?;
    let transactions = state.circulation.list_transactions(&actor, &filter).await?;
    Ok(web::Json(views(&transactions)))
}

/// Fetch one loan.
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    params(RecordPath),
    responses(
        (status = 200, description = "Transaction", body = TransactionDto),
        (status = 400, description = "Invalid id", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["transactions"],
    operation_id = "getTransaction",
    security(("SessionCookie" = []))
)]
#[get("/transactions/{id}")]
pub async fn get_transaction(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RecordPath>,
) -> ApiResult<web::Json<TransactionDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let id: TransactionId = parse_id(&path.id, TRANSACTION_ID)?;
    let transaction = state.circulation.get_transaction(&actor, &id).await?;
    Ok(web::Json(TransactionDto::from(&transaction)))
}

/// Lend one copy of a book.
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = BorrowBody,
    responses(
        (status = 201, description = "Loan recorded", body = TransactionDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Unknown book or borrower", body = ErrorSchema),
        (status = 409, description = "No copies available", body = ErrorSchema)
    ),
    tags = ["transactions"],
    operation_id = "borrowBook",
    security(("SessionCookie" = []))
)]
#[post("/transactions")]
pub async fn borrow_book(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<BorrowBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let request = BorrowRequest::try_from(payload.into_inner())?;
    let transaction = state.circulation.borrow(&actor, request).await?;
    Ok(HttpResponse::Created().json(TransactionDto::from(&transaction)))
}

/// Close a loan and settle its fine.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/return",
    params(RecordPath),
    request_body(content = ReturnBody, description = "Optional; omit to return now"),
    responses(
        (status = 200, description = "Loan closed", body = TransactionDto),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Already returned", body = ErrorSchema)
    ),
    tags = ["transactions"],
    operation_id = "returnBook",
    security(("SessionCookie" = []))
)]
#[post("/transactions/{id}/return")]
pub async fn return_book(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<RecordPath>,
    payload: Option<web::Json<ReturnBody>>,
) -> ApiResult<web::Json<TransactionDto>> {
    let actor = session.require_actor(state.login.as_ref()).await?;
    let id: TransactionId = parse_id(&path.id, TRANSACTION_ID)?;
    let body = payload.map(web::Json::into_inner).unwrap_or_default();
    let return_date = parse_optional_timestamp(body.return_date.as_deref(), RETURN_DATE)?;
    let transaction = state
        .circulation
        .record_return(&actor, &id, return_date)
        .await?;
    Ok(web::Json(TransactionDto::from(&transaction)))
}

/// Mount the circulation routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_transactions)
        .service(get_transaction)
        .service(borrow_book)
        .service(return_book);
}

#[cfg(test)]
#[path = "transactions_tests.rs"]
mod tests;
