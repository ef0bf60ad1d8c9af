//! JSON error responses for the console API.
//!
//! Each [`ErrorCode`] maps to one status. Server-side failures are logged
//! with their trace id, and internal failures reach the client only as a
//! generic message.

use std::borrow::Cow;

use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

pub use crate::domain::ApiResult;

const GENERIC_MESSAGE: &str = "Internal server error";

impl ErrorCode {
    /// Status line used when this code leaves the HTTP adapter.
    pub(crate) const fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::CopiesUnavailable | Self::InvalidState | Self::Conflict => StatusCode::CONFLICT,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Error {
    /// Payload the client is allowed to see.
    ///
    /// Internal failures keep only their trace id.
    fn client_view(&self) -> Cow<'_, Self> {
        if self.code() != ErrorCode::InternalError {
            return Cow::Borrowed(self);
        }
        let generic = Self::internal(GENERIC_MESSAGE);
        Cow::Owned(match self.trace_id() {
            Some(id) => generic.with_trace_id(id),
            None => generic,
        })
    }

    fn log_server_failure(&self, status: StatusCode) {
        error!(
            status = status.as_u16(),
            code = self.code().as_str(),
            trace_id = self.trace_id().unwrap_or("none"),
            cause = self.message(),
            "request ended in a server failure"
        );
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        self.code().http_status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            self.log_server_failure(status);
        }
        let mut response = HttpResponse::build(status).json(self.client_view().as_ref());
        if let Some(value) = self.trace_id().and_then(|id| HeaderValue::from_str(id).ok()) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
        }
        response
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        let status = err.as_response_error().status_code();
        error!(status = status.as_u16(), cause = %err, "framework error surfaced as internal failure");
        Self::internal(GENERIC_MESSAGE)
    }
}

#[cfg(test)]
mod tests;
