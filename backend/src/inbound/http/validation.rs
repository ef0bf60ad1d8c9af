//! Shared validation helpers for inbound HTTP adapters.
//!
//! Request bodies arrive as loosely typed DTOs; these helpers turn their
//! strings into domain values and report failures as `invalid_request`
//! errors carrying the offending field.

use std::str::FromStr;

use actix_web::web;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use crate::domain::{BookCategory, Error, Role, TransactionStatus};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidId,
    InvalidTimestamp,
    InvalidCategory,
    InvalidRole,
    InvalidStatus,
    InvalidValue,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidId => "invalid_id",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidCategory => "invalid_category",
            ErrorCode::InvalidRole => "invalid_role",
            ErrorCode::InvalidStatus => "invalid_status",
            ErrorCode::InvalidValue => "invalid_value",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("missing required field: {field}"))
        .with_code(ErrorCode::MissingField)
}

/// Reject a value that failed a domain rule, keeping the rule's message.
pub(crate) fn invalid_value_error(field: FieldName, message: impl Into<String>) -> Error {
    ValidationError::new(field.as_str(), message).with_code(ErrorCode::InvalidValue)
}

pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

/// Parse a record identifier (`BookId`, `UserId`, `TransactionId`).
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse().map_err(|_| {
        let name = field.as_str();
        ValidationError::new(name, format!("{name} must be a valid UUID"))
            .with_value(ErrorCode::InvalidId, value)
    })
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(
        field,
        format!("{field} must be an RFC 3339 timestamp or a YYYY-MM-DD date"),
    )
    .with_value(ErrorCode::InvalidTimestamp, value)
}

/// Parse a timestamp; bare dates are read as midnight UTC.
pub(crate) fn parse_timestamp(value: &str, field: FieldName) -> Result<DateTime<Utc>, Error> {
    let trimmed = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| invalid_timestamp_error(field, value))
}

pub(crate) fn parse_optional_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value.map(|raw| parse_timestamp(raw, field)).transpose()
}

pub(crate) fn parse_category(value: &str, field: FieldName) -> Result<BookCategory, Error> {
    value.parse().map_err(|_| {
        let name = field.as_str();
        let allowed = BookCategory::ALL
            .iter()
            .map(|category| category.label())
            .collect::<Vec<_>>()
            .join(", ");
        ValidationError::new(name, format!("{name} must be one of: {allowed}"))
            .with_value(ErrorCode::InvalidCategory, value)
    })
}

pub(crate) fn parse_role(value: &str, field: FieldName) -> Result<Role, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "admin" => Ok(Role::Admin),
        "librarian" => Ok(Role::Librarian),
        _ => {
            let name = field.as_str();
            Err(
                ValidationError::new(name, format!("{name} must be admin or librarian"))
                    .with_value(ErrorCode::InvalidRole, value),
            )
        }
    }
}

pub(crate) fn parse_status(value: &str, field: FieldName) -> Result<TransactionStatus, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "borrowed" => Ok(TransactionStatus::Borrowed),
        "returned" => Ok(TransactionStatus::Returned),
        "overdue" => Ok(TransactionStatus::Overdue),
        _ => {
            let name = field.as_str();
            Err(ValidationError::new(
                name,
                format!("{name} must be borrowed, returned or overdue"),
            )
            .with_value(ErrorCode::InvalidStatus, value))
        }
    }
}

/// JSON body settings reporting malformed payloads as `invalid_request`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        Error::invalid_request(format!("malformed JSON body: {err}")).into()
    })
}

/// Query string settings reporting malformed parameters as `invalid_request`.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        Error::invalid_request(format!("malformed query string: {err}")).into()
    })
}
