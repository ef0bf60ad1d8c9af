//! WebSocket inbound adapter streaming applied changes to the console.
//!
//! Responsibilities:
//! - validate upgrade requests (session, origin allow-list)
//! - hand each connection a fresh subscription to the change feed
//! - keep WebSocket-specific concerns at the edge of the system

use actix_web::web::{self, Payload};
use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::{HeaderValue, ORIGIN},
};
use tracing::{error, info, warn};
use url::Url;

use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

mod session;

pub mod messages;
pub mod state;

use state::{AllowedOrigins, WsState};

/// Upgrade to the change stream. Requires a signed-in session.
#[get("/ws/changes")]
pub async fn ws_entry(
    http: web::Data<HttpState>,
    ws: web::Data<WsState>,
    session: SessionContext,
    req: HttpRequest,
    stream: Payload,
) -> actix_web::Result<HttpResponse> {
    let mut origin_iter = req.headers().get_all(ORIGIN);
    let origin_header = origin_iter.next().ok_or_else(|| {
        error!("Missing Origin header on WebSocket upgrade");
        actix_web::error::ErrorForbidden("Origin not allowed")
    })?;
    if origin_iter.next().is_some() {
        error!("Multiple Origin headers on WebSocket upgrade");
        return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
    }
    validate_origin(&ws.origins, origin_header)?;

    let actor = session.require_actor(http.login.as_ref()).await?;
    let feed = http.changes.subscribe();

    let (response, ws_session, messages) = actix_ws::handle(&req, stream).map_err(|error| {
        error!(error = %error, "WebSocket upgrade failed");
        actix_web::error::ErrorInternalServerError("WebSocket upgrade failed")
    })?;
    info!(user_id = %actor.user_id, "change stream opened");
    actix_web::rt::spawn(session::handle_ws_session(feed, ws_session, messages));
    Ok(response)
}

fn validate_origin(allowed: &AllowedOrigins, origin_header: &HeaderValue) -> actix_web::Result<()> {
    let origin_value = origin_header.to_str().map_err(|error| {
        error!(error = %error, "Failed to parse Origin header as string");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    let origin = Url::parse(origin_value).map_err(|error| {
        error!(error = %error, "Failed to parse Origin header as URL");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    if allowed.permits(&origin) {
        Ok(())
    } else {
        warn!(
            origin = origin_value,
            "Rejected WS upgrade due to disallowed Origin"
        );
        Err(actix_web::error::ErrorForbidden("Origin not allowed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use rstest::rstest;

    fn allowed() -> AllowedOrigins {
        AllowedOrigins::parse(["https://library.example"]).expect("origins")
    }

    #[rstest]
    #[case("http://localhost:3000")]
    #[case("https://library.example")]
    fn accepts_configured_origins(#[case] origin: &str) {
        let header = HeaderValue::from_str(origin).expect("valid header value");
        assert!(validate_origin(&allowed(), &header).is_ok());
    }

    #[rstest]
    #[case("http://localhost")]
    #[case("https://example.com")]
    fn rejects_disallowed_origins(#[case] origin: &str) {
        let header = HeaderValue::from_str(origin).expect("valid header value");
        let error = validate_origin(&allowed(), &header).expect_err("origin should be rejected");
        assert_eq!(
            error.as_response_error().status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[rstest]
    #[case(HeaderValue::from_bytes(&[0x80]).expect("opaque header value"))]
    #[case(HeaderValue::from_static("not a url"))]
    fn rejects_malformed_origin_headers(#[case] header: HeaderValue) {
        let error = validate_origin(&allowed(), &header).expect_err("origin should be rejected");
        assert_eq!(
            error.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
